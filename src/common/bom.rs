//! Byte Order Mark (BOM) utilities for byte-backed streams.
//!
//! Input decoding relies on `encoding_rs` BOM sniffing; [`detect_bom`] only
//! records which mark was seen. On the output side a sink may be asked to
//! lead with the BOM of its encoding.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// Supported BOM encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomKind {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl BomKind {
    /// Returns the byte representation of the BOM.
    #[inline]
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            BomKind::Utf8 => &UTF8_BOM,
            BomKind::Utf16Le => &UTF16_LE_BOM,
            BomKind::Utf16Be => &UTF16_BE_BOM,
        }
    }

    /// The BOM that announces `encoding`, if it has one.
    pub fn for_encoding(encoding: &'static Encoding) -> Option<Self> {
        if encoding == UTF_8 {
            Some(BomKind::Utf8)
        } else if encoding == UTF_16LE {
            Some(BomKind::Utf16Le)
        } else if encoding == UTF_16BE {
            Some(BomKind::Utf16Be)
        } else {
            None
        }
    }
}

/// UTF-8 BOM bytes.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 little-endian BOM bytes.
pub const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 big-endian BOM bytes.
pub const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Detects a BOM at the start of `bytes`.
pub fn detect_bom(bytes: &[u8]) -> Option<BomKind> {
    Encoding::for_bom(bytes).and_then(|(encoding, _)| BomKind::for_encoding(encoding))
}
