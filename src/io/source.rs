//! Character sources for the decoder.

use crate::common::BomKind;
use crate::common::bom::detect_bom;
use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use std::io::{self, Read};

/// Default number of bytes pulled from a reader per decode step.
const DEFAULT_BYTE_CHUNK: usize = 8192;

/// A blocking, chunked stream of characters.
///
/// `read_chars` fills a prefix of `buf` and reports how many characters it
/// wrote. `Ok(None)` marks the end of the stream; `Ok(Some(0))` only means
/// that nothing was available this time. An error is fatal to the decoder
/// that issued the read.
pub trait CharSource {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>>;

    /// Release the underlying resource. Called at most once by the decoder.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        (**self).read_chars(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        (**self).read_chars(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Copy characters of `text[*offset..]` into `buf`, advancing `offset`.
fn drain_chars(text: &str, offset: &mut usize, buf: &mut [char]) -> usize {
    let mut written = 0;
    for (i, c) in text[*offset..].char_indices() {
        if written == buf.len() {
            *offset += i;
            return written;
        }
        buf[written] = c;
        written += 1;
    }
    *offset = text.len();
    written
}

/// In-memory source over an owned string.
#[derive(Debug, Clone)]
pub struct StrSource {
    text: String,
    offset: usize,
}

impl StrSource {
    pub fn new(text: impl Into<String>) -> Self {
        StrSource {
            text: text.into(),
            offset: 0,
        }
    }

    /// Characters not yet handed out.
    pub fn remaining(&self) -> &str {
        &self.text[self.offset..]
    }
}

impl CharSource for StrSource {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        if self.offset >= self.text.len() {
            return Ok(None);
        }
        Ok(Some(drain_chars(&self.text, &mut self.offset, buf)))
    }
}

/// Source decoding a byte reader through `encoding_rs`.
///
/// A leading UTF-8 or UTF-16 byte-order mark overrides the declared encoding
/// and is removed. Malformed byte sequences decode to U+FFFD.
pub struct ReaderSource<R> {
    reader: R,
    decoder: Decoder,
    bytes: Vec<u8>,
    decoded: String,
    offset: usize,
    finished: bool,
    bom: Option<BomKind>,
    sniffed: bool,
}

impl<R: Read> ReaderSource<R> {
    /// Create a UTF-8 source
    pub fn new(reader: R) -> Self {
        Self::with_encoding(reader, UTF_8)
    }

    /// Create a source for the given encoding
    pub fn with_encoding(reader: R, encoding: &'static Encoding) -> Self {
        ReaderSource {
            reader,
            decoder: encoding.new_decoder(),
            bytes: vec![0; DEFAULT_BYTE_CHUNK],
            decoded: String::new(),
            offset: 0,
            finished: false,
            bom: None,
            sniffed: false,
        }
    }

    /// The encoding in effect, after BOM sniffing once input has been seen.
    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }

    /// The byte-order mark found at the start of the input, once read.
    pub fn bom(&self) -> Option<BomKind> {
        self.bom
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self) -> io::Result<()> {
        let read = loop {
            match self.reader.read(&mut self.bytes) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        let last = read == 0;
        if !self.sniffed && !last {
            self.sniffed = true;
            self.bom = detect_bom(&self.bytes[..read]);
        }

        self.decoded.clear();
        self.offset = 0;
        let needed = self.decoder.max_utf8_buffer_length(read).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "decoded chunk size overflows")
        })?;
        self.decoded.reserve(needed);

        let (result, _, _) = self
            .decoder
            .decode_to_string(&self.bytes[..read], &mut self.decoded, last);
        if result == CoderResult::OutputFull {
            return Err(io::Error::other("decode buffer exhausted"));
        }

        self.finished = last;
        Ok(())
    }
}

impl<R: Read> CharSource for ReaderSource<R> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        loop {
            if self.offset < self.decoded.len() {
                return Ok(Some(drain_chars(&self.decoded, &mut self.offset, buf)));
            }
            if self.finished {
                return Ok(None);
            }
            self.fill()?;
        }
    }
}
