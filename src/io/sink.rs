//! Character sinks for the encoder.

use crate::common::BomKind;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use std::io::{self, BufWriter, Write};

/// A blocking destination for text.
pub trait CharSink {
    fn write_str(&mut self, s: &str) -> io::Result<()>;

    fn write_char(&mut self, c: char) -> io::Result<()> {
        let mut utf8 = [0u8; 4];
        self.write_str(c.encode_utf8(&mut utf8))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Flush and release the underlying resource.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl CharSink for String {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.push_str(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> io::Result<()> {
        self.push(c);
        Ok(())
    }
}

impl<S: CharSink + ?Sized> CharSink for &mut S {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn write_char(&mut self, c: char) -> io::Result<()> {
        (**self).write_char(c)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: CharSink + ?Sized> CharSink for Box<S> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn write_char(&mut self, c: char) -> io::Result<()> {
        (**self).write_char(c)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Buffered sink encoding text onto a byte writer.
///
/// Output reaches the writer when the internal buffer fills, on `flush`, or
/// on `close`. UTF-16 is encoded directly; every other encoding goes through
/// `encoding_rs`, which writes unmappable characters as numeric character
/// references.
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
    encoding: &'static Encoding,
    pending_bom: Option<BomKind>,
}

impl<W: Write> WriterSink<W> {
    /// Create a UTF-8 sink
    pub fn new(writer: W) -> Self {
        Self::with_encoding(writer, UTF_8)
    }

    /// Create a sink for the given encoding
    pub fn with_encoding(writer: W, encoding: &'static Encoding) -> Self {
        WriterSink {
            writer: BufWriter::new(writer),
            encoding,
            pending_bom: None,
        }
    }

    /// Lead the output with the encoding's byte-order mark, if it has one.
    pub fn with_bom(mut self) -> Self {
        self.pending_bom = BomKind::for_encoding(self.encoding);
        self
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Flush buffered output and return the writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.write_bom()?;
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    fn write_bom(&mut self) -> io::Result<()> {
        if let Some(bom) = self.pending_bom.take() {
            self.writer.write_all(bom.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: Write> CharSink for WriterSink<W> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_bom()?;
        if self.encoding == UTF_16LE {
            for unit in s.encode_utf16() {
                self.writer.write_all(&unit.to_le_bytes())?;
            }
        } else if self.encoding == UTF_16BE {
            for unit in s.encode_utf16() {
                self.writer.write_all(&unit.to_be_bytes())?;
            }
        } else {
            let (bytes, _, _) = self.encoding.encode(s);
            self.writer.write_all(&bytes)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_bom()?;
        self.writer.flush()
    }
}
