//! Random-access buffering for sequential byte streams.
//!
//! Paginated formats keep their index at the end of the file, so the decoder
//! needs to seek. A plain `Read` cannot, so the stream is read into memory
//! once.

use std::io::{self, Cursor, Read};

/// Most bytes reserved up front; larger streams grow as they are read.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// A fully buffered byte source supporting positional reads.
///
/// ```rust
/// use tokslab::ByteSource;
///
/// let source = ByteSource::from_reader(&b"hello world"[..], 11).unwrap();
/// let mut buf = [0u8; 5];
/// assert_eq!(source.read_at(&mut buf, 6).unwrap(), 5);
/// assert_eq!(&buf, b"world");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteSource {
    data: Vec<u8>,
}

impl ByteSource {
    /// Wrap bytes already in memory.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Read exactly `size` bytes from `reader`.
    ///
    /// # Errors
    ///
    /// Returns an `UnexpectedEof` error if the stream ends before `size`
    /// bytes, or any error the reader reports.
    pub fn from_reader<R: Read>(reader: R, size: u64) -> io::Result<Self> {
        let capacity = usize::try_from(size.min(MAX_PREALLOC)).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        reader.take(size).read_to_end(&mut data)?;
        if (data.len() as u64) < size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended after {} of {size} bytes", data.len()),
            ));
        }
        Ok(Self { data })
    }

    /// Copy bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied, which is short only at the end of
    /// the data.
    ///
    /// # Errors
    ///
    /// Returns an `UnexpectedEof` error if `offset` is at or past the end.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start < self.data.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    /// A seekable reader over the data.
    pub fn cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_slice())
    }

    /// The buffered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
