//! Double-buffered byte reader with non-consuming lookahead
//!
//! Two buffers are kept: `left` is being consumed, `right` holds the bytes that
//! follow it. When `left` runs dry the buffers swap and the old `left` is refilled
//! as the new `right`, so one buffer's worth of bytes past the cursor can always be
//! peeked without consuming anything.

use crate::error::{TablContext, TablError, TablResult};
use std::fs::File;
use std::io::{self, Read};

/// Source name that selects standard input
pub const STDIN_NAME: &str = "-";

pub struct BufferedReader {
    source: Box<dyn Read>,
    left: Vec<u8>,
    right: Vec<u8>,
    left_len: usize,
    right_len: usize,
    pos: usize,
    capacity: usize,
    eof: bool,
}

impl BufferedReader {
    /// Open a file (or stdin for `-`) with the default buffer size
    pub fn open(name: &str) -> TablResult<Self> {
        Self::open_with_capacity(name, crate::config::DEFAULT_BUFFER_SIZE)
    }

    /// Open a file (or stdin for `-`) with `capacity` bytes per buffer
    pub fn open_with_capacity(name: &str, capacity: usize) -> TablResult<Self> {
        let source: Box<dyn Read> = if name == STDIN_NAME {
            Box::new(io::stdin())
        } else {
            let file = File::open(name).with_file_context(name)?;
            if file.metadata().with_file_context(name)?.is_dir() {
                return Err(TablError::is_directory(name));
            }
            Box::new(file)
        };

        Ok(Self::from_reader(source, capacity))
    }

    /// Wrap an already open source
    pub fn from_reader(source: Box<dyn Read>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            source,
            left: vec![0; capacity],
            right: vec![0; capacity],
            left_len: 0,
            right_len: 0,
            pos: 0,
            capacity,
            eof: false,
        }
    }

    /// Capacity of each of the two buffers
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read one byte, `None` at end of stream
    pub fn read_byte(&mut self) -> TablResult<Option<u8>> {
        if !self.swap_and_fill()? {
            return Ok(None);
        }
        let byte = self.left[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    /// Copy upcoming bytes into `buf` without consuming them.
    ///
    /// Returns the number of bytes available; a count smaller than `buf.len()`
    /// means the stream ends before that point.
    pub fn peek(&mut self, buf: &mut [u8]) -> TablResult<usize> {
        if buf.len() > self.capacity {
            return Err(TablError::PeekTooLong {
                requested: buf.len(),
                capacity: self.capacity,
            });
        }

        if !self.swap_and_fill()? {
            return Ok(0);
        }

        let from_left = (self.left_len - self.pos).min(buf.len());
        buf[..from_left].copy_from_slice(&self.left[self.pos..self.pos + from_left]);

        let from_right = (buf.len() - from_left).min(self.right_len);
        buf[from_left..from_left + from_right].copy_from_slice(&self.right[..from_right]);

        Ok(from_left + from_right)
    }

    /// Make sure `left` holds at least one unread byte.
    ///
    /// Returns `false` once the stream is exhausted.
    fn swap_and_fill(&mut self) -> io::Result<bool> {
        while self.pos >= self.left_len {
            if self.right_len > 0 {
                std::mem::swap(&mut self.left, &mut self.right);
                self.left_len = self.right_len;
                self.right_len = 0;
                self.pos = 0;
                if !self.eof {
                    self.right_len = self.fill_right()?;
                }
            } else if self.eof {
                return Ok(false);
            } else {
                // first access
                self.left_len = fill(&mut self.source, &mut self.left, &mut self.eof)?;
                self.pos = 0;
                if !self.eof {
                    self.right_len = self.fill_right()?;
                }
            }
        }
        Ok(true)
    }

    fn fill_right(&mut self) -> io::Result<usize> {
        fill(&mut self.source, &mut self.right, &mut self.eof)
    }
}

/// Fill `buf` from `source`; a short read marks the end of the stream.
fn fill(source: &mut Box<dyn Read>, buf: &mut [u8], eof: &mut bool) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => {
                *eof = true;
                break;
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl Read for BufferedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            if !self.swap_and_fill()? {
                break;
            }
            let n = (self.left_len - self.pos).min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&self.left[self.pos..self.pos + n]);
            self.pos += n;
            written += n;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &[u8], capacity: usize) -> BufferedReader {
        BufferedReader::from_reader(Box::new(Cursor::new(data.to_vec())), capacity)
    }

    /// Hands out at most one byte per call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    fn read_all_bytes(br: &mut BufferedReader) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = br.read_byte().expect("read_byte failed") {
            out.push(b);
        }
        out
    }

    #[test]
    fn test_missing_file() {
        match BufferedReader::open("/nonexistent/tabl/missing.txt") {
            Err(TablError::FileNotFound { file }) => {
                assert_eq!(file, "/nonexistent/tabl/missing.txt")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error opening a missing file"),
        }
    }

    #[test]
    fn test_open_file() -> TablResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.txt");
        std::fs::write(&path, b"# comment\nname\tage\n")?;

        let mut br = BufferedReader::open(path.to_str().expect("utf-8 path"))?;
        assert_eq!(br.capacity(), crate::config::DEFAULT_BUFFER_SIZE);
        let mut buf = [0u8; 4];
        assert_eq!(br.peek(&mut buf)?, 4);
        assert_eq!(&buf, b"# co");
        Ok(())
    }

    #[test]
    fn test_peek_too_long() {
        let mut br = reader(b"0123456789", 4);
        let mut buf = [0u8; 5];
        assert!(matches!(
            br.peek(&mut buf),
            Err(TablError::PeekTooLong {
                requested: 5,
                capacity: 4
            })
        ));
    }

    #[test]
    fn test_peek_is_idempotent() -> TablResult<()> {
        let mut br = reader(b"# comment line", 4);
        let mut first = [0u8; 4];
        let mut second = [0u8; 4];

        assert_eq!(br.peek(&mut first)?, 4);
        assert_eq!(br.peek(&mut second)?, 4);
        assert_eq!(first, second);
        assert_eq!(&first, b"# co");
        Ok(())
    }

    #[test]
    fn test_peek_then_read_match() -> TablResult<()> {
        let mut br = reader(b"abcdefghij", 4);
        br.read_byte()?;
        br.read_byte()?;
        br.read_byte()?;

        // spans the end of left and the start of right
        let mut peeked = [0u8; 4];
        assert_eq!(br.peek(&mut peeked)?, 4);
        let mut read = [0u8; 4];
        assert_eq!(br.read(&mut read)?, 4);
        assert_eq!(peeked, read);
        assert_eq!(&read, b"defg");
        Ok(())
    }

    #[test]
    fn test_peek_short_at_end() -> TablResult<()> {
        let mut br = reader(b"xyz", 4);
        let mut buf = [0u8; 4];
        assert_eq!(br.peek(&mut buf)?, 3);
        assert_eq!(&buf[..3], b"xyz");

        assert_eq!(read_all_bytes(&mut br), b"xyz");
        assert_eq!(br.peek(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn test_boundary_exact_multiple() {
        let mut br = reader(b"01234567", 4);
        assert_eq!(read_all_bytes(&mut br), b"01234567");
        assert_eq!(br.read_byte().expect("read_byte failed"), None);
    }

    #[test]
    fn test_boundary_one_past_multiple() {
        let mut br = reader(b"012345678", 4);
        assert_eq!(read_all_bytes(&mut br), b"012345678");
    }

    #[test]
    fn test_bulk_read_across_buffers() -> io::Result<()> {
        let mut br = reader(b"012345678", 4);
        let mut buf = [0u8; 6];
        assert_eq!(br.read(&mut buf)?, 6);
        assert_eq!(&buf, b"012345");
        assert_eq!(br.read(&mut buf)?, 3);
        assert_eq!(&buf[..3], b"678");
        assert_eq!(br.read(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn test_empty_stream() -> TablResult<()> {
        let mut br = reader(b"", 4);
        let mut buf = [0u8; 2];
        assert_eq!(br.peek(&mut buf)?, 0);
        assert_eq!(br.read_byte()?, None);
        Ok(())
    }

    #[test]
    fn test_trickling_source() -> TablResult<()> {
        let data = b"trickle-fed source".to_vec();
        let mut br = BufferedReader::from_reader(Box::new(Trickle(Cursor::new(data.clone()))), 4);

        let mut buf = [0u8; 4];
        assert_eq!(br.peek(&mut buf)?, 4);
        assert_eq!(&buf, b"tric");
        assert_eq!(read_all_bytes(&mut br), data);
        Ok(())
    }
}
