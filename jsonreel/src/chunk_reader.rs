// SPDX-License-Identifier: Apache-2.0

//! An in-memory [`Reader`] for documents that are already loaded.
//!
//! [`ChunkReader`] can hand out a whole slice at once or cap every read at a
//! fixed chunk size, which is how the streaming code paths get exercised
//! without real I/O.
//!
//! ```rust
//! use jsonreel::{deserialize_with, ChunkReader, ParseError, Token, Tokens};
//!
//! // Sum an array of integers, three bytes at a time.
//! let reader = ChunkReader::new(b"[10, 20, 12]", 3);
//! let sum = deserialize_with(
//!     reader,
//!     0i64,
//!     |sum: &mut i64, tokens: &mut Tokens<'_>, _: &mut i32| -> Result<bool, ParseError> {
//!         while let Some(token) = tokens.next_token()? {
//!             match token {
//!                 Token::StartArray => {}
//!                 Token::Number(n) => *sum += n.as_i64().ok_or_else(|| tokens.overflow())?,
//!                 Token::EndArray => return Ok(true),
//!                 _ => return Err(tokens.unexpected("an integer")),
//!             }
//!         }
//!         Ok(false)
//!     },
//! )
//! .unwrap();
//! assert_eq!(sum, 42);
//! ```

use crate::Reader;

/// A [`Reader`] over a byte slice, optionally in fixed-size chunks.
///
/// - [`ChunkReader::full_slice`] reads as much as the destination can hold.
/// - [`ChunkReader::new`] returns at most `chunk_size` bytes per read, which
///   simulates packets arriving from a socket.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    chunk_size: usize,
}

impl<'a> ChunkReader<'a> {
    /// Each read returns at most `chunk_size` bytes (minimum 1).
    pub fn new(data: &'a [u8], chunk_size: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Consume the slice as fast as the destination buffer allows.
    pub fn full_slice(data: &'a [u8]) -> Self {
        Self::new(data, usize::MAX)
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl Reader for ChunkReader<'_> {
    type Error = std::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let to_copy = self.remaining().len().min(buf.len()).min(self.chunk_size);
        buf[..to_copy].copy_from_slice(&self.data[self.pos..self.pos + to_copy]);
        self.pos += to_copy;
        Ok(to_copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_slice_reader_basic() {
        let mut reader = ChunkReader::full_slice(b"hello world");

        let mut buf = [0u8; 5];
        assert_eq!(reader.read(&mut buf), Ok(5));
        assert_eq!(&buf, b"hello");

        let mut buf = [0u8; 10];
        assert_eq!(reader.read(&mut buf), Ok(6));
        assert_eq!(&buf[..6], b" world");

        // EOF
        assert_eq!(reader.read(&mut buf), Ok(0));
    }

    #[test]
    fn test_chunk_reader_limits_each_read() {
        let mut reader = ChunkReader::new(b"hello world", 4);
        let mut buf = [0u8; 10];
        assert_eq!(reader.read(&mut buf), Ok(4));
        assert_eq!(&buf[..4], b"hell");
        assert_eq!(reader.remaining(), b"o world");

        // Destination smaller than the chunk.
        assert_eq!(reader.read(&mut buf[..2]), Ok(2));
        assert_eq!(&buf[..2], b"o ");

        assert_eq!(reader.read(&mut buf), Ok(4));
        assert_eq!(reader.read(&mut buf), Ok(1));
        assert_eq!(reader.read(&mut buf), Ok(0));
    }

    #[test]
    fn test_zero_chunk_size_reads_one_byte() {
        let mut reader = ChunkReader::new(b"ab", 0);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf), Ok(1));
    }
}
