//! Record start offset discovery.
//!
//! [`LineOffsets`] walks a source front to back in fixed-size chunks and yields the
//! absolute byte offset of the first byte of every record: `0` first, then the
//! position just past each terminator byte. Positions are computed from the
//! absolute chunk start, so a terminator in the last byte of a chunk is reported
//! like any other, and the output does not depend on the chunk size.
//!
//! ```
//! use linestride::offsets::line_offsets;
//!
//! let data = b"a,b\nc,d\n".to_vec();
//! let offsets: Vec<u64> = line_offsets(&data, 4, b'\n')
//!     .collect::<anyhow::Result<_>>()
//!     .unwrap();
//! assert_eq!(offsets, vec![0, 4, 8]);
//! ```

use crate::source::{ReadAt, read_chunk_at};
use anyhow::{Context, Result};

/// Lazy iterator over record start offsets of a source.
///
/// Yields `Ok(offset)` in strictly increasing order. A read error is yielded once
/// as `Err`; the iterator is fused afterwards.
pub struct LineOffsets<R> {
    src: R,
    terminator: u8,
    buf: Vec<u8>,
    // absolute position of the next chunk to read
    pos: u64,
    // index of the next unscanned byte in `buf[..filled]`
    cursor: usize,
    filled: usize,
    // absolute position of `buf[0]`
    chunk_start: u64,
    started: bool,
    done: bool,
    bytes_read: u64,
}

/// Build a [`LineOffsets`] over `src` reading `buffer_size` bytes at a time.
pub fn line_offsets<R: ReadAt>(src: R, buffer_size: usize, terminator: u8) -> LineOffsets<R> {
    LineOffsets::new(src, buffer_size, terminator)
}

impl<R: ReadAt> LineOffsets<R> {
    pub fn new(src: R, buffer_size: usize, terminator: u8) -> Self {
        Self {
            src,
            terminator,
            buf: vec![0u8; buffer_size.max(1)],
            pos: 0,
            cursor: 0,
            filled: 0,
            chunk_start: 0,
            started: false,
            done: false,
            bytes_read: 0,
        }
    }

    /// Total bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn refill(&mut self) -> Result<bool> {
        let n = read_chunk_at(&self.src, &mut self.buf, self.pos)
            .with_context(|| format!("scan {} bytes at offset {}", self.buf.len(), self.pos))?;
        self.chunk_start = self.pos;
        self.pos += n as u64;
        self.bytes_read += n as u64;
        self.cursor = 0;
        self.filled = n;
        Ok(n > 0)
    }
}

impl<R: ReadAt> Iterator for LineOffsets<R> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(Ok(0));
        }
        loop {
            if let Some(i) = self.buf[self.cursor..self.filled]
                .iter()
                .position(|&b| b == self.terminator)
            {
                let idx = self.cursor + i;
                self.cursor = idx + 1;
                return Some(Ok(self.chunk_start + idx as u64 + 1));
            }
            match self.refill() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: ReadAt> std::iter::FusedIterator for LineOffsets<R> {}
