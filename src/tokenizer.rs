//! Splitting one span of a file into delimiter-separated tokens.
//!
//! [`SpanTokens`] re-reads `[start, end)` at explicit offsets in chunks of at most
//! `buffer_size` bytes. Bytes seen since the last separator are carried across
//! chunk refills, so a token may be arbitrarily longer than the buffer.
//!
//! For a span ending in its terminator the number of tokens is the number of
//! delimiters plus one, and joining the tokens with the delimiter reproduces the
//! span without its terminator. An empty span yields no tokens.
//!
//! ```
//! use linestride::{Span, tokenizer::tokenize_span};
//!
//! let data = b"abcdefghij,k\n".to_vec();
//! let tokens: Vec<String> = tokenize_span(&data, Span::new(0, 13), 4, b',', b'\n')
//!     .map(|t| t.map(|t| t.to_string_lossy().into_owned()))
//!     .collect::<anyhow::Result<_>>()
//!     .unwrap();
//! assert_eq!(tokens, vec!["abcdefghij", "k"]);
//! ```

use crate::source::{ReadAt, read_chunk_at};
use crate::span::Span;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

/// The raw bytes of one field.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(Vec<u8>);

impl Token {
    #[inline]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The token as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Token {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Lazy iterator over the tokens of one span.
///
/// A read error is yielded once as `Err`; the iterator is fused afterwards.
pub struct SpanTokens<R> {
    src: R,
    span: Span,
    delimiter: u8,
    terminator: u8,
    buf: Vec<u8>,
    // absolute position of the next chunk to read
    pos: u64,
    carry: Vec<u8>,
    // tokens completed in the current chunk, not yet handed out
    ready: VecDeque<Token>,
    // the last byte consumed was a delimiter, so an (empty) field is open
    open_field: bool,
    exhausted: bool,
    done: bool,
    bytes_read: u64,
}

/// Build a [`SpanTokens`] over `span` of `src`.
pub fn tokenize_span<R: ReadAt>(
    src: R,
    span: Span,
    buffer_size: usize,
    delimiter: u8,
    terminator: u8,
) -> SpanTokens<R> {
    SpanTokens::new(src, span, buffer_size, delimiter, terminator)
}

impl<R: ReadAt> SpanTokens<R> {
    pub fn new(src: R, span: Span, buffer_size: usize, delimiter: u8, terminator: u8) -> Self {
        Self {
            src,
            span,
            delimiter,
            terminator,
            buf: vec![0u8; buffer_size.max(1)],
            pos: span.start,
            carry: Vec::new(),
            ready: VecDeque::new(),
            open_field: false,
            exhausted: span.is_empty(),
            done: false,
            bytes_read: 0,
        }
    }

    /// Total bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read the next chunk of the span and split it. Returns `false` at end of stream.
    fn fill(&mut self) -> Result<bool> {
        let remaining = self.span.end.saturating_sub(self.pos);
        if remaining == 0 {
            return Ok(false);
        }
        let want = (self.buf.len() as u64).min(remaining) as usize;
        let n = read_chunk_at(&self.src, &mut self.buf[..want], self.pos).with_context(|| {
            format!("read {want} bytes at offset {} of span {}", self.pos, self.span)
        })?;
        if n == 0 {
            // source ended before the span did
            return Ok(false);
        }
        self.pos += n as u64;
        self.bytes_read += n as u64;

        let chunk = &self.buf[..n];
        let mut token_start = 0;
        for (i, &b) in chunk.iter().enumerate() {
            if b == self.delimiter || b == self.terminator {
                let mut bytes = std::mem::take(&mut self.carry);
                bytes.extend_from_slice(&chunk[token_start..i]);
                self.ready.push_back(Token(bytes));
                token_start = i + 1;
                self.open_field = b == self.delimiter;
            }
        }
        if token_start < n {
            self.carry.extend_from_slice(&chunk[token_start..]);
            self.open_field = false;
        }
        Ok(true)
    }
}

impl<R: ReadAt> Iterator for SpanTokens<R> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(t) = self.ready.pop_front() {
                return Some(Ok(t));
            }
            if self.done {
                return None;
            }
            if self.exhausted {
                self.done = true;
                if !self.carry.is_empty() || self.open_field {
                    self.open_field = false;
                    return Some(Ok(Token(std::mem::take(&mut self.carry))));
                }
                return None;
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => self.exhausted = true,
                Err(e) => {
                    self.done = true;
                    self.ready.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: ReadAt> std::iter::FusedIterator for SpanTokens<R> {}
