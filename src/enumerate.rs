//! Positional tagging of ordered streams.
//!
//! Overlapping windows cannot be matched back to their place in the file once they
//! are reordered (e.g. by the parallel runner), so each one is paired with its
//! ordinal position before any fan-out.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A value tagged with its position in the originating stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enumerated<T> {
    pub position: u64,
    pub value: T,
}

impl<T> Enumerated<T> {
    #[inline]
    pub fn new(position: u64, value: T) -> Self {
        Self { position, value }
    }
}

/// A window paired with its ordinal position in the window stream.
pub type EnumeratedWindow = Enumerated<crate::window::Window>;

/// Iterator adapter numbering `Ok` items from a caller-supplied base.
///
/// Errors pass through without consuming a position.
pub struct EnumerateFrom<I> {
    inner: I,
    next: u64,
}

pub fn enumerate_from<I: Iterator>(inner: I, base: u64) -> EnumerateFrom<I> {
    EnumerateFrom { inner, next: base }
}

impl<I, T> Iterator for EnumerateFrom<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<Enumerated<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Ok(value) => {
                let position = self.next;
                self.next += 1;
                Some(Ok(Enumerated { position, value }))
            }
            Err(e) => Some(Err(e)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// `.enumerate_from(base)` on any fallible stream.
pub trait EnumerateExt: Iterator + Sized {
    fn enumerate_from(self, base: u64) -> EnumerateFrom<Self> {
        enumerate_from(self, base)
    }
}

impl<I: Iterator> EnumerateExt for I {}
