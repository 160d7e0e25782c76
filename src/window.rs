//! Sliding windows over record offsets.
//!
//! A [`Window`] holds `W` consecutive record start offsets; each adjacent pair
//! bounds one record, so a window describes `W - 1` consecutive [`Span`]s.
//! [`SlidingWindows`] turns an ordered offset stream into every contiguous run of
//! `W` offsets, advancing by one offset per window and buffering at most `W`.

use crate::span::Span;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What to do with offsets still buffered when the source runs out before a
/// single full window was formed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailPolicy {
    /// Discard the short remainder.
    #[default]
    Drop,
    /// Emit the short remainder as one final window.
    Emit,
}

/// `W` consecutive record start offsets, strictly increasing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    offsets: Vec<u64>,
}

impl Window {
    pub fn new(offsets: Vec<u64>) -> Self {
        debug_assert!(offsets.windows(2).all(|p| p[0] < p[1]));
        Self { offsets }
    }

    #[inline]
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn first(&self) -> Option<u64> {
        self.offsets.first().copied()
    }

    pub fn last(&self) -> Option<u64> {
        self.offsets.last().copied()
    }

    /// The records bounded by adjacent offsets, in order.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.offsets.windows(2).map(|p| Span::new(p[0], p[1]))
    }

    /// The whole byte range covered by this window, if it has at least two offsets.
    pub fn extent(&self) -> Option<Span> {
        match (self.offsets.first(), self.offsets.last()) {
            (Some(&a), Some(&b)) if self.offsets.len() >= 2 => Some(Span::new(a, b)),
            _ => None,
        }
    }

    pub fn into_offsets(self) -> Vec<u64> {
        self.offsets
    }
}

impl From<Vec<u64>> for Window {
    fn from(offsets: Vec<u64>) -> Self {
        Self::new(offsets)
    }
}

/// Iterator adapter emitting every contiguous run of `len` items.
///
/// Input errors are forwarded unchanged and end the stream.
pub struct SlidingWindows<I> {
    inner: I,
    len: usize,
    policy: TailPolicy,
    buf: VecDeque<u64>,
    emitted_full: bool,
    done: bool,
}

impl<I> SlidingWindows<I>
where
    I: Iterator<Item = Result<u64>>,
{
    /// A window needs two offsets to bound a record; `len` below 2 is raised to 2.
    pub fn new(inner: I, len: usize, policy: TailPolicy) -> Self {
        let len = len.max(2);
        Self {
            inner,
            len,
            policy,
            buf: VecDeque::with_capacity(len),
            emitted_full: false,
            done: false,
        }
    }

    fn flush_tail(&mut self) -> Option<Window> {
        if self.emitted_full || self.buf.is_empty() {
            return None;
        }
        match self.policy {
            TailPolicy::Drop => None,
            TailPolicy::Emit => Some(Window::new(self.buf.drain(..).collect())),
        }
    }
}

impl<I> Iterator for SlidingWindows<I>
where
    I: Iterator<Item = Result<u64>>,
{
    type Item = Result<Window>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.inner.next() {
                Some(Ok(offset)) => {
                    self.buf.push_back(offset);
                    if self.buf.len() == self.len {
                        let w = Window::new(self.buf.iter().copied().collect());
                        self.buf.pop_front();
                        self.emitted_full = true;
                        return Some(Ok(w));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.flush_tail().map(Ok);
                }
            }
        }
    }
}

impl<I> std::iter::FusedIterator for SlidingWindows<I> where I: Iterator<Item = Result<u64>> {}

/// `.sliding_windows(len, policy)` on any offset stream.
pub trait SlidingWindowExt: Iterator<Item = Result<u64>> + Sized {
    fn sliding_windows(self, len: usize, policy: TailPolicy) -> SlidingWindows<Self> {
        SlidingWindows::new(self, len, policy)
    }
}

impl<I: Iterator<Item = Result<u64>>> SlidingWindowExt for I {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(v: &[u64]) -> impl Iterator<Item = Result<u64>> + '_ {
        v.iter().copied().map(Ok)
    }

    #[test]
    fn buffer_never_exceeds_window_len() {
        let offsets: Vec<u64> = (0..100).collect();
        let mut it = ok(&offsets).sliding_windows(4, TailPolicy::Drop);
        while let Some(w) = it.next() {
            w.unwrap();
            assert!(it.buf.len() < 4);
            assert!(it.buf.capacity() >= 4);
        }
    }

    #[test]
    fn tail_is_not_reemitted_after_full_window() {
        let out: Vec<Window> = ok(&[0, 1, 2])
            .sliding_windows(2, TailPolicy::Emit)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out.len(), 2);
    }
}
