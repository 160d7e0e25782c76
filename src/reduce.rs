//! First/last reductions over finite ordered streams.
//!
//! Completion is the end of the iterator; fed from a channel `Receiver`, that is
//! the moment every sender has been dropped.

use anyhow::Result;

/// The first element of the stream, or the first error if it comes first.
///
/// Only one element is pulled; the rest of the stream is left untouched.
pub fn take_first<T, I>(iter: I) -> Result<Option<T>>
where
    I: IntoIterator<Item = Result<T>>,
{
    iter.into_iter().next().transpose()
}

/// The last element of the stream. Any error ends the reduction and is returned.
pub fn take_last<T, I>(iter: I) -> Result<Option<T>>
where
    I: IntoIterator<Item = Result<T>>,
{
    let mut last = None;
    for item in iter {
        last = Some(item?);
    }
    Ok(last)
}
