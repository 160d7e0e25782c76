//! Test helpers for code built on linestride.
//!
//! - [`TempCsv`]: a temporary file pre-filled with content, deleted on drop
//! - [`FailingSource`]: a [`ReadAt`] that fails once reads reach a given offset
//! - [`collect_tokens`]: tokenize one span straight into strings
//!
//! ```
//! use linestride::testing::*;
//! use linestride::{Span, StrideConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let csv = TempCsv::new("a,b\nc,d\n")?;
//! let file = csv.open()?;
//! let tokens = collect_tokens(&file, Span::new(0, 4), &StrideConfig::default())?;
//! assert_eq!(tokens, vec!["a", "b"]);
//! # Ok(())
//! # }
//! ```

use crate::config::StrideConfig;
use crate::source::ReadAt;
use crate::span::Span;
use crate::tokenizer::SpanTokens;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;

/// A temporary file holding the given bytes.
pub struct TempCsv {
    file: NamedTempFile,
}

impl TempCsv {
    /// # Errors
    /// Returns an error if the temporary file cannot be created or written.
    pub fn new(content: impl AsRef<[u8]>) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .context("create temp csv")?;
        file.write_all(content.as_ref()).context("write temp csv")?;
        file.flush()?;
        Ok(Self { file })
    }

    /// `rows` lines of `cols` numbered fields each, e.g. `r0c0,r0c1\n`.
    ///
    /// # Errors
    /// See [`TempCsv::new`].
    pub fn with_rows(rows: usize, cols: usize) -> Result<Self> {
        let mut content = String::new();
        for r in 0..rows {
            let fields: Vec<String> = (0..cols).map(|c| format!("r{r}c{c}")).collect();
            content.push_str(&fields.join(","));
            content.push('\n');
        }
        Self::new(content)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Open an independent read handle to the file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open(&self) -> Result<File> {
        File::open(self.path()).with_context(|| format!("open {}", self.path().display()))
    }
}

/// Wraps a source and fails every read starting at or past `fail_at`.
///
/// Reads that straddle `fail_at` are cut short there, so the failure surfaces on
/// the following read whatever the caller's buffer size.
pub struct FailingSource<R> {
    inner: R,
    fail_at: u64,
    failures: AtomicU64,
}

impl<R: ReadAt> FailingSource<R> {
    pub fn new(inner: R, fail_at: u64) -> Self {
        Self {
            inner,
            fail_at,
            failures: AtomicU64::new(0),
        }
    }

    /// Number of reads that have failed.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl<R: ReadAt> ReadAt for FailingSource<R> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if offset >= self.fail_at {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(io::Error::other(format!("injected failure at offset {offset}")));
        }
        // short read up to the failure point; the next read hits it
        let room = usize::try_from(self.fail_at - offset).unwrap_or(usize::MAX);
        let n = buf.len().min(room);
        self.inner.read_at(&mut buf[..n], offset)
    }
}

/// Tokenize `span` of `src` and return the tokens as (lossy) strings.
///
/// # Errors
/// Returns the first read error.
pub fn collect_tokens<R: ReadAt + ?Sized>(
    src: &R,
    span: Span,
    cfg: &StrideConfig,
) -> Result<Vec<String>> {
    SpanTokens::new(src, span, cfg.buffer_size, cfg.delimiter, cfg.terminator)
        .map(|t| t.map(|t| t.to_string_lossy().into_owned()))
        .collect()
}
