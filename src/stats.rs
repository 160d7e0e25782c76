//! Run statistics for a pipeline pass.
//!
//! Stages bump shared atomic counters while they run; [`PipelineStats`] is the
//! snapshot taken when the pass ends. It serializes to JSON and can be logged as
//! one structured event.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for one pass over a file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub offsets: u64,
    pub windows: u64,
    pub records: u64,
    pub tokens: u64,
    /// Bytes read by the offset scanner.
    pub scanned_bytes: u64,
    /// Bytes re-read by the tokenizer. Exceeds the file size when windows overlap.
    pub tokenized_bytes: u64,
    pub elapsed_ms: u64,
}

impl PipelineStats {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Write the stats as pretty JSON, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns an error if the file or its directories cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(&mut f, self)
            .with_context(|| format!("serialize stats to {}", path.display()))?;
        f.write_all(b"\n")?;
        Ok(())
    }

    pub fn log_summary(&self) {
        tracing::info!(
            offsets = self.offsets,
            windows = self.windows,
            records = self.records,
            tokens = self.tokens,
            scanned_bytes = self.scanned_bytes,
            tokenized_bytes = self.tokenized_bytes,
            elapsed_ms = self.elapsed_ms,
            "pipeline finished"
        );
    }
}

/// Live counters shared by the stages of a running pipeline.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub offsets: AtomicU64,
    pub windows: AtomicU64,
    pub records: AtomicU64,
    pub tokens: AtomicU64,
    pub scanned_bytes: AtomicU64,
    pub tokenized_bytes: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, elapsed: Duration) -> PipelineStats {
        PipelineStats {
            offsets: self.offsets.load(Ordering::Relaxed),
            windows: self.windows.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            tokens: self.tokens.load(Ordering::Relaxed),
            scanned_bytes: self.scanned_bytes.load(Ordering::Relaxed),
            tokenized_bytes: self.tokenized_bytes.load(Ordering::Relaxed),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
