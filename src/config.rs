//! Pipeline configuration.
//!
//! [`StrideConfig`] carries every tunable of the scanner, windower and tokenizer.
//! It can be built in code with chainable setters or loaded from a JSON file; any
//! field missing from the file takes its default.
//!
//! ```
//! use linestride::{StrideConfig, TailPolicy};
//!
//! let cfg = StrideConfig::default()
//!     .window_len(3)
//!     .buffer_size(4096)
//!     .tail_policy(TailPolicy::Emit);
//! cfg.validate().unwrap();
//! ```

use crate::window::TailPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default scan/tokenize buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Tunables for a single pass over one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrideConfig {
    /// Number of consecutive offsets per window (at least 2).
    pub window_len: usize,
    /// Bytes read per chunk by the scanner and the tokenizer.
    pub buffer_size: usize,
    /// Field separator byte.
    #[serde(with = "byte_char")]
    pub delimiter: u8,
    /// Record separator byte.
    #[serde(with = "byte_char")]
    pub terminator: u8,
    /// Capacity of the channels between stages. `0` makes every hand-off a rendezvous.
    pub channel_capacity: usize,
    /// What to do with a short remainder when the offsets run out.
    pub tail_policy: TailPolicy,
    /// Position assigned to the first window.
    pub base_index: u64,
    /// Windows tokenized together by the parallel runner.
    pub batch_size: usize,
}

impl Default for StrideConfig {
    fn default() -> Self {
        Self {
            window_len: 2,
            buffer_size: DEFAULT_BUFFER_SIZE,
            delimiter: b',',
            terminator: b'\n',
            channel_capacity: 1,
            tail_policy: TailPolicy::Drop,
            base_index: 0,
            batch_size: 64,
        }
    }
}

impl StrideConfig {
    /// Previous/current/next context: three offsets, two spans per window.
    pub fn context() -> Self {
        Self::default().window_len(3)
    }

    pub fn window_len(mut self, len: usize) -> Self {
        self.window_len = len;
        self
    }

    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    pub fn delimiter(mut self, byte: u8) -> Self {
        self.delimiter = byte;
        self
    }

    pub fn terminator(mut self, byte: u8) -> Self {
        self.terminator = byte;
        self
    }

    pub fn channel_capacity(mut self, cap: usize) -> Self {
        self.channel_capacity = cap;
        self
    }

    pub fn tail_policy(mut self, policy: TailPolicy) -> Self {
        self.tail_policy = policy;
        self
    }

    pub fn base_index(mut self, base: u64) -> Self {
        self.base_index = base;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Check the configuration before any stage starts.
    ///
    /// # Errors
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.window_len < 2 {
            bail!("window_len must be at least 2, got {}", self.window_len);
        }
        if self.buffer_size == 0 {
            bail!("buffer_size must be greater than 0");
        }
        if self.delimiter == self.terminator {
            bail!(
                "delimiter and terminator must differ (both are {:?})",
                self.delimiter as char
            );
        }
        if self.batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }
        Ok(())
    }

    /// Load a configuration from a JSON file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, is not valid JSON for this
    /// type, or fails [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }
}

/// Separator bytes are written as one-character strings (`","`, `"\n"`) and may also
/// be given as plain numbers.
mod byte_char {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u8),
        Str(String),
    }

    pub fn serialize<S: Serializer>(b: &u8, s: S) -> Result<S::Ok, S::Error> {
        let mut tmp = [0u8; 4];
        s.serialize_str((*b as char).encode_utf8(&mut tmp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Num(n) => Ok(n),
            Repr::Str(s) => match s.as_bytes() {
                [b] => Ok(*b),
                _ => Err(D::Error::custom(format!(
                    "expected a single ASCII character, got {s:?}"
                ))),
            },
        }
    }
}
