//! # linestride
//!
//! Streaming record windows over very large delimited text files.
//!
//! linestride never loads a file into memory. It scans the file once in
//! fixed-size chunks to find where every record starts, slides a window of `W`
//! consecutive record offsets over that stream, and re-reads each record's byte
//! range on demand to split it into fields. Fields may be far longer than the
//! read buffer; they are reassembled across refills.
//!
//! ## Key Features
//!
//! - **Bounded memory** - O(window length + buffer size) per stage, whatever the file size
//! - **Positional reads only** - every stage reads through [`ReadAt`] at explicit offsets,
//!   so concurrent stages share one file handle safely
//! - **Sliding windows** - adjacent-record pairs (`W = 2`) or previous/current/next
//!   context (`W = 3`), with an explicit [`TailPolicy`] for short remainders
//! - **Staged execution** - scanner, windower and tokenizer on their own threads,
//!   joined by bounded channels with backpressure and a shared cancellation flag
//! - **Parallel tokenizing** - [`Pipeline::run_par`] keeps file order (feature `parallel`)
//! - **NaN-tolerant numerics** - [`numeric::coerce`] and [`numeric::average`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use linestride::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let stats = process_file("data.csv", StrideConfig::default(), |w| {
//!     for rec in &w.records {
//!         let values: Vec<f64> = rec.tokens.iter().map(numeric::coerce).collect();
//!         println!("window {}: mean {}", w.position, numeric::average(values));
//!     }
//!     Ok(())
//! })?;
//! stats.log_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Building blocks
//!
//! The stages are plain iterators and can be used without the threaded runner:
//!
//! ```
//! use linestride::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let data = b"a,b\nc,d\ne,f\n".to_vec();
//! let windows: Vec<Window> = line_offsets(&data, 4, b'\n')
//!     .sliding_windows(2, TailPolicy::Drop)
//!     .collect::<Result<_>>()?;
//! assert_eq!(windows[0].offsets(), &[0, 4]);
//! assert_eq!(windows[1].offsets(), &[4, 8]);
//!
//! let span = windows[0].spans().next().unwrap();
//! let tokens: Vec<Token> = tokenize_span(&data, span, 4, b',', b'\n')
//!     .collect::<Result<_>>()?;
//! assert_eq!(tokens, vec![Token::from("a"), Token::from("b")]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `io-csv` - [`output::RowWriter`] for delimiter-joined output
//! - `parallel` - [`Pipeline::run_par`] on the rayon pool
//! - `cli` - the `linestride` binary
//!
//! ## Module Overview
//!
//! - [`source`] - the positional read capability
//! - [`offsets`] - record start offset scanner
//! - [`window`] - sliding windows and tail policy
//! - [`enumerate`] - positional tagging of windows
//! - [`tokenizer`] - span tokenizer
//! - [`numeric`] - NaN-sentinel coercion and averaging
//! - [`reduce`] - take-first / take-last
//! - [`pipeline`] - threaded runner
//! - [`stats`] - run counters
//! - [`config`] - tunables

pub mod config;
pub mod enumerate;
pub mod numeric;
pub mod offsets;
pub mod pipeline;
pub mod reduce;
pub mod source;
pub mod span;
pub mod stats;
pub mod testing;
pub mod tokenizer;
pub mod window;

#[cfg(feature = "io-csv")]
pub mod output;

// General re-exports
pub use config::StrideConfig;
pub use enumerate::{EnumerateExt, Enumerated, EnumeratedWindow, enumerate_from};
pub use numeric::{CoerceExt, NanAverage, average, coerce};
pub use offsets::{LineOffsets, line_offsets};
pub use pipeline::{
    CancelToken, ParsedWindow, Pipeline, Record, open_input, parse_window, process_file,
    read_record,
};
pub use reduce::{take_first, take_last};
pub use source::ReadAt;
pub use span::Span;
pub use stats::PipelineStats;
pub use tokenizer::{SpanTokens, Token, tokenize_span};
pub use window::{SlidingWindowExt, SlidingWindows, TailPolicy, Window};

// Gated re-exports
#[cfg(feature = "io-csv")]
pub use output::RowWriter;
