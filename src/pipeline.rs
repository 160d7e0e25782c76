//! Staged execution over one file.
//!
//! ```text
//! scanner ──offsets──▶ windower ──windows──▶ tokenizer ──parsed windows──▶ sink
//! ```
//!
//! Each stage runs on its own scoped thread and hands items downstream through a
//! bounded `crossbeam-channel`, so a fast producer blocks until the next stage is
//! ready and memory stays bounded regardless of file size. The sink runs on the
//! calling thread. Every stage reads the file through [`ReadAt`] at explicit
//! offsets; nothing depends on a shared cursor.
//!
//! Errors travel downstream as `Err` items. The first one (or a failing sink) trips
//! the run's cancellation flag, every stage stops at its next item, and all
//! threads are joined before [`Pipeline::run`] returns the error.

use crate::config::StrideConfig;
use crate::enumerate::{EnumerateExt, EnumeratedWindow};
use crate::offsets::LineOffsets;
use crate::source::ReadAt;
use crate::span::Span;
use crate::stats::{PipelineStats, StatsCounters};
use crate::tokenizer::{SpanTokens, Token};
use crate::window::{SlidingWindowExt, Window};
use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::{Receiver, Sender, bounded};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

/// The tokens of one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub span: Span,
    pub tokens: Vec<Token>,
}

/// A window together with the parsed records it bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedWindow {
    /// Ordinal position of the window, counted from the configured base index.
    pub position: u64,
    pub window: Window,
    /// One record per adjacent offset pair of `window`.
    pub records: Vec<Record>,
}

/// Cooperative stop signal shared by all stages of a run.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Tokenize one record span into a [`Record`].
///
/// # Errors
/// Returns the first read error of the span.
pub fn read_record<R: ReadAt + ?Sized>(src: &R, span: Span, cfg: &StrideConfig) -> Result<Record> {
    let tokens = SpanTokens::new(src, span, cfg.buffer_size, cfg.delimiter, cfg.terminator)
        .collect::<Result<Vec<_>>>()?;
    Ok(Record { span, tokens })
}

/// Tokenize every span of an enumerated window.
///
/// # Errors
/// Returns the first read error, annotated with the window position.
pub fn parse_window<R: ReadAt + ?Sized>(
    src: &R,
    cfg: &StrideConfig,
    window: EnumeratedWindow,
) -> Result<ParsedWindow> {
    parse_window_counted(src, cfg, window, None)
}

fn parse_window_counted<R: ReadAt + ?Sized>(
    src: &R,
    cfg: &StrideConfig,
    window: EnumeratedWindow,
    stats: Option<&StatsCounters>,
) -> Result<ParsedWindow> {
    let position = window.position;
    let window = window.value;
    let mut records = Vec::with_capacity(window.len().saturating_sub(1));
    for span in window.spans() {
        let mut it = SpanTokens::new(src, span, cfg.buffer_size, cfg.delimiter, cfg.terminator);
        let tokens = it
            .by_ref()
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("tokenize window #{position}"))?;
        if let Some(stats) = stats {
            StatsCounters::add(&stats.tokens, tokens.len() as u64);
            StatsCounters::add(&stats.records, 1);
            StatsCounters::add(&stats.tokenized_bytes, it.bytes_read());
        }
        records.push(Record { span, tokens });
    }
    Ok(ParsedWindow {
        position,
        window,
        records,
    })
}

/// Shared state handed to every stage of a run.
struct StageCtx<'a, R> {
    src: &'a R,
    cfg: &'a StrideConfig,
    stats: &'a StatsCounters,
    halt: &'a CancelToken,
    external: &'a CancelToken,
    // set once a stage drops an item because the run was stopped
    interrupted: AtomicBool,
}

impl<'a, R> StageCtx<'a, R> {
    fn new(
        src: &'a R,
        cfg: &'a StrideConfig,
        stats: &'a StatsCounters,
        halt: &'a CancelToken,
        external: &'a CancelToken,
    ) -> Self {
        Self {
            src,
            cfg,
            stats,
            halt,
            external,
            interrupted: AtomicBool::new(false),
        }
    }

    /// Called with an item in hand; `true` means that item is abandoned.
    fn stopped(&self) -> bool {
        let stopped = self.halt.is_cancelled() || self.external.is_cancelled();
        if stopped {
            self.interrupted.store(true, Ordering::Release);
        }
        stopped
    }

    /// The run was cancelled from outside before every item was delivered.
    fn cancelled_early(&self) -> bool {
        self.external.is_cancelled() && self.interrupted.load(Ordering::Acquire)
    }
}

fn scan_stage<R: ReadAt>(ctx: &StageCtx<'_, R>, tx: Sender<Result<u64>>) {
    tracing::debug!(buffer_size = ctx.cfg.buffer_size, "scanner started");
    let mut offsets = LineOffsets::new(ctx.src, ctx.cfg.buffer_size, ctx.cfg.terminator);
    for item in offsets.by_ref() {
        if ctx.stopped() {
            break;
        }
        let failed = item.is_err();
        if !failed {
            StatsCounters::add(&ctx.stats.offsets, 1);
        }
        if tx.send(item).is_err() || failed {
            break;
        }
    }
    StatsCounters::add(&ctx.stats.scanned_bytes, offsets.bytes_read());
    tracing::debug!(scanned_bytes = offsets.bytes_read(), "scanner finished");
}

fn window_stage<R>(
    ctx: &StageCtx<'_, R>,
    rx: Receiver<Result<u64>>,
    tx: Sender<Result<EnumeratedWindow>>,
) {
    tracing::debug!(window_len = ctx.cfg.window_len, "windower started");
    let windows = rx
        .into_iter()
        .sliding_windows(ctx.cfg.window_len, ctx.cfg.tail_policy)
        .enumerate_from(ctx.cfg.base_index);
    for item in windows {
        if ctx.stopped() {
            break;
        }
        let failed = item.is_err();
        if !failed {
            StatsCounters::add(&ctx.stats.windows, 1);
        }
        if tx.send(item).is_err() || failed {
            break;
        }
    }
    tracing::debug!("windower finished");
}

fn tokenize_stage<R: ReadAt>(
    ctx: &StageCtx<'_, R>,
    rx: Receiver<Result<EnumeratedWindow>>,
    tx: Sender<Result<ParsedWindow>>,
) {
    tracing::debug!("tokenizer started");
    for item in rx {
        if ctx.stopped() {
            break;
        }
        let parsed = item.and_then(|w| parse_window_counted(ctx.src, ctx.cfg, w, Some(ctx.stats)));
        let failed = parsed.is_err();
        if tx.send(parsed).is_err() || failed {
            break;
        }
    }
    tracing::debug!("tokenizer finished");
}

fn join_stage(handle: thread::ScopedJoinHandle<'_, ()>, name: &str) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow!("{name} stage panicked"))
}

#[cfg(feature = "parallel")]
fn drain_batches<R, F>(
    ctx: &StageCtx<'_, R>,
    rx: &Receiver<Result<EnumeratedWindow>>,
    batch_size: usize,
    sink: &mut F,
) -> Result<()>
where
    R: ReadAt,
    F: FnMut(ParsedWindow) -> Result<()>,
{
    use rayon::prelude::*;

    let mut batch: Vec<EnumeratedWindow> = Vec::with_capacity(batch_size);
    let mut windows = rx.iter();
    loop {
        let mut upstream_err = None;
        for item in windows.by_ref() {
            match item {
                Ok(w) => batch.push(w),
                Err(e) => {
                    upstream_err = Some(e);
                    break;
                }
            }
            if batch.len() == batch_size {
                break;
            }
        }
        if batch.is_empty() && upstream_err.is_none() {
            return Ok(());
        }
        if ctx.stopped() {
            return Ok(());
        }
        tracing::debug!(batch = batch.len(), "tokenizing batch");
        // collect keeps the enumeration order of the batch
        let parsed: Vec<ParsedWindow> = batch
            .par_drain(..)
            .map(|w| parse_window_counted(ctx.src, ctx.cfg, w, Some(ctx.stats)))
            .collect::<Result<_>>()?;
        for w in parsed {
            sink(w)?;
        }
        if let Some(e) = upstream_err {
            return Err(e);
        }
    }
}

/// A configured single-pass pipeline.
///
/// ```no_run
/// use linestride::{Pipeline, StrideConfig};
///
/// # fn main() -> anyhow::Result<()> {
/// let file = std::fs::File::open("data.csv")?;
/// let pipeline = Pipeline::new(StrideConfig::default())?;
/// let stats = pipeline.run(file, |w| {
///     for rec in &w.records {
///         println!("{} {:?}", w.position, rec.tokens);
///     }
///     Ok(())
/// })?;
/// stats.log_summary();
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: StrideConfig,
    cancel: CancelToken,
}

impl Pipeline {
    /// # Errors
    /// Returns an error if `config` fails [`StrideConfig::validate`].
    pub fn new(config: StrideConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &StrideConfig {
        &self.config
    }

    /// A handle that stops any run of this pipeline when cancelled.
    ///
    /// Cancellation is sticky: later runs of the same pipeline stop immediately.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run all stages over `src`, handing each parsed window to `sink` in file order.
    ///
    /// # Errors
    /// Returns the first read error, the first `sink` error, an error if a stage
    /// panicked, or an error if the run was cancelled through
    /// [`cancel_token`](Self::cancel_token) before every window was delivered.
    pub fn run<R, F>(&self, src: R, mut sink: F) -> Result<PipelineStats>
    where
        R: ReadAt,
        F: FnMut(ParsedWindow) -> Result<()>,
    {
        let started = Instant::now();
        let stats = StatsCounters::default();
        let halt = CancelToken::new();
        let ctx = StageCtx::new(&src, &self.config, &stats, &halt, &self.cancel);
        let cap = self.config.channel_capacity;
        let (off_tx, off_rx) = bounded::<Result<u64>>(cap);
        let (win_tx, win_rx) = bounded::<Result<EnumeratedWindow>>(cap);
        let (row_tx, row_rx) = bounded::<Result<ParsedWindow>>(cap);

        let outcome = thread::scope(|s| {
            let ctx = &ctx;
            let scanner = s.spawn(move || scan_stage(ctx, off_tx));
            let windower = s.spawn(move || window_stage(ctx, off_rx, win_tx));
            let tokenizer = s.spawn(move || tokenize_stage(ctx, win_rx, row_tx));

            let mut outcome = Ok(());
            for item in row_rx.iter() {
                if let Err(e) = item.and_then(&mut sink) {
                    halt.cancel();
                    outcome = Err(e);
                    break;
                }
            }
            // unblock any stage still waiting to send
            drop(row_rx);

            let joined = join_stage(scanner, "scanner")
                .and(join_stage(windower, "windower"))
                .and(join_stage(tokenizer, "tokenizer"));
            outcome.and(joined)
        });

        if outcome.is_ok() && ctx.cancelled_early() {
            tracing::warn!("pipeline cancelled before the end of input");
            bail!("pipeline cancelled");
        }
        outcome?;
        Ok(stats.snapshot(started.elapsed()))
    }

    /// Run all stages and collect every parsed window in file order.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub fn collect<R: ReadAt>(&self, src: R) -> Result<Vec<ParsedWindow>> {
        let mut out = Vec::new();
        self.run(src, |w| {
            out.push(w);
            Ok(())
        })?;
        Ok(out)
    }

    /// Like [`run`](Self::run), but windows are tokenized in parallel on the rayon
    /// pool, `batch_size` windows at a time. The sink still sees windows in file
    /// order.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    #[cfg(feature = "parallel")]
    pub fn run_par<R, F>(&self, src: R, mut sink: F) -> Result<PipelineStats>
    where
        R: ReadAt,
        F: FnMut(ParsedWindow) -> Result<()>,
    {
        let started = Instant::now();
        let stats = StatsCounters::default();
        let halt = CancelToken::new();
        let ctx = StageCtx::new(&src, &self.config, &stats, &halt, &self.cancel);
        let cap = self.config.channel_capacity;
        let batch_size = self.config.batch_size;
        let (off_tx, off_rx) = bounded::<Result<u64>>(cap);
        let (win_tx, win_rx) = bounded::<Result<EnumeratedWindow>>(cap);

        let outcome = thread::scope(|s| {
            let ctx = &ctx;
            let scanner = s.spawn(move || scan_stage(ctx, off_tx));
            let windower = s.spawn(move || window_stage(ctx, off_rx, win_tx));

            let outcome = drain_batches(ctx, &win_rx, batch_size, &mut sink);
            if outcome.is_err() {
                halt.cancel();
            }
            drop(win_rx);

            let joined = join_stage(scanner, "scanner").and(join_stage(windower, "windower"));
            outcome.and(joined)
        });

        if outcome.is_ok() && ctx.cancelled_early() {
            tracing::warn!("pipeline cancelled before the end of input");
            bail!("pipeline cancelled");
        }
        outcome?;
        Ok(stats.snapshot(started.elapsed()))
    }
}

/// Open `path` for positional reads, rejecting anything but an existing regular file.
///
/// # Errors
/// Returns an error if the path does not exist, is not a regular file, or cannot be
/// opened.
pub fn open_input(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    File::open(path).with_context(|| format!("open {}", path.display()))
}

/// Open `path` and run a pipeline over it with `config`.
///
/// # Errors
/// Returns configuration errors before any stage starts, then any error of
/// [`Pipeline::run`].
pub fn process_file<F>(
    path: impl AsRef<Path>,
    config: StrideConfig,
    sink: F,
) -> Result<PipelineStats>
where
    F: FnMut(ParsedWindow) -> Result<()>,
{
    let pipeline = Pipeline::new(config)?;
    let file = open_input(path)?;
    pipeline.run(file, sink)
}
