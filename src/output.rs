//! Delimiter-joined row output.
//!
//! [`RowWriter`] writes every record of a [`ParsedWindow`] as one line, with the
//! record's tokens joined by the configured delimiter. Tokens are written
//! byte-for-byte (no quoting, blank lines stay blank), so a file read with the
//! same delimiter and terminator round-trips unchanged.

use crate::config::StrideConfig;
use crate::pipeline::{ParsedWindow, Record};
use crate::tokenizer::Token;
use anyhow::{Context, Result, anyhow};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct RowWriter<W: Write> {
    // `None` only after a failed flush while writing a blank row
    wtr: Option<csv::Writer<W>>,
    builder: WriterBuilder,
    terminator: u8,
    rows: u64,
    // overlapping windows repeat records; only records past this offset are new
    written_until: Option<u64>,
}

impl RowWriter<BufWriter<File>> {
    /// Create (or truncate) `path`, creating parent directories if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the directories or the file cannot be created.
    pub fn create(path: impl AsRef<Path>, cfg: &StrideConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self::new(BufWriter::new(f), cfg))
    }
}

impl<W: Write> RowWriter<W> {
    pub fn new(w: W, cfg: &StrideConfig) -> Self {
        let mut builder = WriterBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(cfg.delimiter)
            .terminator(Terminator::Any(cfg.terminator))
            .quote_style(QuoteStyle::Never);
        Self {
            wtr: Some(builder.from_writer(w)),
            builder,
            terminator: cfg.terminator,
            rows: 0,
            written_until: None,
        }
    }

    fn csv(&mut self) -> Result<&mut csv::Writer<W>> {
        self.wtr.as_mut().context("row writer is closed after a failed flush")
    }

    /// Write one record as a row.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn write_record(&mut self, rec: &Record) -> Result<()> {
        let written = match rec.tokens.as_slice() {
            [] => self.write_blank_row(),
            [only] if only.is_empty() => self.write_blank_row(),
            tokens => self
                .csv()
                .and_then(|w| Ok(w.write_record(tokens.iter().map(Token::as_bytes))?)),
        };
        written.with_context(|| format!("write row for span {}", rec.span))?;
        self.rows += 1;
        Ok(())
    }

    /// A lone empty field would be quoted as `""`; a blank line is written as the
    /// bare terminator instead.
    fn write_blank_row(&mut self) -> Result<()> {
        let wtr = self.wtr.take().context("row writer is closed after a failed flush")?;
        let mut inner = wtr
            .into_inner()
            .map_err(|e| anyhow!("flush rows: {}", e.error()))?;
        let written = inner.write_all(&[self.terminator]);
        self.wtr = Some(self.builder.from_writer(inner));
        written.context("write blank row")
    }

    /// Write the records of a window that no earlier window has written.
    ///
    /// With `W > 2` consecutive windows share `W - 2` records; each record is still
    /// written once, in file order.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn write_window(&mut self, w: &ParsedWindow) -> Result<()> {
        for rec in &w.records {
            if self.written_until.is_some_and(|end| rec.span.start < end) {
                continue;
            }
            self.write_record(rec)?;
            self.written_until = Some(rec.span.end);
        }
        Ok(())
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and return the inner writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(self) -> Result<W> {
        self.wtr
            .context("row writer is closed after a failed flush")?
            .into_inner()
            .map_err(|e| anyhow!("flush rows: {}", e.error()))
    }
}
