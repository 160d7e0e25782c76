//! Numeric coercion of tokens with a NaN sentinel.
//!
//! A field that does not parse as a float becomes `f64::NAN` instead of an error,
//! so aggregates over a column stay total. [`average`] and [`NanAverage`] skip
//! those sentinels.

use crate::tokenizer::Token;
use anyhow::Result;

/// Parse ASCII-trimmed bytes as `f64`, or `NaN` if they are not a number.
///
/// Finite literals whose magnitude overflows `f64` are out of range and also map
/// to `NaN`; an explicit `inf`/`infinity` literal is kept.
pub fn parse_f64(bytes: &[u8]) -> f64 {
    let Some(s) = std::str::from_utf8(bytes).ok().map(str::trim_ascii) else {
        return f64::NAN;
    };
    match s.parse::<f64>() {
        Ok(v) if v.is_infinite() && !is_infinity_literal(s) => f64::NAN,
        Ok(v) => v,
        Err(_) => f64::NAN,
    }
}

fn is_infinity_literal(s: &str) -> bool {
    let unsigned = s.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

/// Coerce one token to a number. Unparsable tokens yield `NaN`.
#[inline]
pub fn coerce(token: &Token) -> f64 {
    parse_f64(token.as_bytes())
}

/// Mean of the non-NaN values, or `0.0` if there are none.
///
/// ```
/// use linestride::numeric::average;
///
/// assert_eq!(average([1.5, f64::NAN, 3.0]), 2.25);
/// assert_eq!(average([f64::NAN, f64::NAN]), 0.0);
/// ```
pub fn average<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let avg = NanAverage;
    let mut acc = avg.create();
    for v in values {
        avg.add_input(&mut acc, v);
    }
    avg.finish(acc)
}

/// NaN-ignoring average as an incremental accumulator.
///
/// - Accumulator: `(sum, count)` of the non-NaN inputs
/// - Output: `sum / count`, or `0.0` when `count == 0`
#[derive(Clone, Copy, Debug, Default)]
pub struct NanAverage;

impl NanAverage {
    pub fn create(&self) -> (f64, u64) {
        (0.0, 0)
    }

    pub fn add_input(&self, acc: &mut (f64, u64), v: f64) {
        if !v.is_nan() {
            acc.0 += v;
            acc.1 += 1;
        }
    }

    pub fn merge(&self, acc: &mut (f64, u64), other: (f64, u64)) {
        acc.0 += other.0;
        acc.1 += other.1;
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn finish(&self, acc: (f64, u64)) -> f64 {
        if acc.1 == 0 {
            0.0
        } else {
            acc.0 / (acc.1 as f64)
        }
    }
}

/// Iterator adapter mapping a token stream to numbers.
///
/// Parse failures become `NaN`; upstream errors are passed through unchanged.
pub struct CoerceNumeric<I> {
    inner: I,
}

impl<I> Iterator for CoerceNumeric<I>
where
    I: Iterator<Item = Result<Token>>,
{
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|t| t.map(|t| coerce(&t)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub trait CoerceExt: Iterator<Item = Result<Token>> + Sized {
    fn coerce_numeric(self) -> CoerceNumeric<Self> {
        CoerceNumeric { inner: self }
    }
}

impl<I: Iterator<Item = Result<Token>>> CoerceExt for I {}
