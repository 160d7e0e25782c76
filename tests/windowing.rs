//! Tests for sliding windows over record offsets.

use anyhow::{Result, anyhow};
use linestride::*;

fn offsets(v: &[u64]) -> impl Iterator<Item = Result<u64>> + '_ {
    v.iter().copied().map(Ok)
}

fn windows(v: &[u64], len: usize, policy: TailPolicy) -> Result<Vec<Vec<u64>>> {
    offsets(v)
        .sliding_windows(len, policy)
        .map(|w| w.map(Window::into_offsets))
        .collect()
}

#[test]
fn adjacent_pairs_for_window_of_two() -> Result<()> {
    let out = windows(&[0, 4, 8, 12], 2, TailPolicy::Drop)?;
    assert_eq!(out, vec![vec![0, 4], vec![4, 8], vec![8, 12]]);
    Ok(())
}

#[test]
fn window_count_is_k_minus_w_plus_one() -> Result<()> {
    let src: Vec<u64> = (0..20).map(|i| i * 3).collect();
    for w in 2..=src.len() {
        let out = windows(&src, w, TailPolicy::Drop)?;
        assert_eq!(out.len(), src.len() - w + 1, "window length {w}");
        assert!(out.iter().all(|win| win.len() == w));
        // each window is the previous one shifted left by one
        for pair in out.windows(2) {
            assert_eq!(pair[0][1..], pair[1][..w - 1]);
        }
        assert_eq!(out[0], src[..w]);
    }
    Ok(())
}

#[test]
fn window_length_below_two_is_raised_to_two() -> Result<()> {
    for len in [0, 1] {
        let out = windows(&[0, 4, 8], len, TailPolicy::Emit)?;
        assert_eq!(out, vec![vec![0, 4], vec![4, 8]], "window length {len}");
    }
    Ok(())
}

#[test]
fn short_source_dropped_by_default() -> Result<()> {
    assert!(windows(&[0, 5], 3, TailPolicy::Drop)?.is_empty());
    assert!(windows(&[0], 2, TailPolicy::Drop)?.is_empty());
    assert!(windows(&[], 2, TailPolicy::Drop)?.is_empty());
    Ok(())
}

#[test]
fn short_source_emitted_when_configured() -> Result<()> {
    assert_eq!(windows(&[0, 5], 3, TailPolicy::Emit)?, vec![vec![0, 5]]);
    assert_eq!(windows(&[0], 2, TailPolicy::Emit)?, vec![vec![0]]);
    assert!(windows(&[], 2, TailPolicy::Emit)?.is_empty());
    Ok(())
}

#[test]
fn emit_policy_does_not_repeat_covered_tail() -> Result<()> {
    let out = windows(&[0, 1, 2, 3], 3, TailPolicy::Emit)?;
    assert_eq!(out, vec![vec![0, 1, 2], vec![1, 2, 3]]);
    Ok(())
}

#[test]
fn spans_of_a_context_window() {
    let w = Window::new(vec![0, 4, 8]);
    let spans: Vec<Span> = w.spans().collect();
    assert_eq!(spans, vec![Span::new(0, 4), Span::new(4, 8)]);
    assert_eq!(w.extent(), Some(Span::new(0, 8)));
    assert_eq!(w.first(), Some(0));
    assert_eq!(w.last(), Some(8));
}

#[test]
fn single_offset_window_has_no_spans() {
    let w = Window::new(vec![7]);
    assert_eq!(w.spans().count(), 0);
    assert_eq!(w.extent(), None);
}

#[test]
fn upstream_error_is_forwarded_and_ends_stream() {
    let src = vec![Ok(0), Ok(4), Err(anyhow!("boom")), Ok(12)];
    let mut it = src.into_iter().sliding_windows(2, TailPolicy::Emit);
    assert_eq!(it.next().unwrap().unwrap().offsets(), &[0, 4]);
    assert!(it.next().unwrap().is_err());
    assert!(it.next().is_none());
}

#[test]
fn windows_over_scanned_file() -> Result<()> {
    let data = b"a,b\nc,d\ne,f\n".to_vec();
    let out: Vec<Window> = line_offsets(&data, 3, b'\n')
        .sliding_windows(2, TailPolicy::Drop)
        .collect::<Result<_>>()?;
    assert_eq!(out[0].offsets(), &[0, 4]);
    assert_eq!(out[1].offsets(), &[4, 8]);
    assert_eq!(out.len(), 3);
    Ok(())
}

#[test]
fn empty_file_has_no_complete_windows() -> Result<()> {
    let data: Vec<u8> = Vec::new();
    for w in 2..5 {
        let n = line_offsets(&data, 8, b'\n')
            .sliding_windows(w, TailPolicy::Drop)
            .count();
        assert_eq!(n, 0);
    }
    Ok(())
}
