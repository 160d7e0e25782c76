//! Tests for span tokenization across buffer boundaries.

use anyhow::Result;
use linestride::testing::*;
use linestride::*;

fn cfg(buf: usize) -> StrideConfig {
    StrideConfig::default().buffer_size(buf)
}

fn whole(data: &[u8]) -> Span {
    Span::new(0, data.len() as u64)
}

#[test]
fn first_span_of_three_line_file() -> Result<()> {
    let csv = TempCsv::new("a,b\nc,d\ne,f\n")?;
    let file = csv.open()?;
    let windows: Vec<Window> = line_offsets(&file, 1024, b'\n')
        .sliding_windows(2, TailPolicy::Drop)
        .collect::<Result<_>>()?;
    let span = windows[0].spans().next().unwrap();
    assert_eq!(collect_tokens(&file, span, &cfg(1024))?, vec!["a", "b"]);
    let span = windows[1].spans().next().unwrap();
    assert_eq!(collect_tokens(&file, span, &cfg(1024))?, vec!["c", "d"]);
    Ok(())
}

#[test]
fn token_longer_than_buffer_is_intact() -> Result<()> {
    let data = b"abcdefghij\n";
    assert_eq!(collect_tokens(&data[..], whole(data), &cfg(4))?, vec!["abcdefghij"]);
    Ok(())
}

#[test]
fn round_trip_for_every_buffer_size() -> Result<()> {
    let line = b"12,,three,a much longer field than any small buffer,x,\n";
    let span = whole(line);
    let expected = &line[..line.len() - 1];
    for buf in 1..=line.len() + 8 {
        let tokens = collect_tokens(&line[..], span, &cfg(buf))?;
        assert_eq!(tokens.join(",").as_bytes(), expected, "buffer size {buf}");
        // delimiters + 1
        let delims = expected.iter().filter(|&&b| b == b',').count();
        assert_eq!(tokens.len(), delims + 1, "buffer size {buf}");
    }
    Ok(())
}

#[test]
fn span_in_the_middle_of_a_file() -> Result<()> {
    let data = b"h1,h2\n10,20\n30,40\n";
    let tokens = collect_tokens(&data[..], Span::new(6, 12), &cfg(3))?;
    assert_eq!(tokens, vec!["10", "20"]);
    Ok(())
}

#[test]
fn unterminated_last_record_emits_carry() -> Result<()> {
    let data = b"x,y\nlast,row";
    let tokens = collect_tokens(&data[..], Span::new(4, 12), &cfg(5))?;
    assert_eq!(tokens, vec!["last", "row"]);
    Ok(())
}

#[test]
fn empty_line_is_one_empty_token() -> Result<()> {
    let data = b"\n";
    assert_eq!(collect_tokens(&data[..], whole(data), &cfg(8))?, vec![""]);
    Ok(())
}

#[test]
fn empty_span_has_no_tokens() -> Result<()> {
    let data = b"a,b\n";
    assert!(collect_tokens(&data[..], Span::new(4, 4), &cfg(8))?.is_empty());
    Ok(())
}

#[test]
fn custom_delimiter_and_terminator() -> Result<()> {
    let data = b"a\tb\tc|d\te|";
    let c = cfg(2).delimiter(b'\t').terminator(b'|');
    assert_eq!(collect_tokens(&data[..], Span::new(0, 6), &c)?, vec!["a", "b", "c"]);
    assert_eq!(collect_tokens(&data[..], Span::new(6, 10), &c)?, vec!["d", "e"]);
    Ok(())
}

#[test]
fn span_past_end_of_source_stops_at_eof() -> Result<()> {
    let data = b"p,q";
    let tokens = collect_tokens(&data[..], Span::new(0, 100), &cfg(2))?;
    assert_eq!(tokens, vec!["p", "q"]);
    Ok(())
}

#[test]
fn read_error_surfaces_from_tokenizer() {
    let src = FailingSource::new(b"aaaa,bbbb,cccc\n".to_vec(), 6);
    let mut it = tokenize_span(&src, Span::new(0, 15), 4, b',', b'\n');
    assert_eq!(it.next().unwrap().unwrap().as_bytes(), b"aaaa");
    let err = it.next().unwrap().unwrap_err();
    assert!(format!("{err:#}").contains("injected failure"));
    assert!(it.next().is_none());
}

#[test]
fn tokens_are_raw_bytes() -> Result<()> {
    let data = b"\xff\xfe,ok\n";
    let toks: Vec<Token> = tokenize_span(&data[..], whole(data), 3, b',', b'\n')
        .collect::<Result<_>>()?;
    assert_eq!(toks[0].as_bytes(), b"\xff\xfe");
    assert!(toks[0].as_str().is_none());
    assert_eq!(toks[1].as_str(), Some("ok"));
    Ok(())
}

#[test]
fn tokenizer_does_not_disturb_scanner_on_shared_handle() -> Result<()> {
    let csv = TempCsv::with_rows(50, 3)?;
    let file = csv.open()?;
    let mut scanned = Vec::new();
    let mut offsets = line_offsets(&file, 16, b'\n');
    let mut prev = offsets.next().unwrap()?;
    scanned.push(prev);
    for o in offsets {
        let o = o?;
        // interleave positional span reads with the scan on the same handle
        let row = collect_tokens(&file, Span::new(prev, o), &cfg(5))?;
        assert_eq!(row.len(), 3);
        prev = o;
        scanned.push(o);
    }
    assert_eq!(scanned.len(), 51);
    Ok(())
}
