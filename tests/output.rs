//! Tests for row output and stats export.

use anyhow::Result;
use linestride::testing::TempCsv;
use linestride::*;
use std::fs;

#[cfg(feature = "io-csv")]
#[test]
fn rows_round_trip_through_the_pipeline() -> Result<()> {
    let content = "id,name,score\n1,ann,3.5\n\n2,bob,x\n,\n3,cy,\n";
    let csv = TempCsv::new(content)?;
    let cfg = StrideConfig::default();
    let mut writer = RowWriter::new(Vec::new(), &cfg);
    Pipeline::new(cfg)?.run(csv.open()?, |w| writer.write_window(&w))?;
    assert_eq!(writer.rows(), 6);
    let bytes = writer.finish()?;
    assert_eq!(String::from_utf8(bytes)?, content);
    Ok(())
}

#[cfg(feature = "io-csv")]
#[test]
fn blank_lines_stay_blank() -> Result<()> {
    let content = "a,b\n\nc,d\n\n\n";
    let csv = TempCsv::new(content)?;
    let cfg = StrideConfig::context().buffer_size(2);
    let mut writer = RowWriter::new(Vec::new(), &cfg);
    Pipeline::new(cfg)?.run(csv.open()?, |w| writer.write_window(&w))?;
    assert_eq!(writer.rows(), 5);
    assert_eq!(String::from_utf8(writer.finish()?)?, content);
    Ok(())
}

#[cfg(feature = "io-csv")]
#[test]
fn overlapping_windows_write_each_record_once() -> Result<()> {
    let csv = TempCsv::with_rows(6, 3)?;
    let cfg = StrideConfig::context();
    let mut writer = RowWriter::new(Vec::new(), &cfg);
    Pipeline::new(cfg)?.run(csv.open()?, |w| writer.write_window(&w))?;
    assert_eq!(writer.rows(), 6);
    let written = String::from_utf8(writer.finish()?)?;
    assert_eq!(written, fs::read_to_string(csv.path())?);
    Ok(())
}

#[cfg(feature = "io-csv")]
#[test]
fn writer_uses_configured_separators() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("rows.txt");
    let cfg = StrideConfig::default().delimiter(b'\t').terminator(b'\r');
    let mut writer = RowWriter::create(&path, &cfg)?;
    writer.write_record(&Record {
        span: Span::new(0, 4),
        tokens: vec![Token::from("a"), Token::from("b,c")],
    })?;
    writer.finish()?;
    assert_eq!(fs::read_to_string(&path)?, "a\tb,c\r");
    Ok(())
}

#[test]
fn stats_save_and_reload() -> Result<()> {
    let csv = TempCsv::with_rows(4, 2)?;
    let stats = Pipeline::new(StrideConfig::default())?.run(csv.open()?, |_| Ok(()))?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out").join("stats.json");
    stats.save_to_file(&path)?;
    let back: PipelineStats = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(back, stats);
    assert_eq!(stats.to_json()["windows"], serde_json::json!(4));
    Ok(())
}
