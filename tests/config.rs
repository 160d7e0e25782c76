//! Tests for configuration defaults, validation and JSON loading.

use anyhow::Result;
use linestride::testing::TempCsv;
use linestride::*;

#[test]
fn defaults() {
    let cfg = StrideConfig::default();
    assert_eq!(cfg.window_len, 2);
    assert_eq!(cfg.buffer_size, 1024);
    assert_eq!(cfg.delimiter, b',');
    assert_eq!(cfg.terminator, b'\n');
    assert_eq!(cfg.channel_capacity, 1);
    assert_eq!(cfg.tail_policy, TailPolicy::Drop);
    assert_eq!(cfg.base_index, 0);
    assert!(cfg.validate().is_ok());
    assert_eq!(StrideConfig::context().window_len, 3);
}

#[test]
fn validate_rejects_bad_values() {
    let bad = [
        StrideConfig::default().window_len(0),
        StrideConfig::default().window_len(1),
        StrideConfig::default().buffer_size(0),
        StrideConfig::default().delimiter(b'\n'),
        StrideConfig::default().batch_size(0),
    ];
    for cfg in bad {
        assert!(cfg.validate().is_err(), "{cfg:?}");
    }
    assert!(StrideConfig::default().channel_capacity(0).validate().is_ok());
}

#[test]
fn load_partial_json() -> Result<()> {
    // file name suffix doesn't matter to the loader
    let file = TempCsv::new(r#"{ "window_len": 3, "delimiter": "\t", "tail_policy": "emit" }"#)?;
    let cfg = StrideConfig::from_json_file(file.path())?;
    assert_eq!(cfg.window_len, 3);
    assert_eq!(cfg.delimiter, b'\t');
    assert_eq!(cfg.tail_policy, TailPolicy::Emit);
    assert_eq!(cfg.buffer_size, 1024);
    Ok(())
}

#[test]
fn separators_accept_numbers() -> Result<()> {
    let file = TempCsv::new(r#"{ "delimiter": 59, "terminator": "|" }"#)?;
    let cfg = StrideConfig::from_json_file(file.path())?;
    assert_eq!(cfg.delimiter, b';');
    assert_eq!(cfg.terminator, b'|');
    Ok(())
}

#[test]
fn json_round_trip_keeps_separators_readable() -> Result<()> {
    let cfg = StrideConfig::context().delimiter(b';');
    let json = serde_json::to_string(&cfg)?;
    assert!(json.contains(r#""delimiter":";""#), "{json}");
    let back: StrideConfig = serde_json::from_str(&json)?;
    assert_eq!(back, cfg);
    Ok(())
}

#[test]
fn load_rejects_unknown_fields_and_invalid_values() -> Result<()> {
    let unknown = TempCsv::new(r#"{ "windw_len": 3 }"#)?;
    assert!(StrideConfig::from_json_file(unknown.path()).is_err());

    let invalid = TempCsv::new(r#"{ "window_len": 1 }"#)?;
    let err = StrideConfig::from_json_file(invalid.path()).unwrap_err();
    assert!(format!("{err:#}").contains("window_len"));

    let long = TempCsv::new(r#"{ "delimiter": ";;" }"#)?;
    assert!(StrideConfig::from_json_file(long.path()).is_err());
    Ok(())
}

#[test]
fn missing_config_file() {
    let err = StrideConfig::from_json_file("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("open"));
}
