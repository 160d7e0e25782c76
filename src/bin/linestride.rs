use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use linestride::{ParsedWindow, Pipeline, RowWriter, StrideConfig, TailPolicy, open_input};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linestride=info")),
        )
        .init();

    if let Err(err) = run(&cli().get_matches()) {
        eprintln!("linestride failed: {err:#}");
        process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("linestride")
        .about("Stream record windows out of a large delimited file")
        .arg(
            Arg::new("in")
                .long("in")
                .value_name("PATH")
                .help("Input file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("PATH")
                .help("Write each record as a delimiter-joined row to this file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("print")
                .long("print")
                .help("Print every window and its tokens to stdout")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("JSON configuration file; flags override its values")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("window")
                .long("window")
                .short('w')
                .help("Offsets per window (2 = adjacent records, 3 = previous/current/next)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("buffer-size")
                .long("buffer-size")
                .value_name("BYTES")
                .value_parser(value_parser!(usize)),
        )
        .arg(Arg::new("delimiter").long("delimiter").short('d'))
        .arg(Arg::new("terminator").long("terminator"))
        .arg(
            Arg::new("channel-capacity")
                .long("channel-capacity")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("tail")
                .long("tail")
                .help("Short trailing window: drop or emit")
                .value_parser(["drop", "emit"]),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help("Tokenize windows in parallel batches")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .value_name("PATH")
                .help("Save run statistics as JSON")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn parse_byte(name: &str, s: &str) -> Result<u8> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        "\\n" => Ok(b'\n'),
        "\\r" => Ok(b'\r'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => bail!("--{name} must be a single ASCII character, got {s:?}"),
        },
    }
}

fn config_from(m: &ArgMatches) -> Result<StrideConfig> {
    let mut cfg = match m.get_one::<PathBuf>("config") {
        Some(path) => StrideConfig::from_json_file(path)?,
        None => StrideConfig::default(),
    };
    if let Some(&w) = m.get_one::<usize>("window") {
        cfg = cfg.window_len(w);
    }
    if let Some(&n) = m.get_one::<usize>("buffer-size") {
        cfg = cfg.buffer_size(n);
    }
    if let Some(s) = m.get_one::<String>("delimiter") {
        cfg = cfg.delimiter(parse_byte("delimiter", s)?);
    }
    if let Some(s) = m.get_one::<String>("terminator") {
        cfg = cfg.terminator(parse_byte("terminator", s)?);
    }
    if let Some(&n) = m.get_one::<usize>("channel-capacity") {
        cfg = cfg.channel_capacity(n);
    }
    if let Some(s) = m.get_one::<String>("tail") {
        cfg = cfg.tail_policy(if s == "emit" { TailPolicy::Emit } else { TailPolicy::Drop });
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn print_window(w: &ParsedWindow) {
    println!("#{} {:?}", w.position, w.window.offsets());
    for rec in &w.records {
        let fields: Vec<_> = rec.tokens.iter().map(|t| t.to_string_lossy()).collect();
        println!("  {} {:?}", rec.span, fields);
    }
}

fn run(m: &ArgMatches) -> Result<()> {
    let cfg = config_from(m)?;
    let input = m
        .get_one::<PathBuf>("in")
        .context("missing --in")?;
    let file = open_input(input)?;
    let mut writer = match m.get_one::<PathBuf>("out") {
        Some(path) => Some(RowWriter::create(path, &cfg)?),
        None => None,
    };
    let print = m.get_flag("print");

    tracing::info!(
        input = %input.display(),
        window_len = cfg.window_len,
        buffer_size = cfg.buffer_size,
        "processing"
    );

    let pipeline = Pipeline::new(cfg)?;
    let sink = |w: ParsedWindow| -> Result<()> {
        if print {
            print_window(&w);
        }
        if let Some(writer) = writer.as_mut() {
            writer.write_window(&w)?;
        }
        Ok(())
    };
    let stats = if m.get_flag("parallel") {
        pipeline.run_par(&file, sink)?
    } else {
        pipeline.run(&file, sink)?
    };

    if let Some(writer) = writer {
        let rows = writer.rows();
        writer.finish()?;
        tracing::info!(rows, "output written");
    }
    stats.log_summary();
    if let Some(path) = m.get_one::<PathBuf>("stats") {
        stats.save_to_file(path)?;
    }
    Ok(())
}
