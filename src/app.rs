use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{Cli, Commands};
use crate::config::{self, StatsConfig};
use crate::decode::decode_lines;
use crate::render::{self, OutputFormat};
use crate::session;
use crate::stats::{SessionSummary, StatsError, compute_summary};

/// Exit status when the log holds nothing to summarize.
pub const EXIT_NO_STATS: u8 = 2;

pub fn run(cli: Cli, config: StatsConfig) -> Result<u8> {
    match cli.command {
        Some(Commands::Path) => {
            println!("{}", locate(&cli, &config)?.display());
            Ok(0)
        }
        Some(Commands::Config) => {
            eprintln!("config: {}", config::config_path().display());
            eprintln!("projects_root: {}", config.projects_root().display());
            println!("{}", config_json(&config)?);
            Ok(0)
        }
        None => report(&cli, &config),
    }
}

fn report(cli: &Cli, config: &StatsConfig) -> Result<u8> {
    let path = locate(cli, config)?;
    let summary = match summarize_file(&path)? {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("No statistics available for {}: {err}.", path.display());
            return Ok(EXIT_NO_STATS);
        }
    };

    let format = cli.format.unwrap_or(config.default_format);
    let color = format == OutputFormat::Text
        && cli.output.is_none()
        && !cli.no_color
        && config.color_enabled()
        && io::stdout().is_terminal();
    let rendered = render::render(&summary, format, color)?;

    match &cli.output {
        Some(output) => {
            render::write_output(output, &rendered)?;
            eprintln!("Statistics written to {}", output.display());
        }
        None => print!("{rendered}"),
    }
    Ok(0)
}

/// Reads, decodes and aggregates one log. The inner result is the
/// "nothing to summarize" outcome; the outer one is an I/O failure.
pub fn summarize_file(path: &Path) -> Result<Result<SessionSummary, StatsError>> {
    debug!(path = %path.display(), "reading session log");
    let raw = session::read_log(path)?;
    let decoded = decode_lines(&raw);
    info!(
        records = decoded.records.len(),
        skipped = decoded.skipped,
        "decoded session log"
    );
    Ok(compute_summary(&decoded.records))
}

/// Effective configuration as printed by the `config` subcommand.
pub fn config_json(config: &StatsConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

fn locate(cli: &Cli, config: &StatsConfig) -> Result<PathBuf> {
    session::locate_log(cli.file.as_deref(), cli.project.as_deref(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("session-stats").chain(args.iter().copied()))
            .expect("parse")
    }

    #[test]
    fn writes_json_report_to_output_file() {
        let tmp = TempDir::new().expect("temp dir");
        let log = tmp.path().join("session.jsonl");
        fs::write(
            &log,
            r#"{"type":"user","timestamp":"2025-06-01T10:00:00Z","sessionId":"run-1"}
garbage line
{"type":"assistant","timestamp":"2025-06-01T10:00:07Z","message":{"content":[{"type":"tool_use","name":"Grep"}],"usage":{"input_tokens":3,"output_tokens":4}}}
"#,
        )
        .expect("write log");
        let out = tmp.path().join("out").join("stats.json");
        let args = [
            "--file",
            log.to_str().expect("utf8 path"),
            "--format",
            "json",
            "--output",
            out.to_str().expect("utf8 path"),
        ];

        let code = run(cli(&args), StatsConfig::default()).expect("run");

        assert_eq!(code, 0);
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).expect("read report")).expect("json");
        assert_eq!(value["sessionId"], "run-1");
        assert_eq!(value["messageCount"], 2);
        assert_eq!(value["activeDuration"], "7s");
        assert_eq!(value["totalTokens"], 7);
    }

    #[test]
    fn log_without_timestamps_exits_with_no_stats_status() {
        let tmp = TempDir::new().expect("temp dir");
        let log = tmp.path().join("session.jsonl");
        fs::write(&log, "{\"type\":\"summary\",\"summary\":\"x\"}\n").expect("write log");
        let out = tmp.path().join("stats.txt");
        let args = [
            "--file",
            log.to_str().expect("utf8 path"),
            "-o",
            out.to_str().expect("utf8 path"),
        ];

        let code = run(cli(&args), StatsConfig::default()).expect("run");

        assert_eq!(code, EXIT_NO_STATS);
        assert!(!out.exists());
    }

    #[test]
    fn empty_log_summarizes_to_empty_error() {
        let tmp = TempDir::new().expect("temp dir");
        let log = tmp.path().join("empty.jsonl");
        fs::write(&log, "").expect("write log");

        let outcome = summarize_file(&log).expect("read");

        assert_eq!(outcome, Err(StatsError::EmptyLog));
    }

    #[test]
    fn config_output_is_plain_json() {
        let cfg = StatsConfig {
            projects_dir: Some("/logs/projects".to_string()),
            ..StatsConfig::default()
        };

        let printed = config_json(&cfg).expect("config json");
        let value: serde_json::Value = serde_json::from_str(&printed).expect("json");

        assert_eq!(value["projects_dir"], "/logs/projects");
        assert!(printed.trim_start().starts_with('{'));
    }

    #[test]
    fn missing_log_is_an_error() {
        let tmp = TempDir::new().expect("temp dir");
        let log = tmp.path().join("missing.jsonl");
        let args = ["--file", log.to_str().expect("utf8 path")];

        assert!(run(cli(&args), StatsConfig::default()).is_err());
    }
}
