use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::render::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "session-stats",
    version,
    about = "Summarize timing, tool and token usage of an AI coding assistant session log"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Session log to analyse instead of the newest one for the project.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub file: Option<PathBuf>,

    /// Project directory whose newest session log is analysed.
    #[arg(short, long, value_name = "DIR", global = true)]
    pub project: Option<PathBuf>,

    /// Output format (defaults to the configured format).
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub output: Option<PathBuf>,

    /// Disable coloured console output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Print the path of the session log that would be analysed.
    Path,
    /// Print the effective configuration.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_flags() {
        let cli = Cli::try_parse_from([
            "session-stats",
            "--file",
            "log.jsonl",
            "--format",
            "yaml",
            "-o",
            "out.yaml",
            "--no-color",
        ])
        .expect("parse");

        assert_eq!(cli.command, None);
        assert_eq!(cli.file, Some(PathBuf::from("log.jsonl")));
        assert_eq!(cli.format, Some(OutputFormat::Yaml));
        assert_eq!(cli.output, Some(PathBuf::from("out.yaml")));
        assert!(cli.no_color);
    }

    #[test]
    fn project_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["session-stats", "path", "--project", "/work/app"])
            .expect("parse");

        assert_eq!(cli.command, Some(Commands::Path));
        assert_eq!(cli.project, Some(PathBuf::from("/work/app")));
    }

    #[test]
    fn report_flags_are_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "session-stats",
            "config",
            "--format",
            "json",
            "--output",
            "cfg.json",
            "--no-color",
        ])
        .expect("parse");

        assert_eq!(cli.command, Some(Commands::Config));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.output, Some(PathBuf::from("cfg.json")));
        assert!(cli.no_color);
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["session-stats", "--format", "xml"]).is_err());
    }
}
