use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use session_stats::app;
use session_stats::cli::Cli;
use session_stats::config::StatsConfig;
use session_stats::util::setup_tracing;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("session-stats error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<u8> {
    setup_tracing();
    let cli = Cli::parse();
    let config = StatsConfig::load()?;
    app::run(cli, config)
}
