use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use crossterm::style::{Color, Stylize};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::stats::SessionSummary;
use crate::util::{format_local_time, format_tokens, truncate};

const REPORT_WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Renders a summary; the result always ends with a newline.
pub fn render(summary: &SessionSummary, format: OutputFormat, color: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(summary, color)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(summary)
                .context("failed to serialize statistics as JSON")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(summary).context("failed to serialize statistics as YAML")
        }
    }
}

pub fn render_text(summary: &SessionSummary, color: bool) -> String {
    let mut out = String::new();
    let title = "Session Statistics";
    if color {
        let _ = writeln!(out, "{}", title.with(Color::Cyan).bold());
    } else {
        let _ = writeln!(out, "{title}");
    }

    section(&mut out, "Session", color);
    kv(&mut out, "Session ID", &summary.session_id);
    kv(&mut out, "Summary", &truncate(&summary.summary, 72));
    kv(&mut out, "Version", &summary.version);
    kv(&mut out, "Branch", &summary.git_branch);
    kv(&mut out, "Directory", &summary.working_directory);

    section(&mut out, "Timing", color);
    kv(&mut out, "Started", &format_local_time(summary.start_time));
    kv(&mut out, "Ended", &format_local_time(summary.end_time));
    kv(&mut out, "Duration", &summary.total_duration);
    kv(&mut out, "Active", &summary.active_duration);
    kv(&mut out, "Waiting", &summary.waiting_duration);

    section(&mut out, "Messages", color);
    kv(&mut out, "Total", &summary.message_count.to_string());
    kv(&mut out, "User", &summary.user_message_count.to_string());
    kv(&mut out, "Assistant", &summary.assistant_message_count.to_string());
    kv(&mut out, "Tool uses", &summary.tool_usage_count.to_string());
    kv(&mut out, "Thinking", &summary.thinking_count.to_string());

    section(&mut out, "Tools", color);
    if summary.tool_breakdown.is_empty() {
        let _ = writeln!(out, "  (none)");
    } else {
        let width = summary
            .tool_breakdown
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0);
        for (name, count) in ranked_tools(summary) {
            let _ = writeln!(out, "  {name:<width$}  {count}");
        }
    }

    section(&mut out, "Tokens", color);
    kv(&mut out, "Input", &token_value(summary.total_input_tokens));
    kv(&mut out, "Output", &token_value(summary.total_output_tokens));
    kv(&mut out, "Total", &token_value(summary.total_tokens));
    kv(&mut out, "Cache write", &token_value(summary.total_cache_created));
    kv(&mut out, "Cache read", &token_value(summary.total_cache_read));
    kv(&mut out, "Cache events", &summary.cache_events.to_string());
    out
}

/// Tools by descending invocation count, ties broken by name.
fn ranked_tools(summary: &SessionSummary) -> Vec<(&str, u64)> {
    let mut tools: Vec<(&str, u64)> = summary
        .tool_breakdown
        .iter()
        .map(|(name, count)| (name.as_str(), *count))
        .collect();
    tools.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    tools
}

/// Writes `contents` to `path` through a temp file in the same directory.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create output directory {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn token_value(tokens: u64) -> String {
    if tokens >= 1_000 {
        format!("{} ({tokens})", format_tokens(tokens))
    } else {
        tokens.to_string()
    }
}

fn section(out: &mut String, title: &str, color: bool) {
    let rule = hr(title, REPORT_WIDTH);
    if color {
        let _ = writeln!(out, "{}", rule.with(Color::DarkGrey));
    } else {
        let _ = writeln!(out, "{rule}");
    }
}

fn kv(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{label:<12}: {value}");
}

fn hr(title: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let core = format!(" {title} ");
    if core.len() >= width {
        return truncate(title, width);
    }

    let side = (width - core.len()) / 2;
    let right = width - core.len() - side;
    format!("{}{}{}", "-".repeat(side), core, "-".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_lines;
    use crate::stats::compute_summary;
    use tempfile::TempDir;

    fn sample_summary() -> SessionSummary {
        let decoded = decode_lines(
            r#"{"type":"summary","summary":"Ship the release"}
{"type":"user","timestamp":"2025-06-01T10:00:00Z","sessionId":"abc","version":"1.0.31","gitBranch":"main","cwd":"/work/app"}
{"type":"assistant","timestamp":"2025-06-01T10:00:30Z","message":{"content":[{"type":"tool_use","name":"Read"},{"type":"tool_use","name":"Bash"},{"type":"tool_use","name":"Bash"}],"usage":{"input_tokens":1500,"output_tokens":250,"cache_read_input_tokens":12000}}}
{"type":"user","timestamp":"2025-06-01T10:02:00Z"}"#,
        );
        compute_summary(&decoded.records).expect("summary")
    }

    #[test]
    fn header_rule_respects_requested_width() {
        assert_eq!(hr("Tokens", 24).len(), 24);
        assert_eq!(hr("A very long section title", 10), "A very ...");
    }

    #[test]
    fn text_report_lists_sections_and_ranked_tools() {
        let text = render_text(&sample_summary(), false);

        for heading in ["Session", "Timing", "Messages", "Tools", "Tokens"] {
            assert!(text.contains(&format!(" {heading} ")), "missing {heading}");
        }
        assert!(text.contains("Session ID  : abc"));
        assert!(text.contains("Duration    : 2m 0s"));
        assert!(text.contains("Active      : 30s"));
        assert!(text.contains("Waiting     : 1m 30s"));
        assert!(text.contains("Input       : 1.5K (1500)"));
        assert!(text.contains("Output      : 250"));
        assert!(text.contains("Cache read  : 12.0K (12000)"));
        let bash = text.find("  Bash  2").expect("bash row");
        let read = text.find("  Read  1").expect("read row");
        assert!(bash < read);
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn colored_text_report_uses_ansi_styles() {
        let text = render_text(&sample_summary(), true);
        assert!(text.contains('\u{1b}'));
    }

    #[test]
    fn json_and_yaml_carry_iso_timestamps() {
        let summary = sample_summary();

        let json = render(&summary, OutputFormat::Json, false).expect("json");
        assert!(json.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse json");
        assert_eq!(value["startTime"], "2025-06-01T10:00:00.000Z");
        assert_eq!(value["toolBreakdown"]["Bash"], 2);

        let yaml = render(&summary, OutputFormat::Yaml, false).expect("yaml");
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("parse yaml");
        assert_eq!(value["endTime"].as_str(), Some("2025-06-01T10:02:00.000Z"));
        assert_eq!(value["sessionId"].as_str(), Some("abc"));
        assert_eq!(value["totalTokens"].as_u64(), Some(1750));
    }

    #[test]
    fn write_output_creates_parents_and_replaces_existing_file() {
        let tmp = TempDir::new().expect("temp dir");
        let path = tmp.path().join("reports").join("stats.json");

        write_output(&path, "first\n").expect("first write");
        write_output(&path, "second\n").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second\n");
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(entries, 1);
    }
}
