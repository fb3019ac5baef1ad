use chrono::{DateTime, Local, Utc};
use tracing_subscriber::{EnvFilter, fmt};

/// Logs go to stderr so structured output on stdout stays machine-readable.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Renders a millisecond span as `1h 2m 3s`, `2m 3s` or `3s`.
///
/// Sub-second remainders are floored and negative spans render as `0s`.
pub fn format_duration_ms(millis: i64) -> String {
    let seconds = millis.max(0) / 1_000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{hours}h {}m {}s", minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

pub fn format_local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn truncate(input: &str, max_len: usize) -> String {
    if input.chars().count() <= max_len {
        return input.to_string();
    }
    if max_len <= 3 {
        return input.chars().take(max_len).collect();
    }
    let head: String = input.chars().take(max_len - 3).collect();
    format!("{head}...")
}
