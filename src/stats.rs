use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::model::{EventKind, EventRecord, Speaker};
use crate::util::format_duration_ms;

pub const UNKNOWN_FIELD: &str = "unknown";
pub const NO_SUMMARY: &str = "No summary available";

/// Why a log produced no statistics. Reported to the user, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("the session log contains no events")]
    EmptyLog,
    #[error("no event in the session log carries a timestamp")]
    NoTimestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub summary: String,
    pub version: String,
    pub git_branch: String,
    pub working_directory: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub end_time: DateTime<Utc>,
    pub total_duration: String,
    pub active_duration: String,
    pub waiting_duration: String,
    pub message_count: usize,
    pub user_message_count: usize,
    pub assistant_message_count: usize,
    pub tool_usage_count: usize,
    pub thinking_count: usize,
    pub tool_breakdown: BTreeMap<String, u64>,
    pub cache_events: u64,
    pub total_cache_created: u64,
    pub total_cache_read: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
}

/// Milliseconds attributed to the assistant working and to the human replying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalTotals {
    pub active_ms: i64,
    pub waiting_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ToolTally {
    records_with_tools: usize,
    records_with_thinking: usize,
    breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TokenTotals {
    cache_events: u64,
    cache_created: u64,
    cache_read: u64,
    input: u64,
    output: u64,
}

/// Folds a decoded session log into its summary.
pub fn compute_summary(records: &[EventRecord]) -> Result<SessionSummary, StatsError> {
    if records.is_empty() {
        return Err(StatsError::EmptyLog);
    }

    let mut timestamps = records.iter().filter_map(|record| record.timestamp);
    let first = timestamps.next().ok_or(StatsError::NoTimestamps)?;
    let (start_time, end_time) = timestamps.fold((first, first), |(start, end), ts| {
        (start.min(ts), end.max(ts))
    });

    let intervals = classify_intervals(records);
    let tools = ToolTally::collect(records);
    let tokens = TokenTotals::collect(records);

    Ok(SessionSummary {
        session_id: first_field(records, |record| record.session_id.as_deref()),
        summary: summary_text(records),
        version: first_field(records, |record| record.version.as_deref()),
        git_branch: first_field(records, |record| record.git_branch.as_deref()),
        working_directory: first_field(records, |record| record.cwd.as_deref()),
        start_time,
        end_time,
        total_duration: format_duration_ms((end_time - start_time).num_milliseconds()),
        active_duration: format_duration_ms(intervals.active_ms),
        waiting_duration: format_duration_ms(intervals.waiting_ms),
        message_count: records.len(),
        user_message_count: records.iter().filter(|record| record.is_user()).count(),
        assistant_message_count: records.iter().filter(|record| record.is_assistant()).count(),
        tool_usage_count: tools.records_with_tools,
        thinking_count: tools.records_with_thinking,
        tool_breakdown: tools.breakdown,
        cache_events: tokens.cache_events,
        total_cache_created: tokens.cache_created,
        total_cache_read: tokens.cache_read,
        total_input_tokens: tokens.input,
        total_output_tokens: tokens.output,
        total_tokens: tokens.input.saturating_add(tokens.output),
    })
}

/// Splits the conversation timeline into active and waiting time.
///
/// Timestamped user/assistant records are stably sorted by time and each
/// adjacent pair is attributed by who spoke first and who answered.
/// A user record followed by another user record counts toward neither.
pub fn classify_intervals(records: &[EventRecord]) -> IntervalTotals {
    let mut turns: Vec<(DateTime<Utc>, Speaker)> = records
        .iter()
        .filter_map(|record| Some((record.timestamp?, record.speaker()?)))
        .collect();
    turns.sort_by_key(|(ts, _)| *ts);

    let mut totals = IntervalTotals::default();
    for pair in turns.windows(2) {
        let (current_at, current) = pair[0];
        let (next_at, next) = pair[1];
        let delta = (next_at - current_at).num_milliseconds();
        match (current, next) {
            (Speaker::User, Speaker::Assistant) | (Speaker::Assistant, Speaker::Assistant) => {
                totals.active_ms = totals.active_ms.saturating_add(delta);
            }
            (Speaker::Assistant, Speaker::User) => {
                totals.waiting_ms = totals.waiting_ms.saturating_add(delta);
            }
            (Speaker::User, Speaker::User) => {}
        }
    }
    totals
}

impl ToolTally {
    fn collect(records: &[EventRecord]) -> Self {
        let mut tally = Self::default();
        for record in records.iter().filter(|record| record.is_assistant()) {
            if record.has_tool_use() {
                tally.records_with_tools += 1;
            }
            if record.has_thinking() {
                tally.records_with_thinking += 1;
            }
            for name in record.tool_names() {
                *tally.breakdown.entry(name.to_string()).or_default() += 1;
            }
        }
        tally
    }
}

impl TokenTotals {
    fn collect(records: &[EventRecord]) -> Self {
        let mut totals = Self::default();
        for usage in records.iter().filter_map(EventRecord::usage) {
            if let Some(created) = usage.cache_creation_input_tokens.filter(|n| *n > 0) {
                totals.cache_created = totals.cache_created.saturating_add(created);
                totals.cache_events += 1;
            }
            if let Some(read) = usage.cache_read_input_tokens {
                totals.cache_read = totals.cache_read.saturating_add(read);
            }
            if let Some(input) = usage.input_tokens {
                totals.input = totals.input.saturating_add(input);
            }
            if let Some(output) = usage.output_tokens {
                totals.output = totals.output.saturating_add(output);
            }
        }
        totals
    }
}

fn summary_text(records: &[EventRecord]) -> String {
    records
        .iter()
        .find(|record| record.kind == EventKind::Summary)
        .and_then(|record| record.summary.as_deref())
        .filter(|text| !text.is_empty())
        .unwrap_or(NO_SUMMARY)
        .to_string()
}

fn first_field<'a>(
    records: &'a [EventRecord],
    field: impl Fn(&'a EventRecord) -> Option<&'a str>,
) -> String {
    records
        .iter()
        .filter_map(field)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_FIELD)
        .to_string()
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
