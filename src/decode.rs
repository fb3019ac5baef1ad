use tracing::warn;

use crate::model::EventRecord;

/// Records decoded from a session log, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedLog {
    pub records: Vec<EventRecord>,
    /// Non-blank lines that could not be decoded; one warning was logged for each.
    pub skipped: usize,
}

/// Decodes every non-blank line of `raw` into an [`EventRecord`].
///
/// A line that fails to decode is skipped with a warning on the diagnostic
/// channel; the remaining lines are still processed.
pub fn decode_lines(raw: &str) -> DecodedLog {
    let mut log = DecodedLog::default();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            continue;
        }
        match decode_line(trimmed) {
            Ok(record) => log.records.push(record),
            Err(err) => {
                log.skipped += 1;
                warn!(line = index + 1, error = %err, "skipping malformed session log line");
            }
        }
    }
    log
}

pub fn decode_line(line: &str) -> serde_json::Result<EventRecord> {
    serde_json::from_str(line)
}
