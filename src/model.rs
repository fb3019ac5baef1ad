use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Discriminator of a session log line (`type` in the JSON).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum EventKind {
    Summary,
    User,
    Assistant,
    Other(String),
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "summary" => Self::Summary,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Other(value),
        }
    }
}

/// Which side of the conversation produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One decoded line of a session log.
///
/// Only `type` is required. Every other field decodes leniently: a value of
/// the wrong shape is treated as absent rather than failing the line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub git_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<Usage>,
}

/// Message body: plain text for typed prompts, a block list otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Blocks(Vec::new())
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Self::Text(text),
            Value::Array(items) => {
                Self::Blocks(items.into_iter().map(ContentBlock::from_value).collect())
            }
            _ => Self::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    ToolUse {
        #[serde(default, deserialize_with = "lenient")]
        name: Option<String>,
    },
    Thinking,
    #[serde(other)]
    Other,
}

impl ContentBlock {
    fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or(Self::Other)
    }
}

/// Token accounting attached to a message. Each counter is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "lenient")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub output_tokens: Option<u64>,
}

impl EventRecord {
    pub fn is_user(&self) -> bool {
        self.kind == EventKind::User
    }

    pub fn is_assistant(&self) -> bool {
        self.kind == EventKind::Assistant
    }

    pub fn speaker(&self) -> Option<Speaker> {
        match self.kind {
            EventKind::User => Some(Speaker::User),
            EventKind::Assistant => Some(Speaker::Assistant),
            _ => None,
        }
    }

    pub fn content_blocks(&self) -> &[ContentBlock] {
        match self.message.as_ref().map(|message| &message.content) {
            Some(MessageContent::Blocks(blocks)) => blocks.as_slice(),
            _ => &[],
        }
    }

    /// Names of every named `tool_use` block, in content order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.content_blocks().iter().filter_map(|block| match block {
            ContentBlock::ToolUse { name: Some(name) } if !name.is_empty() => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn has_tool_use(&self) -> bool {
        self.content_blocks()
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }

    pub fn has_thinking(&self) -> bool {
        self.content_blocks()
            .iter()
            .any(|block| matches!(block, ContentBlock::Thinking))
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.message.as_ref()?.usage.as_ref()
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => parse_utc_timestamp(&text),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

pub fn parse_utc_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
