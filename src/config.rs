use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::render::OutputFormat;

const CONFIG_FILE_NAME: &str = "session-stats.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatsConfig {
    pub default_format: OutputFormat,
    pub color: bool,
    pub prefer_repo_root: bool,
    pub projects_dir: Option<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Text,
            color: true,
            prefer_repo_root: true,
            projects_dir: None,
        }
    }
}

impl StatsConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// A missing file yields the defaults; nothing is written back.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut parsed: StatsConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        parsed.normalize();
        Ok(parsed)
    }

    pub fn projects_root(&self) -> PathBuf {
        self.projects_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(projects_path)
    }

    pub fn color_enabled(&self) -> bool {
        self.color && env::var_os("NO_COLOR").is_none()
    }

    fn normalize(&mut self) {
        if let Some(dir) = self.projects_dir.as_mut() {
            let trimmed = dir.trim().to_string();
            if trimmed.is_empty() {
                self.projects_dir = None;
            } else {
                *dir = trimmed;
            }
        }
    }
}

pub fn claude_home() -> PathBuf {
    if let Some(custom) = env_path("CLAUDE_CONFIG_DIR") {
        return custom;
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
}

pub fn projects_path() -> PathBuf {
    claude_home().join("projects")
}

pub fn config_path() -> PathBuf {
    env_path("SESSION_STATS_CONFIG").unwrap_or_else(|| claude_home().join(CONFIG_FILE_NAME))
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn expand_home(raw_path: &str) -> PathBuf {
    let path = raw_path.trim();
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }

    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }

    Path::new(path).to_path_buf()
}
