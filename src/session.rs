use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::StatsConfig;

/// Picks the session log to analyse.
///
/// An explicit file wins, then an explicit project directory, then the
/// projects derived from the current working directory.
pub fn locate_log(
    explicit_file: Option<&Path>,
    project: Option<&Path>,
    config: &StatsConfig,
) -> Result<PathBuf> {
    if let Some(file) = explicit_file {
        if !file.is_file() {
            bail!("session log {} does not exist", file.display());
        }
        return Ok(file.to_path_buf());
    }

    let projects_root = config.projects_root();
    if let Some(project) = project {
        let project = resolve_project(project)?;
        return latest_log_in(&project_log_dir(&projects_root, &project));
    }

    let cwd = env::current_dir().context("failed to resolve the current directory")?;
    let candidates = candidate_projects(&cwd, fetch_repo_root(&cwd), config.prefer_repo_root);
    latest_project_log(&projects_root, &candidates)
}

/// Directory name under which session logs for `project` are stored.
///
/// Every character other than an ASCII letter, digit or `-` becomes `-`.
pub fn project_dir_name(project: &Path) -> String {
    project
        .to_string_lossy()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

/// Absolute form of a user-supplied project path, without `.` components
/// or a trailing separator.
pub fn resolve_project(project: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(project)
        .with_context(|| format!("failed to resolve project path {}", project.display()))?;
    Ok(absolute.components().collect())
}

pub fn project_log_dir(projects_root: &Path, project: &Path) -> PathBuf {
    projects_root.join(project_dir_name(project))
}

pub fn candidate_projects(
    cwd: &Path,
    repo_root: Option<PathBuf>,
    prefer_repo_root: bool,
) -> Vec<PathBuf> {
    let mut ordered: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    let cwd = cwd.to_path_buf();
    let ranked = if prefer_repo_root {
        [repo_root, Some(cwd)]
    } else {
        [Some(cwd), repo_root]
    };
    for candidate in ranked.into_iter().flatten() {
        push_unique_path(&mut ordered, &mut seen, candidate);
    }
    ordered
}

/// Newest log among the first candidate project that has a log directory.
pub fn latest_project_log(projects_root: &Path, candidates: &[PathBuf]) -> Result<PathBuf> {
    for project in candidates {
        let dir = project_log_dir(projects_root, project);
        debug!(
            project = %project.display(),
            dir = %dir.display(),
            "checking project log directory"
        );
        if dir.is_dir() {
            return latest_log_in(&dir);
        }
    }

    let tried = candidates
        .iter()
        .map(|project| project_log_dir(projects_root, project).display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    bail!("no session log directory found (looked in: {tried})")
}

/// Most recently modified `*.jsonl` file directly inside `dir`.
pub fn latest_log_in(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("session log directory {} does not exist", dir.display());
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        let modified = match entry.metadata().ok().and_then(|meta| meta.modified().ok()) {
            Some(modified) => modified,
            None => continue,
        };

        let candidate = (modified, path.to_path_buf());
        if newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }

    newest
        .map(|(_, path)| path)
        .with_context(|| format!("no session logs (*.jsonl) found in {}", dir.display()))
}

pub fn read_log(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read session log {}", path.display()))
}

fn fetch_repo_root(path: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--show-toplevel")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!root.is_empty()).then(|| PathBuf::from(root))
}

fn push_unique_path(paths: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>, candidate: PathBuf) {
    if candidate.as_os_str().is_empty() {
        return;
    }
    if seen.insert(candidate.clone()) {
        paths.push(candidate);
    }
}
