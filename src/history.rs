use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

pub const HISTORY_FILE: &str = "contextforge_history.json";
/// Oldest entries are evicted past this many
pub const HISTORY_CAP: usize = 50;
/// Problem text kept per entry, in chars
pub const PROBLEM_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub projeto: String,
    pub problema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arquivo: Option<String>,
    #[serde(default)]
    pub resolvido: bool,
    pub criado_em: DateTime<Utc>,
    /// Minutes it took to resolve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_resolucao: Option<u32>,
}

/// Problems the user has worked on, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

impl History {
    /// Load from disk, or start empty if the file is missing.
    ///
    /// A file that fails to parse is renamed to `<file>.corrupt` first, so the
    /// next save cannot overwrite it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(History::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(history) => Ok(history),
            Err(e) => {
                let aside = corrupt_path(path);
                std::fs::rename(path, &aside).map_err(|io| {
                    ForgeError::History(format!(
                        "{} is corrupt ({}) and could not be moved aside: {}",
                        path.display(),
                        e,
                        io
                    ))
                })?;
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "history file is corrupt, starting fresh"
                );
                Ok(History::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Prepend a new entry and evict past the cap. Returns the new id.
    pub fn record(&mut self, project: &str, problem: &str, file: Option<&str>) -> i64 {
        self.record_at(Utc::now(), project, problem, file)
    }

    fn record_at(
        &mut self,
        now: DateTime<Utc>,
        project: &str,
        problem: &str,
        file: Option<&str>,
    ) -> i64 {
        let mut id = now.timestamp_millis();
        while self.entries.iter().any(|e| e.id == id) {
            id += 1;
        }

        self.entries.insert(
            0,
            HistoryEntry {
                id,
                projeto: project.to_string(),
                problema: problem.trim().chars().take(PROBLEM_PREVIEW_CHARS).collect(),
                arquivo: file.map(str::to_string).filter(|f| !f.is_empty()),
                resolvido: false,
                criado_em: now,
                tempo_resolucao: None,
            },
        );
        self.entries.truncate(HISTORY_CAP);
        id
    }

    pub fn mark_resolved(&mut self, id: i64, minutes: Option<u32>) -> Result<&HistoryEntry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ForgeError::History(format!("No history entry with id {}", id)))?;
        entry.resolvido = true;
        entry.tempo_resolucao = minutes;
        Ok(entry)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn keeps_newest_fifty() {
        let mut history = History::default();
        let start = Utc::now();
        for i in 0..55 {
            history.record_at(start + Duration::seconds(i), "toolbox", &format!("problem {}", i), None);
        }

        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.entries()[0].problema, "problem 54");
        assert_eq!(history.entries()[49].problema, "problem 5");
    }

    #[test]
    fn truncates_problem_and_drops_empty_file() {
        let mut history = History::default();
        history.record("toolbox", &"x".repeat(300), Some(""));
        let entry = &history.entries()[0];
        assert_eq!(entry.problema.chars().count(), PROBLEM_PREVIEW_CHARS);
        assert!(entry.arquivo.is_none());
        assert!(!entry.resolvido);
    }

    #[test]
    fn same_millisecond_gets_distinct_ids() {
        let mut history = History::default();
        let now = Utc::now();
        let a = history.record_at(now, "p", "first", None);
        let b = history.record_at(now, "p", "second", None);
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_sets_flag_and_minutes() {
        let mut history = History::default();
        let id = history.record("toolbox", "Button does nothing", Some("src/app.js"));

        let entry = history.mark_resolved(id, Some(15)).unwrap();
        assert!(entry.resolvido);
        assert_eq!(entry.tempo_resolucao, Some(15));

        assert!(matches!(history.mark_resolved(1, None), Err(ForgeError::History(_))));
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(HISTORY_FILE);

        let mut history = History::default();
        history.record("toolbox", "Webhook returns 500", Some("api/webhook.js"));
        history.save(&path).unwrap();

        let loaded = History::load(&path).unwrap();
        assert_eq!(loaded.entries(), history.entries());
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(HISTORY_FILE);
        assert!(History::load(&path).unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_kept_aside_before_saving_over_it() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(HISTORY_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let mut history = History::load(&path).unwrap();
        assert!(history.is_empty());
        history.record("Toolbox", "Button does nothing on click", None);
        history.save(&path).unwrap();

        let kept = std::fs::read_to_string(temp.path().join(format!("{}.corrupt", HISTORY_FILE))).unwrap();
        assert_eq!(kept, "{not json");
        assert_eq!(History::load(&path).unwrap().entries().len(), 1);
    }
}
