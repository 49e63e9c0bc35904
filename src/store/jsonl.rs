use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{EffectiveSolution, RefinementRecord, RefinementStore, REFINEMENTS_TABLE, SOLUTIONS_TABLE};
use crate::error::{ForgeError, Result};
use crate::refine::MemoryEntry;

/// Local store: one `<table>.jsonl` file per table.
///
/// File access is blocking, so every trait method hands its work to
/// `spawn_blocking` instead of running it on a runtime worker.
pub struct JsonlStore {
    tables: Arc<Tables>,
}

struct Tables {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            tables: Arc::new(Tables {
                dir: dir.to_path_buf(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tables) -> Result<T> + Send + 'static,
    {
        let tables = Arc::clone(&self.tables);
        tokio::task::spawn_blocking(move || work(&tables))
            .await
            .map_err(|e| ForgeError::Store(format!("Store task failed: {}", e)))?
    }
}

impl Tables {
    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", table))
    }

    fn read_all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let mut rows = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!(table, error = %e, "skipping malformed row"),
            }
        }
        Ok(rows)
    }

    fn append<T: Serialize>(&self, table: &str, row: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let line = serde_json::to_string(row)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn rewrite<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut content = String::new();
        for row in rows {
            content.push_str(&serde_json::to_string(row)?);
            content.push('\n');
        }
        fs::write(self.table_path(table), content)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Time-ordered id, disambiguated by the current row count
    fn next_id(existing: usize) -> String {
        format!("{}-{}", chrono::Utc::now().timestamp_millis(), existing + 1)
    }
}

#[async_trait]
impl RefinementStore for JsonlStore {
    async fn insert_refinement(&self, record: &RefinementRecord) -> Result<Option<String>> {
        let mut row = record.clone();
        self.blocking(move |tables| {
            let _guard = tables.lock();
            let existing = tables.read_all::<RefinementRecord>(REFINEMENTS_TABLE)?.len();
            let id = Tables::next_id(existing);
            row.id = Some(id.clone());
            tables.append(REFINEMENTS_TABLE, &row)?;
            Ok(Some(id))
        })
        .await
    }

    async fn top_solutions(&self, project_id: &str, limit: usize) -> Result<Vec<MemoryEntry>> {
        let project_id = project_id.to_string();
        self.blocking(move |tables| {
            let mut solutions: Vec<EffectiveSolution> = tables
                .read_all::<EffectiveSolution>(SOLUTIONS_TABLE)?
                .into_iter()
                .filter(|s| s.project_id == project_id)
                .collect();
            // Stable sort keeps insertion order among equal counts
            solutions.sort_by(|a, b| b.times_used.cmp(&a.times_used));
            Ok(solutions.iter().take(limit).map(MemoryEntry::from).collect())
        })
        .await
    }

    async fn insert_solution(&self, solution: &EffectiveSolution) -> Result<()> {
        let mut row = solution.clone();
        self.blocking(move |tables| {
            let _guard = tables.lock();
            let existing = tables.read_all::<EffectiveSolution>(SOLUTIONS_TABLE)?.len();
            row.id = Some(Tables::next_id(existing));
            tables.append(SOLUTIONS_TABLE, &row)
        })
        .await
    }

    async fn mark_resolved(&self, refinement_id: &str, resolved: bool) -> Result<()> {
        let refinement_id = refinement_id.to_string();
        self.blocking(move |tables| {
            let _guard = tables.lock();
            let mut rows = tables.read_all::<RefinementRecord>(REFINEMENTS_TABLE)?;
            let row = rows
                .iter_mut()
                .find(|r| r.id.as_deref() == Some(refinement_id.as_str()))
                .ok_or_else(|| ForgeError::Store(format!("No refinement with id {}", refinement_id)))?;
            row.resolved = Some(resolved);
            tables.rewrite(REFINEMENTS_TABLE, &rows)
        })
        .await
    }
}
