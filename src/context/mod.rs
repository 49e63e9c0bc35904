//! Project context records.
//!
//! Each project lives in its own JSON file under the contexts directory.
//! Field names follow the stored format (`nome`, `padroes`, ...); English
//! aliases are accepted so hand-written files can use either.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{ForgeError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectContext {
    /// Stable identifier; defaults to the file stem when absent
    #[serde(default)]
    pub id: String,
    #[serde(rename = "nome", alias = "name")]
    pub name: String,
    #[serde(rename = "descricao", alias = "description", default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub project_context: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub changes_guide: Option<String>,
    #[serde(rename = "arquivos_principais", alias = "key_files", default)]
    pub key_files: Vec<String>,
    #[serde(rename = "padroes", alias = "conventions", default)]
    pub conventions: Vec<String>,
}

impl ProjectContext {
    /// A context carrying only a name; every optional section falls back
    #[cfg(test)]
    pub fn named(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// `Name (stack)` label used when listing projects
    pub fn label(&self) -> String {
        match self.stack.as_deref().filter(|s| !s.is_empty()) {
            Some(stack) => format!("{} ({})", self.name, stack),
            None => self.name.clone(),
        }
    }
}

/// All known project contexts, keyed by id
#[derive(Debug, Default)]
pub struct ContextRegistry {
    projects: BTreeMap<String, ProjectContext>,
}

impl ContextRegistry {
    /// Load every `*.json` file under `dir`. A missing directory yields an empty registry.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut projects = BTreeMap::new();
        if !dir.exists() {
            return Ok(Self { projects });
        }

        for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }

            let raw = std::fs::read_to_string(path)?;
            let mut context: ProjectContext = serde_json::from_str(&raw).map_err(|e| {
                ForgeError::Config(format!("Invalid project context {}: {}", path.display(), e))
            })?;
            if context.name.trim().is_empty() {
                return Err(ForgeError::Config(format!(
                    "Project context {} has no name",
                    path.display()
                )));
            }
            if context.id.trim().is_empty() {
                context.id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
            }
            projects.insert(context.id.clone(), context);
        }

        Ok(Self { projects })
    }

    pub fn get(&self, id: &str) -> Result<&ProjectContext> {
        self.projects
            .get(id)
            .ok_or_else(|| ForgeError::UnknownProject(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectContext> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
