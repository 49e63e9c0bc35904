//! Persistence for refinements and the per-project solution memory.

pub mod jsonl;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::refine::MemoryEntry;

pub use jsonl::JsonlStore;
pub use supabase::SupabaseStore;

pub const REFINEMENTS_TABLE: &str = "refinamentos";
pub const SOLUTIONS_TABLE: &str = "solucoes_efetivas";

/// One refinement exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "projeto_id")]
    pub project_id: String,
    #[serde(rename = "problema_original")]
    pub problem: String,
    #[serde(rename = "prompt_original")]
    pub original_prompt: String,
    #[serde(rename = "prompt_refinado")]
    pub refined_prompt: String,
    #[serde(rename = "tipo_refinamento")]
    pub kind: String,
    #[serde(rename = "tokens_usados")]
    pub tokens_used: u64,
    #[serde(rename = "resolvido", default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

/// A solution the user confirmed worked; feeds future refinements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveSolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "projeto_id")]
    pub project_id: String,
    #[serde(rename = "tipo_problema")]
    pub problem_type: String,
    #[serde(rename = "contexto")]
    pub context: String,
    #[serde(rename = "solucao")]
    pub solution: String,
    #[serde(rename = "tipo_refinamento")]
    pub kind: String,
    #[serde(rename = "vezes_usado")]
    pub times_used: u32,
    #[serde(rename = "taxa_sucesso")]
    pub success_rate: u32,
}

impl From<&EffectiveSolution> for MemoryEntry {
    fn from(s: &EffectiveSolution) -> Self {
        MemoryEntry {
            problem_type: s.problem_type.clone(),
            solution: s.solution.clone(),
            times_used: s.times_used,
        }
    }
}

#[async_trait]
pub trait RefinementStore: Send + Sync {
    /// Insert a refinement; returns the new id when the backend reports one
    async fn insert_refinement(&self, record: &RefinementRecord) -> Result<Option<String>>;

    /// Top `limit` solutions for a project, most used first
    async fn top_solutions(&self, project_id: &str, limit: usize) -> Result<Vec<MemoryEntry>>;

    async fn insert_solution(&self, solution: &EffectiveSolution) -> Result<()>;

    async fn mark_resolved(&self, refinement_id: &str, resolved: bool) -> Result<()>;
}

/// Hosted datastore when configured, local JSONL files otherwise
pub fn open(config: &Config) -> Arc<dyn RefinementStore> {
    match config.datastore {
        Some(ref settings) => {
            tracing::debug!(url = %settings.url, "using hosted datastore");
            Arc::new(SupabaseStore::new(settings))
        }
        None => {
            let dir = config.store_dir();
            tracing::debug!(dir = %dir.display(), "using local JSONL store");
            Arc::new(JsonlStore::new(&dir))
        }
    }
}
