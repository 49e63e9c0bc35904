use async_trait::async_trait;
use serde_json::Value;

use super::{EffectiveSolution, RefinementRecord, RefinementStore, REFINEMENTS_TABLE, SOLUTIONS_TABLE};
use crate::config::DatastoreSettings;
use crate::error::{ForgeError, Result};
use crate::refine::MemoryEntry;

/// Supabase tables through the PostgREST API
pub struct SupabaseStore {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(settings: &DatastoreSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            service_key: settings.service_key.clone(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(ForgeError::Store(format!("{}: {}", status, text)))
    }
}

#[async_trait]
impl RefinementStore for SupabaseStore {
    async fn insert_refinement(&self, record: &RefinementRecord) -> Result<Option<String>> {
        let response = self
            .request(reqwest::Method::POST, REFINEMENTS_TABLE)
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;

        Ok(rows.first().and_then(|row| row.get("id")).and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }))
    }

    async fn top_solutions(&self, project_id: &str, limit: usize) -> Result<Vec<MemoryEntry>> {
        let filter = format!("eq.{}", project_id);
        let limit = limit.to_string();
        let response = self
            .request(reqwest::Method::GET, SOLUTIONS_TABLE)
            .query(&[
                ("select", "*"),
                ("projeto_id", filter.as_str()),
                ("order", "vezes_usado.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let rows: Vec<MemoryEntry> = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    async fn insert_solution(&self, solution: &EffectiveSolution) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, SOLUTIONS_TABLE)
            .header("Prefer", "return=minimal")
            .json(solution)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn mark_resolved(&self, refinement_id: &str, resolved: bool) -> Result<()> {
        let filter = format!("eq.{}", refinement_id);
        let response = self
            .request(reqwest::Method::PATCH, REFINEMENTS_TABLE)
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "resolvido": resolved }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
