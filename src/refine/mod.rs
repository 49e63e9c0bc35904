//! Prompt refinement: request types, validation, the gateway that talks to
//! the LLM, the rate limiter guarding it, and the client that calls it.

pub mod client;
pub mod gateway;
pub mod ratelimit;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use gateway::{ErrorBody, Gateway, GatewayError};
pub use ratelimit::{RateLimiter, SlidingWindowLimiter};

/// Longest original prompt accepted for refinement
pub const MAX_PROMPT_CHARS: usize = 10_000;
/// Project id recorded when the caller sends none
pub const UNKNOWN_PROJECT: &str = "unknown";

/// Refinement strategy (`tipo` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefinementKind {
    /// More specific and technical
    Especifico,
    /// Add missing context
    Contexto,
    /// Propose an alternative approach
    Alternativa,
    /// Disambiguate and clarify
    Correcao,
    /// Improve overall output quality
    Refinar,
}

impl RefinementKind {
    pub fn all() -> &'static [RefinementKind] {
        &[
            RefinementKind::Especifico,
            RefinementKind::Contexto,
            RefinementKind::Alternativa,
            RefinementKind::Correcao,
            RefinementKind::Refinar,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefinementKind::Especifico => "especifico",
            RefinementKind::Contexto => "contexto",
            RefinementKind::Alternativa => "alternativa",
            RefinementKind::Correcao => "correcao",
            RefinementKind::Refinar => "refinar",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RefinementKind::Especifico => "make it more specific and technical",
            RefinementKind::Contexto => "add missing project context",
            RefinementKind::Alternativa => "reframe with an alternative approach",
            RefinementKind::Correcao => "clarify and remove ambiguity",
            RefinementKind::Refinar => "improve the quality of the expected output",
        }
    }

    /// Comma-separated list of every accepted wire value
    pub fn allowed_values() -> String {
        Self::all()
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RefinementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefinementKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("tipo is invalid. Use: {}", Self::allowed_values()))
    }
}

/// A prior solution that worked for this project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(rename = "tipo_problema", alias = "tipoProblema")]
    pub problem_type: String,
    #[serde(rename = "solucao")]
    pub solution: String,
    #[serde(rename = "vezes_usado", alias = "vezesUsado", default)]
    pub times_used: u32,
}

/// Validated refinement request
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementRequest {
    pub original_prompt: String,
    pub project_context: String,
    pub kind: RefinementKind,
    pub problem: String,
    pub memory: Vec<MemoryEntry>,
    pub project_id: String,
}

impl RefinementRequest {
    /// Validate a JSON body, naming the first offending field on failure
    pub fn from_json(body: &Value) -> std::result::Result<Self, GatewayError> {
        let obj = body
            .as_object()
            .ok_or_else(|| invalid("request body must be a JSON object"))?;

        let original_prompt = match obj.get("promptOriginal").and_then(Value::as_str) {
            Some(p) if !p.is_empty() => p,
            _ => return Err(invalid("promptOriginal is required")),
        };
        if original_prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(invalid(&format!(
                "promptOriginal is too long (max {} chars)",
                MAX_PROMPT_CHARS
            )));
        }

        let kind = obj
            .get("tipo")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(&format!("tipo is invalid. Use: {}", RefinementKind::allowed_values())))?
            .parse::<RefinementKind>()
            .map_err(|e| invalid(&e))?;

        let problem = match obj.get("problema").and_then(Value::as_str) {
            Some(p) if !p.is_empty() => p,
            _ => return Err(invalid("problema is required")),
        };

        let project_context = match obj.get("contexto") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(invalid("contexto must be a string")),
        };

        let memory = match obj.get("memoria") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_json::from_value::<Vec<MemoryEntry>>(v.clone())
                .map_err(|_| invalid("memoria must be a list of prior solutions"))?,
        };

        let project_id = obj
            .get("projeto_id")
            .or_else(|| obj.get("projetoId"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_PROJECT)
            .to_string();

        Ok(Self {
            original_prompt: original_prompt.to_string(),
            project_context,
            kind,
            problem: problem.to_string(),
            memory,
            project_id,
        })
    }
}

fn invalid(message: &str) -> GatewayError {
    GatewayError::Validation(message.to_string())
}

/// Outcome of one refinement call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementResult {
    pub refined_prompt: String,
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Request body posted to the gateway
#[derive(Debug, Clone, Serialize)]
pub struct RefinementPayload {
    #[serde(rename = "projeto_id")]
    pub project_id: String,
    #[serde(rename = "promptOriginal")]
    pub original_prompt: String,
    #[serde(rename = "contexto")]
    pub project_context: String,
    #[serde(rename = "tipo")]
    pub kind: RefinementKind,
    #[serde(rename = "problema")]
    pub problem: String,
    #[serde(rename = "memoria")]
    pub memory: Vec<MemoryEntry>,
}

/// Success body returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementResponse {
    pub prompt_refinado: String,
    pub tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tipo: RefinementKind,
    pub timestamp: String,
}

impl RefinementResponse {
    pub fn new(result: RefinementResult, kind: RefinementKind) -> Self {
        Self {
            prompt_refinado: result.refined_prompt,
            tokens: result.total_tokens,
            input_tokens: result.input_tokens,
            output_tokens: result.output_tokens,
            tipo: kind,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
