use std::path::{Path, PathBuf};

use crate::auth::services::Service;
use crate::auth::AuthStore;
use crate::error::{ForgeError, Result};

/// Model used for every refinement unless overridden
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.anthropic.com";
/// Output bound for a single refinement completion
pub const REFINE_MAX_TOKENS: u32 = 2000;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";

/// Accepted requests per client inside one window
pub const RATE_LIMIT_REQUESTS: usize = 20;
pub const RATE_LIMIT_WINDOW_MS: u64 = 60 * 1000;

/// Prior solutions fetched per refinement
pub const MEMORY_FETCH_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct DatastoreSettings {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub gateway_url: String,
    pub rate_limit_requests: usize,
    pub rate_limit_window_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Local state: history, JSONL store
    pub data_dir: PathBuf,
    /// One `<project>.json` per project context
    pub contexts_dir: PathBuf,
    pub llm: LlmSettings,
    /// Hosted datastore; `None` means the local JSONL store is used
    pub datastore: Option<DatastoreSettings>,
    pub server: ServerSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ForgeError::Config("Could not determine home directory".into()))?;
        let auth = AuthStore::load()?;
        Self::resolve(&home, &auth, |key| std::env::var(key).ok())
    }

    /// Resolve settings with precedence: env > auth.json > defaults
    pub fn resolve<F>(home: &Path, auth: &AuthStore, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let data_dir = env("CONTEXTFORGE_HOME")
            .map(|p| expand_path(&p))
            .unwrap_or_else(|| home.join(".contextforge"));
        let contexts_dir = env("CONTEXTFORGE_CONTEXTS")
            .map(|p| expand_path(&p))
            .unwrap_or_else(|| data_dir.join("contexts"));

        let anthropic = auth.get(Service::Anthropic);
        let llm = LlmSettings {
            endpoint: env(Service::Anthropic.endpoint_env_var())
                .or_else(|| anthropic.and_then(|c| c.endpoint.clone()))
                .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: env("CONTEXTFORGE_LLM_MODEL")
                .or_else(|| anthropic.and_then(|c| c.model.clone()))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: env(Service::Anthropic.key_env_var())
                .or_else(|| anthropic.map(|c| c.key.clone())),
            max_tokens: REFINE_MAX_TOKENS,
        };

        let supabase = auth.get(Service::Supabase);
        let datastore_url = env(Service::Supabase.endpoint_env_var())
            .or_else(|| supabase.and_then(|c| c.endpoint.clone()));
        let datastore_key =
            env(Service::Supabase.key_env_var()).or_else(|| supabase.map(|c| c.key.clone()));
        let datastore = match (datastore_url, datastore_key) {
            (Some(url), Some(service_key)) => Some(DatastoreSettings {
                url: url.trim_end_matches('/').to_string(),
                service_key,
            }),
            (Some(_), None) => {
                return Err(ForgeError::Config(format!(
                    "{} is set but {} is missing",
                    Service::Supabase.endpoint_env_var(),
                    Service::Supabase.key_env_var()
                )))
            }
            _ => None,
        };

        let server = ServerSettings {
            bind: env("CONTEXTFORGE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            gateway_url: env("CONTEXTFORGE_GATEWAY_URL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            rate_limit_requests: parse_number(
                env("CONTEXTFORGE_RATE_LIMIT"),
                "CONTEXTFORGE_RATE_LIMIT",
                RATE_LIMIT_REQUESTS,
            )?,
            rate_limit_window_ms: parse_number(
                env("CONTEXTFORGE_RATE_WINDOW_MS"),
                "CONTEXTFORGE_RATE_WINDOW_MS",
                RATE_LIMIT_WINDOW_MS,
            )?,
        };

        Ok(Config {
            data_dir,
            contexts_dir,
            llm,
            datastore,
            server,
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(crate::history::HISTORY_FILE)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ForgeError::Config(format!("{} must be a number, got '{}'", name, value))),
        None => Ok(default),
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
