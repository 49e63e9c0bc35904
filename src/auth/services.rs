use std::fmt;

/// External services whose credentials ContextForge stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Anthropic,
    Supabase,
}

impl Service {
    pub fn all() -> &'static [Service] {
        &[Service::Anthropic, Service::Supabase]
    }

    /// Env var holding the secret for this service
    pub fn key_env_var(&self) -> &'static str {
        match self {
            Service::Anthropic => "ANTHROPIC_API_KEY",
            Service::Supabase => "SUPABASE_SERVICE_ROLE_KEY",
        }
    }

    /// Env var holding the endpoint override for this service
    pub fn endpoint_env_var(&self) -> &'static str {
        match self {
            Service::Anthropic => "CONTEXTFORGE_LLM_ENDPOINT",
            Service::Supabase => "SUPABASE_URL",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Anthropic => "Anthropic (Claude)",
            Service::Supabase => "Supabase (datastore)",
        }
    }

    /// Whether the service is unusable without an explicit endpoint
    pub fn requires_endpoint(&self) -> bool {
        matches!(self, Service::Supabase)
    }

    pub fn from_str_loose(s: &str) -> Option<Service> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" | "llm" => Some(Service::Anthropic),
            "supabase" | "db" | "datastore" => Some(Service::Supabase),
            _ => None,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Anthropic => write!(f, "anthropic"),
            Service::Supabase => write!(f, "supabase"),
        }
    }
}
