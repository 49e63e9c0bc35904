use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM returned {status}: {message}")]
    LlmStatus { status: u16, message: String },

    #[error("Gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("Datastore error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Invalid problem description: {0}")]
    InvalidProblem(String),

    #[error("History error: {0}")]
    History(String),
}

impl ForgeError {
    /// Upstream HTTP status carried by this error, if any
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ForgeError::LlmStatus { status, .. } => Some(*status),
            ForgeError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
