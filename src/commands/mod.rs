pub mod auth;
pub mod compose;
pub mod feedback;
pub mod history;
pub mod refine;
pub mod serve;

use contextforge::error::{ForgeError, Result};

/// Single-threaded runtime for commands that make a handful of requests
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ForgeError::Config(format!("tokio runtime: {}", e)))
}
