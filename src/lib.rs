// Library interface for contextforge

pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod history;
pub mod llm;
pub mod refine;
pub mod renderer;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{ForgeError, Result};
