use contextforge::config::Config;
use contextforge::error::{ForgeError, Result};
use contextforge::server;

pub fn cmd_serve(config: &Config, bind: Option<String>) -> Result<()> {
    let mut config = config.clone();
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    tracing::info!(
        model = %config.llm.model,
        rate_limit = config.server.rate_limit_requests,
        window_ms = config.server.rate_limit_window_ms,
        datastore = if config.datastore.is_some() { "supabase" } else { "local" },
        "starting gateway"
    );

    tokio::runtime::Runtime::new()
        .map_err(|e| ForgeError::Config(format!("tokio runtime: {}", e)))?
        .block_on(server::serve(&config))
}
