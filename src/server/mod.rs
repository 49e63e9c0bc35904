//! HTTP surface for the refinement gateway.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::Result;
use crate::llm::client::LlmClient;
use crate::refine::client::REFINE_PATH;
use crate::refine::{ErrorBody, Gateway, GatewayError, SlidingWindowLimiter};
use crate::store;

/// Request bodies larger than this are treated as unreadable
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Client id used when neither proxy headers nor a peer address are known
pub const UNKNOWN_CLIENT: &str = "unknown";

pub fn router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            REFINE_PATH,
            post(refine_prompt)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(cors)
        .with_state(gateway)
}

/// Gateway wired from config: Anthropic client, configured store, in-memory limiter
pub fn build_gateway(config: &Config) -> Arc<Gateway> {
    if config.llm.api_key.is_none() {
        tracing::warn!("no Anthropic API key configured; refinements will fail with 401");
    }

    let llm = Arc::new(LlmClient::new(&config.llm));
    let limiter = Arc::new(SlidingWindowLimiter::new(
        config.server.rate_limit_requests,
        config.server.rate_limit_window_ms,
    ));

    Arc::new(Gateway::new(llm, store::open(config), limiter).with_max_tokens(config.llm.max_tokens))
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let listener = TcpListener::bind(&config.server.bind).await?;
    run(listener, build_gateway(config), shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn run<F>(listener: TcpListener, gateway: Arc<Gateway>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("refinement gateway listening on http://{}{}", addr, REFINE_PATH);

    axum::serve(
        listener,
        router(gateway).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

async fn refine_prompt(State(gateway): State<Arc<Gateway>>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_id(request.headers(), peer.as_ref());

    let bytes = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, client = %client, "failed to read request body");
            let err = match gateway.admit(&client) {
                Err(limited) => limited,
                Ok(()) => GatewayError::UnreadableBody(e.to_string()),
            };
            return error_response(&err);
        }
    };
    // Unparseable JSON still counts against the rate limit before failing validation
    let body = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);

    match gateway.refine(&body, &client).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            error: "Method not allowed".into(),
            details: None,
        }),
    )
        .into_response()
}

fn error_response(err: &GatewayError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.body())).into_response()
}

/// Identify the caller: first `x-forwarded-for` hop, then `x-real-ip`,
/// then the socket peer.
pub fn client_id(headers: &HeaderMap, peer: Option<&SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header_value("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header_value("x-real-ip") {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
