use super::{ErrorBody, RefinementPayload, RefinementResponse};
use crate::error::{ForgeError, Result};

/// Path the gateway serves refinements on
pub const REFINE_PATH: &str = "/api/refinar-prompt";

/// Calls a running refinement gateway over HTTP
pub struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, REFINE_PATH)
    }

    pub async fn refine(&self, payload: &RefinementPayload) -> Result<RefinementResponse> {
        let response = self.client.post(self.url()).json(payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(ErrorBody {
                    error,
                    details: Some(details),
                }) => format!("{} ({})", error, details),
                Ok(ErrorBody { error, details: None }) => error,
                Err(_) => text,
            };
            return Err(ForgeError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
