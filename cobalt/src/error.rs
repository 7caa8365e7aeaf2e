use thiserror::Error;

/// Unified error type for the Cobalt client.
#[derive(Debug, Error)]
pub enum CobaltError {
    /// Errors from the gateway (WebSocket, sharding).
    #[error("gateway error: {0}")]
    Gateway(#[from] cobalt_gateway::GatewayError),

    /// Errors from the HTTP client (REST API).
    #[error("HTTP error: {0}")]
    Http(#[from] cobalt_http::HttpError),
}

impl CobaltError {
    /// Whether the failure is an authentication problem that no retry can
    /// fix: stop the process and fix the token or intents.
    pub fn is_authentication(&self) -> bool {
        match self {
            CobaltError::Gateway(e) => {
                matches!(e, cobalt_gateway::GatewayError::AuthenticationFailed)
            }
            CobaltError::Http(e) => e.is_authentication(),
        }
    }
}
