//! HTTP client for the task server.
//!
//! Wraps the two endpoints the engine consumes: the pending-notification
//! list and the one-shot respond action. Every response arrives in the
//! server's `{ code, data?, message? }` envelope where `code == 0` is
//! success.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::EngineConfig;
use crate::errors::PulseError;
use crate::ledger::WireNotification;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid server endpoint '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Server rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

impl PulseError for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidEndpoint { .. } => "API_INVALID_ENDPOINT",
            ApiError::Request(_) => "API_REQUEST_FAILED",
            ApiError::HttpStatus { .. } => "API_HTTP_STATUS",
            ApiError::Rejected { .. } => "API_REJECTED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, ApiError::InvalidEndpoint { .. })
    }
}

/// Server response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn rejection_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "unknown server error".to_string())
    }
}

/// Derive the websocket endpoint from the HTTP server endpoint.
///
/// `http` becomes `ws`, `https` becomes `wss`; any other scheme is
/// rejected.
pub fn ws_endpoint(server_url: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(server_url).map_err(|e| ApiError::InvalidEndpoint {
        url: server_url.to_string(),
        message: e.to_string(),
    })?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(ApiError::InvalidEndpoint {
                url: server_url.to_string(),
                message: format!("unsupported scheme '{}'", other),
            });
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| ApiError::InvalidEndpoint {
            url: server_url.to_string(),
            message: "scheme translation failed".to_string(),
        })?;

    Ok(url)
}

/// Client for the task server's REST surface.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn base(config: &EngineConfig) -> Result<String, ApiError> {
        // Validate once so transport failures are network errors, not
        // malformed-URL panics deep inside reqwest.
        Url::parse(&config.server_url).map_err(|e| ApiError::InvalidEndpoint {
            url: config.server_url.clone(),
            message: e.to_string(),
        })?;
        Ok(config.server_url.trim_end_matches('/').to_string())
    }

    /// Fetch the full pending-notification set for the configured subject.
    pub async fn fetch_notifications(
        &self,
        config: &EngineConfig,
    ) -> Result<Vec<WireNotification>, ApiError> {
        let url = format!("{}/api/users/notifications", Self::base(config)?);

        let response = self
            .http
            .get(&url)
            .query(&[("um_code", config.um_code.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let envelope: Envelope<Vec<WireNotification>> = response.json().await?;
        if envelope.code != 0 {
            return Err(ApiError::Rejected {
                code: envelope.code,
                message: envelope.rejection_message(),
            });
        }

        let items = envelope.data.unwrap_or_default();
        debug!(
            event = "core.api.notifications_fetched",
            count = items.len(),
        );
        Ok(items)
    }

    /// Respond to a task on behalf of the configured subject.
    pub async fn respond_task(&self, config: &EngineConfig, task_id: i64) -> Result<(), ApiError> {
        let url = format!(
            "{}/api/tasks/{}/respond-by-umcode",
            Self::base(config)?,
            task_id
        );

        let response = self
            .http
            .post(&url)
            .query(&[("um_code", config.um_code.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let envelope: Envelope<serde_json::Value> = response.json().await?;
        if envelope.code != 0 {
            return Err(ApiError::Rejected {
                code: envelope.code,
                message: envelope.rejection_message(),
            });
        }

        debug!(event = "core.api.task_responded", task_id = task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_endpoint_translates_http() {
        let url = ws_endpoint("http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5000/");
    }

    #[test]
    fn test_ws_endpoint_translates_https() {
        let url = ws_endpoint("https://tasks.example.com/base").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/base");
    }

    #[test]
    fn test_ws_endpoint_rejects_other_schemes() {
        let err = ws_endpoint("ftp://host").unwrap_err();
        assert_eq!(err.error_code(), "API_INVALID_ENDPOINT");
    }

    #[test]
    fn test_ws_endpoint_rejects_garbage() {
        assert!(ws_endpoint("not a url").is_err());
    }

    #[test]
    fn test_envelope_success_shape() {
        let envelope: Envelope<Vec<WireNotification>> = serde_json::from_str(
            r#"{"code":0,"data":[{"id":1,"title":"t","content":"c","timestamp":"2026-03-01T09:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(envelope.code, 0);
        assert_eq!(envelope.data.unwrap().len(), 1);
    }

    #[test]
    fn test_envelope_rejection_carries_message() {
        let envelope: Envelope<Vec<WireNotification>> =
            serde_json::from_str(r#"{"code":404,"message":"任务不存在"}"#).unwrap();
        assert_eq!(envelope.code, 404);
        assert_eq!(envelope.rejection_message(), "任务不存在");
    }

    #[test]
    fn test_envelope_rejection_without_message() {
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(r#"{"code":1}"#).unwrap();
        assert_eq!(envelope.rejection_message(), "unknown server error");
    }
}
