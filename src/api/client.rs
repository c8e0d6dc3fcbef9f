// ABOUTME: Generic backend API client keyed by domain and operation name
// Wraps every response in the platform envelope and feeds failures to the
// global error notifier unless a call opts out

use crate::models::ContainerInfo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Backend API domains. Every operation lives under exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Admin,
    User,
    Team,
    System,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Admin => "admin",
            Domain::User => "user",
            Domain::Team => "team",
            Domain::System => "system",
        }
    }
}

/// Per-call configuration. `skip_global_error` keeps a failure out of the
/// global toast channel so the caller can handle it locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    pub skip_global_error: bool,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Inner payload of every backend response: the records plus an optional
/// total for paginated listings.
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    pub data: T,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Full response envelope handed back to callers.
#[derive(Debug)]
pub struct ApiEnvelope<T> {
    pub data: Paged<T>,
    pub status: u16,
}

/// Request/response client for everything outside the exec bridge. The
/// bridge itself only ever uses this to learn which pods and containers
/// exist; all CRUD traffic is opaque to the core.
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
    error_tx: mpsc::UnboundedSender<String>,
}

impl ApiClient {
    /// Returns the client and the stream of globally surfaced error
    /// messages, which the app drains into toasts.
    pub fn new(
        base: impl Into<String>,
        token: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        (
            Self {
                http: reqwest::Client::new(),
                base: base.into(),
                token,
                error_tx,
            },
            error_rx,
        )
    }

    /// Invoke `POST /api/{domain}/{op}` with a JSON payload.
    pub async fn call<P, T>(
        &self,
        domain: Domain,
        op: &str,
        payload: &P,
        opts: CallOptions,
    ) -> Result<ApiEnvelope<T>, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let result = self.call_inner(domain, op, payload).await;
        if let Err(e) = &result {
            if opts.skip_global_error {
                debug!(domain = domain.as_str(), op, error = %e, "api call failed (handled locally)");
            } else {
                let _ = self.error_tx.send(e.to_string());
            }
        }
        result
    }

    async fn call_inner<P, T>(
        &self,
        domain: Domain,
        op: &str,
        payload: &P,
    ) -> Result<ApiEnvelope<T>, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!(
            "{}/api/{}/{}",
            self.base.trim_end_matches('/'),
            domain.as_str(),
            op
        );
        let mut request = self.http.post(&url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, message });
        }

        let data: Paged<T> = response.json().await?;
        Ok(ApiEnvelope { data, status })
    }

    /// Running challenge containers, with the identifiers the bridge needs
    /// to open an exec session.
    pub async fn list_containers(&self) -> Result<Vec<ContainerInfo>, ApiError> {
        let envelope = self
            .call(
                Domain::Admin,
                "container/list",
                &serde_json::json!({}),
                CallOptions::default(),
            )
            .await?;
        Ok(envelope.data.data)
    }
}
