// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for delivering mutations to the remote API.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP delivery for production ([`HttpTransport`])
//! - Scripted transports for unit testing
//!
//! The wire contract is one `POST` per record with `Authorization: <credential>`
//! and the payload as the JSON body. 2xx is success, 4xx a permanent rejection,
//! 5xx or a network failure is transient.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};

/// Header carrying the mutation id so the server can drop re-sent duplicates.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Longest rejection body kept in `last_error`.
const MAX_ERROR_BODY: usize = 512;

/// Failure of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server rejected the payload (4xx).
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Server-side failure (5xx).
    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    /// Rate limited or request timed out server-side (429/408).
    #[error("throttled: HTTP {status}")]
    Throttled { status: u16 },

    /// Status outside the 2xx/4xx/5xx classes.
    #[error("unexpected response: HTTP {status}")]
    Unexpected { status: u16 },

    /// The request could not be built (e.g. a credential that is not a valid header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, DNS, or TLS failure.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the request timeout.
    #[error("request timed out")]
    Timeout,
}

impl TransportError {
    /// Deterministic failures that retrying cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            TransportError::Rejected { .. }
                | TransportError::Unexpected { .. }
                | TransportError::InvalidRequest(_)
        )
    }

    /// Failures that suggest the host is actually offline.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TransportError::Network(_) | TransportError::Timeout)
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Classifies a response status into success or a delivery failure.
pub fn classify_status(status: u16, body: &str) -> TransportResult<()> {
    match status {
        200..=299 => Ok(()),
        408 | 429 => Err(TransportError::Throttled { status }),
        400..=499 => Err(TransportError::Rejected {
            status,
            body: truncate(body, MAX_ERROR_BODY),
        }),
        500..=599 => Err(TransportError::Server { status }),
        _ => Err(TransportError::Unexpected { status }),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// One delivery request.
#[derive(Clone, PartialEq)]
pub struct Delivery {
    pub id: String,
    pub resource_kind: String,
    pub payload: serde_json::Value,
    pub credential: String,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("resource_kind", &self.resource_kind)
            .field("payload", &self.payload)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl From<&ob_core::PendingMutation> for Delivery {
    fn from(m: &ob_core::PendingMutation) -> Self {
        Delivery {
            id: m.id.clone(),
            resource_kind: m.resource_kind.clone(),
            payload: m.payload.clone(),
            credential: m.credential.clone(),
        }
    }
}

/// Transport trait for delivering one mutation.
///
/// Implementations must not retry internally; retry policy belongs to the engine.
pub trait Transport: Send + Sync {
    /// Sends one mutation and reports whether the remote acknowledged it.
    fn deliver(
        &self,
        delivery: Delivery,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn deliver(
        &self,
        delivery: Delivery,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        (**self).deliver(delivery)
    }
}

/// HTTP transport implementation using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    remote: RemoteConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport for the given remote.
    pub fn new(remote: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(remote.timeout())
            .user_agent(concat!("outbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(HttpTransport { client, remote })
    }

    /// Returns the remote this transport posts to.
    pub fn remote(&self) -> &RemoteConfig {
        &self.remote
    }
}

impl Transport for HttpTransport {
    fn deliver(
        &self,
        delivery: Delivery,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let url = self.remote.endpoint_url(&delivery.resource_kind);

            let response = self
                .client
                .post(&url)
                .header(AUTHORIZATION, delivery.credential.as_str())
                .header(IDEMPOTENCY_HEADER, delivery.id.as_str())
                .json(&delivery.payload)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let body = if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                response.text().await.unwrap_or_default()
            } else {
                String::new()
            };
            classify_status(status.as_u16(), &body)
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
