// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability probe for the remote host.
//!
//! Stands in for a platform reachability signal: the remote counts as
//! reachable when a TCP connection to its host and port succeeds within the
//! timeout.

use std::time::Duration;

use reqwest::Url;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl Probe {
    /// Builds a probe for the host and port of `url`.
    pub fn for_url(url: &str, timeout: Duration) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;
        Ok(Probe {
            host,
            port,
            timeout,
        })
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if the remote accepted a TCP connection in time.
    pub async fn check(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let reachable = matches!(tokio::time::timeout(self.timeout, connect).await, Ok(Ok(_)));
        debug!(target = %self.target(), reachable, "reachability probe");
        reachable
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
