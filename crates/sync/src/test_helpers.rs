// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for engine and facade tests.

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ob_core::ClockSource;
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;

use crate::transport::{Delivery, Transport, TransportError, TransportResult};

type Responder = Box<dyn Fn(&Delivery) -> TransportResult<()> + Send + Sync>;

/// Transport whose answers come from a closure and which records every call.
pub struct MockTransport {
    responder: Responder,
    delivered: Mutex<Vec<Delivery>>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
}

impl MockTransport {
    /// Answers every call with `responder`.
    pub fn new(responder: impl Fn(&Delivery) -> TransportResult<()> + Send + Sync + 'static) -> Self {
        MockTransport {
            responder: Box::new(responder),
            delivered: Mutex::new(Vec::new()),
            gate: None,
            entered: Arc::new(Notify::new()),
        }
    }

    /// Acknowledges everything.
    pub fn accepting() -> Self {
        Self::new(|_| Ok(()))
    }

    /// Fails everything with a 503.
    pub fn unavailable() -> Self {
        Self::new(|_| Err(TransportError::Server { status: 503 }))
    }

    /// Rejects payloads whose `name` is in `names` with a 422; accepts the rest.
    pub fn rejecting(names: &'static [&'static str]) -> Self {
        Self::new(move |d| {
            if names.contains(&payload_name(d)) {
                Err(TransportError::Rejected {
                    status: 422,
                    body: "unprocessable".to_string(),
                })
            } else {
                Ok(())
            }
        })
    }

    /// Makes every call wait for a permit from the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Notified each time a call enters `deliver`.
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }

    /// Deliveries attempted so far, in call order.
    pub fn calls(&self) -> Vec<Delivery> {
        self.delivered.lock().unwrap().clone()
    }

    /// Payload names attempted so far, in call order.
    pub fn names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|d| payload_name(d).to_string())
            .collect()
    }
}

impl Transport for MockTransport {
    fn deliver(
        &self,
        delivery: Delivery,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.delivered.lock().unwrap().push(delivery.clone());
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            (self.responder)(&delivery)
        })
    }
}

/// Returns the `name` field tests put in payloads.
pub fn payload_name(delivery: &Delivery) -> &str {
    delivery.payload["name"].as_str().unwrap_or_default()
}

/// Clock that advances with tokio's time, so paused-time tests move the
/// engine's notion of "now" together with its timers.
pub struct TokioClock {
    base_ms: i64,
    origin: Instant,
}

impl TokioClock {
    pub fn new(base_ms: i64) -> Self {
        TokioClock {
            base_ms,
            origin: Instant::now(),
        }
    }
}

impl ClockSource for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap();
        self.base_ms + elapsed
    }
}
