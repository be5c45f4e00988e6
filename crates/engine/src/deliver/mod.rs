//! Delivery dispatcher: fans an output record out to every enabled
//! destination, independently and in parallel. Per-destination failure never
//! blocks the others.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use schema::{Destinations, OutputRecord};
use serde::Serialize;

pub mod discord;
pub mod realtime;
pub mod telegram;
pub mod webhook;

pub use realtime::{push_payload, PushMessage, RealtimeBus};
pub use webhook::{backoff_delay, is_retryable, sign};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub destination: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn success(destination: &'static str) -> Self {
        Self {
            destination,
            success: true,
            error: None,
        }
    }

    pub fn failure(destination: &'static str, error: impl Into<String>) -> Self {
        Self {
            destination,
            success: false,
            error: Some(error.into()),
        }
    }
}

pub struct Dispatcher {
    http: reqwest::Client,
    bus: Option<Arc<RealtimeBus>>,
}

impl Dispatcher {
    pub fn new(bus: Option<Arc<RealtimeBus>>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("reqwest");
        Self { http, bus }
    }

    /// Deliver one output to every enabled destination concurrently and
    /// return all per-destination results.
    pub async fn deliver(
        &self,
        output: &OutputRecord,
        destinations: &Destinations,
    ) -> Vec<DeliveryResult> {
        let mut futures: Vec<BoxFuture<'_, DeliveryResult>> = Vec::new();

        if let Some(config) = destinations.discord.as_ref().filter(|c| c.enabled) {
            futures.push(discord::send(&self.http, config, output).boxed());
        }
        if let Some(config) = destinations.telegram.as_ref().filter(|c| c.enabled) {
            futures.push(telegram::send(&self.http, config, output).boxed());
        }
        if let Some(config) = destinations.webhook.as_ref().filter(|c| c.enabled) {
            futures.push(webhook::send(&self.http, config, output).boxed());
        }
        if destinations
            .websocket
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(false)
        {
            futures.push(self.publish_realtime(output).boxed());
        }

        futures::future::join_all(futures).await
    }

    async fn publish_realtime(&self, output: &OutputRecord) -> DeliveryResult {
        match &self.bus {
            Some(bus) => {
                bus.publish(&output.pipeline_id, push_payload(output));
                DeliveryResult::success("websocket")
            }
            None => DeliveryResult::failure("websocket", "realtime bus not initialized"),
        }
    }
}
