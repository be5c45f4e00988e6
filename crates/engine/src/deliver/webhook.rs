//! Generic signed HTTP webhook destination.
//!
//! Body is the output data plus a `_meta` envelope. Optional HMAC-SHA256
//! signing of the serialized body, hex-encoded under a `sha256=` prefix.
//! Bounded retry: 4xx aborts immediately, 5xx and transport errors retry
//! with linear or exponential backoff until the attempt budget is spent.

use std::time::Duration;

use hmac::{Hmac, Mac};
use log::{debug, warn};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::StatusCode;
use schema::{Backoff, OutputRecord, WebhookDestination};
use serde_json::json;
use sha2::Sha256;
use tokio::time::sleep;

use super::DeliveryResult;

pub const USER_AGENT: &str = "tada-relay/0.1";
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Tada-Signature";

/// `sha256=` + lowercase hex HMAC-SHA256 of the body.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Sleep before retry `attempt` (1-based count of failures so far).
pub fn backoff_delay(backoff: Backoff, attempt: u32) -> Duration {
    let millis = match backoff {
        Backoff::Linear => attempt as u64 * 1000,
        Backoff::Exponential => 2u64.saturating_pow(attempt.saturating_sub(1)) * 1000,
    };
    Duration::from_millis(millis)
}

/// Non-2xx classification: server errors retry, client errors abort.
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
}

fn build_body(output: &OutputRecord) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    for (key, value) in &output.data {
        body.insert(key.clone(), value.to_json());
    }
    body.insert(
        "_meta".to_string(),
        json!({
            "pipelineId": output.pipeline_id,
            "eventId": output.id,
            "timestamp": output.timestamp,
        }),
    );
    serde_json::Value::Object(body)
}

pub(crate) async fn send(
    http: &reqwest::Client,
    config: &WebhookDestination,
    output: &OutputRecord,
) -> DeliveryResult {
    let body = match serde_json::to_vec(&build_body(output)) {
        Ok(body) => body,
        Err(e) => return DeliveryResult::failure("webhook", format!("serialize: {e}")),
    };

    let attempts = config.retry.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let mut request = http
            .post(&config.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .header("X-Tada-Pipeline-Id", output.pipeline_id.as_str())
            .header("X-Tada-Event-Id", output.id.as_str())
            .header("X-Tada-Timestamp", output.timestamp.to_string());

        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => request = request.header(name, value),
                _ => warn!("skipping invalid webhook header `{name}`"),
            }
        }

        if let Some(secret) = &config.secret {
            let header = config
                .signature_header
                .as_deref()
                .unwrap_or(DEFAULT_SIGNATURE_HEADER);
            request = request.header(header, sign(secret, &body));
        }

        match request.body(body.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(
                        "webhook delivered pipeline={} attempt={}/{}",
                        output.pipeline_id, attempt, attempts
                    );
                    return DeliveryResult::success("webhook");
                }
                if !is_retryable(status) {
                    // Client error: the request itself is wrong, retrying
                    // cannot help.
                    return DeliveryResult::failure(
                        "webhook",
                        format!("non-retryable status {status}"),
                    );
                }
                last_error = format!("status {status}");
            }
            Err(e) => {
                last_error = format!("transport: {e}");
            }
        }

        if attempt < attempts {
            let delay = backoff_delay(config.retry.backoff, attempt);
            warn!(
                "webhook attempt {}/{} failed pipeline={} ({last_error}), retrying in {:?}",
                attempt, attempts, output.pipeline_id, delay
            );
            sleep(delay).await;
        }
    }

    DeliveryResult::failure("webhook", format!("{attempts} attempts exhausted: {last_error}"))
}
