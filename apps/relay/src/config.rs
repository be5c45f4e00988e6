use anyhow::{anyhow, Result};
use std::{env, time::Duration};
use yellowstone_grpc_proto::prelude::CommitmentLevel;

#[derive(Clone, Debug)]
pub struct Config {
    pub geyser_endpoint: String,
    pub geyser_x_token: Option<String>,

    pub include_failed: bool,
    pub commitment: CommitmentLevel,

    /// JSON file holding the pipeline set; re-read on an interval.
    pub pipelines_path: String,
    pub pipelines_refresh: Duration,

    /// Realtime WebSocket bind address; empty disables the bus.
    pub ws_bind: Option<String>,

    pub reconnect_min_backoff: Duration,
    pub reconnect_max_backoff: Duration,
}

fn parse_bool(v: Option<String>, default: bool) -> bool {
    match v.as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") | Some("NO") => false,
        None => default,
        _ => default,
    }
}

fn parse_commitment(s: &str) -> Result<CommitmentLevel> {
    match s.to_lowercase().as_str() {
        "processed" => Ok(CommitmentLevel::Processed),
        "confirmed" => Ok(CommitmentLevel::Confirmed),
        "finalized" => Ok(CommitmentLevel::Finalized),
        other => Err(anyhow!(
            "Invalid COMMITMENT={other}. Use processed|confirmed|finalized"
        )),
    }
}

pub fn load() -> Result<Config> {
    let geyser_endpoint =
        env::var("GEYSER_ENDPOINT").map_err(|_| anyhow!("Missing GEYSER_ENDPOINT"))?;
    let geyser_x_token = env::var("GEYSER_X_TOKEN").ok();

    let include_failed = parse_bool(env::var("INCLUDE_FAILED").ok(), false);

    let commitment =
        parse_commitment(&env::var("COMMITMENT").unwrap_or_else(|_| "processed".to_string()))?;

    let pipelines_path =
        env::var("PIPELINES_PATH").unwrap_or_else(|_| "pipelines.json".to_string());

    let pipelines_refresh = env::var("PIPELINES_REFRESH_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30));

    let ws_bind = match env::var("WS_BIND") {
        Ok(s) if s.trim().is_empty() => None,
        Ok(s) => Some(s),
        Err(_) => Some("127.0.0.1:9020".to_string()),
    };

    Ok(Config {
        geyser_endpoint,
        geyser_x_token,
        include_failed,
        commitment,
        pipelines_path,
        pipelines_refresh,
        ws_bind,
        reconnect_min_backoff: Duration::from_secs(1),
        reconnect_max_backoff: Duration::from_secs(30),
    })
}
