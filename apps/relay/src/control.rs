//! Control-plane shim: load pipeline definitions from a JSON file at startup
//! and re-sync on an interval. Changed pipelines are re-upserted, vanished
//! ones removed; a definition the index rejects is skipped with a warning.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use schema::Pipeline;
use tokio::time::sleep;

use engine::PipelineIndex;

pub async fn sync_once(path: &str, index: &PipelineIndex) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let pipelines: Vec<Pipeline> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let mut kept: HashSet<String> = HashSet::new();
    let mut upserted = 0usize;

    for pipeline in pipelines {
        let id = pipeline.id.clone();
        match index.upsert(pipeline) {
            Ok(()) => {
                kept.insert(id);
                upserted += 1;
            }
            Err(e) => warn!("rejecting pipeline definition: {e}"),
        }
    }

    for id in index.ids() {
        if !kept.contains(&id) {
            index.remove(&id);
        }
    }

    Ok(upserted)
}

pub fn spawn_refresh(path: String, index: Arc<PipelineIndex>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match sync_once(&path, &index).await {
                Ok(count) => info!("pipeline re-sync: {count} active definitions"),
                Err(e) => warn!("pipeline re-sync failed: {e:?}"),
            }
        }
    });
}
