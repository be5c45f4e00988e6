use anyhow::Result;
use log::{info, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

mod config;
mod control;
mod metrics;
mod stream;
mod ws;

use config::Config;
use engine::{stats, Engine, PipelineIndex, RealtimeBus};
use metrics::Metrics;

fn setup_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cfg: Config = config::load()?;

    info!("relay starting:");
    info!("  endpoint={}", cfg.geyser_endpoint);
    info!("  commitment={:?}", cfg.commitment);
    info!("  include_failed={}", cfg.include_failed);
    info!("  pipelines_path={}", cfg.pipelines_path);
    info!("  pipelines_refresh={:?}", cfg.pipelines_refresh);
    match &cfg.ws_bind {
        Some(bind) => info!("  ws_bind={bind}"),
        None => info!("  realtime push=DISABLED (WS_BIND empty)"),
    }

    // Startup order: catalog and schemas are static, so: decoder registry →
    // realtime bus → initial pipeline set → stream consumption.
    let index = Arc::new(PipelineIndex::new());
    let bus = cfg.ws_bind.as_ref().map(|_| Arc::new(RealtimeBus::new()));
    let engine = Arc::new(Engine::new(index.clone(), bus.clone()));

    if let (Some(bind), Some(bus)) = (cfg.ws_bind.clone(), bus) {
        tokio::spawn(async move {
            if let Err(e) = ws::serve(&bind, bus).await {
                warn!("realtime listener failed: {e:?}");
            }
        });
    }

    match control::sync_once(&cfg.pipelines_path, &index).await {
        Ok(count) => info!("loaded {count} pipeline(s) from {}", cfg.pipelines_path),
        Err(e) => warn!("initial pipeline load failed (starting empty): {e:?}"),
    }
    control::spawn_refresh(cfg.pipelines_path.clone(), index.clone(), cfg.pipelines_refresh);

    let m = Arc::new(Metrics::new());

    // ---- Background metrics logger (prints even when stream is healthy) ----
    {
        let m = m.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(5)).await;
                let (tx_seen, reconnects, connected) = m.snapshot();
                info!(
                    "metrics tx_seen={} reconnects={} connected={} | {}",
                    tx_seen,
                    reconnects,
                    connected,
                    stats().summary()
                );
            }
        });
    }

    let mut backoff = cfg.reconnect_min_backoff;
    let mut last_connected = 0u64;

    info!("starting main loop (Ctrl+C to stop)");

    loop {
        // Allow clean shutdown; in-flight retries are dropped with the task.
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("shutdown signal received (Ctrl+C).");
                break;
            }

            res = async {
                m.reconnects.fetch_add(1, Ordering::Relaxed);
                stream::run_once(&cfg, &engine, &m).await
            } => {
                if let Err(e) = res {
                    warn!("run_once error: {e:?}");
                }

                // Reset backoff if we managed to subscribe at least once since last loop
                let now_connected = m.connected.load(Ordering::Relaxed);
                if now_connected > last_connected {
                    backoff = cfg.reconnect_min_backoff;
                    last_connected = now_connected;
                }

                warn!("disconnected. reconnecting in {backoff:?}");
                sleep(backoff).await;
                backoff = (backoff * 2).min(cfg.reconnect_max_backoff);
            }
        }
    }

    Ok(())
}
