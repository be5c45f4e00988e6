use anyhow::Result;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tonic::transport::ClientTlsConfig;
use yellowstone_grpc_client::GeyserGrpcClient;
use yellowstone_grpc_proto::prelude::{
    subscribe_update::UpdateOneof, SubscribeRequest, SubscribeRequestFilterBlocksMeta,
    SubscribeRequestFilterTransactions, SubscribeUpdateTransaction,
};

use engine::Engine;
use schema::{InnerInstructions, Instruction, TokenBalance, TransactionEnvelope, PROGRAMS};

use crate::{config::Config, metrics::Metrics};

/// Slots worth of block times to remember; transactions reference the slot
/// they landed in.
const BLOCK_TIME_CACHE: usize = 1024;

pub async fn run_once(cfg: &Config, engine: &Arc<Engine>, m: &Metrics) -> Result<()> {
    let mut client = GeyserGrpcClient::build_from_shared(cfg.geyser_endpoint.clone())?
        .x_token(cfg.geyser_x_token.clone())?
        .tls_config(ClientTlsConfig::new().with_native_roots())?
        .connect()
        .await?;

    let (mut sub_tx, mut sub_rx) = client.subscribe().await?;

    let mut tx_filters = HashMap::new();
    tx_filters.insert(
        "tx_filter".to_string(),
        SubscribeRequestFilterTransactions {
            vote: Some(false),
            failed: Some(cfg.include_failed),
            account_required: PROGRAMS.iter().map(|p| p.address.to_string()).collect(),
            ..Default::default()
        },
    );

    let mut block_filters = HashMap::new();
    block_filters.insert(
        "block_meta".to_string(),
        SubscribeRequestFilterBlocksMeta::default(),
    );

    sub_tx
        .send(SubscribeRequest {
            transactions: tx_filters,
            blocks_meta: block_filters,
            commitment: Some(cfg.commitment as i32),
            ..Default::default()
        })
        .await?;

    info!("Subscribed. Streaming…");
    m.connected
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    let mut block_times: BTreeMap<u64, i64> = BTreeMap::new();
    let mut latest_block_time: Option<i64> = None;

    while let Some(msg) = sub_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("stream error: {e:?} (will reconnect)");
                break;
            }
        };

        match msg.update_oneof {
            Some(UpdateOneof::BlockMeta(meta)) => {
                if let Some(ts) = meta.block_time {
                    block_times.insert(meta.slot, ts.timestamp);
                    latest_block_time = Some(ts.timestamp);
                    while block_times.len() > BLOCK_TIME_CACHE {
                        block_times.pop_first();
                    }
                }
            }
            Some(UpdateOneof::Transaction(tx)) => {
                m.tx_seen.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

                let block_time = block_times.get(&tx.slot).copied().or(latest_block_time);
                let Some(envelope) = envelope_from_update(tx, block_time) else {
                    continue;
                };

                if !cfg.include_failed && !envelope.is_success {
                    continue;
                }

                // Distinct transactions process concurrently; ordering across
                // slots is not guaranteed through the dispatcher.
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.process(&envelope).await;
                });
            }
            Some(UpdateOneof::Ping(_)) => {}
            _ => {}
        }
    }

    Ok(())
}

/// Convert a geyser transaction update into the envelope the decoders read.
/// The full account-key list is `accountKeys + loadedWritable + loadedReadonly`.
fn envelope_from_update(
    tx: SubscribeUpdateTransaction,
    block_time: Option<i64>,
) -> Option<TransactionEnvelope> {
    let slot = tx.slot;
    let tx_info = tx.transaction?;
    let signature = bs58::encode(&tx_info.signature).into_string();
    let meta = tx_info.meta;
    let message = tx_info.transaction?.message?;

    let mut account_keys: Vec<String> = message
        .account_keys
        .iter()
        .map(|k| bs58::encode(k).into_string())
        .collect();
    if let Some(meta) = meta.as_ref() {
        account_keys.extend(
            meta.loaded_writable_addresses
                .iter()
                .chain(meta.loaded_readonly_addresses.iter())
                .map(|k| bs58::encode(k).into_string()),
        );
    }

    let instructions = message
        .instructions
        .iter()
        .map(|ix| Instruction {
            program_index: ix.program_id_index as usize,
            accounts: ix.accounts.iter().map(|&i| i as usize).collect(),
            data: ix.data.clone(),
        })
        .collect();

    let inner_instructions = meta
        .as_ref()
        .map(|meta| {
            meta.inner_instructions
                .iter()
                .map(|group| InnerInstructions {
                    outer_index: group.index as usize,
                    instructions: group
                        .instructions
                        .iter()
                        .map(|ix| Instruction {
                            program_index: ix.program_id_index as usize,
                            accounts: ix.accounts.iter().map(|&i| i as usize).collect(),
                            data: ix.data.clone(),
                        })
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    let convert_balances =
        |balances: &[yellowstone_grpc_proto::prelude::TokenBalance]| -> Vec<TokenBalance> {
            balances
                .iter()
                .map(|b| TokenBalance {
                    account_index: b.account_index,
                    mint: b.mint.clone(),
                    owner: (!b.owner.is_empty()).then(|| b.owner.clone()),
                    amount: b
                        .ui_token_amount
                        .as_ref()
                        .map(|a| a.amount.clone())
                        .unwrap_or_else(|| "0".to_string()),
                    decimals: b.ui_token_amount.as_ref().map(|a| a.decimals as u8),
                })
                .collect()
        };

    let (is_success, pre_token_balances, post_token_balances, log_messages) = match meta.as_ref() {
        Some(meta) => (
            meta.err.is_none(),
            convert_balances(&meta.pre_token_balances),
            convert_balances(&meta.post_token_balances),
            meta.log_messages.clone(),
        ),
        None => (true, Vec::new(), Vec::new(), Vec::new()),
    };

    Some(TransactionEnvelope {
        signature,
        slot,
        block_time,
        is_success,
        account_keys,
        instructions,
        inner_instructions,
        pre_token_balances,
        post_token_balances,
        log_messages,
    })
}
