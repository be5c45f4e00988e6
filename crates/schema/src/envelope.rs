//! TransactionEnvelope: the opaque transaction carrier decoders read.
//!
//! All relevant facts are extracted once per transaction; decoders receive
//! this struct and produce events without side effects. Handles both legacy
//! and v0 transactions with address lookup tables (the full account-key
//! ordering is `accountKeys + loadedAddresses.writable + loadedAddresses.readonly`).

use serde_json::Value as Json;

/// A single instruction, outer or inner. `accounts` are indices into the
/// envelope's full account-key list; `data` is the raw instruction payload.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub program_index: usize,
    pub accounts: Vec<usize>,
    pub data: Vec<u8>,
}

/// Inner instructions grouped under the outer instruction that spawned them.
#[derive(Debug, Clone)]
pub struct InnerInstructions {
    pub outer_index: usize,
    pub instructions: Vec<Instruction>,
}

/// Token balance for a specific account (pre- or post-transaction).
#[derive(Debug, Clone)]
pub struct TokenBalance {
    pub account_index: u32,
    pub mint: String,
    pub owner: Option<String>,
    /// Amount in base units, kept as a string for precision.
    pub amount: String,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionEnvelope {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub is_success: bool,
    /// Fee-payer-first full account keys, including lookup-table loaded
    /// addresses.
    pub account_keys: Vec<String>,
    /// Top-level instructions.
    pub instructions: Vec<Instruction>,
    pub inner_instructions: Vec<InnerInstructions>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
}

impl TransactionEnvelope {
    /// Fee payer is the first account key.
    pub fn fee_payer(&self) -> &str {
        self.account_keys.first().map(String::as_str).unwrap_or("")
    }

    pub fn account_at(&self, index: usize) -> Option<&str> {
        self.account_keys.get(index).map(String::as_str)
    }

    /// Whether an address appears anywhere in the full account-key set.
    pub fn involves(&self, address: &str) -> bool {
        self.account_keys.iter().any(|k| k == address)
    }

    pub fn program_of(&self, ix: &Instruction) -> Option<&str> {
        self.account_at(ix.program_index)
    }

    /// First outer instruction whose program is `address`.
    pub fn primary_instruction(&self, address: &str) -> Option<&Instruction> {
        self.instructions
            .iter()
            .find(|ix| self.program_of(ix) == Some(address))
    }

    /// All instructions (outer then inner groups, in execution order) whose
    /// program is `address`.
    pub fn instructions_for(&self, address: &str) -> Vec<&Instruction> {
        let mut out: Vec<&Instruction> = self
            .instructions
            .iter()
            .filter(|ix| self.program_of(ix) == Some(address))
            .collect();
        for group in &self.inner_instructions {
            out.extend(
                group
                    .instructions
                    .iter()
                    .filter(|ix| self.program_of(ix) == Some(address)),
            );
        }
        out
    }

    /// Build an envelope from an RPC `getTransaction` JSON object. Accepts
    /// both raw and jsonParsed encodings, legacy and v0 transactions.
    pub fn from_rpc_json(tx: &Json, signature: &str, slot: u64) -> Self {
        let block_time = tx.get("blockTime").and_then(|v| v.as_i64());
        let is_success = tx.pointer("/meta/err").map(|e| e.is_null()).unwrap_or(false);

        let account_keys = resolve_full_account_keys(tx);

        let instructions = tx
            .pointer("/transaction/message/instructions")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|ix| parse_instruction(ix, &account_keys))
                    .collect()
            })
            .unwrap_or_default();

        let inner_instructions = tx
            .pointer("/meta/innerInstructions")
            .and_then(|v| v.as_array())
            .map(|groups| {
                groups
                    .iter()
                    .map(|group| {
                        let outer_index =
                            group.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                        let instructions = group
                            .get("instructions")
                            .and_then(|v| v.as_array())
                            .map(|arr| {
                                arr.iter()
                                    .filter_map(|ix| parse_instruction(ix, &account_keys))
                                    .collect()
                            })
                            .unwrap_or_default();
                        InnerInstructions {
                            outer_index,
                            instructions,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let pre_token_balances = parse_token_balances(tx, "/meta/preTokenBalances");
        let post_token_balances = parse_token_balances(tx, "/meta/postTokenBalances");

        let log_messages = tx
            .pointer("/meta/logMessages")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            signature: signature.to_string(),
            slot,
            block_time,
            is_success,
            account_keys,
            instructions,
            inner_instructions,
            pre_token_balances,
            post_token_balances,
            log_messages,
        }
    }
}

/// Merge `message.accountKeys` with `meta.loadedAddresses` for v0
/// transactions. Handles both jsonParsed (objects with a `pubkey` field) and
/// raw (plain strings) key formats.
fn resolve_full_account_keys(tx: &Json) -> Vec<String> {
    let mut account_keys: Vec<String> = tx
        .pointer("/transaction/message/accountKeys")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| {
                    if x.is_string() {
                        x.as_str().map(|s| s.to_string())
                    } else {
                        x.get("pubkey").and_then(|p| p.as_str()).map(|s| s.to_string())
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(loaded) = tx.pointer("/meta/loadedAddresses") {
        for table in ["writable", "readonly"] {
            if let Some(addrs) = loaded.get(table).and_then(|v| v.as_array()) {
                for addr in addrs {
                    if let Some(s) = addr.as_str() {
                        account_keys.push(s.to_string());
                    }
                }
            }
        }
    }

    account_keys
}

fn parse_instruction(ix: &Json, account_keys: &[String]) -> Option<Instruction> {
    let program_index = if let Some(idx) = ix.get("programIdIndex").and_then(|v| v.as_u64()) {
        idx as usize
    } else if let Some(pid) = ix.get("programId").and_then(|v| v.as_str()) {
        // jsonParsed carries the resolved address instead of an index.
        account_keys.iter().position(|k| k == pid)?
    } else {
        return None;
    };

    let accounts: Vec<usize> = ix
        .get("accounts")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_u64().map(|n| n as usize))
                .collect()
        })
        .unwrap_or_default();

    let data = ix
        .get("data")
        .and_then(|v| v.as_str())
        .and_then(|s| bs58::decode(s).into_vec().ok())
        .unwrap_or_default();

    Some(Instruction {
        program_index,
        accounts,
        data,
    })
}

fn parse_token_balances(tx: &Json, path: &str) -> Vec<TokenBalance> {
    tx.pointer(path)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|b| {
                    let account_index = b.get("accountIndex")?.as_u64()? as u32;
                    let mint = b.get("mint")?.as_str()?.to_string();
                    let owner = b.get("owner").and_then(|v| v.as_str()).map(|s| s.to_string());
                    let amount = b
                        .pointer("/uiTokenAmount/amount")
                        .and_then(|v| v.as_str())
                        .unwrap_or("0")
                        .to_string();
                    let decimals = b
                        .pointer("/uiTokenAmount/decimals")
                        .and_then(|v| v.as_u64())
                        .map(|d| d as u8);

                    Some(TokenBalance {
                        account_index,
                        mint,
                        owner,
                        amount,
                        decimals,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
