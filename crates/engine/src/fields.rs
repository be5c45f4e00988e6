//! Field probing shared by the filter and transform engines.
//!
//! Decoded programs name the same concept differently (`sol_amount`,
//! `quote_amount_in`, ...); these ordered probe lists pick the first present
//! field so pipelines can reason in terms of direction, SOL amount and token
//! amount regardless of the emitting program.

use schema::{DataMap, Event, Value};

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Mint-role field names, snake-case and camel-case variants both recognized.
pub const MINT_FIELDS: &[&str] = &[
    "mint",
    "token_mint",
    "tokenMint",
    "base_mint",
    "baseMint",
    "quote_mint",
    "quoteMint",
    "input_mint",
    "inputMint",
    "output_mint",
    "outputMint",
];

/// Actor-role field names probed for wallet matching (plus the signer).
pub const WALLET_FIELDS: &[&str] = &["user", "creator", "trader", "owner", "authority", "from"];

/// SOL-denominated amount fields, in probe order. Values are lamports.
pub const SOL_AMOUNT_FIELDS: &[&str] = &[
    "sol_amount",
    "quote_amount_in",
    "user_quote_amount_in",
    "quote_amount_out",
    "user_quote_amount_out",
    "amount_in",
    "quote_amount",
];

/// Token-denominated amount fields, in probe order. Values are raw base
/// units.
pub const TOKEN_AMOUNT_FIELDS: &[&str] = &[
    "token_amount",
    "base_amount_out",
    "base_amount_in",
    "output_amount",
    "amount_out",
    "token_amount_out",
];

/// Role names whose values are account addresses, used when collecting the
/// event's account set.
pub const ACCOUNT_ROLE_FIELDS: &[&str] = &[
    "mint",
    "token_mint",
    "quote_mint",
    "base_mint",
    "input_mint",
    "output_mint",
    "user",
    "creator",
    "trader",
    "owner",
    "authority",
    "from",
    "to",
    "payer",
    "pool",
    "pool_state",
    "pool_id",
    "bonding_curve",
    "config",
    "global",
    "global_config",
    "fee_recipient",
];

/// Derive trade direction: explicit `is_buy`, else `trade_direction`
/// (0 = buy), else inferred from the event name. `None` when underivable.
pub fn derive_direction(event: &Event) -> Option<bool> {
    if let Some(is_buy) = event.data.get("is_buy").and_then(Value::as_bool) {
        return Some(is_buy);
    }
    if let Some(direction) = event.data.get("trade_direction").and_then(Value::as_f64) {
        return Some(direction == 0.0);
    }
    let name = event.name.to_lowercase();
    if name.contains("buy") {
        Some(true)
    } else if name.contains("sell") {
        Some(false)
    } else {
        None
    }
}

fn probe(data: &DataMap, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|f| data.get(*f).and_then(Value::as_f64))
}

/// First-present SOL-like amount, converted from lamports to whole SOL.
pub fn derive_sol_amount(event: &Event) -> Option<f64> {
    probe(&event.data, SOL_AMOUNT_FIELDS).map(|lamports| lamports / LAMPORTS_PER_SOL)
}

/// First-present token-like amount, in raw base units.
pub fn derive_token_amount(event: &Event) -> Option<f64> {
    probe(&event.data, TOKEN_AMOUNT_FIELDS)
}

/// Collect the event's mint candidates in probe order.
pub fn collect_mints(event: &Event) -> Vec<&str> {
    MINT_FIELDS
        .iter()
        .filter_map(|f| event.data.get(*f).and_then(Value::as_str))
        .collect()
}

/// Collect the event's actor candidates: signer first, then actor-role
/// fields.
pub fn collect_wallets(event: &Event) -> Vec<&str> {
    let mut out = vec![event.signer.as_str()];
    for field in WALLET_FIELDS {
        if let Some(wallet) = event.data.get(*field).and_then(Value::as_str) {
            out.push(wallet);
        }
    }
    out
}

/// Collect all account-like strings from the event: signer plus any
/// role-named field, recursively through nested maps. Only strings of
/// base58-address length (≥ 32) qualify.
pub fn collect_accounts(event: &Event) -> Vec<String> {
    let mut out = vec![event.signer.clone()];
    collect_accounts_from(&event.data, &mut out);
    out.retain(|a| a.len() >= 32);
    out.dedup();
    out
}

fn collect_accounts_from(data: &DataMap, out: &mut Vec<String>) {
    for (key, value) in data {
        match value {
            Value::Str(s) if ACCOUNT_ROLE_FIELDS.contains(&key.as_str()) => {
                out.push(s.clone());
            }
            Value::Map(nested) => collect_accounts_from(nested, out),
            _ => {}
        }
    }
}
