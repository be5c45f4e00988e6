//! Post-decode enrichment shared by all decoders.

use schema::{DataMap, Instruction, TransactionEnvelope, Value, WSOL_MINT};

/// Infer token identity from post-transaction token balances: the single
/// non-native mint becomes `token_mint`; the wrapped-SOL mint becomes
/// `quote_mint` when present, otherwise the second non-native mint does.
/// Existing keys are never overwritten.
pub(crate) fn infer_token_identity(env: &TransactionEnvelope, data: &mut DataMap) {
    let mut non_native: Vec<&str> = Vec::new();
    let mut has_wsol = false;

    for balance in &env.post_token_balances {
        if balance.mint == WSOL_MINT {
            has_wsol = true;
        } else if !non_native.iter().any(|m| *m == balance.mint) {
            non_native.push(&balance.mint);
        }
    }

    if let Some(token) = non_native.first() {
        data.entry("token_mint".to_string())
            .or_insert_with(|| Value::Str(token.to_string()));
    }

    let quote = if has_wsol {
        Some(WSOL_MINT)
    } else {
        non_native.get(1).copied()
    };
    if let Some(quote) = quote {
        data.entry("quote_mint".to_string())
            .or_insert_with(|| Value::Str(quote.to_string()));
    }
}

/// Bind role names to the accounts of an instruction, in account order.
/// Out-of-range indices and empty role names are omitted silently; existing
/// keys win.
pub(crate) fn apply_role_accounts(
    env: &TransactionEnvelope,
    ix: &Instruction,
    roles: &[&'static str],
    data: &mut DataMap,
) {
    for (position, role) in roles.iter().enumerate() {
        if role.is_empty() {
            continue;
        }
        let Some(&key_index) = ix.accounts.get(position) else {
            continue;
        };
        let Some(address) = env.account_at(key_index) else {
            continue;
        };
        data.entry(role.to_string())
            .or_insert_with(|| Value::Str(address.to_string()));
    }
}

/// Lift first-level nested struct fields to top-level keys, keeping the
/// nested map in place so both `swap_result.output_amount` and
/// `output_amount` resolve. Top-level keys win on collision.
pub(crate) fn flatten_nested(data: &mut DataMap) {
    let mut lifted: Vec<(String, Value)> = Vec::new();
    for value in data.values() {
        if let Value::Map(nested) = value {
            for (k, v) in nested {
                lifted.push((k.clone(), v.clone()));
            }
        }
    }
    for (k, v) in lifted {
        data.entry(k).or_insert(v);
    }
}
