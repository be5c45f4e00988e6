//! Transform engine: reshapes a matched event into an output record.

use chrono::{SecondsFormat, TimeZone, Utc};
use log::warn;
use schema::{
    DataMap, Event, FieldMapping, OutputRecord, TemplateKind, Transform, Value,
};

use crate::fields::{derive_direction, derive_sol_amount, derive_token_amount, LAMPORTS_PER_SOL};

/// Initial virtual token reserves of a fresh bonding curve, the fixed point
/// the curve-progress pipe measures against.
pub const INITIAL_VIRTUAL_TOKEN_RESERVES: f64 = 1_073_000_000_000_000.0;

/// Apply a pipeline's transform to an event. The envelope fields (`id`,
/// `pipelineId`, `program`, `signature`, `timestamp`) are always present;
/// only `data` varies by transform.
pub fn apply(transform: &Transform, event: &Event, pipeline_id: &str) -> OutputRecord {
    let data = match transform {
        Transform::Template { name } => apply_template(*name, event),
        Transform::Fields { fields } => apply_fields(fields, event),
        Transform::Code { .. } => {
            // Reserved escape hatch: pass-through with a warning.
            warn!("code transform is not executed in the core; falling back to raw");
            apply_template(TemplateKind::Raw, event)
        }
    };

    OutputRecord {
        id: event.id.clone(),
        pipeline_id: pipeline_id.to_string(),
        program: event.program,
        signature: event.signature.clone(),
        timestamp: event.block_time.unwrap_or(0) * 1000,
        data,
    }
}

fn apply_template(kind: TemplateKind, event: &Event) -> DataMap {
    match kind {
        TemplateKind::Raw => raw_template(event),
        TemplateKind::Trade => trade_template(event),
        TemplateKind::Transfer => transfer_template(event),
        TemplateKind::Migration => migration_template(event),
    }
}

fn raw_template(event: &Event) -> DataMap {
    let mut data = DataMap::new();
    data.insert("name".into(), Value::Str(event.name.clone()));
    data.insert("program".into(), Value::Str(event.program.as_str().into()));
    data.insert("signer".into(), Value::Str(event.signer.clone()));
    for (k, v) in &event.data {
        data.insert(k.clone(), v.clone());
    }
    data
}

fn first_present<'a>(data: &'a DataMap, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|n| data.get(*n).filter(|v| !v.is_null()))
}

fn trade_template(event: &Event) -> DataMap {
    let mut data = DataMap::new();
    data.insert("type".into(), Value::Str("trade".into()));
    data.insert("eventName".into(), Value::Str(event.name.clone()));
    data.insert("trader".into(), Value::Str(event.signer.clone()));

    let direction = match derive_direction(event) {
        Some(true) => "buy",
        Some(false) => "sell",
        None => "swap",
    };
    data.insert("direction".into(), Value::Str(direction.into()));

    let token = first_present(
        &event.data,
        &["mint", "token_mint", "base_mint", "input_mint", "pool"],
    );
    data.insert("token".into(), token.cloned().unwrap_or(Value::Null));

    if let Some(sol) = derive_sol_amount(event) {
        data.insert("solAmount".into(), Value::Num(sol));
    }
    if let Some(tokens) = derive_token_amount(event) {
        data.insert("tokenAmount".into(), Value::Num(tokens));
    }

    let swap_result = event.data.get("swap_result").and_then(Value::as_map);
    let input_amount = first_present(&event.data, &["input_amount", "actual_input_amount", "amount_in"])
        .and_then(Value::as_f64)
        .or_else(|| {
            swap_result
                .and_then(|r| first_present(r, &["input_amount", "actual_input_amount"]))
                .and_then(Value::as_f64)
        });
    if let Some(amount) = input_amount {
        data.insert("inputAmount".into(), Value::Num(amount));
    }
    let output_amount = first_present(&event.data, &["output_amount", "amount_out"])
        .and_then(Value::as_f64)
        .or_else(|| {
            swap_result
                .and_then(|r| r.get("output_amount"))
                .and_then(Value::as_f64)
        });
    if let Some(amount) = output_amount {
        data.insert("outputAmount".into(), Value::Num(amount));
    }
    if let Some(fee) = swap_result
        .and_then(|r| r.get("trading_fee"))
        .and_then(Value::as_f64)
    {
        data.insert("tradingFee".into(), Value::Num(fee));
    }

    let virtual_sol = event.data.get("virtual_sol_reserves").and_then(Value::as_f64);
    let virtual_tokens = event.data.get("virtual_token_reserves").and_then(Value::as_f64);
    if let (Some(sol), Some(tokens)) = (virtual_sol, virtual_tokens) {
        if tokens > 0.0 {
            data.insert("price".into(), Value::Num(sol / tokens));
        }
    }

    data.insert(
        "pool".into(),
        first_present(&event.data, &["pool", "pool_state", "pool_id"])
            .cloned()
            .unwrap_or(Value::Null),
    );

    data
}

fn transfer_template(event: &Event) -> DataMap {
    let mut data = DataMap::new();
    data.insert("type".into(), Value::Str("transfer".into()));
    data.insert("eventName".into(), Value::Str(event.name.clone()));
    data.insert(
        "from".into(),
        first_present(&event.data, &["from", "user"])
            .cloned()
            .unwrap_or_else(|| Value::Str(event.signer.clone())),
    );
    data.insert(
        "to".into(),
        event.data.get("to").cloned().unwrap_or(Value::Null),
    );
    data.insert(
        "amount".into(),
        first_present(&event.data, &["amount", "token_amount", "amount_out", "output_amount"])
            .cloned()
            .unwrap_or(Value::Null),
    );
    data.insert(
        "mint".into(),
        first_present(&event.data, &["mint", "token_mint"])
            .cloned()
            .unwrap_or(Value::Null),
    );
    data
}

fn migration_template(event: &Event) -> DataMap {
    let mut data = DataMap::new();
    data.insert("type".into(), Value::Str("migration".into()));
    data.insert("eventName".into(), Value::Str(event.name.clone()));
    data.insert(
        "token".into(),
        first_present(&event.data, &["mint", "token_mint", "base_mint"])
            .cloned()
            .unwrap_or(Value::Null),
    );
    data.insert(
        "pool".into(),
        first_present(&event.data, &["pool", "pool_state", "virtual_pool"])
            .cloned()
            .unwrap_or(Value::Null),
    );
    data.insert(
        "creator".into(),
        first_present(&event.data, &["creator", "user"])
            .cloned()
            .unwrap_or_else(|| Value::Str(event.signer.clone())),
    );
    if let Some(reserves) = event.data.get("virtual_sol_reserves").and_then(Value::as_f64) {
        data.insert("solRaised".into(), Value::Num(reserves / LAMPORTS_PER_SOL));
    }
    data.insert(
        "timestamp".into(),
        Value::Num(event.block_time.unwrap_or(0) as f64 * 1000.0),
    );
    data
}

fn apply_fields(fields: &[FieldMapping], event: &Event) -> DataMap {
    let mut data = DataMap::new();
    for mapping in fields {
        // A missing source is a legitimate result: the target key is absent.
        let Some(value) = event.lookup(&mapping.source) else {
            continue;
        };
        let value = match &mapping.pipe {
            Some(pipe) => apply_pipe(pipe, value),
            None => value,
        };
        data.insert(mapping.target.clone(), value);
    }
    data
}

/// Apply a named unary pipe. Unknown names warn and pass the value through.
pub fn apply_pipe(name: &str, value: Value) -> Value {
    match name {
        "lamportsToSol" => match value.as_f64() {
            Some(lamports) => Value::Num(lamports / LAMPORTS_PER_SOL),
            None => value,
        },
        "base58" => Value::Str(value.to_display_string()),
        "timestamp" => match value.as_f64() {
            Some(secs) => match Utc.timestamp_opt(secs as i64, 0).single() {
                Some(dt) => Value::Str(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
                None => value,
            },
            None => value,
        },
        "shorten" => match value.as_str() {
            Some(s) if s.chars().count() > 12 => {
                let head: String = s.chars().take(4).collect();
                let tail: String = s.chars().skip(s.chars().count() - 4).collect();
                Value::Str(format!("{head}…{tail}"))
            }
            _ => value,
        },
        "bondingCurveProgress" => match value.as_f64() {
            Some(current) => {
                let progress = (INITIAL_VIRTUAL_TOKEN_RESERVES - current)
                    / INITIAL_VIRTUAL_TOKEN_RESERVES
                    * 100.0;
                let clamped = progress.clamp(0.0, 100.0);
                Value::Num((clamped * 100.0).round() / 100.0)
            }
            None => value,
        },
        other => {
            warn!("unknown pipe `{other}`, passing value through");
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{EventSource, ProgramId};

    fn trade_event() -> Event {
        let mut data = DataMap::new();
        data.insert("mint".into(), Value::Str("Mint1111111111111111111111111111111111111111".into()));
        data.insert("sol_amount".into(), Value::big(20_000_000_000u64));
        data.insert("token_amount".into(), Value::big(5_000_000u64));
        data.insert("is_buy".into(), Value::Bool(true));

        Event {
            id: "sig:addr:0".into(),
            program: ProgramId::Pumpfun,
            program_address: ProgramId::Pumpfun.address().into(),
            name: "TradeEvent".into(),
            signature: "sig".into(),
            slot: 1,
            block_time: Some(1_700_000_000),
            signer: "SignerWallet11111111111111111111111111111111".into(),
            source: EventSource::direct(),
            data,
        }
    }

    #[test]
    fn test_raw_template_keeps_every_data_key() {
        let event = trade_event();
        let out = apply(&Transform::default(), &event, "pl_1");

        assert_eq!(out.id, event.id);
        assert_eq!(out.pipeline_id, "pl_1");
        assert_eq!(out.timestamp, 1_700_000_000_000);
        assert_eq!(out.data.get("name").unwrap().as_str(), Some("TradeEvent"));
        assert_eq!(out.data.get("program").unwrap().as_str(), Some("pumpfun"));
        assert_eq!(out.data.get("signer").unwrap().as_str(), Some(event.signer.as_str()));
        for key in event.data.keys() {
            assert!(out.data.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_trade_template() {
        let out = apply(
            &Transform::Template { name: TemplateKind::Trade },
            &trade_event(),
            "pl_1",
        );

        assert_eq!(out.data.get("type").unwrap().as_str(), Some("trade"));
        assert_eq!(out.data.get("eventName").unwrap().as_str(), Some("TradeEvent"));
        assert_eq!(out.data.get("direction").unwrap().as_str(), Some("buy"));
        assert_eq!(
            out.data.get("token").unwrap().as_str(),
            Some("Mint1111111111111111111111111111111111111111")
        );
        assert_eq!(out.data.get("solAmount").unwrap().as_f64(), Some(20.0));
        assert_eq!(out.data.get("tokenAmount").unwrap().as_f64(), Some(5_000_000.0));
        // No pool field on the event: key present, null value.
        assert!(out.data.get("pool").unwrap().is_null());
    }

    #[test]
    fn test_trade_template_nested_swap_result() {
        let mut event = trade_event();
        let mut result = DataMap::new();
        result.insert("actual_input_amount".into(), Value::big(111u64));
        result.insert("output_amount".into(), Value::big(222u64));
        result.insert("trading_fee".into(), Value::big(3u64));
        event.data.insert("swap_result".into(), Value::Map(result));

        let out = apply(&Transform::Template { name: TemplateKind::Trade }, &event, "pl");
        assert_eq!(out.data.get("inputAmount").unwrap().as_f64(), Some(111.0));
        assert_eq!(out.data.get("outputAmount").unwrap().as_f64(), Some(222.0));
        assert_eq!(out.data.get("tradingFee").unwrap().as_f64(), Some(3.0));
    }

    #[test]
    fn test_trade_template_price() {
        let mut event = trade_event();
        event.data.insert("virtual_sol_reserves".into(), Value::big(30_000_000_000u64));
        event.data.insert("virtual_token_reserves".into(), Value::big(1_000_000_000_000u64));

        let out = apply(&Transform::Template { name: TemplateKind::Trade }, &event, "pl");
        assert_eq!(out.data.get("price").unwrap().as_f64(), Some(0.03));
    }

    #[test]
    fn test_migration_template() {
        let mut event = trade_event();
        event.name = "CompleteEvent".into();
        event.data.insert("virtual_sol_reserves".into(), Value::big(85_000_000_000u64));

        let out = apply(&Transform::Template { name: TemplateKind::Migration }, &event, "pl");
        assert_eq!(out.data.get("type").unwrap().as_str(), Some("migration"));
        assert_eq!(out.data.get("solRaised").unwrap().as_f64(), Some(85.0));
        assert_eq!(
            out.data.get("token").unwrap().as_str(),
            Some("Mint1111111111111111111111111111111111111111")
        );
    }

    #[test]
    fn test_fields_mode_with_pipes() {
        let transform = Transform::Fields {
            fields: vec![
                FieldMapping {
                    source: "data.sol_amount".into(),
                    target: "sol".into(),
                    pipe: Some("lamportsToSol".into()),
                },
                FieldMapping {
                    source: "signer".into(),
                    target: "who".into(),
                    pipe: Some("shorten".into()),
                },
                FieldMapping {
                    source: "data.absent".into(),
                    target: "nothing".into(),
                    pipe: None,
                },
            ],
        };

        let out = apply(&transform, &trade_event(), "pl");
        assert_eq!(out.data.get("sol").unwrap().as_f64(), Some(20.0));
        assert_eq!(out.data.get("who").unwrap().as_str(), Some("Sign…1111"));
        // Missing sources yield no key.
        assert!(!out.data.contains_key("nothing"));
    }

    #[test]
    fn test_code_mode_falls_back_to_raw() {
        let out = apply(&Transform::Code { code: "x => x".into() }, &trade_event(), "pl");
        assert_eq!(out.data.get("name").unwrap().as_str(), Some("TradeEvent"));
        assert!(out.data.contains_key("sol_amount"));
    }

    #[test]
    fn test_pipe_laws() {
        // lamportsToSol round-trips integers in safe range.
        let x = 123_456_789f64;
        let piped = apply_pipe("lamportsToSol", Value::Num(x));
        assert_eq!(piped.as_f64().unwrap() * LAMPORTS_PER_SOL, x);

        // shorten is identity at ≤ 12 chars.
        let short = apply_pipe("shorten", Value::Str("abcdefghijkl".into()));
        assert_eq!(short.as_str(), Some("abcdefghijkl"));

        // Curve progress endpoints and monotonicity.
        let at_initial = apply_pipe(
            "bondingCurveProgress",
            Value::Num(INITIAL_VIRTUAL_TOKEN_RESERVES),
        );
        assert_eq!(at_initial.as_f64(), Some(0.0));
        let at_zero = apply_pipe("bondingCurveProgress", Value::Num(0.0));
        assert_eq!(at_zero.as_f64(), Some(100.0));
        let mid = apply_pipe(
            "bondingCurveProgress",
            Value::Num(INITIAL_VIRTUAL_TOKEN_RESERVES / 2.0),
        );
        assert_eq!(mid.as_f64(), Some(50.0));

        // Above-initial reserves clamp to 0, not negative.
        let above = apply_pipe(
            "bondingCurveProgress",
            Value::Num(INITIAL_VIRTUAL_TOKEN_RESERVES * 2.0),
        );
        assert_eq!(above.as_f64(), Some(0.0));
    }

    #[test]
    fn test_timestamp_pipe() {
        let piped = apply_pipe("timestamp", Value::big(1_700_000_000u64));
        assert_eq!(piped.as_str(), Some("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn test_unknown_pipe_is_identity() {
        let v = apply_pipe("doesNotExist", Value::Num(5.0));
        assert_eq!(v.as_f64(), Some(5.0));
    }
}
