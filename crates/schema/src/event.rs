//! Normalized event record, the canonical output of decoding.

use serde::Serialize;

use crate::programs::ProgramId;
use crate::value::{lookup_path, DataMap, Value};

/// Aggregator attribution for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Direct,
    Jupiter,
    Raydium,
    Unknown,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Direct => "direct",
            SourceKind::Jupiter => "jupiter",
            SourceKind::Raydium => "raydium",
            SourceKind::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> SourceKind {
        match tag {
            "jupiter" => SourceKind::Jupiter,
            "raydium" => SourceKind::Raydium,
            _ => SourceKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_program: Option<String>,
}

impl EventSource {
    pub fn direct() -> EventSource {
        EventSource {
            kind: SourceKind::Direct,
            outer_program: None,
        }
    }
}

/// A single decoded event. Ephemeral: constructed per transaction, dropped
/// after fan-out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// `"{signature}:{programAddress}:{sequenceWithinTx}"`, unique and
    /// deterministic for a given envelope.
    pub id: String,
    pub program: ProgramId,
    pub program_address: String,
    /// Event name from the program schema (`TradeEvent`, `EvtSwap2`, ...).
    pub name: String,
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    /// Fee payer address.
    pub signer: String,
    pub source: EventSource,
    /// Field-name → value mapping, snake-case names preserved from the
    /// program schema.
    pub data: DataMap,
}

impl Event {
    /// Resolve a dotted path against the full event. The first segment may
    /// name an envelope-level field (`name`, `signer`, `slot`, `data`,
    /// `source`); anything else falls through to the `data` sub-tree, so
    /// `sol_amount` and `data.sol_amount` resolve identically.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (path, None),
        };

        match head {
            "id" => rest.is_none().then(|| Value::Str(self.id.clone())),
            "program" => rest.is_none().then(|| Value::Str(self.program.as_str().to_string())),
            "programAddress" => rest.is_none().then(|| Value::Str(self.program_address.clone())),
            "name" => rest.is_none().then(|| Value::Str(self.name.clone())),
            "signature" => rest.is_none().then(|| Value::Str(self.signature.clone())),
            "slot" => rest.is_none().then(|| Value::Num(self.slot as f64)),
            "blockTime" => match rest {
                None => self.block_time.map(|t| Value::Num(t as f64)),
                Some(_) => None,
            },
            "signer" => rest.is_none().then(|| Value::Str(self.signer.clone())),
            "source" => match rest {
                None => None,
                Some("type") => Some(Value::Str(self.source.kind.as_str().to_string())),
                Some("outerProgram") => {
                    self.source.outer_program.as_ref().map(|p| Value::Str(p.clone()))
                }
                Some(_) => None,
            },
            "data" => match rest {
                None => Some(Value::Map(self.data.clone())),
                Some(r) => lookup_path(&self.data, r).cloned(),
            },
            _ => lookup_path(&self.data, path).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        let mut data = DataMap::new();
        data.insert("sol_amount".into(), Value::big(1_000_000_000u64));
        let mut nested = DataMap::new();
        nested.insert("output_amount".into(), Value::big(7u64));
        data.insert("swap_result".into(), Value::Map(nested));

        Event {
            id: "sig:addr:0".into(),
            program: ProgramId::Pumpfun,
            program_address: ProgramId::Pumpfun.address().into(),
            name: "TradeEvent".into(),
            signature: "sig".into(),
            slot: 100,
            block_time: Some(1_700_000_000),
            signer: "FeePayer111".into(),
            source: EventSource::direct(),
            data,
        }
    }

    #[test]
    fn test_lookup_envelope_fields() {
        let e = sample_event();
        assert_eq!(e.lookup("name").unwrap().as_str(), Some("TradeEvent"));
        assert_eq!(e.lookup("signer").unwrap().as_str(), Some("FeePayer111"));
        assert_eq!(e.lookup("slot").unwrap().as_f64(), Some(100.0));
        assert_eq!(e.lookup("source.type").unwrap().as_str(), Some("direct"));
        assert!(e.lookup("source.outerProgram").is_none());
    }

    #[test]
    fn test_lookup_data_paths() {
        let e = sample_event();
        assert_eq!(e.lookup("data.sol_amount").unwrap().as_f64(), Some(1e9));
        // Bare names fall through to data.
        assert_eq!(e.lookup("sol_amount").unwrap().as_f64(), Some(1e9));
        assert_eq!(
            e.lookup("swap_result.output_amount").unwrap().as_f64(),
            Some(7.0)
        );
        assert!(e.lookup("data.missing").is_none());
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let e = sample_event();
        let j = serde_json::to_value(&e).unwrap();
        assert_eq!(j["programAddress"], ProgramId::Pumpfun.address());
        assert_eq!(j["blockTime"], 1_700_000_000i64);
        assert_eq!(j["source"]["type"], "direct");
        assert_eq!(j["data"]["sol_amount"], "1000000000");
    }
}
