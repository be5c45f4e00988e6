//! Tagged value union for decoded event payloads.
//!
//! Event `data` maps are heterogeneous: base58 addresses, booleans, small
//! numbers, 64/128-bit amounts (kept as decimal strings for precision), and
//! nested structs. `Value` carries all of them through the filter and
//! transform layers without losing the distinction between "a string" and
//! "a big integer rendered as a string".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field-name → value mapping used for event `data` and output records.
pub type DataMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    /// Finite numbers that fit f64 without precision loss (u8..u32, i32, ratios).
    Num(f64),
    Str(String),
    /// u64/u128/i64 amounts in base units, rendered as decimal strings.
    Big(String),
    List(Vec<Value>),
    Map(DataMap),
}

impl Value {
    pub fn big(n: impl ToString) -> Value {
        Value::Big(n.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view. `Big` and `Str` values that parse as numbers coerce,
    /// matching the filter engine's comparison rules.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) if n.is_finite() => Some(*n),
            Value::Big(s) | Value::Str(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Value::Bool(_) | Value::Null | Value::List(_) | Value::Map(_) | Value::Num(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Big(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Stringified form used for loose equality (`"5"` equals `5`).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Str(s) | Value::Big(s) => s.clone(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_else(|_| String::new())
            }
        }
    }

    /// Convert from a `serde_json::Value` (pipeline definitions, fixtures).
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Num).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(a) => Value::List(a.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(o) => Value::Map(
                o.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Big(n.to_string())
    }
}

/// Dotted-path lookup inside a data map (`swap_result.output_amount`).
pub fn lookup_path<'a>(map: &'a DataMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for seg in segments {
        current = current.as_map()?.get(seg)?;
    }
    Some(current)
}
