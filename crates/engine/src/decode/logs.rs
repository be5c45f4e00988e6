//! Log-emitted event extraction.
//!
//! Some programs emit events by writing base64-encoded records into program
//! log lines prefixed `"Program data: "`. The owning program is tracked via
//! the surrounding `"Program <addr> invoke"` / `"Program <addr> success"`
//! markers: a program is current between its invoke and its matching
//! success/failure line.

use base64::Engine as _;
use log::debug;
use schema::{decode_fields, ByteReader, DataMap, ProgramSchema, TransactionEnvelope};

const PROGRAM_DATA_PREFIX: &str = "Program data: ";

#[derive(Debug, Clone)]
pub(crate) struct ProgramDataLog {
    /// Program current when the line was written, per invoke/success markers.
    pub owner: Option<String>,
    pub bytes: Vec<u8>,
}

/// Walk the log lines, attributing each `"Program data:"` record to the
/// program on top of the invoke stack. Malformed base64 is skipped.
pub(crate) fn extract_program_data_logs(logs: &[String]) -> Vec<ProgramDataLog> {
    let mut out = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    for line in logs {
        if let Some(b64) = line.strip_prefix(PROGRAM_DATA_PREFIX) {
            match base64::engine::general_purpose::STANDARD.decode(b64.trim()) {
                Ok(bytes) => out.push(ProgramDataLog {
                    owner: stack.last().cloned(),
                    bytes,
                }),
                Err(_) => debug!("skipping malformed base64 program data line"),
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("Program ") {
            if let Some((addr, tail)) = rest.split_once(' ') {
                if tail.starts_with("invoke") {
                    stack.push(addr.to_string());
                } else if tail.starts_with("success") || tail.starts_with("failed") {
                    // Pop to the matching frame; logs are well nested.
                    if let Some(pos) = stack.iter().rposition(|p| p == addr) {
                        stack.truncate(pos);
                    }
                }
            }
        }
    }

    out
}

/// Decode every log-emitted event owned by `schema.address`. Records whose
/// discriminator is unknown or whose payload does not deserialize are
/// skipped, never raised.
pub(crate) fn decode_log_events(
    env: &TransactionEnvelope,
    schema: &ProgramSchema,
) -> Vec<(&'static str, DataMap)> {
    let mut out = Vec::new();

    for record in extract_program_data_logs(&env.log_messages) {
        if record.owner.as_deref() != Some(schema.address) {
            continue;
        }
        if record.bytes.len() < 8 {
            continue;
        }
        let Some(def) = schema.event_by_discriminator(&record.bytes[..8]) else {
            debug!(
                "unknown log event discriminator sig={} program={}",
                env.signature, schema.address
            );
            continue;
        };
        let mut reader = ByteReader::new(&record.bytes[8..]);
        match decode_fields(def.fields, &mut reader) {
            Ok(data) => out.push((def.name, data)),
            Err(e) => debug!(
                "log event decode failed sig={} event={} err={}",
                env.signature, def.name, e
            ),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_owner_tracking_nested_invokes() {
        let payload = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
        let logs = lines(&[
            "Program Outer111 invoke [1]",
            "Program Inner222 invoke [2]",
            &format!("Program data: {payload}"),
            "Program Inner222 success",
            &format!("Program data: {payload}"),
            "Program Outer111 success",
        ]);

        let records = extract_program_data_logs(&logs);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].owner.as_deref(), Some("Inner222"));
        assert_eq!(records[1].owner.as_deref(), Some("Outer111"));
        assert_eq!(records[0].bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_base64_skipped() {
        let logs = lines(&[
            "Program Outer111 invoke [1]",
            "Program data: !!!not-base64!!!",
            "Program Outer111 success",
        ]);
        assert!(extract_program_data_logs(&logs).is_empty());
    }

    #[test]
    fn test_data_outside_any_invoke_has_no_owner() {
        let payload = base64::engine::general_purpose::STANDARD.encode([9u8]);
        let logs = lines(&[&format!("Program data: {payload}")]);
        let records = extract_program_data_logs(&logs);
        assert_eq!(records.len(), 1);
        assert!(records[0].owner.is_none());
    }
}
