//! CPI-emitted event extraction.
//!
//! Programs that emit events as self-invocations carry the payload in an
//! inner instruction's data bytes. The discriminator match is authoritative:
//! the inner instruction's declared program index is not gated on, because
//! the self-invocation may arrive under a different account index.

use log::debug;
use schema::{decode_fields, ByteReader, DataMap, ProgramSchema, TransactionEnvelope};

/// Event-CPI wrapper discriminator some programs prefix before the event
/// payload.
pub const EVENT_CPI_WRAPPER: [u8; 8] = [0xe4, 0x45, 0xa5, 0x2e, 0x51, 0xcb, 0x9a, 0x1d];

/// Decode every CPI-emitted event for one program, in inner-instruction
/// order. For each inner instruction with ≥ 16 data bytes:
///
/// 1. when `wrapper_first` is set and the leading 8 bytes are the known
///    wrapper discriminator, decode past it;
/// 2. otherwise interpret the bytes as `[discriminator(8)][payload]`;
/// 3. if that discriminator is unknown, strip the first 8 bytes and retry.
///
/// Only discriminators present in the program's event table are accepted.
pub(crate) fn decode_cpi_events(
    env: &TransactionEnvelope,
    schema: &ProgramSchema,
    wrapper_first: bool,
) -> Vec<(&'static str, DataMap)> {
    let mut out = Vec::new();

    for group in &env.inner_instructions {
        for ix in &group.instructions {
            if ix.data.len() < 16 {
                continue;
            }

            let decoded = if wrapper_first && ix.data[..8] == EVENT_CPI_WRAPPER {
                try_decode(env, schema, &ix.data[8..])
            } else {
                try_decode(env, schema, &ix.data)
                    .or_else(|| try_decode(env, schema, &ix.data[8..]))
            };

            if let Some(event) = decoded {
                out.push(event);
            }
        }
    }

    out
}

fn try_decode(
    env: &TransactionEnvelope,
    schema: &ProgramSchema,
    bytes: &[u8],
) -> Option<(&'static str, DataMap)> {
    if bytes.len() < 8 {
        return None;
    }
    let def = schema.event_by_discriminator(&bytes[..8])?;
    let mut reader = ByteReader::new(&bytes[8..]);
    match decode_fields(def.fields, &mut reader) {
        Ok(data) => Some((def.name, data)),
        Err(e) => {
            debug!(
                "cpi event decode failed sig={} event={} err={}",
                env.signature, def.name, e
            );
            None
        }
    }
}
