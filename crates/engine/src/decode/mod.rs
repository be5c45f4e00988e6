//! Decoder registry: one decoder per supported program.
//!
//! Decoders register by program address at startup and share one contract:
//! `parse(envelope) -> Vec<Event>`. A transaction may involve several
//! programs; the registry invokes every decoder and concatenates results in
//! registration order. Per-decoder failures are isolated: a panic inside one
//! decoder produces an empty list for that decoder only.

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::warn;
use schema::{
    aggregator_by_address, DataMap, Event, EventSource, ProgramId, SourceKind,
    TransactionEnvelope,
};

use crate::stats::stats;

mod cpi;
mod enrich;
mod logs;

pub mod meteora_damm;
pub mod meteora_dbc;
pub mod pumpfun;
pub mod pumpswap;
pub mod raydium_cpmm;
pub mod raydium_launchpad;

pub use cpi::EVENT_CPI_WRAPPER;
pub use meteora_damm::MeteoraDammDecoder;
pub use meteora_dbc::MeteoraDbcDecoder;
pub use pumpfun::PumpfunDecoder;
pub use pumpswap::PumpswapDecoder;
pub use raydium_cpmm::RaydiumCpmmDecoder;
pub use raydium_launchpad::RaydiumLaunchpadDecoder;

pub trait ProgramDecoder: Send + Sync {
    fn program(&self) -> ProgramId;

    fn address(&self) -> &'static str {
        self.program().address()
    }

    /// Decode every event this program emitted in the envelope. Must return
    /// the same list for the same envelope; never errors to the caller.
    fn parse(&self, env: &TransactionEnvelope) -> Vec<Event>;
}

pub struct DecoderRegistry {
    decoders: Vec<Box<dyn ProgramDecoder>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self { decoders: Vec::new() }
    }

    /// Registry with the full program catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PumpfunDecoder));
        registry.register(Box::new(RaydiumLaunchpadDecoder));
        registry.register(Box::new(MeteoraDbcDecoder));
        registry.register(Box::new(PumpswapDecoder));
        registry.register(Box::new(MeteoraDammDecoder));
        registry.register(Box::new(RaydiumCpmmDecoder));
        registry
    }

    pub fn register(&mut self, decoder: Box<dyn ProgramDecoder>) {
        self.decoders.push(decoder);
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Run every decoder over the envelope, concatenating results in
    /// registration order. A panicking decoder contributes nothing and is
    /// counted as an error.
    pub fn parse(&self, env: &TransactionEnvelope) -> Vec<Event> {
        let mut events = Vec::new();
        for decoder in &self.decoders {
            match catch_unwind(AssertUnwindSafe(|| decoder.parse(env))) {
                Ok(decoded) => events.extend(decoded),
                Err(_) => {
                    stats().record_error();
                    warn!(
                        "decoder panicked program={} sig={}",
                        decoder.program(),
                        env.signature
                    );
                }
            }
        }
        events
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Scan the full account-key set for a known aggregator address. First match
/// wins; order is the deterministic account-key list order.
pub fn attribute_source(env: &TransactionEnvelope) -> EventSource {
    for key in &env.account_keys {
        if let Some(agg) = aggregator_by_address(key) {
            return EventSource {
                kind: SourceKind::from_tag(agg.tag),
                outer_program: Some(agg.address.to_string()),
            };
        }
    }
    EventSource::direct()
}

/// Builds events for one decoder invocation, numbering them 0,1,2… in
/// emission order.
pub(crate) struct EventFactory<'a> {
    env: &'a TransactionEnvelope,
    program: ProgramId,
    source: EventSource,
    seq: usize,
}

impl<'a> EventFactory<'a> {
    pub(crate) fn new(env: &'a TransactionEnvelope, program: ProgramId) -> Self {
        Self {
            env,
            program,
            source: attribute_source(env),
            seq: 0,
        }
    }

    pub(crate) fn build(&mut self, name: &str, data: DataMap) -> Event {
        let address = self.program.address();
        let event = Event {
            id: format!("{}:{}:{}", self.env.signature, address, self.seq),
            program: self.program,
            program_address: address.to_string(),
            name: name.to_string(),
            signature: self.env.signature.clone(),
            slot: self.env.slot,
            block_time: self.env.block_time,
            signer: self.env.fee_payer().to_string(),
            source: self.source.clone(),
            data,
        };
        self.seq += 1;
        event
    }
}
