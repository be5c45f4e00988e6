//! Event pipeline runtime: decode on-chain transactions into normalized
//! events, match them against user-defined pipelines, filter, transform and
//! fan out to delivery destinations.

pub mod decode;
pub mod deliver;
pub mod fields;
pub mod filter;
pub mod index;
pub mod orchestrator;
pub mod stats;
pub mod transform;

pub use decode::{attribute_source, DecoderRegistry, ProgramDecoder};
pub use deliver::{DeliveryResult, Dispatcher, RealtimeBus};
pub use index::{ConfigError, PipelineIndex};
pub use orchestrator::Engine;
pub use stats::{stats, StatsSnapshot};
