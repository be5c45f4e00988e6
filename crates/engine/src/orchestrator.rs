//! End-to-end orchestration: decode → match → filter → transform → deliver.

use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use schema::{Event, Pipeline, TransactionEnvelope};

use crate::decode::DecoderRegistry;
use crate::deliver::{Dispatcher, RealtimeBus};
use crate::filter;
use crate::index::PipelineIndex;
use crate::stats::stats;
use crate::transform;

pub struct Engine {
    registry: DecoderRegistry,
    index: Arc<PipelineIndex>,
    dispatcher: Dispatcher,
}

impl Engine {
    /// Engine with the default decoder set. The pipeline index is shared
    /// with the control plane; the bus is shared with the realtime
    /// transport, or absent when realtime push is disabled.
    pub fn new(index: Arc<PipelineIndex>, bus: Option<Arc<RealtimeBus>>) -> Self {
        Self::with_registry(DecoderRegistry::with_defaults(), index, bus)
    }

    pub fn with_registry(
        registry: DecoderRegistry,
        index: Arc<PipelineIndex>,
        bus: Option<Arc<RealtimeBus>>,
    ) -> Self {
        Self {
            registry,
            index: index.clone(),
            dispatcher: Dispatcher::new(bus),
        }
    }

    pub fn index(&self) -> &Arc<PipelineIndex> {
        &self.index
    }

    /// Process one transaction envelope: decode every event, then run each
    /// matched pipeline. Pipelines for one event run concurrently; a failing
    /// pipeline never affects the others.
    pub async fn process(&self, envelope: &TransactionEnvelope) {
        let events = self.registry.parse(envelope);
        if events.is_empty() {
            return;
        }
        debug!(
            "decoded {} event(s) sig={} slot={}",
            events.len(),
            envelope.signature,
            envelope.slot
        );

        for event in &events {
            stats().record_event_processed();
            let pipelines = self.index.pipelines_for(event.program);
            if pipelines.is_empty() {
                continue;
            }
            join_all(
                pipelines
                    .iter()
                    .map(|pipeline| self.run_pipeline(pipeline, event)),
            )
            .await;
        }
    }

    async fn run_pipeline(&self, pipeline: &Arc<Pipeline>, event: &Event) {
        if !filter::evaluate(&pipeline.filter, event) {
            stats().record_event_filtered();
            return;
        }
        stats().record_event_matched();

        let output = transform::apply(&pipeline.transform, event, &pipeline.id);
        let results = self.dispatcher.deliver(&output, &pipeline.destinations).await;
        for result in results {
            stats().record_destination(result.destination, result.success);
            if !result.success {
                stats().record_error();
                warn!(
                    "delivery failed pipeline={} destination={} err={}",
                    pipeline.id,
                    result.destination,
                    result.error.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
}
