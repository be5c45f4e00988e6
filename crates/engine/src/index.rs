//! Pipeline index: program-id → pipelines reverse mapping.
//!
//! Reads dominate (one lookup per decoded event); writes arrive from the
//! control plane. A single RwLock over the whole index gives readers an
//! atomic snapshot: they observe either the old or the new version of a
//! pipeline, never a half-indexed state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::info;
use schema::{Pipeline, PipelineStatus, ProgramId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pipeline `{0}` has an empty program list")]
    EmptyPrograms(String),
    #[error("pipeline `{0}` has no enabled destination")]
    NoEnabledDestination(String),
}

#[derive(Default)]
struct Inner {
    pipelines: HashMap<String, Arc<Pipeline>>,
    by_program: HashMap<ProgramId, Vec<String>>,
}

impl Inner {
    fn unindex(&mut self, pipeline: &Pipeline) {
        for program in &pipeline.programs {
            if let Some(bucket) = self.by_program.get_mut(program) {
                bucket.retain(|id| id != &pipeline.id);
                if bucket.is_empty() {
                    self.by_program.remove(program);
                }
            }
        }
    }

    fn index(&mut self, pipeline: &Pipeline) {
        for program in &pipeline.programs {
            let bucket = self.by_program.entry(*program).or_default();
            if !bucket.iter().any(|id| id == &pipeline.id) {
                bucket.push(pipeline.id.clone());
            }
        }
    }
}

#[derive(Default)]
pub struct PipelineIndex {
    inner: RwLock<Inner>,
}

impl PipelineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store and index a pipeline, replacing any previous version without
    /// leaving stale entries. Rejects definitions the orchestrator could
    /// never act on.
    pub fn upsert(&self, pipeline: Pipeline) -> Result<(), ConfigError> {
        if pipeline.programs.is_empty() {
            return Err(ConfigError::EmptyPrograms(pipeline.id));
        }
        if !pipeline.destinations.any_enabled() {
            return Err(ConfigError::NoEnabledDestination(pipeline.id));
        }

        let mut inner = self.inner.write().unwrap();
        if let Some(previous) = inner.pipelines.remove(&pipeline.id) {
            inner.unindex(&previous);
        }
        inner.index(&pipeline);
        inner.pipelines.insert(pipeline.id.clone(), Arc::new(pipeline));
        Ok(())
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.pipelines.remove(id) {
            Some(pipeline) => {
                inner.unindex(&pipeline);
                info!("pipeline removed id={id}");
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Pipeline>> {
        self.inner.read().unwrap().pipelines.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<Pipeline>> {
        self.inner.read().unwrap().pipelines.values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.read().unwrap().pipelines.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active pipelines registered for a program. Paused and errored
    /// pipelines are indexed but not returned.
    pub fn pipelines_for(&self, program: ProgramId) -> Vec<Arc<Pipeline>> {
        let inner = self.inner.read().unwrap();
        inner
            .by_program
            .get(&program)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter_map(|id| inner.pipelines.get(id))
                    .filter(|p| p.status == PipelineStatus::Active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{Destinations, Filter, Transform, WebsocketDestination};

    fn pipeline(id: &str, programs: Vec<ProgramId>) -> Pipeline {
        Pipeline {
            id: id.to_string(),
            name: id.to_string(),
            api_key: String::new(),
            programs,
            filter: Filter::default(),
            transform: Transform::default(),
            destinations: Destinations {
                websocket: Some(WebsocketDestination { enabled: true }),
                ..Default::default()
            },
            status: PipelineStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_upsert_indexes_every_program() {
        let index = PipelineIndex::new();
        index
            .upsert(pipeline("pl_1", vec![ProgramId::Pumpfun, ProgramId::Pumpswap]))
            .unwrap();

        assert_eq!(index.pipelines_for(ProgramId::Pumpfun).len(), 1);
        assert_eq!(index.pipelines_for(ProgramId::Pumpswap).len(), 1);
        assert!(index.pipelines_for(ProgramId::RaydiumCpmm).is_empty());
    }

    #[test]
    fn test_reupsert_leaves_no_stale_entries() {
        let index = PipelineIndex::new();
        index
            .upsert(pipeline("pl_1", vec![ProgramId::Pumpfun, ProgramId::Pumpswap]))
            .unwrap();
        // Re-upsert with a narrower program list.
        index.upsert(pipeline("pl_1", vec![ProgramId::Pumpswap])).unwrap();

        assert!(index.pipelines_for(ProgramId::Pumpfun).is_empty());
        assert_eq!(index.pipelines_for(ProgramId::Pumpswap).len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_drops_reverse_mappings() {
        let index = PipelineIndex::new();
        index.upsert(pipeline("pl_1", vec![ProgramId::Pumpfun])).unwrap();
        index.upsert(pipeline("pl_2", vec![ProgramId::Pumpfun])).unwrap();

        assert!(index.remove("pl_1"));
        assert!(!index.remove("pl_1"));
        let remaining = index.pipelines_for(ProgramId::Pumpfun);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "pl_2");
    }

    #[test]
    fn test_paused_pipelines_not_returned() {
        let index = PipelineIndex::new();
        let mut paused = pipeline("pl_1", vec![ProgramId::Pumpfun]);
        paused.status = PipelineStatus::Paused;
        index.upsert(paused).unwrap();

        assert!(index.pipelines_for(ProgramId::Pumpfun).is_empty());
        // Still stored, just not processed.
        assert!(index.get("pl_1").is_some());
    }

    #[test]
    fn test_upsert_rejects_invalid_definitions() {
        let index = PipelineIndex::new();

        let empty_programs = pipeline("pl_1", vec![]);
        assert_eq!(
            index.upsert(empty_programs),
            Err(ConfigError::EmptyPrograms("pl_1".into()))
        );

        let mut no_destination = pipeline("pl_2", vec![ProgramId::Pumpfun]);
        no_destination.destinations = Destinations::default();
        assert_eq!(
            index.upsert(no_destination),
            Err(ConfigError::NoEnabledDestination("pl_2".into()))
        );

        assert!(index.is_empty());
    }

    #[test]
    fn test_duplicate_program_entries_deduped() {
        let index = PipelineIndex::new();
        index
            .upsert(pipeline("pl_1", vec![ProgramId::Pumpfun, ProgramId::Pumpfun]))
            .unwrap();
        assert_eq!(index.pipelines_for(ProgramId::Pumpfun).len(), 1);
    }
}
