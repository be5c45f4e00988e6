//! OutputRecord: the per-pipeline, per-event result of filter-then-transform.

use serde::Serialize;

use crate::programs::ProgramId;
use crate::value::DataMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    /// Event id, unchanged.
    pub id: String,
    pub pipeline_id: String,
    pub program: ProgramId,
    pub signature: String,
    /// Event block time in milliseconds.
    pub timestamp: i64,
    pub data: DataMap,
}
