use std::collections::BTreeMap;

use concord_core::{CorrespondenceEdge, CorrespondenceSnapshot, Dataset};
use serde::{Deserialize, Serialize};

use crate::error::CompareError;
use crate::finding::{FindingKind, Findings, KnownWrongValues};
use crate::measure::Measurement;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// State carried over from earlier runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorState {
    #[serde(default)]
    pub correspondence: CorrespondenceSnapshot,
    #[serde(default)]
    pub known_wrong: KnownWrongValues,
}

impl PriorState {
    pub fn from_json(input: &str) -> Result<Self, CompareError> {
        serde_json::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareSummary {
    pub total_findings: usize,
    pub findings_by_kind: BTreeMap<FindingKind, usize>,
    pub findings_by_dataset: BTreeMap<Dataset, usize>,
    pub measurements: usize,
    pub new_correspondences: usize,
    pub new_incorrespondences: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub meta: CompareMeta,
    pub summary: CompareSummary,
    /// Measurements per dataset they are filed under.
    pub measurements: BTreeMap<Dataset, Vec<Measurement>>,
    pub findings: Findings,
    /// Edges added during this run; prior edges are not repeated.
    pub correspondences: Vec<CorrespondenceEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}
