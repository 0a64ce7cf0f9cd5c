use std::collections::{BTreeMap, BTreeSet};

use concord_core::{Dataset, Resource, Value};
use serde::{Deserialize, Serialize};

/// Issue type of values that cannot be used as bound.
pub const INVALID_VALUE: &str = "Invalid Value";

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// A quality finding, filed under the dataset whose output it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    /// Two corresponding resources bind different values.
    Deviation {
        aspect: String,
        affected_resource: Resource,
        affected_variable: String,
        affected_value: Value,
        compared_to_dataset: Dataset,
        compared_to_resource: Resource,
        compared_to_value: Value,
    },
    /// The filing dataset has no resource corresponding to `compared_to_resource`.
    ResourceOmission {
        aspect: String,
        compared_to_dataset: Dataset,
        compared_to_resource: Resource,
    },
    /// `affected_value` of `affected_resource` is missing at
    /// `compared_to_resource`, which has no value of its own that is missing here.
    ValueOmission {
        aspect: String,
        affected_resource: Resource,
        affected_variable: String,
        affected_value: Value,
        compared_to_dataset: Dataset,
        compared_to_resource: Resource,
    },
    /// Two resources of one dataset correspond to each other.
    Duplicate {
        aspect: String,
        affected_resource: Resource,
        duplicate_of: Resource,
    },
    Issue {
        aspect: String,
        affected_resource: Resource,
        #[serde(skip_serializing_if = "Option::is_none")]
        affected_variable: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        affected_value: Option<Value>,
        issue_type: String,
        comment: String,
    },
}

impl Finding {
    pub fn kind(&self) -> FindingKind {
        match self {
            Self::Deviation { .. } => FindingKind::Deviation,
            Self::ResourceOmission { .. } => FindingKind::ResourceOmission,
            Self::ValueOmission { .. } => FindingKind::ValueOmission,
            Self::Duplicate { .. } => FindingKind::Duplicate,
            Self::Issue { .. } => FindingKind::Issue,
        }
    }

    pub fn aspect(&self) -> &str {
        match self {
            Self::Deviation { aspect, .. }
            | Self::ResourceOmission { aspect, .. }
            | Self::ValueOmission { aspect, .. }
            | Self::Duplicate { aspect, .. }
            | Self::Issue { aspect, .. } => aspect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Deviation,
    ResourceOmission,
    ValueOmission,
    Duplicate,
    Issue,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deviation => write!(f, "deviation"),
            Self::ResourceOmission => write!(f, "resource_omission"),
            Self::ValueOmission => write!(f, "value_omission"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::Issue => write!(f, "issue"),
        }
    }
}

/// Findings per owning dataset. Ordered, so exact repeats collapse and
/// output order does not depend on discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Findings(BTreeMap<Dataset, BTreeSet<Finding>>);

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the dataset already had this finding.
    pub fn file(&mut self, dataset: &Dataset, finding: Finding) -> bool {
        self.0.entry(dataset.clone()).or_default().insert(finding)
    }

    pub fn of(&self, dataset: &Dataset) -> impl Iterator<Item = &Finding> {
        self.0.get(dataset).into_iter().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Dataset, &Finding)> {
        self.0
            .iter()
            .flat_map(|(dataset, findings)| findings.iter().map(move |f| (dataset, f)))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn merge(&mut self, other: Findings) {
        for (dataset, findings) in other.0 {
            self.0.entry(dataset).or_default().extend(findings);
        }
    }
}

// ---------------------------------------------------------------------------
// Known-wrong values
// ---------------------------------------------------------------------------

/// A value already diagnosed as wrong in an earlier run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WrongValue {
    pub aspect: String,
    pub resource: Resource,
    pub variable: String,
    pub value: Value,
}

/// Known-wrong values per dataset, used to keep disagreements that were
/// already diagnosed from being reported again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownWrongValues(BTreeMap<Dataset, BTreeSet<WrongValue>>);

impl KnownWrongValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dataset: impl Into<Dataset>, wrong: WrongValue) {
        self.0.entry(dataset.into()).or_default().insert(wrong);
    }

    pub fn contains(
        &self,
        dataset: &Dataset,
        aspect: &str,
        resource: &Resource,
        variable: &str,
        value: &Value,
    ) -> bool {
        self.0.get(dataset).is_some_and(|known| {
            known.iter().any(|w| {
                w.aspect == aspect && &w.resource == resource && w.variable == variable && &w.value == value
            })
        })
    }
}
