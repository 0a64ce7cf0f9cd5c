//! Aspects: named entity types and the collaborator that extracts them.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::{Dataset, Resource, Value};

use crate::config::{AspectConfig, VariableKind};
use crate::error::CompareError;

/// An entity type and, per dataset, the variables that dataset binds for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aspect {
    name: String,
    variables_by_dataset: BTreeMap<Dataset, BTreeSet<String>>,
    kinds: BTreeMap<String, VariableKind>,
}

impl Aspect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables_by_dataset: BTreeMap::new(),
            kinds: BTreeMap::new(),
        }
    }

    pub fn from_config(name: &str, config: &AspectConfig) -> Self {
        let mut aspect = Self::new(name);
        for (dataset, dataset_config) in &config.datasets {
            aspect = aspect.with_dataset(dataset.clone(), dataset_config.variables.iter().cloned());
        }
        for (variable, variable_config) in &config.variables {
            aspect = aspect.with_kind(variable.clone(), variable_config.kind);
        }
        aspect
    }

    pub fn with_dataset(
        mut self,
        dataset: impl Into<Dataset>,
        variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.variables_by_dataset
            .entry(dataset.into())
            .or_default()
            .extend(variables.into_iter().map(Into::into));
        self
    }

    pub fn with_kind(mut self, variable: impl Into<String>, kind: VariableKind) -> Self {
        self.kinds.insert(variable.into(), kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.variables_by_dataset.keys()
    }

    pub fn covers_dataset(&self, dataset: &Dataset) -> bool {
        self.variables_by_dataset.contains_key(dataset)
    }

    /// `true` if `dataset` binds `variable` for this aspect.
    pub fn variable_covered_by(&self, variable: &str, dataset: &Dataset) -> bool {
        self.variables_by_dataset
            .get(dataset)
            .is_some_and(|vars| vars.contains(variable))
    }

    /// Datasets binding `variable`, in order.
    pub fn datasets_covering(&self, variable: &str) -> BTreeSet<Dataset> {
        self.variables_by_dataset
            .iter()
            .filter(|(_, vars)| vars.contains(variable))
            .map(|(dataset, _)| dataset.clone())
            .collect()
    }

    pub fn kind_of(&self, variable: &str) -> VariableKind {
        self.kinds.get(variable).copied().unwrap_or_default()
    }

    pub(crate) fn check_dataset(&self, dataset: &Dataset) -> Result<(), CompareError> {
        if self.covers_dataset(dataset) {
            Ok(())
        } else {
            Err(CompareError::UnknownDataset {
                aspect: self.name.clone(),
                dataset: dataset.to_string(),
            })
        }
    }
}

/// Supplies extracted entities and their bindings.
///
/// Implementations may fail on unreadable input; an aspect or dataset they
/// do not know is an error too, not an empty result.
pub trait AspectSource {
    /// Distinct keys of the aspect's entities in `dataset`.
    fn keys_of(&self, aspect: &Aspect, dataset: &Dataset) -> Result<BTreeSet<Resource>, CompareError>;

    /// Values bound to `variable` for `resource`. May contain repeats.
    fn values_of(
        &self,
        aspect: &Aspect,
        dataset: &Dataset,
        resource: &Resource,
        variable: &str,
    ) -> Result<Vec<Value>, CompareError>;
}

/// Which datasets surfaced each key, restricted to the aspect's datasets.
pub(crate) fn load_keys(
    source: &dyn AspectSource,
    aspect: &Aspect,
) -> Result<BTreeMap<Dataset, BTreeSet<Resource>>, CompareError> {
    let mut keys = BTreeMap::new();
    for dataset in aspect.datasets() {
        keys.insert(dataset.clone(), source.keys_of(aspect, dataset)?);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Aspect {
        Aspect::new("person")
            .with_dataset("alpha", ["label", "employer"])
            .with_dataset("beta", ["label"])
            .with_kind("employer", VariableKind::Resource)
    }

    #[test]
    fn variable_coverage() {
        let aspect = person();
        let alpha = Dataset::from("alpha");
        let beta = Dataset::from("beta");
        assert!(aspect.variable_covered_by("employer", &alpha));
        assert!(!aspect.variable_covered_by("employer", &beta));
        assert_eq!(aspect.datasets_covering("label").len(), 2);
        assert_eq!(
            aspect.datasets_covering("employer"),
            BTreeSet::from([alpha])
        );
    }

    #[test]
    fn kinds_default_to_any() {
        let aspect = person();
        assert_eq!(aspect.kind_of("employer"), VariableKind::Resource);
        assert_eq!(aspect.kind_of("label"), VariableKind::Any);
    }

    #[test]
    fn unknown_dataset() {
        let aspect = person();
        assert!(aspect.check_dataset(&Dataset::from("beta")).is_ok());
        let err = aspect.check_dataset(&Dataset::from("gamma")).unwrap_err();
        assert!(err.to_string().contains("'gamma'"));
    }
}
