//! Mappings: steps that assert correspondences before comparison.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::{CorrespondenceStore, Dataset, DatasetPair, Resource, Value};

use crate::aspect::{load_keys, Aspect, AspectSource};
use crate::config::{MappingConfig, MappingKind};
use crate::error::CompareError;
use crate::finding::{Finding, Findings, INVALID_VALUE};

#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    /// Insertions that changed the store.
    pub linked: usize,
    pub findings: Findings,
}

pub fn apply_mapping(
    mapping: &MappingConfig,
    source: &dyn AspectSource,
    aspect: &Aspect,
    store: &mut CorrespondenceStore,
) -> Result<MappingOutcome, CompareError> {
    let outcome = match mapping.kind {
        MappingKind::UsePresent => use_present(source, aspect, &mapping.variables, store)?,
        MappingKind::EquivalentValues => {
            equivalent_values(source, aspect, &mapping.variables, store)?
        }
        MappingKind::JaroWinkler => jaro_winkler(
            source,
            aspect,
            &mapping.variables,
            mapping.threshold,
            mapping.case_sensitive,
            store,
        )?,
    };
    log::info!(
        "mapping {:?} of '{}' on {:?}: {} new links, {} issues",
        mapping.kind,
        aspect.name(),
        mapping.variables,
        outcome.linked,
        outcome.findings.len()
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Use present
// ---------------------------------------------------------------------------

/// Links each resource to the resources its `variables` point to. Resources
/// pointing to the same target are linked together with it in one step.
pub fn use_present(
    source: &dyn AspectSource,
    aspect: &Aspect,
    variables: &[String],
    store: &mut CorrespondenceStore,
) -> Result<MappingOutcome, CompareError> {
    let keys = load_keys(source, aspect)?;
    let mut outcome = MappingOutcome::default();

    for (dataset, resources) in &keys {
        for variable in variables {
            if !aspect.variable_covered_by(variable, dataset) {
                log::warn!(
                    "missing variable '{variable}' in aspect '{}' for dataset '{dataset}'",
                    aspect.name()
                );
                continue;
            }

            let mut by_target: BTreeMap<Resource, BTreeSet<Resource>> = BTreeMap::new();
            for resource in resources {
                for value in source.values_of(aspect, dataset, resource, variable)? {
                    match value {
                        Value::Resource(target) => {
                            by_target.entry(target).or_default().insert(resource.clone());
                        }
                        Value::Literal(_) => {
                            let comment = format!(
                                "failed to get corresponding resource, found a literal: {value}"
                            );
                            outcome.findings.file(
                                dataset,
                                Finding::Issue {
                                    aspect: aspect.name().to_string(),
                                    affected_resource: resource.clone(),
                                    affected_variable: Some(variable.clone()),
                                    affected_value: Some(value),
                                    issue_type: INVALID_VALUE.to_string(),
                                    comment,
                                },
                            );
                        }
                    }
                }
            }

            for (target, sources) in by_target {
                let mut linked: Vec<Resource> = Vec::with_capacity(sources.len() + 1);
                linked.push(target);
                linked.extend(sources);
                if store.add_correspondence(&linked) {
                    outcome.linked += 1;
                }
            }
        }
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Equivalent values
// ---------------------------------------------------------------------------

/// One value per mapped variable. Resource values stand for their
/// correspondence group.
type Combination = Vec<Value>;

/// Links resources of different datasets that share at least one value
/// combination of `variables`, so multi-valued variables need only one
/// equivalent value each. Resources lacking a value for any of the
/// variables are not indexed.
pub fn equivalent_values(
    source: &dyn AspectSource,
    aspect: &Aspect,
    variables: &[String],
    store: &mut CorrespondenceStore,
) -> Result<MappingOutcome, CompareError> {
    let keys = load_keys(source, aspect)?;
    let mut outcome = MappingOutcome::default();

    let usable: Vec<&Dataset> = keys
        .keys()
        .filter(|dataset| {
            let covered = variables
                .iter()
                .all(|v| aspect.variable_covered_by(v, dataset));
            if !covered {
                log::debug!(
                    "aspect '{}': dataset '{dataset}' lacks some of {variables:?}, skipped by mapping",
                    aspect.name()
                );
            }
            covered
        })
        .collect();

    let mut indexes: BTreeMap<&Dataset, BTreeMap<Combination, BTreeSet<Resource>>> = BTreeMap::new();
    for dataset in &usable {
        let index = indexes.entry(*dataset).or_default();
        for resource in keys.get(*dataset).into_iter().flatten() {
            let mut per_variable: Vec<BTreeSet<Value>> = Vec::with_capacity(variables.len());
            for variable in variables {
                let values: BTreeSet<Value> = source
                    .values_of(aspect, dataset, resource, variable)?
                    .into_iter()
                    .map(|value| match value {
                        Value::Resource(r) => Value::Resource(store.representative(&r)),
                        literal => literal,
                    })
                    .collect();
                per_variable.push(values);
            }
            for combination in combinations(&per_variable) {
                index.entry(combination).or_default().insert(resource.clone());
            }
        }
    }

    for pair in DatasetPair::pairs_of(usable.iter().copied()) {
        let (Some(first), Some(second)) = (indexes.get(&pair.first), indexes.get(&pair.second)) else {
            continue;
        };
        for (combination, left) in first {
            let Some(right) = second.get(combination) else {
                continue;
            };
            let linked: Vec<Resource> = left.iter().chain(right).cloned().collect();
            if store.add_correspondence(&linked) {
                outcome.linked += 1;
            }
        }
    }
    Ok(outcome)
}

/// Cartesian product of the value sets, in order. Empty if any set is empty.
fn combinations(per_variable: &[BTreeSet<Value>]) -> Vec<Combination> {
    let mut out: Vec<Combination> = vec![Vec::with_capacity(per_variable.len())];
    for values in per_variable {
        out = out
            .iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect();
    }
    out
}

// ---------------------------------------------------------------------------
// Jaro-Winkler
// ---------------------------------------------------------------------------

/// Per variable and dataset pair, links resources whose literal values are
/// each other's most similar value at or above `threshold`. Resource values
/// are ignored.
pub fn jaro_winkler(
    source: &dyn AspectSource,
    aspect: &Aspect,
    variables: &[String],
    threshold: f64,
    case_sensitive: bool,
    store: &mut CorrespondenceStore,
) -> Result<MappingOutcome, CompareError> {
    let keys = load_keys(source, aspect)?;
    let mut outcome = MappingOutcome::default();

    for variable in variables {
        let mut indexes: BTreeMap<&Dataset, BTreeMap<String, BTreeSet<Resource>>> = BTreeMap::new();
        for (dataset, resources) in &keys {
            if !aspect.variable_covered_by(variable, dataset) {
                log::debug!(
                    "aspect '{}': dataset '{dataset}' lacks '{variable}', skipped by mapping",
                    aspect.name()
                );
                continue;
            }
            let index = indexes.entry(dataset).or_default();
            for resource in resources {
                for value in source.values_of(aspect, dataset, resource, variable)? {
                    let Some(literal) = value.as_literal() else {
                        continue;
                    };
                    let text = if case_sensitive {
                        literal.lexical().to_string()
                    } else {
                        literal.lexical().to_lowercase()
                    };
                    index.entry(text).or_default().insert(resource.clone());
                }
            }
        }

        for pair in DatasetPair::pairs_of(indexes.keys().copied()) {
            let (Some(first), Some(second)) = (indexes.get(&pair.first), indexes.get(&pair.second)) else {
                continue;
            };
            let best_in_second: BTreeMap<&str, Vec<&str>> = first
                .keys()
                .map(|value| (value.as_str(), best_matches(value, second.keys(), threshold)))
                .collect();
            // Only mutual best matches keep the result independent of pair order.
            for (value2, resources2) in second {
                for value1 in best_matches(value2, first.keys(), threshold) {
                    let mutual = best_in_second
                        .get(value1)
                        .is_some_and(|matches| matches.contains(&value2.as_str()));
                    if !mutual {
                        continue;
                    }
                    for resource1 in &first[value1] {
                        for resource2 in resources2 {
                            if store.add_correspondence(&[resource1.clone(), resource2.clone()]) {
                                outcome.linked += 1;
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(outcome)
}

/// Candidates with the highest similarity to `value`, if at least `threshold`.
fn best_matches<'v>(
    value: &str,
    candidates: impl IntoIterator<Item = &'v String>,
    threshold: f64,
) -> Vec<&'v str> {
    let mut best = Vec::new();
    let mut best_score = threshold;
    for candidate in candidates {
        let score = strsim::jaro_winkler(value, candidate);
        if score < best_score {
            continue;
        }
        if score > best_score {
            best.clear();
            best_score = score;
        }
        best.push(candidate.as_str());
    }
    best
}
