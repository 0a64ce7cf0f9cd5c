//! Entity-level comparison: counts, duplicates, coverage, coveredness and
//! completeness of an aspect's population across datasets.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::{CorrespondenceStore, Dataset, DatasetPair, Resource};

use crate::aspect::{load_keys, Aspect, AspectSource};
use crate::error::CompareError;
use crate::finding::{Finding, Findings};
use crate::measure::{Measurement, Tally};

#[derive(Debug, Clone, Default)]
pub struct PopulationOutcome {
    pub measurements: Vec<Measurement>,
    pub findings: Findings,
}

/// Loads the aspect's keys from `source` and compares them.
pub fn compare_population(
    source: &dyn AspectSource,
    aspect: &Aspect,
    store: &CorrespondenceStore,
) -> Result<PopulationOutcome, CompareError> {
    let keys = load_keys(source, aspect)?;
    Ok(measure_population(aspect, &keys, store))
}

/// Compares pre-loaded keys. Datasets of the aspect missing from `keys`
/// count as empty.
pub fn measure_population(
    aspect: &Aspect,
    keys: &BTreeMap<Dataset, BTreeSet<Resource>>,
    store: &CorrespondenceStore,
) -> PopulationOutcome {
    let datasets: Vec<Dataset> = aspect.datasets().cloned().collect();
    let pairs = DatasetPair::pairs_of(&datasets);
    let mut tally = Tally::new(datasets.iter().cloned());
    let mut findings = Findings::new();

    let mut unprocessed: BTreeMap<Dataset, BTreeSet<Resource>> = datasets
        .iter()
        .map(|d| (d.clone(), keys.get(d).cloned().unwrap_or_default()))
        .collect();
    for (dataset, resources) in &unprocessed {
        tally.add_count(dataset, resources.len() as u64);
    }

    let universe: BTreeSet<Resource> = unprocessed.values().flatten().cloned().collect();
    let mut groups = 0usize;

    for group in store.correspondence_groups(&universe) {
        groups += 1;

        // Snapshot the intersections before touching the working sets.
        let members: BTreeMap<Dataset, BTreeSet<Resource>> = unprocessed
            .iter()
            .map(|(d, rest)| (d.clone(), group.intersection(rest).cloned().collect()))
            .collect();
        for (dataset, matched) in &members {
            if let Some(rest) = unprocessed.get_mut(dataset) {
                rest.retain(|r| !matched.contains(r));
            }
        }

        let present: BTreeSet<&Dataset> = members
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(d, _)| d)
            .collect();

        for pair in &pairs {
            if present.contains(&pair.first) && present.contains(&pair.second) {
                tally.add_coverage(pair, 1);
            }
        }

        for (dataset, matched) in &members {
            if matched.is_empty() {
                // Everything the others have here is missing in `dataset`.
                for (other, resources) in &members {
                    for resource in resources {
                        findings.file(
                            dataset,
                            Finding::ResourceOmission {
                                aspect: aspect.name().to_string(),
                                compared_to_dataset: other.clone(),
                                compared_to_resource: resource.clone(),
                            },
                        );
                    }
                }
                continue;
            }

            tally.add_duplicates(dataset, matched.len() as u64 - 1);
            let matched: Vec<&Resource> = matched.iter().collect();
            for (i, first) in matched.iter().enumerate() {
                for second in &matched[i + 1..] {
                    findings.file(
                        dataset,
                        Finding::Duplicate {
                            aspect: aspect.name().to_string(),
                            affected_resource: (*first).clone(),
                            duplicate_of: (*second).clone(),
                        },
                    );
                }
            }

            if present.len() > 1 {
                tally.add_coveredness(dataset, 1);
            }
        }
    }

    // Groups partition the universe, so every resource was matched.
    debug_assert!(unprocessed.values().all(BTreeSet::is_empty));

    log::info!(
        "population of '{}': {} resources in {} groups across {} datasets, {} findings",
        aspect.name(),
        universe.len(),
        groups,
        datasets.len(),
        findings.len()
    );

    PopulationOutcome {
        measurements: tally.measurements(aspect.name(), None),
        findings,
    }
}
