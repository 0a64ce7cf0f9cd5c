use std::collections::BTreeMap;
use std::path::Path;

use concord_core::{CorrespondenceStore, Dataset};

use crate::aspect::{Aspect, AspectSource};
use crate::attribute::compare_attributes;
use crate::config::CompareConfig;
use crate::error::CompareError;
use crate::evidence::compute_summary;
use crate::finding::Findings;
use crate::mapping::apply_mapping;
use crate::measure::Measurement;
use crate::model::{CompareMeta, CompareResult, PriorState};
use crate::population::compare_population;
use crate::source::CsvSource;

/// Run every configured step: mappings first, then population and attribute
/// comparisons against the resulting correspondences.
///
/// Either the whole run succeeds or nothing is returned.
pub fn run(
    config: &CompareConfig,
    source: &dyn AspectSource,
    prior: &PriorState,
) -> Result<CompareResult, CompareError> {
    config.validate()?;
    log::info!("run '{}' started", config.name);

    let aspects: BTreeMap<&str, Aspect> = config
        .aspects
        .iter()
        .map(|(name, aspect_config)| (name.as_str(), Aspect::from_config(name, aspect_config)))
        .collect();
    let aspect = |name: &str| {
        aspects
            .get(name)
            .ok_or_else(|| CompareError::UnknownAspect(name.to_string()))
    };

    let mut store = CorrespondenceStore::from_snapshot(&prior.correspondence);
    let mut findings = Findings::new();
    let mut measurements: BTreeMap<Dataset, Vec<Measurement>> = BTreeMap::new();

    for mapping in &config.mappings {
        let outcome = apply_mapping(mapping, source, aspect(&mapping.aspect)?, &mut store)?;
        findings.merge(outcome.findings);
    }

    for name in &config.population.aspects {
        let outcome = compare_population(source, aspect(name)?, &store)?;
        file_measurements(&mut measurements, outcome.measurements);
        findings.merge(outcome.findings);
    }

    for attribute in &config.attributes {
        let equivalence = attribute.equivalence()?;
        let outcome = compare_attributes(
            source,
            aspect(&attribute.aspect)?,
            &attribute.variables,
            &equivalence,
            &store,
            &prior.known_wrong,
        )?;
        file_measurements(&mut measurements, outcome.measurements);
        findings.merge(outcome.findings);
    }

    let correspondences = store.added_edges().to_vec();
    let summary = compute_summary(&measurements, &findings, &correspondences);
    log::info!(
        "run '{}' finished: {} measurements, {} findings, {} new edges",
        config.name,
        summary.measurements,
        summary.total_findings,
        correspondences.len()
    );

    Ok(CompareResult {
        meta: CompareMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        measurements,
        findings,
        correspondences,
    })
}

/// Load a TOML config and its CSV files (relative to the config's directory)
/// and run it.
pub fn run_files(config_path: &Path, prior: &PriorState) -> Result<CompareResult, CompareError> {
    let config_toml = std::fs::read_to_string(config_path)
        .map_err(|e| CompareError::Io(format!("{}: {e}", config_path.display())))?;
    let config = CompareConfig::from_toml(&config_toml)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let source = CsvSource::load(&config, base_dir)?;
    run(&config, &source, prior)
}

fn file_measurements(into: &mut BTreeMap<Dataset, Vec<Measurement>>, measurements: Vec<Measurement>) {
    for measurement in measurements {
        into.entry(measurement.computed_on.clone())
            .or_default()
            .push(measurement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{CorrespondenceEdge, Resource, Value};

    use crate::finding::{Finding, WrongValue};
    use crate::measure::Measure;
    use crate::source::MemorySource;

    const CONFIG: &str = r#"
name = "Engine"

[aspects.person.datasets.a]
variables = ["label", "same_as"]

[aspects.person.datasets.b]
variables = ["label"]

[population]
aspects = ["person"]

[[attributes]]
aspect = "person"
variables = ["label"]

[[mappings]]
kind = "use_present"
aspect = "person"
variables = ["same_as"]
"#;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_value("person", "a", "a1", "label", Value::string("Ada"))
            .with_value("person", "a", "a1", "same_as", Value::resource("b1"))
            .with_value("person", "a", "a2", "label", Value::string("Alan"))
            .with_value("person", "b", "b1", "label", Value::string("Ada"))
            .with_value("person", "b", "b1", "label", Value::string("Augusta"))
    }

    #[test]
    fn mappings_feed_comparisons() {
        let config = CompareConfig::from_toml(CONFIG).unwrap();
        let result = run(&config, &source(), &PriorState::default()).unwrap();

        assert_eq!(
            result.correspondences,
            vec![CorrespondenceEdge::Corresponds {
                left: Resource::from("b1"),
                right: Resource::from("a1"),
            }]
        );

        let a = Dataset::from("a");
        let coverage = result.measurements[&a]
            .iter()
            .find(|m| m.measure == Measure::AbsoluteCoverage && m.variable.is_none())
            .unwrap();
        assert_eq!(coverage.value.to_string(), "1");

        // b misses a2; a1 misses "Augusta" from b1
        assert!(result.findings.of(&Dataset::from("b")).any(|f| matches!(
            f,
            Finding::ResourceOmission { compared_to_resource, .. } if compared_to_resource == &Resource::from("a2")
        )));
        assert!(result.findings.of(&Dataset::from("b")).any(|f| matches!(
            f,
            Finding::ValueOmission { affected_value, .. } if affected_value == &Value::string("Augusta")
        )));
        assert_eq!(result.summary.total_findings, result.findings.len());
        assert_eq!(result.meta.config_name, "Engine");
    }

    #[test]
    fn prior_state_seeds_and_suppresses() {
        let config = CompareConfig::from_toml(CONFIG).unwrap();
        let mut prior = PriorState::default();
        prior
            .correspondence
            .corresponds
            .push((Resource::from("a1"), Resource::from("b1")));
        prior.known_wrong.insert(
            "b",
            WrongValue {
                aspect: "person".into(),
                resource: Resource::from("b1"),
                variable: "label".into(),
                value: Value::string("Augusta"),
            },
        );

        let result = run(&config, &source(), &prior).unwrap();
        assert!(result.correspondences.is_empty());
        assert_eq!(result.summary.new_correspondences, 0);
        assert!(!result
            .findings
            .iter()
            .any(|(_, f)| matches!(f, Finding::ValueOmission { .. })));
    }

    #[test]
    fn unknown_dataset_in_source_fails_run() {
        struct Failing;
        impl AspectSource for Failing {
            fn keys_of(
                &self,
                aspect: &Aspect,
                dataset: &Dataset,
            ) -> Result<std::collections::BTreeSet<Resource>, CompareError> {
                Err(CompareError::UnknownDataset {
                    aspect: aspect.name().into(),
                    dataset: dataset.to_string(),
                })
            }

            fn values_of(
                &self,
                _: &Aspect,
                _: &Dataset,
                _: &Resource,
                _: &str,
            ) -> Result<Vec<Value>, CompareError> {
                Ok(vec![])
            }
        }

        let config = CompareConfig::from_toml(CONFIG).unwrap();
        assert!(run(&config, &Failing, &PriorState::default()).is_err());
    }

    #[test]
    fn prior_state_from_json() {
        let prior = PriorState::from_json(
            r#"{
                "correspondence": { "corresponds": [["a1", "b1"]] },
                "known_wrong": { "b": [
                    { "aspect": "person", "resource": "b1", "variable": "label", "value": "\"Augusta\"" }
                ] }
            }"#,
        )
        .unwrap();
        assert_eq!(prior.correspondence.corresponds.len(), 1);
        assert!(prior.known_wrong.contains(
            &Dataset::from("b"),
            "person",
            &Resource::from("b1"),
            "label",
            &Value::string("Augusta"),
        ));
        assert!(PriorState::from_json("{").is_err());
    }
}
