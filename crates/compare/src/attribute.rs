//! Value-level comparison of an aspect's variables between corresponding
//! resources: counts, coverage and completeness per variable, plus
//! deviation and omission findings.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::{
    CorrespondenceStore, Dataset, DatasetPair, EquivalenceConfig, Resource, Value, ValueEquivalence,
};

use crate::aspect::{load_keys, Aspect, AspectSource};
use crate::config::VariableKind;
use crate::error::CompareError;
use crate::finding::{Finding, Findings, KnownWrongValues, INVALID_VALUE};
use crate::measure::{Measurement, Tally};

#[derive(Debug, Clone, Default)]
pub struct AttributeOutcome {
    pub measurements: Vec<Measurement>,
    pub findings: Findings,
}

/// Values usable for comparison, keyed by (dataset, resource, variable).
/// Absent when the binding was rejected.
type Bindings = BTreeMap<(Dataset, Resource, String), Vec<Value>>;

pub fn compare_attributes(
    source: &dyn AspectSource,
    aspect: &Aspect,
    variables: &[String],
    config: &EquivalenceConfig,
    store: &CorrespondenceStore,
    known_wrong: &KnownWrongValues,
) -> Result<AttributeOutcome, CompareError> {
    let equivalence = ValueEquivalence::new(config, store);
    let keys = load_keys(source, aspect)?;
    let mut findings = Findings::new();

    let bindings = load_bindings(source, aspect, variables, &keys, &equivalence, &mut findings)?;

    let mut comparison = Comparison {
        aspect,
        equivalence: &equivalence,
        known_wrong,
        bindings: &bindings,
        findings,
        suppressed: 0,
    };

    let mut tallies: BTreeMap<&str, Tally> = variables
        .iter()
        .map(|v| (v.as_str(), Tally::new(aspect.datasets_covering(v))))
        .collect();

    let universe: BTreeSet<Resource> = keys.values().flatten().cloned().collect();
    for group in store.correspondence_groups(&universe) {
        let members: BTreeMap<&Dataset, Vec<&Resource>> = keys
            .iter()
            .map(|(d, resources)| (d, group.iter().filter(|r| resources.contains(*r)).collect()))
            .collect();
        for (variable, tally) in tallies.iter_mut() {
            comparison.measure_group(variable, &members, tally);
            comparison.report_group(variable, &members);
        }
    }

    if comparison.suppressed > 0 {
        log::debug!(
            "aspect '{}': {} findings suppressed by known-wrong values",
            aspect.name(),
            comparison.suppressed
        );
    }
    log::info!(
        "attributes of '{}': {} variables, {} findings",
        aspect.name(),
        variables.len(),
        comparison.findings.len()
    );

    let measurements = tallies
        .iter()
        .flat_map(|(variable, tally)| tally.measurements(aspect.name(), Some(*variable)))
        .collect();
    Ok(AttributeOutcome {
        measurements,
        findings: comparison.findings,
    })
}

/// Fetches the bindings of every tracked variable. Wrong-kind values reject
/// the whole (resource, variable) binding with an issue; excluded values
/// and exact repeats are dropped.
fn load_bindings(
    source: &dyn AspectSource,
    aspect: &Aspect,
    variables: &[String],
    keys: &BTreeMap<Dataset, BTreeSet<Resource>>,
    equivalence: &ValueEquivalence<'_>,
    findings: &mut Findings,
) -> Result<Bindings, CompareError> {
    let mut bindings = Bindings::new();
    for (dataset, resources) in keys {
        for variable in variables {
            if !aspect.variable_covered_by(variable, dataset) {
                continue;
            }
            let kind = aspect.kind_of(variable);
            for resource in resources {
                let raw = source.values_of(aspect, dataset, resource, variable)?;

                let wrong: Vec<&Value> = raw.iter().filter(|v| !accepts(kind, v)).collect();
                if !wrong.is_empty() {
                    for value in wrong {
                        findings.file(
                            dataset,
                            Finding::Issue {
                                aspect: aspect.name().to_string(),
                                affected_resource: resource.clone(),
                                affected_variable: Some(variable.clone()),
                                affected_value: Some(value.clone()),
                                issue_type: INVALID_VALUE.to_string(),
                                comment: format!("expected a {kind} value, found {value}"),
                            },
                        );
                    }
                    continue;
                }

                let mut values: Vec<Value> = Vec::with_capacity(raw.len());
                for value in raw {
                    if !equivalence.is_excluded(&value) && !values.contains(&value) {
                        values.push(value);
                    }
                }
                bindings.insert((dataset.clone(), resource.clone(), variable.clone()), values);
            }
        }
    }
    Ok(bindings)
}

fn accepts(kind: VariableKind, value: &Value) -> bool {
    match kind {
        VariableKind::Resource => value.as_resource().is_some(),
        VariableKind::Literal => value.as_literal().is_some(),
        VariableKind::Any => true,
    }
}

// ---------------------------------------------------------------------------
// Per-group work
// ---------------------------------------------------------------------------

struct Comparison<'a> {
    aspect: &'a Aspect,
    equivalence: &'a ValueEquivalence<'a>,
    known_wrong: &'a KnownWrongValues,
    bindings: &'a Bindings,
    findings: Findings,
    suppressed: usize,
}

impl<'a> Comparison<'a> {
    fn values(&self, dataset: &Dataset, resource: &Resource, variable: &str) -> Option<&'a [Value]> {
        self.bindings
            .get(&(dataset.clone(), resource.clone(), variable.to_string()))
            .map(Vec::as_slice)
    }

    /// Folds values into buckets of equivalent values; each bucket is
    /// represented by its first value.
    fn buckets(&self, values: impl IntoIterator<Item = &'a Value>) -> Vec<&'a Value> {
        let mut buckets: Vec<&Value> = Vec::new();
        for value in values {
            if !buckets.iter().any(|b| self.equivalence.equivalent(value, b)) {
                buckets.push(value);
            }
        }
        buckets
    }

    fn measure_group(
        &self,
        variable: &str,
        members: &BTreeMap<&Dataset, Vec<&Resource>>,
        tally: &mut Tally,
    ) {
        let mut buckets: BTreeMap<&Dataset, Vec<&Value>> = BTreeMap::new();
        for (dataset, resources) in members {
            if resources.is_empty() || !tally.datasets().contains(*dataset) {
                continue;
            }
            let raw: Vec<&Value> = resources
                .iter()
                .filter_map(|r| self.values(dataset, r, variable))
                .flatten()
                .collect();
            let distinct = self.buckets(raw.iter().copied());
            tally.add_count(dataset, raw.len() as u64);
            tally.add_duplicates(dataset, (raw.len() - distinct.len()) as u64);
            buckets.insert(*dataset, distinct);
        }

        let buckets: Vec<(&Dataset, Vec<&Value>)> = buckets.into_iter().collect();
        for (i, (first, first_buckets)) in buckets.iter().enumerate() {
            for (second, second_buckets) in &buckets[i + 1..] {
                if let Some(pair) = DatasetPair::new((*first).clone(), (*second).clone()) {
                    tally.add_coverage(&pair, self.matching(first_buckets, second_buckets));
                }
            }

            let covered = first_buckets
                .iter()
                .filter(|value| {
                    buckets
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .any(|(_, (_, others))| others.iter().any(|o| self.equivalence.equivalent(value, o)))
                })
                .count();
            tally.add_coveredness(first, covered as u64);
        }
    }

    /// Greedy one-to-one matching of equivalent buckets.
    fn matching(&self, left: &[&Value], right: &[&Value]) -> u64 {
        let mut used = vec![false; right.len()];
        let mut matched = 0;
        for value in left {
            let hit = right
                .iter()
                .enumerate()
                .position(|(i, other)| !used[i] && self.equivalence.equivalent(value, other));
            if let Some(i) = hit {
                used[i] = true;
                matched += 1;
            }
        }
        matched
    }

    /// Compares every pair of bound resources in the group: across datasets,
    /// and within a dataset for duplicates.
    fn report_group(&mut self, variable: &str, members: &BTreeMap<&Dataset, Vec<&Resource>>) {
        let bound: Vec<(&Dataset, &Resource, &'a [Value])> = members
            .iter()
            .flat_map(|(d, resources)| resources.iter().map(move |r| (*d, *r)))
            .filter_map(|(d, r)| self.values(d, r, variable).map(|vs| (d, r, vs)))
            .collect();

        for (i, first) in bound.iter().enumerate() {
            for second in &bound[i + 1..] {
                self.report_pair(variable, *first, *second);
            }
        }
    }

    fn report_pair(
        &mut self,
        variable: &str,
        (d1, r1, values1): (&Dataset, &Resource, &[Value]),
        (d2, r2, values2): (&Dataset, &Resource, &[Value]),
    ) {
        let uncovered1 = self.uncovered(values1, values2);
        let uncovered2 = self.uncovered(values2, values1);

        match (uncovered1.is_empty(), uncovered2.is_empty()) {
            (true, true) => {}
            (true, false) => self.report_omissions(variable, (d2, r2), &uncovered2, (d1, r1)),
            (false, true) => self.report_omissions(variable, (d1, r1), &uncovered1, (d2, r2)),
            (false, false) => {
                for value1 in &uncovered1 {
                    for value2 in &uncovered2 {
                        self.report_deviation(variable, (d1, r1, *value1), (d2, r2, *value2));
                        self.report_deviation(variable, (d2, r2, *value2), (d1, r1, *value1));
                    }
                }
            }
        }
    }

    /// Values of `values` without an equivalent in `others`.
    fn uncovered<'v>(&self, values: &'v [Value], others: &[Value]) -> Vec<&'v Value> {
        values
            .iter()
            .filter(|v| !others.iter().any(|o| self.equivalence.equivalent(v, o)))
            .collect()
    }

    /// Files omissions under the side holding the values.
    fn report_omissions(
        &mut self,
        variable: &str,
        (holder_dataset, holder): (&Dataset, &Resource),
        values: &[&Value],
        (lacking_dataset, lacking): (&Dataset, &Resource),
    ) {
        for value in values {
            if self.is_known_wrong(holder_dataset, holder, variable, value) {
                continue;
            }
            self.findings.file(
                holder_dataset,
                Finding::ValueOmission {
                    aspect: self.aspect.name().to_string(),
                    affected_resource: holder.clone(),
                    affected_variable: variable.to_string(),
                    affected_value: (*value).clone(),
                    compared_to_dataset: lacking_dataset.clone(),
                    compared_to_resource: lacking.clone(),
                },
            );
        }
    }

    /// Files a deviation of `affected` under its dataset, unless the value it
    /// is compared to is known to be wrong.
    fn report_deviation(
        &mut self,
        variable: &str,
        (dataset, resource, value): (&Dataset, &Resource, &Value),
        (other_dataset, other, other_value): (&Dataset, &Resource, &Value),
    ) {
        if self.is_known_wrong(other_dataset, other, variable, other_value) {
            return;
        }
        self.findings.file(
            dataset,
            Finding::Deviation {
                aspect: self.aspect.name().to_string(),
                affected_resource: resource.clone(),
                affected_variable: variable.to_string(),
                affected_value: value.clone(),
                compared_to_dataset: other_dataset.clone(),
                compared_to_resource: other.clone(),
                compared_to_value: other_value.clone(),
            },
        );
    }

    fn is_known_wrong(&mut self, dataset: &Dataset, resource: &Resource, variable: &str, value: &Value) -> bool {
        let known = self
            .known_wrong
            .contains(dataset, self.aspect.name(), resource, variable, value);
        if known {
            self.suppressed += 1;
        }
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::LanguagePattern;

    use crate::finding::WrongValue;
    use crate::measure::Measure;
    use crate::source::MemorySource;

    fn v(term: &str) -> Value {
        Value::parse_term(term).unwrap()
    }

    fn r(name: &str) -> Resource {
        Resource::from(name)
    }

    fn d(name: &str) -> Dataset {
        Dataset::from(name)
    }

    fn person() -> Aspect {
        Aspect::new("person")
            .with_dataset("a", ["label", "employer"])
            .with_dataset("b", ["label", "employer"])
            .with_kind("employer", VariableKind::Resource)
    }

    /// `p` in dataset a and `q` in dataset b, corresponding.
    fn linked() -> CorrespondenceStore {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&[r("p"), r("q")]);
        store
    }

    fn labels(source: MemorySource, entries: &[(&str, &str, &str)]) -> MemorySource {
        entries
            .iter()
            .fold(source, |s, (ds, res, term)| s.with_value("person", *ds, *res, "label", v(term)))
    }

    fn compare(
        source: &MemorySource,
        variable: &str,
        config: &EquivalenceConfig,
        store: &CorrespondenceStore,
        known_wrong: &KnownWrongValues,
    ) -> AttributeOutcome {
        compare_attributes(source, &person(), &[variable.to_string()], config, store, known_wrong).unwrap()
    }

    fn measure(outcome: &AttributeOutcome, measure: Measure, on: &str) -> Option<String> {
        outcome
            .measurements
            .iter()
            .find(|m| m.measure == measure && m.computed_on == d(on))
            .map(|m| m.value.to_string())
    }

    #[test]
    fn one_sided_difference_is_an_omission() {
        let source = labels(
            MemorySource::new(),
            &[("a", "p", "A"), ("a", "p", "B"), ("b", "q", "A")],
        );
        let outcome = compare(
            &source,
            "label",
            &EquivalenceConfig::default(),
            &linked(),
            &KnownWrongValues::new(),
        );

        let in_a: Vec<&Finding> = outcome.findings.of(&d("a")).collect();
        assert_eq!(
            in_a,
            vec![&Finding::ValueOmission {
                aspect: "person".into(),
                affected_resource: r("p"),
                affected_variable: "label".into(),
                affected_value: Value::string("B"),
                compared_to_dataset: d("b"),
                compared_to_resource: r("q"),
            }]
        );
        assert_eq!(outcome.findings.of(&d("b")).count(), 0);
    }

    #[test]
    fn two_sided_difference_is_a_deviation() {
        let source = labels(MemorySource::new(), &[("a", "p", "A"), ("b", "q", "C")]);
        let outcome = compare(
            &source,
            "label",
            &EquivalenceConfig::default(),
            &linked(),
            &KnownWrongValues::new(),
        );

        assert_eq!(outcome.findings.len(), 2);
        assert!(outcome.findings.of(&d("b")).any(|f| *f
            == Finding::Deviation {
                aspect: "person".into(),
                affected_resource: r("q"),
                affected_variable: "label".into(),
                affected_value: Value::string("C"),
                compared_to_dataset: d("a"),
                compared_to_resource: r("p"),
                compared_to_value: Value::string("A"),
            }));
        assert!(outcome
            .findings
            .iter()
            .all(|(_, f)| matches!(f, Finding::Deviation { .. })));
    }

    #[test]
    fn known_wrong_values_suppress_findings() {
        let source = labels(MemorySource::new(), &[("a", "p", "A"), ("b", "q", "C")]);
        let mut known = KnownWrongValues::new();
        known.insert(
            "b",
            WrongValue {
                aspect: "person".into(),
                resource: r("q"),
                variable: "label".into(),
                value: Value::string("C"),
            },
        );
        let outcome = compare(&source, "label", &EquivalenceConfig::default(), &linked(), &known);

        // a's deviation points at the known-wrong C and is dropped
        assert_eq!(outcome.findings.of(&d("a")).count(), 0);
        assert_eq!(outcome.findings.of(&d("b")).count(), 1);
    }

    #[test]
    fn known_wrong_value_suppresses_its_omission() {
        let source = labels(
            MemorySource::new(),
            &[("a", "p", "A"), ("a", "p", "B"), ("b", "q", "A")],
        );
        let mut known = KnownWrongValues::new();
        known.insert(
            "a",
            WrongValue {
                aspect: "person".into(),
                resource: r("p"),
                variable: "label".into(),
                value: Value::string("B"),
            },
        );
        let outcome = compare(&source, "label", &EquivalenceConfig::default(), &linked(), &known);
        assert!(outcome.findings.is_empty());
    }

    #[test]
    fn counts_buckets_and_coverage() {
        let source = MemorySource::new()
            .with_value("person", "a", "p", "label", v("\"1\"^^xsd:integer"))
            .with_value("person", "a", "p", "label", v("\"1.0\"^^xsd:decimal"))
            .with_value("person", "a", "p", "label", v("x"))
            .with_value("person", "b", "q", "label", v("\"1\"^^xsd:double"));
        let outcome = compare(
            &source,
            "label",
            &EquivalenceConfig::default(),
            &linked(),
            &KnownWrongValues::new(),
        );

        assert_eq!(measure(&outcome, Measure::Count, "a").as_deref(), Some("3"));
        assert_eq!(measure(&outcome, Measure::DeduplicatedCount, "a").as_deref(), Some("2"));
        assert_eq!(measure(&outcome, Measure::DuplicateCount, "a").as_deref(), Some("1"));
        assert_eq!(measure(&outcome, Measure::AbsoluteCoverage, "a").as_deref(), Some("1"));
        assert_eq!(measure(&outcome, Measure::RelativeCoveredness, "a").as_deref(), Some("0.5"));
        assert_eq!(measure(&outcome, Measure::RelativeCoveredness, "b").as_deref(), Some("1"));
        // estimate = 2·1 / 1
        assert_eq!(measure(&outcome, Measure::Completeness, "b").as_deref(), Some("0.5"));
        assert!(outcome.measurements.iter().all(|m| m.variable.as_deref() == Some("label")));
    }

    #[test]
    fn coverage_matches_each_bucket_once() {
        let source = MemorySource::new()
            .with_value("person", "a", "p", "label", v("\"2020-01-01\"^^xsd:date"))
            .with_value("person", "b", "q", "label", v("\"2020-01-01T10:00:00\"^^xsd:dateTime"))
            .with_value("person", "b", "q", "label", v("\"2020-01-01T12:00:00\"^^xsd:dateTime"));
        let config = EquivalenceConfig {
            allow_time_skip: true,
            ..EquivalenceConfig::default()
        };
        let outcome = compare(&source, "label", &config, &linked(), &KnownWrongValues::new());

        assert_eq!(measure(&outcome, Measure::DeduplicatedCount, "b").as_deref(), Some("2"));
        assert_eq!(measure(&outcome, Measure::AbsoluteCoverage, "b").as_deref(), Some("1"));
        assert_eq!(measure(&outcome, Measure::AbsoluteCoveredness, "b").as_deref(), Some("2"));
        assert!(outcome.findings.is_empty());
    }

    #[test]
    fn wrong_kind_raises_issue_and_skips_binding() {
        let source = MemorySource::new()
            .with_value("person", "a", "p", "employer", v("\"Acme\""))
            .with_value("person", "b", "q", "employer", v("<http://x/acme>"));
        let outcome = compare(
            &source,
            "employer",
            &EquivalenceConfig::default(),
            &linked(),
            &KnownWrongValues::new(),
        );

        let in_a: Vec<&Finding> = outcome.findings.of(&d("a")).collect();
        assert_eq!(in_a.len(), 1);
        assert!(matches!(
            in_a[0],
            Finding::Issue { issue_type, affected_variable: Some(var), .. }
                if issue_type == INVALID_VALUE && var == "employer"
        ));
        assert_eq!(outcome.findings.of(&d("b")).count(), 0);
        assert_eq!(measure(&outcome, Measure::Count, "a").as_deref(), Some("0"));
    }

    #[test]
    fn resource_values_compare_by_correspondence() {
        let mut store = linked();
        store.add_correspondence(&[r("http://a/acme"), r("http://b/acme")]);
        let source = MemorySource::new()
            .with_value("person", "a", "p", "employer", v("<http://a/acme>"))
            .with_value("person", "b", "q", "employer", v("<http://b/acme>"));
        let outcome = compare(
            &source,
            "employer",
            &EquivalenceConfig::default(),
            &store,
            &KnownWrongValues::new(),
        );
        assert!(outcome.findings.is_empty());
        assert_eq!(measure(&outcome, Measure::AbsoluteCoverage, "a").as_deref(), Some("1"));
    }

    #[test]
    fn language_filter_excludes_values() {
        let source = labels(
            MemorySource::new(),
            &[("a", "p", "\"Ada\"@en"), ("a", "p", "\"Ade\"@de"), ("b", "q", "\"Ada\"@en")],
        );
        let config = EquivalenceConfig {
            language_filter_patterns: vec![LanguagePattern::parse("en").unwrap()],
            ..EquivalenceConfig::default()
        };
        let outcome = compare(&source, "label", &config, &linked(), &KnownWrongValues::new());
        assert!(outcome.findings.is_empty());
        assert_eq!(measure(&outcome, Measure::Count, "a").as_deref(), Some("1"));
    }

    #[test]
    fn duplicates_within_a_dataset_are_compared() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&[r("p1"), r("p2")]);
        let source = labels(MemorySource::new(), &[("a", "p1", "A"), ("a", "p2", "B")]);
        let outcome = compare(
            &source,
            "label",
            &EquivalenceConfig::default(),
            &store,
            &KnownWrongValues::new(),
        );
        let in_a: Vec<&Finding> = outcome.findings.of(&d("a")).collect();
        assert_eq!(in_a.len(), 2);
        assert!(in_a.iter().all(|f| matches!(f, Finding::Deviation { compared_to_dataset, .. } if *compared_to_dataset == d("a"))));
        assert_eq!(measure(&outcome, Measure::DuplicateCount, "a").as_deref(), Some("0"));
    }

    #[test]
    fn datasets_without_the_variable_get_no_measures() {
        let aspect = Aspect::new("person")
            .with_dataset("a", ["label"])
            .with_dataset("b", Vec::<String>::new());
        let source = labels(MemorySource::new(), &[("a", "p", "A")]).with_resource("person", "b", "q");
        let outcome = compare_attributes(
            &source,
            &aspect,
            &["label".to_string()],
            &EquivalenceConfig::default(),
            &linked(),
            &KnownWrongValues::new(),
        )
        .unwrap();
        assert!(outcome.measurements.iter().all(|m| m.computed_on == d("a")));
        assert!(outcome.findings.is_empty());
    }
}
