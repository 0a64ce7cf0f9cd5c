//! Measure records and the count accumulator shared by population and
//! attribute comparison.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::{Dataset, DatasetPair};
use serde::Serialize;

use crate::decimal::Decimal;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Count,
    DuplicateCount,
    DeduplicatedCount,
    AbsoluteCoverage,
    RelativeCoverage,
    AbsoluteCoveredness,
    RelativeCoveredness,
    Completeness,
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::DuplicateCount => write!(f, "duplicate_count"),
            Self::DeduplicatedCount => write!(f, "deduplicated_count"),
            Self::AbsoluteCoverage => write!(f, "absolute_coverage"),
            Self::RelativeCoverage => write!(f, "relative_coverage"),
            Self::AbsoluteCoveredness => write!(f, "absolute_coveredness"),
            Self::RelativeCoveredness => write!(f, "relative_coveredness"),
            Self::Completeness => write!(f, "completeness"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MeasureValue {
    Count(u64),
    Ratio(Decimal),
}

impl std::fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Ratio(d) => write!(f, "{d}"),
        }
    }
}

/// One measure value, filed under `computed_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Measurement {
    pub measure: Measure,
    pub aspect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub computed_on: Dataset,
    /// Paired dataset for pairwise measures; all other datasets for
    /// coveredness and completeness; empty for counts.
    pub compared_to: Vec<Dataset>,
    pub value: MeasureValue,
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Running counts for one aspect (or one aspect variable) over a fixed set
/// of datasets. Every pair's coverage starts at zero.
#[derive(Debug, Clone)]
pub(crate) struct Tally {
    datasets: BTreeSet<Dataset>,
    count: BTreeMap<Dataset, u64>,
    duplicates: BTreeMap<Dataset, u64>,
    absolute_coverage: BTreeMap<DatasetPair, u64>,
    absolute_coveredness: BTreeMap<Dataset, u64>,
}

impl Tally {
    pub(crate) fn new(datasets: impl IntoIterator<Item = Dataset>) -> Self {
        let datasets: BTreeSet<Dataset> = datasets.into_iter().collect();
        let zeros = || datasets.iter().map(|d| (d.clone(), 0)).collect();
        Self {
            count: zeros(),
            duplicates: zeros(),
            absolute_coveredness: zeros(),
            absolute_coverage: DatasetPair::pairs_of(&datasets)
                .into_iter()
                .map(|p| (p, 0))
                .collect(),
            datasets,
        }
    }

    pub(crate) fn datasets(&self) -> &BTreeSet<Dataset> {
        &self.datasets
    }

    pub(crate) fn add_count(&mut self, dataset: &Dataset, n: u64) {
        if let Some(c) = self.count.get_mut(dataset) {
            *c += n;
        }
    }

    pub(crate) fn add_duplicates(&mut self, dataset: &Dataset, n: u64) {
        if let Some(c) = self.duplicates.get_mut(dataset) {
            *c += n;
        }
    }

    pub(crate) fn add_coverage(&mut self, pair: &DatasetPair, n: u64) {
        if let Some(c) = self.absolute_coverage.get_mut(pair) {
            *c += n;
        }
    }

    pub(crate) fn add_coveredness(&mut self, dataset: &Dataset, n: u64) {
        if let Some(c) = self.absolute_coveredness.get_mut(dataset) {
            *c += n;
        }
    }

    pub(crate) fn count(&self, dataset: &Dataset) -> u64 {
        self.count.get(dataset).copied().unwrap_or(0)
    }

    pub(crate) fn duplicates(&self, dataset: &Dataset) -> u64 {
        self.duplicates.get(dataset).copied().unwrap_or(0)
    }

    pub(crate) fn deduplicated(&self, dataset: &Dataset) -> u64 {
        self.count(dataset).saturating_sub(self.duplicates(dataset))
    }

    pub(crate) fn absolute_coverage(&self, pair: &DatasetPair) -> u64 {
        self.absolute_coverage.get(pair).copied().unwrap_or(0)
    }

    /// `absoluteCoverage(a, b) / deduplicated(b)`: share of `b` confirmed by `a`.
    pub(crate) fn relative_coverage(&self, a: &Dataset, b: &Dataset) -> Option<Decimal> {
        let pair = DatasetPair::new(a.clone(), b.clone())?;
        Decimal::ratio(
            u128::from(self.absolute_coverage(&pair)),
            u128::from(self.deduplicated(b)),
        )
    }

    pub(crate) fn relative_coveredness(&self, dataset: &Dataset) -> Option<Decimal> {
        Decimal::ratio(
            u128::from(self.absolute_coveredness.get(dataset).copied().unwrap_or(0)),
            u128::from(self.deduplicated(dataset)),
        )
    }

    /// Lincoln–Petersen estimate over all pairs:
    /// `Σ dedup(a)·dedup(b) / Σ coverage(a, b)`. `None` without any overlap.
    pub(crate) fn estimated_population(&self) -> Option<Decimal> {
        let mut products: u128 = 0;
        let mut overlap: u128 = 0;
        for (pair, &coverage) in &self.absolute_coverage {
            products += u128::from(self.deduplicated(&pair.first))
                * u128::from(self.deduplicated(&pair.second));
            overlap += u128::from(coverage);
        }
        Decimal::ratio(products, overlap)
    }

    pub(crate) fn completeness(&self, dataset: &Dataset) -> Option<Decimal> {
        let estimate = self.estimated_population()?;
        Decimal::from_count(self.deduplicated(dataset)).checked_div(estimate)
    }

    /// All defined measures, grouped by the dataset they are filed under.
    pub(crate) fn measurements(&self, aspect: &str, variable: Option<&str>) -> Vec<Measurement> {
        let record = |measure, on: &Dataset, compared_to: Vec<Dataset>, value| Measurement {
            measure,
            aspect: aspect.to_string(),
            variable: variable.map(str::to_string),
            computed_on: on.clone(),
            compared_to,
            value,
        };
        let mut out = Vec::new();
        for dataset in &self.datasets {
            let others: Vec<Dataset> = self
                .datasets
                .iter()
                .filter(|d| *d != dataset)
                .cloned()
                .collect();

            out.push(record(Measure::Count, dataset, vec![], MeasureValue::Count(self.count(dataset))));
            out.push(record(
                Measure::DuplicateCount,
                dataset,
                vec![],
                MeasureValue::Count(self.duplicates(dataset)),
            ));
            out.push(record(
                Measure::DeduplicatedCount,
                dataset,
                vec![],
                MeasureValue::Count(self.deduplicated(dataset)),
            ));

            for other in &others {
                if let Some(pair) = DatasetPair::new(dataset.clone(), other.clone()) {
                    out.push(record(
                        Measure::AbsoluteCoverage,
                        dataset,
                        vec![other.clone()],
                        MeasureValue::Count(self.absolute_coverage(&pair)),
                    ));
                }
                if let Some(ratio) = self.relative_coverage(dataset, other) {
                    out.push(record(
                        Measure::RelativeCoverage,
                        dataset,
                        vec![other.clone()],
                        MeasureValue::Ratio(ratio),
                    ));
                }
            }

            out.push(record(
                Measure::AbsoluteCoveredness,
                dataset,
                others.clone(),
                MeasureValue::Count(self.absolute_coveredness.get(dataset).copied().unwrap_or(0)),
            ));
            if let Some(ratio) = self.relative_coveredness(dataset) {
                out.push(record(
                    Measure::RelativeCoveredness,
                    dataset,
                    others.clone(),
                    MeasureValue::Ratio(ratio),
                ));
            }
            if let Some(ratio) = self.completeness(dataset) {
                out.push(record(
                    Measure::Completeness,
                    dataset,
                    others,
                    MeasureValue::Ratio(ratio),
                ));
            }
        }
        out
    }
}
