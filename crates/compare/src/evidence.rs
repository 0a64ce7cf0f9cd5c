use std::collections::BTreeMap;

use concord_core::{CorrespondenceEdge, Dataset};

use crate::finding::Findings;
use crate::measure::Measurement;
use crate::model::CompareSummary;

/// Compute summary statistics from a run's output.
pub fn compute_summary(
    measurements: &BTreeMap<Dataset, Vec<Measurement>>,
    findings: &Findings,
    edges: &[CorrespondenceEdge],
) -> CompareSummary {
    let mut summary = CompareSummary {
        total_findings: findings.len(),
        measurements: measurements.values().map(Vec::len).sum(),
        ..CompareSummary::default()
    };

    for (dataset, finding) in findings.iter() {
        *summary.findings_by_kind.entry(finding.kind()).or_insert(0) += 1;
        *summary.findings_by_dataset.entry(dataset.clone()).or_insert(0) += 1;
    }

    for edge in edges {
        match edge {
            CorrespondenceEdge::Corresponds { .. } => summary.new_correspondences += 1,
            CorrespondenceEdge::Incorresponds { .. } => summary.new_incorrespondences += 1,
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::Resource;

    use crate::finding::{Finding, FindingKind};

    fn omission(resource: &str) -> Finding {
        Finding::ResourceOmission {
            aspect: "thing".into(),
            compared_to_dataset: Dataset::from("b"),
            compared_to_resource: Resource::from(resource),
        }
    }

    #[test]
    fn summary_counts() {
        let mut findings = Findings::new();
        findings.file(&Dataset::from("a"), omission("b1"));
        findings.file(&Dataset::from("a"), omission("b2"));
        findings.file(
            &Dataset::from("b"),
            Finding::Duplicate {
                aspect: "thing".into(),
                affected_resource: Resource::from("b1"),
                duplicate_of: Resource::from("b2"),
            },
        );
        let edges = vec![
            CorrespondenceEdge::Corresponds {
                left: Resource::from("a1"),
                right: Resource::from("b1"),
            },
            CorrespondenceEdge::Incorresponds {
                left: Resource::from("a1"),
                right: Resource::from("b2"),
            },
        ];

        let summary = compute_summary(&BTreeMap::new(), &findings, &edges);
        assert_eq!(summary.total_findings, 3);
        assert_eq!(summary.findings_by_kind[&FindingKind::ResourceOmission], 2);
        assert_eq!(summary.findings_by_kind[&FindingKind::Duplicate], 1);
        assert_eq!(summary.findings_by_dataset[&Dataset::from("a")], 2);
        assert_eq!(summary.measurements, 0);
        assert_eq!(summary.new_correspondences, 1);
        assert_eq!(summary.new_incorrespondences, 1);
    }
}
