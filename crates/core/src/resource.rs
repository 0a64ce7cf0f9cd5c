use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, globally comparable entity identifier (usually an IRI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(String);

impl Resource {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Resource {
    fn from(iri: &str) -> Self {
        Self::new(iri)
    }
}

impl From<String> for Resource {
    fn from(iri: String) -> Self {
        Self(iri)
    }
}

/// Identifier of a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset(String);

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Dataset {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Dataset {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Unordered pair of distinct datasets. `first < second` always holds, so
/// `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetPair {
    pub first: Dataset,
    pub second: Dataset,
}

impl DatasetPair {
    /// Returns `None` for a dataset paired with itself.
    pub fn new(a: Dataset, b: Dataset) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// All unordered pairs of the given datasets, in ascending order.
    pub fn pairs_of<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> Vec<DatasetPair> {
        let mut sorted: Vec<&Dataset> = datasets.into_iter().collect();
        sorted.sort();
        sorted.dedup();
        let mut pairs = Vec::new();
        for (i, first) in sorted.iter().enumerate() {
            for second in &sorted[i + 1..] {
                pairs.push(DatasetPair {
                    first: (*first).clone(),
                    second: (*second).clone(),
                });
            }
        }
        pairs
    }

    pub fn contains(&self, dataset: &Dataset) -> bool {
        &self.first == dataset || &self.second == dataset
    }

    /// The member of the pair that is not `dataset`.
    pub fn other(&self, dataset: &Dataset) -> Option<&Dataset> {
        if &self.first == dataset {
            Some(&self.second)
        } else if &self.second == dataset {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for DatasetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ↔ {}", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_unordered() {
        let ab = DatasetPair::new("a".into(), "b".into()).unwrap();
        let ba = DatasetPair::new("b".into(), "a".into()).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.first.as_str(), "a");
        assert!(DatasetPair::new("a".into(), "a".into()).is_none());
    }

    #[test]
    fn pairs_of_three() {
        let datasets: Vec<Dataset> = vec!["c".into(), "a".into(), "b".into(), "a".into()];
        let pairs = DatasetPair::pairs_of(&datasets);
        let names: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["a ↔ b", "a ↔ c", "b ↔ c"]);
        assert_eq!(pairs[0].other(&"a".into()), Some(&Dataset::from("b")));
        assert_eq!(pairs[0].other(&"c".into()), None);
    }
}
