//! [`AspectSource`] implementations: an in-memory table and a CSV loader
//! that fills one.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use concord_core::{Dataset, Resource, Value};

use crate::aspect::{Aspect, AspectSource};
use crate::config::CompareConfig;
use crate::error::CompareError;

/// Name of the key column in CSV input.
pub const KEY_COLUMN: &str = "key";

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

type ValueKey = (String, Dataset, Resource, String);

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    keys: BTreeMap<(String, Dataset), BTreeSet<Resource>>,
    values: BTreeMap<ValueKey, Vec<Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(
        &mut self,
        aspect: &str,
        dataset: impl Into<Dataset>,
        resource: impl Into<Resource>,
    ) {
        self.keys
            .entry((aspect.to_string(), dataset.into()))
            .or_default()
            .insert(resource.into());
    }

    /// Binds `value` to `variable`, registering the resource if needed.
    pub fn add_value(
        &mut self,
        aspect: &str,
        dataset: impl Into<Dataset>,
        resource: impl Into<Resource>,
        variable: &str,
        value: Value,
    ) {
        let dataset = dataset.into();
        let resource = resource.into();
        self.add_resource(aspect, dataset.clone(), resource.clone());
        self.values
            .entry((aspect.to_string(), dataset, resource, variable.to_string()))
            .or_default()
            .push(value);
    }

    pub fn with_resource(
        mut self,
        aspect: &str,
        dataset: impl Into<Dataset>,
        resource: impl Into<Resource>,
    ) -> Self {
        self.add_resource(aspect, dataset, resource);
        self
    }

    pub fn with_value(
        mut self,
        aspect: &str,
        dataset: impl Into<Dataset>,
        resource: impl Into<Resource>,
        variable: &str,
        value: Value,
    ) -> Self {
        self.add_value(aspect, dataset, resource, variable, value);
        self
    }
}

impl AspectSource for MemorySource {
    fn keys_of(&self, aspect: &Aspect, dataset: &Dataset) -> Result<BTreeSet<Resource>, CompareError> {
        aspect.check_dataset(dataset)?;
        Ok(self
            .keys
            .get(&(aspect.name().to_string(), dataset.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn values_of(
        &self,
        aspect: &Aspect,
        dataset: &Dataset,
        resource: &Resource,
        variable: &str,
    ) -> Result<Vec<Value>, CompareError> {
        aspect.check_dataset(dataset)?;
        let key = (
            aspect.name().to_string(),
            dataset.clone(),
            resource.clone(),
            variable.to_string(),
        );
        Ok(self.values.get(&key).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Reads one CSV file per (aspect, dataset): a `key` column plus one column
/// per variable. Repeated keys add further values; empty cells bind nothing.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    data: MemorySource,
}

impl CsvSource {
    /// Loads every dataset file of the configured aspects, resolving paths
    /// against `base_dir`.
    pub fn load(config: &CompareConfig, base_dir: &Path) -> Result<Self, CompareError> {
        let mut source = Self::default();
        for (aspect, aspect_config) in &config.aspects {
            for (dataset, dataset_config) in &aspect_config.datasets {
                let Some(file) = &dataset_config.file else {
                    log::warn!("aspect '{aspect}': no file for dataset '{dataset}', treating it as empty");
                    continue;
                };
                let path = base_dir.join(file);
                let csv_data = std::fs::read_to_string(&path)
                    .map_err(|e| CompareError::Io(format!("{}: {e}", path.display())))?;
                source.add_csv(aspect, dataset, file, &csv_data, &dataset_config.variables)?;
            }
        }
        Ok(source)
    }

    /// Adds the rows of one file. `file` only labels errors.
    pub fn add_csv(
        &mut self,
        aspect: &str,
        dataset: &Dataset,
        file: &str,
        csv_data: &str,
        variables: &[String],
    ) -> Result<(), CompareError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CompareError::Io(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let idx = |name: &str| -> Result<usize, CompareError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CompareError::MissingColumn {
                    file: file.into(),
                    column: name.into(),
                })
        };

        let key_idx = idx(KEY_COLUMN)?;
        let variable_idx = variables
            .iter()
            .map(|v| Ok((v.as_str(), idx(v)?)))
            .collect::<Result<Vec<_>, CompareError>>()?;

        let mut rows = 0usize;
        for record in reader.records() {
            let record = record.map_err(|e| CompareError::Io(e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let key = parse_key(record.get(key_idx).unwrap_or(""))
                .ok_or_else(|| CompareError::InvalidTerm {
                    file: file.into(),
                    line,
                    message: "empty or malformed key".into(),
                })?;
            self.data.add_resource(aspect, dataset.clone(), key.clone());

            for (variable, i) in &variable_idx {
                let cell = record.get(*i).unwrap_or("");
                if cell.trim().is_empty() {
                    continue;
                }
                let value = Value::parse_term(cell)
                    .map_err(|e| CompareError::invalid_term(file, line, e))?;
                self.data
                    .add_value(aspect, dataset.clone(), key.clone(), variable, value);
            }
            rows += 1;
        }

        log::debug!("aspect '{aspect}', dataset '{dataset}': {rows} rows from {file}");
        Ok(())
    }
}

/// Keys are IRIs, written bare or in angle brackets.
fn parse_key(cell: &str) -> Option<Resource> {
    let cell = cell.trim();
    let iri = match cell.strip_prefix('<') {
        Some(rest) => rest.strip_suffix('>')?,
        None => cell,
    };
    if iri.is_empty() || iri.contains(['<', '>', ' ']) {
        return None;
    }
    Some(Resource::new(iri))
}

impl AspectSource for CsvSource {
    fn keys_of(&self, aspect: &Aspect, dataset: &Dataset) -> Result<BTreeSet<Resource>, CompareError> {
        self.data.keys_of(aspect, dataset)
    }

    fn values_of(
        &self,
        aspect: &Aspect,
        dataset: &Dataset,
        resource: &Resource,
        variable: &str,
    ) -> Result<Vec<Value>, CompareError> {
        self.data.values_of(aspect, dataset, resource, variable)
    }
}
