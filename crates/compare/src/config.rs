use std::collections::{BTreeMap, BTreeSet};

use concord_core::{Dataset, EquivalenceConfig, LanguagePattern};
use serde::Deserialize;

use crate::error::CompareError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    pub name: String,
    pub aspects: BTreeMap<String, AspectConfig>,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

// ---------------------------------------------------------------------------
// Aspect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AspectConfig {
    pub datasets: BTreeMap<Dataset, DatasetConfig>,
    /// Declared kinds of individual variables. Undeclared ones accept any value.
    #[serde(default)]
    pub variables: BTreeMap<String, VariableConfig>,
}

/// How one dataset provides an aspect.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Data file, relative to the config. Only the CSV source reads it.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableConfig {
    #[serde(default)]
    pub kind: VariableKind,
}

/// What a variable's values are expected to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Resource,
    Literal,
    #[default]
    Any,
}

impl std::fmt::Display for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resource => write!(f, "resource"),
            Self::Literal => write!(f, "literal"),
            Self::Any => write!(f, "any"),
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopulationConfig {
    #[serde(default)]
    pub aspects: Vec<String>,
}

/// Attribute comparison of some variables of one aspect.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeConfig {
    pub aspect: String,
    pub variables: Vec<String>,
    #[serde(default = "default_language_filter_patterns")]
    pub language_filter_patterns: Vec<String>,
    #[serde(default)]
    pub allow_time_skip: bool,
    #[serde(default)]
    pub allow_lang_tag_skip: bool,
}

fn default_language_filter_patterns() -> Vec<String> {
    vec![String::new(), "*".to_string()]
}

impl AttributeConfig {
    /// Equivalence options of this step. Fails on an unparseable pattern.
    pub fn equivalence(&self) -> Result<EquivalenceConfig, CompareError> {
        let language_filter_patterns = self
            .language_filter_patterns
            .iter()
            .map(|p| LanguagePattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EquivalenceConfig {
            allow_lang_tag_skip: self.allow_lang_tag_skip,
            allow_time_skip: self.allow_time_skip,
            language_filter_patterns,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    pub kind: MappingKind,
    pub aspect: String,
    pub variables: Vec<String>,
    /// Minimum Jaro-Winkler similarity. Only read by `jaro_winkler`.
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_similarity_threshold() -> f64 {
    0.9
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// Variable values are references to corresponding resources.
    UsePresent,
    /// Resources with equivalent values of all variables correspond.
    EquivalentValues,
    /// Resources with mutually most similar string values correspond.
    JaroWinkler,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CompareConfig {
    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: CompareConfig =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        if self.aspects.is_empty() {
            return Err(CompareError::ConfigValidation(
                "at least 1 aspect is required".into(),
            ));
        }

        for (name, aspect) in &self.aspects {
            if aspect.datasets.is_empty() {
                return Err(CompareError::ConfigValidation(format!(
                    "aspect '{name}': at least 1 dataset is required"
                )));
            }
            // Declared kinds must refer to provided variables
            for variable in aspect.variables.keys() {
                self.check_variable(name, variable)?;
            }
        }

        for name in &self.population.aspects {
            self.check_aspect(name)?;
        }

        for attribute in &self.attributes {
            self.check_aspect(&attribute.aspect)?;
            if attribute.variables.is_empty() {
                return Err(CompareError::ConfigValidation(format!(
                    "attribute comparison of '{}': no variables given",
                    attribute.aspect
                )));
            }
            for variable in &attribute.variables {
                self.check_variable(&attribute.aspect, variable)?;
            }
            attribute.equivalence()?;
        }

        for mapping in &self.mappings {
            self.check_aspect(&mapping.aspect)?;
            if mapping.variables.is_empty() {
                return Err(CompareError::ConfigValidation(format!(
                    "mapping of '{}': no variables given",
                    mapping.aspect
                )));
            }
            for variable in &mapping.variables {
                self.check_variable(&mapping.aspect, variable)?;
            }
            if mapping.kind == MappingKind::JaroWinkler && !(0.0..=1.0).contains(&mapping.threshold) {
                return Err(CompareError::ConfigValidation(format!(
                    "mapping of '{}': threshold {} outside 0..=1",
                    mapping.aspect, mapping.threshold
                )));
            }
        }

        Ok(())
    }

    fn check_aspect(&self, name: &str) -> Result<&AspectConfig, CompareError> {
        self.aspects
            .get(name)
            .ok_or_else(|| CompareError::UnknownAspect(name.to_string()))
    }

    fn check_variable(&self, aspect: &str, variable: &str) -> Result<(), CompareError> {
        let provided = self
            .check_aspect(aspect)?
            .datasets
            .values()
            .any(|d| d.variables.iter().any(|v| v == variable));
        if provided {
            Ok(())
        } else {
            Err(CompareError::UnknownVariable {
                aspect: aspect.to_string(),
                variable: variable.to_string(),
            })
        }
    }

    /// Aspects touched by any step, in name order.
    pub fn used_aspects(&self) -> BTreeSet<&str> {
        self.population
            .aspects
            .iter()
            .map(String::as_str)
            .chain(self.attributes.iter().map(|a| a.aspect.as_str()))
            .chain(self.mappings.iter().map(|m| m.aspect.as_str()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
