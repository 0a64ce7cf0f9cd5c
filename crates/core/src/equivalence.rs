use serde::{Deserialize, Serialize};

use crate::correspondence::CorrespondenceStore;
use crate::language::LanguagePattern;
use crate::value::{Datatype, Literal, Value};

/// Options for [`ValueEquivalence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceConfig {
    /// Strings differing only by language tag match.
    #[serde(default)]
    pub allow_lang_tag_skip: bool,
    /// A date and a date-time with the same year, month and day match.
    #[serde(default)]
    pub allow_time_skip: bool,
    /// String literals whose tag matches none of these are excluded from
    /// comparison altogether.
    #[serde(default = "LanguagePattern::match_all")]
    pub language_filter_patterns: Vec<LanguagePattern>,
}

impl Default for EquivalenceConfig {
    fn default() -> Self {
        Self {
            allow_lang_tag_skip: false,
            allow_time_skip: false,
            language_filter_patterns: LanguagePattern::match_all(),
        }
    }
}

/// Decides whether two extracted values count as the same value.
///
/// Reflexive and symmetric on values that pass [`ValueEquivalence::is_excluded`].
/// Not transitive under time skip: a date matches two date-times of the same
/// day that do not match each other.
pub struct ValueEquivalence<'a> {
    config: &'a EquivalenceConfig,
    store: &'a CorrespondenceStore,
}

impl<'a> ValueEquivalence<'a> {
    pub fn new(config: &'a EquivalenceConfig, store: &'a CorrespondenceStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &EquivalenceConfig {
        self.config
    }

    pub fn equivalent(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Resource(r1), Value::Resource(r2)) => self.store.correspond(r1, r2),
            (Value::Literal(l1), Value::Literal(l2)) => self.equivalent_literals(l1, l2),
            _ => false,
        }
    }

    fn equivalent_literals(&self, a: &Literal, b: &Literal) -> bool {
        if a.same_value(b) {
            return true;
        }
        let (ta, tb) = (a.datatype(), b.datatype());
        if self.config.allow_time_skip
            && matches!(
                (ta, tb),
                (Datatype::Date, Datatype::DateTime) | (Datatype::DateTime, Datatype::Date)
            )
        {
            return match (a.calendar_date(), b.calendar_date()) {
                (Some(da), Some(db)) => da == db,
                _ => false,
            };
        }
        if self.config.allow_lang_tag_skip && ta.is_string() && tb.is_string() {
            return a.lexical() == b.lexical();
        }
        false
    }

    /// String literals with a language tag (or lack of one) that matches none
    /// of the configured patterns are dropped before comparison.
    pub fn is_excluded(&self, value: &Value) -> bool {
        match value {
            Value::Literal(l) if l.datatype().is_string() => !self
                .config
                .language_filter_patterns
                .iter()
                .any(|p| p.matches(l.language())),
            _ => false,
        }
    }
}
