use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Language range used to filter string literals before comparison.
///
/// `""` matches strings without a language tag, `"*"` matches any tagged
/// string, anything else matches a tag equal to it or starting with it
/// followed by `-` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LanguagePattern {
    Untagged,
    AnyTag,
    Range(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLanguagePattern(pub String);

impl fmt::Display for InvalidLanguagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid language pattern '{}'", self.0)
    }
}

impl std::error::Error for InvalidLanguagePattern {}

impl LanguagePattern {
    /// Both untagged and tagged strings pass.
    pub fn match_all() -> Vec<LanguagePattern> {
        vec![LanguagePattern::Untagged, LanguagePattern::AnyTag]
    }

    pub fn parse(pattern: &str) -> Result<Self, InvalidLanguagePattern> {
        match pattern {
            "" => Ok(Self::Untagged),
            "*" => Ok(Self::AnyTag),
            range => {
                let valid = range.split('-').all(|subtag| {
                    (1..=8).contains(&subtag.len())
                        && subtag.chars().all(|c| c.is_ascii_alphanumeric())
                });
                if valid {
                    Ok(Self::Range(range.to_ascii_lowercase()))
                } else {
                    Err(InvalidLanguagePattern(range.to_string()))
                }
            }
        }
    }

    /// `tag` is `None` or empty for untagged strings.
    pub fn matches(&self, tag: Option<&str>) -> bool {
        let tag = tag.unwrap_or("");
        match self {
            Self::Untagged => tag.is_empty(),
            Self::AnyTag => !tag.is_empty(),
            Self::Range(range) => {
                let tag = tag.to_ascii_lowercase();
                tag == *range
                    || (tag.starts_with(range.as_str())
                        && tag.as_bytes().get(range.len()) == Some(&b'-'))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Untagged => "",
            Self::AnyTag => "*",
            Self::Range(range) => range,
        }
    }
}

impl FromStr for LanguagePattern {
    type Err = InvalidLanguagePattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LanguagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LanguagePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LanguagePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_and_any() {
        assert!(LanguagePattern::Untagged.matches(None));
        assert!(LanguagePattern::Untagged.matches(Some("")));
        assert!(!LanguagePattern::Untagged.matches(Some("en")));
        assert!(LanguagePattern::AnyTag.matches(Some("de")));
        assert!(!LanguagePattern::AnyTag.matches(None));
    }

    #[test]
    fn range_matches_on_subtag_boundary() {
        let en = LanguagePattern::parse("en").unwrap();
        assert!(en.matches(Some("en")));
        assert!(en.matches(Some("EN-gb")));
        assert!(!en.matches(Some("eng")));
        assert!(!en.matches(Some("de")));
        assert!(!en.matches(None));
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(LanguagePattern::parse("en_US").is_err());
        assert!(LanguagePattern::parse("en--us").is_err());
        assert!(LanguagePattern::parse("toolongsubtag").is_err());
        assert_eq!(
            LanguagePattern::parse("*").unwrap(),
            LanguagePattern::AnyTag
        );
    }
}
