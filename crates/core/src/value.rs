use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::number::Number;
use crate::resource::Resource;

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// xsd types derived from `xsd:integer`; all compare through their lexical form.
const INTEGER_TYPES: &[&str] = &[
    "integer",
    "long",
    "int",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "negativeInteger",
    "positiveInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

// ---------------------------------------------------------------------------
// Datatype
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    String,
    LangString,
    Boolean,
    Decimal,
    /// One of the integer types; holds the xsd local name.
    Integer(String),
    Double,
    Float,
    Date,
    DateTime,
    Other(String),
}

impl Datatype {
    pub fn from_iri(iri: &str) -> Self {
        if iri == RDF_LANG_STRING {
            return Self::LangString;
        }
        match iri.strip_prefix(XSD) {
            Some("string") => Self::String,
            Some("boolean") => Self::Boolean,
            Some("decimal") => Self::Decimal,
            Some("double") => Self::Double,
            Some("float") => Self::Float,
            Some("date") => Self::Date,
            Some("dateTime") => Self::DateTime,
            Some(local) if INTEGER_TYPES.contains(&local) => Self::Integer(local.to_string()),
            _ => Self::Other(iri.to_string()),
        }
    }

    pub fn iri(&self) -> String {
        match self {
            Self::String => format!("{XSD}string"),
            Self::LangString => RDF_LANG_STRING.to_string(),
            Self::Boolean => format!("{XSD}boolean"),
            Self::Decimal => format!("{XSD}decimal"),
            Self::Integer(local) => format!("{XSD}{local}"),
            Self::Double => format!("{XSD}double"),
            Self::Float => format!("{XSD}float"),
            Self::Date => format!("{XSD}date"),
            Self::DateTime => format!("{XSD}dateTime"),
            Self::Other(iri) => iri.clone(),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String | Self::LangString)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::Integer(_) | Self::Double | Self::Float
        )
    }

    fn compact(&self) -> String {
        match self {
            Self::LangString => "rdf:langString".to_string(),
            Self::Other(iri) => format!("<{iri}>"),
            other => format!("xsd:{}", other.iri().trim_start_matches(XSD)),
        }
    }
}

// ---------------------------------------------------------------------------
// Literal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    lexical: String,
    datatype: Datatype,
    language: Option<String>,
}

impl Literal {
    pub fn string(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Datatype::String,
            language: None,
        }
    }

    pub fn lang_string(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Datatype::LangString,
            language: Some(language.into()),
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            lexical: lexical.into(),
            datatype,
            language: None,
        }
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Numeric value, `None` for non-numeric types or malformed lexical forms.
    pub fn number(&self) -> Option<Number> {
        match self.datatype {
            Datatype::Decimal | Datatype::Integer(_) => Number::from_decimal_lexical(&self.lexical),
            Datatype::Double => Number::from_double_lexical(&self.lexical),
            Datatype::Float => Number::from_float_lexical(&self.lexical),
            _ => None,
        }
    }

    /// Year, month and day of an `xsd:date` or `xsd:dateTime`.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        match self.datatype {
            Datatype::Date | Datatype::DateTime => {
                let date_part = self.lexical.trim().get(..10)?;
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
            }
            _ => None,
        }
    }

    fn boolean(&self) -> Option<bool> {
        match self.lexical.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    fn date_value(&self) -> Option<(NaiveDate, Option<i32>)> {
        let lexical = self.lexical.trim();
        let date = NaiveDate::parse_from_str(lexical.get(..10)?, "%Y-%m-%d").ok()?;
        let zone = match lexical.get(10..)? {
            "" => None,
            "Z" => Some(0),
            tz => {
                let offset = DateTime::parse_from_rfc3339(&format!("2000-01-01T00:00:00{tz}")).ok()?;
                Some(offset.offset().local_minus_utc())
            }
        };
        Some((date, zone))
    }

    fn date_time_value(&self) -> Option<Result<DateTime<FixedOffset>, NaiveDateTime>> {
        let lexical = self.lexical.trim();
        if let Ok(zoned) = DateTime::parse_from_rfc3339(lexical) {
            return Some(Ok(zoned));
        }
        NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(Err)
    }

    /// Equality within the value space of a single datatype family.
    ///
    /// Numbers of every numeric type share one value space; everything else
    /// only equals literals of the same datatype.
    pub fn same_value(&self, other: &Literal) -> bool {
        if self.datatype.is_numeric() && other.datatype.is_numeric() {
            return match (self.number(), other.number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
        }
        if self.datatype != other.datatype {
            return false;
        }
        match self.datatype {
            Datatype::String => self.lexical == other.lexical,
            Datatype::LangString => {
                self.lexical == other.lexical
                    && self.language.as_deref().map(str::to_ascii_lowercase)
                        == other.language.as_deref().map(str::to_ascii_lowercase)
            }
            Datatype::Boolean => match (self.boolean(), other.boolean()) {
                (Some(a), Some(b)) => a == b,
                _ => self.lexical == other.lexical,
            },
            Datatype::Date => match (self.date_value(), other.date_value()) {
                (Some(a), Some(b)) => a == b,
                _ => self.lexical == other.lexical,
            },
            Datatype::DateTime => match (self.date_time_value(), other.date_time_value()) {
                (Some(a), Some(b)) => a == b,
                _ => self.lexical == other.lexical,
            },
            _ => self.lexical == other.lexical,
        }
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// An attribute binding: either a reference to another entity or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Resource(Resource),
    Literal(Literal),
}

impl Value {
    pub fn resource(iri: impl Into<String>) -> Self {
        Self::Resource(Resource::new(iri))
    }

    pub fn string(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal::string(lexical))
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(r) => Some(r),
            Self::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(l) => Some(l),
            Self::Resource(_) => None,
        }
    }

    /// Parses the compact term syntax:
    ///
    /// - `<iri>`: resource reference
    /// - `"text"`, `"text"@en`, `"1.5"^^xsd:decimal`, `"x"^^<iri>`: literals
    /// - anything else: a plain `xsd:string` literal of the raw text
    pub fn parse_term(term: &str) -> Result<Self, TermError> {
        let trimmed = term.trim();
        if let Some(rest) = trimmed.strip_prefix('<') {
            return match rest.strip_suffix('>') {
                Some(iri) if !iri.is_empty() && !iri.contains(['<', '>', ' ']) => {
                    Ok(Self::resource(iri))
                }
                _ => Err(TermError::new(term, "malformed IRI")),
            };
        }
        if !trimmed.starts_with('"') {
            return Ok(Self::string(term));
        }

        let (lexical, suffix) = parse_quoted(trimmed).ok_or_else(|| TermError::new(term, "unterminated string"))?;
        if suffix.is_empty() {
            return Ok(Self::Literal(Literal::string(lexical)));
        }
        if let Some(tag) = suffix.strip_prefix('@') {
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(TermError::new(term, "malformed language tag"));
            }
            return Ok(Self::Literal(Literal::lang_string(lexical, tag)));
        }
        if let Some(datatype) = suffix.strip_prefix("^^") {
            let iri = if let Some(inner) = datatype.strip_prefix('<') {
                inner
                    .strip_suffix('>')
                    .ok_or_else(|| TermError::new(term, "malformed datatype IRI"))?
                    .to_string()
            } else if let Some(local) = datatype.strip_prefix("xsd:") {
                format!("{XSD}{local}")
            } else if datatype == "rdf:langString" {
                return Err(TermError::new(term, "rdf:langString requires a language tag"));
            } else {
                return Err(TermError::new(term, "unknown datatype prefix"));
            };
            return Ok(Self::Literal(Literal::typed(lexical, Datatype::from_iri(&iri))));
        }
        Err(TermError::new(term, "unexpected text after literal"))
    }
}

/// Splits `"escaped"rest` into the unescaped content and `rest`.
fn parse_quoted(term: &str) -> Option<(String, &str)> {
    let mut lexical = String::new();
    let mut chars = term.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((lexical, &term[i + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                lexical.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            other => lexical.push(other),
        }
    }
    None
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(r) => write!(f, "<{r}>"),
            Self::Literal(l) => write!(f, "{l}"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.lexical.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                other => write!(f, "{other}")?,
            }
        }
        f.write_str("\"")?;
        match (&self.language, &self.datatype) {
            (Some(tag), _) => write!(f, "@{tag}"),
            (None, Datatype::String) => Ok(()),
            (None, datatype) => write!(f, "^^{}", datatype.compact()),
        }
    }
}

impl FromStr for Value {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_term(s)
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        Self::Resource(resource)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_term(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermError {
    pub term: String,
    pub reason: &'static str,
}

impl TermError {
    fn new(term: &str, reason: &'static str) -> Self {
        Self {
            term: term.to_string(),
            reason,
        }
    }
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse term '{}': {}", self.term, self.reason)
    }
}

impl std::error::Error for TermError {}
