//! Query shapes accepted at the boundary and their parsed forms.
//!
//! Callers may hand in a single string, an array of strings or a list of
//! structured predicates. The raw shape is parsed exactly once into
//! [`DimensionQuery`]; nothing downstream inspects the raw shape again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::experience::{Qualities, QualityDimension};
use crate::error::{EmberError, EmberResult};

/// A recognised dimension token: `mood` or `mood.closed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionToken {
    pub dimension: QualityDimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl DimensionToken {
    /// Parse a token. Returns `None` for anything that is not a known
    /// dimension optionally followed by a known subtype.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }

        match token.split_once('.') {
            None => QualityDimension::from_str(token).ok().map(|dimension| Self {
                dimension,
                subtype: None,
            }),
            Some((dim, sub)) => {
                let dimension = QualityDimension::from_str(dim).ok()?;
                if sub.contains('.') || !dimension.is_known_subtype(sub) {
                    return None;
                }
                Some(Self {
                    dimension,
                    subtype: Some(sub.to_lowercase()),
                })
            }
        }
    }

    /// Token as a predicate requiring presence.
    pub fn to_predicate(&self) -> DimensionPredicate {
        DimensionPredicate {
            dimension: self.dimension,
            subtype: self.subtype.clone(),
            present: true,
        }
    }
}

impl fmt::Display for DimensionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            Some(sub) => write!(f, "{}.{}", self.dimension, sub),
            None => write!(f, "{}", self.dimension),
        }
    }
}

fn default_present() -> bool {
    true
}

/// A structured predicate against one dimension.
///
/// With `present = true` a bare predicate matches any non-absent value and a
/// subtype predicate matches only that subtype. With `present = false` the
/// predicate is negated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionPredicate {
    pub dimension: QualityDimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default = "default_present")]
    pub present: bool,
}

impl DimensionPredicate {
    pub fn present(dimension: QualityDimension) -> Self {
        Self {
            dimension,
            subtype: None,
            present: true,
        }
    }

    pub fn absent(dimension: QualityDimension) -> Self {
        Self {
            dimension,
            subtype: None,
            present: false,
        }
    }

    pub fn subtype(dimension: QualityDimension, subtype: impl Into<String>) -> Self {
        Self {
            dimension,
            subtype: Some(subtype.into().to_lowercase()),
            present: true,
        }
    }

    /// Evaluate against a quality switchboard.
    pub fn matches(&self, qualities: &Qualities) -> bool {
        let value = qualities.get(self.dimension);
        let hit = match &self.subtype {
            None => value.is_present(),
            Some(wanted) => value
                .subtype_name()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
        };
        hit == self.present
    }
}

/// Raw query as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Single(String),
    Many(Vec<String>),
    Structured(Vec<DimensionPredicate>),
}

impl From<&str> for QueryInput {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<&str>> for QueryInput {
    fn from(v: Vec<&str>) -> Self {
        Self::Many(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<DimensionPredicate>> for QueryInput {
    fn from(v: Vec<DimensionPredicate>) -> Self {
        Self::Structured(v)
    }
}

/// Parsed query.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionQuery {
    /// Free text; applies no dimension filtering.
    Text(String),
    /// Recognised tokens; all must match.
    Tokens(Vec<DimensionToken>),
    /// Structured predicates; all must match.
    Predicates(Vec<DimensionPredicate>),
}

impl DimensionQuery {
    /// Parse a raw query. Never fails: unrecognised syntax becomes text.
    pub fn parse(input: &QueryInput) -> Self {
        match input {
            QueryInput::Single(s) => match DimensionToken::parse(s) {
                Some(token) => Self::Tokens(vec![token]),
                None => Self::Text(s.trim().to_string()),
            },
            QueryInput::Many(items) => {
                let parsed: Option<Vec<_>> =
                    items.iter().map(|s| DimensionToken::parse(s)).collect();
                match parsed {
                    Some(tokens) if !tokens.is_empty() => Self::Tokens(tokens),
                    _ => Self::Text(
                        items
                            .iter()
                            .map(|s| s.trim())
                            .filter(|s| !s.is_empty())
                            .collect::<Vec<_>>()
                            .join(" "),
                    ),
                }
            }
            QueryInput::Structured(predicates) => Self::Predicates(predicates.clone()),
        }
    }

    /// Query text, if this is a non-empty text query.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) if !t.is_empty() => Some(t),
            _ => None,
        }
    }

    /// Predicates implied by this query.
    pub fn predicates(&self) -> Vec<DimensionPredicate> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Tokens(tokens) => tokens.iter().map(DimensionToken::to_predicate).collect(),
            Self::Predicates(p) => p.clone(),
        }
    }

    /// True when the query is made only of dimension tokens or predicates.
    pub fn is_dimension_only(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Tokens(t) => !t.is_empty(),
            Self::Predicates(p) => !p.is_empty(),
        }
    }
}

/// Time constraint on the best-available timestamp of an experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeFilter {
    /// Inclusive range.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Natural language, resolved through a `TemporalParser`.
    Phrase(String),
}

/// Structured filters; each one supplied contributes to filter relevance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiencer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeFilter>,
    /// Only experiences that reflect on this id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflects: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.experiencer.is_none()
            && self.perspective.is_none()
            && self.processing.is_none()
            && self.time.is_none()
            && self.reflects.is_none()
    }

    pub fn with_experiencer(mut self, experiencer: impl Into<String>) -> Self {
        self.experiencer = Some(experiencer.into());
        self
    }

    pub fn with_perspective(mut self, perspective: impl Into<String>) -> Self {
        self.perspective = Some(perspective.into());
        self
    }

    pub fn with_processing(mut self, processing: impl Into<String>) -> Self {
        self.processing = Some(processing.into());
        self
    }

    pub fn with_time(mut self, time: TimeFilter) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_reflects(mut self, id: impl Into<String>) -> Self {
        self.reflects = Some(id.into());
        self
    }
}

/// Result ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortOrder {
    /// Composite score, ties by recency.
    #[default]
    Relevance,
    Newest,
    Oldest,
}

/// Post-hoc organisation of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum GroupBy {
    #[strum(to_string = "experiencer")]
    Experiencer,
    #[strum(to_string = "date", serialize = "day")]
    Date,
    #[serde(alias = "quality_signature")]
    #[strum(to_string = "qualities", serialize = "quality_signature", serialize = "signature")]
    Qualities,
    #[strum(to_string = "perspective")]
    Perspective,
    #[strum(to_string = "similarity", serialize = "cluster")]
    Similarity,
}

impl GroupBy {
    /// Parse a grouping key, failing with a validation error naming
    /// `group_by` for unknown keys.
    pub fn parse(key: &str) -> EmberResult<Self> {
        Self::from_str(key.trim()).map_err(|_| EmberError::invalid_group_by(key))
    }
}
