//! Experience records and their quality switchboard.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The seven qualitative axes every experience is annotated along.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QualityDimension {
    /// Bodily engagement: thinking vs sensing.
    Embodied,
    /// Attentional focus: narrow vs broad.
    Focus,
    /// Emotional atmosphere: open vs closed.
    Mood,
    /// Directedness: goal vs wander.
    Purpose,
    /// Spatial framing: here vs there.
    Space,
    /// Temporal framing: past vs future.
    Time,
    /// Social presence: individual vs collective.
    Presence,
}

impl QualityDimension {
    /// Subtypes recognised in dotted query tokens for this dimension.
    pub fn subtypes(&self) -> &'static [&'static str] {
        match self {
            Self::Embodied => &["thinking", "sensing"],
            Self::Focus => &["narrow", "broad"],
            Self::Mood => &["open", "closed"],
            Self::Purpose => &["goal", "wander"],
            Self::Space => &["here", "there"],
            Self::Time => &["past", "future"],
            Self::Presence => &["individual", "collective"],
        }
    }

    /// Whether `subtype` belongs to this dimension's vocabulary.
    pub fn is_known_subtype(&self, subtype: &str) -> bool {
        self.subtypes()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(subtype))
    }

    /// All dimension names as static strings.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|d| d.into()).collect()
    }
}

/// Value of one quality dimension on an experience.
///
/// Serialized as `false` (absent), `true` (present without subtype) or the
/// subtype string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawQualityValue", into = "RawQualityValue")]
pub enum QualityValue {
    #[default]
    Absent,
    Present,
    Subtype(String),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawQualityValue {
    Flag(bool),
    Subtype(String),
}

impl From<RawQualityValue> for QualityValue {
    fn from(raw: RawQualityValue) -> Self {
        match raw {
            RawQualityValue::Flag(true) => Self::Present,
            RawQualityValue::Flag(false) => Self::Absent,
            RawQualityValue::Subtype(s) if s.trim().is_empty() => Self::Absent,
            RawQualityValue::Subtype(s) => Self::Subtype(s.trim().to_lowercase()),
        }
    }
}

impl From<QualityValue> for RawQualityValue {
    fn from(value: QualityValue) -> Self {
        match value {
            QualityValue::Absent => Self::Flag(false),
            QualityValue::Present => Self::Flag(true),
            QualityValue::Subtype(s) => Self::Subtype(s),
        }
    }
}

impl QualityValue {
    /// Create a subtype value (normalised to lowercase).
    pub fn subtype(subtype: impl Into<String>) -> Self {
        Self::from(RawQualityValue::Subtype(subtype.into()))
    }

    /// Any non-absent value.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// The subtype, if one is set.
    pub fn subtype_name(&self) -> Option<&str> {
        match self {
            Self::Subtype(s) => Some(s),
            _ => None,
        }
    }
}

/// The quality switchboard: one value per dimension, missing means absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualities(BTreeMap<QualityDimension, QualityValue>);

impl Qualities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for a dimension.
    pub fn get(&self, dimension: QualityDimension) -> &QualityValue {
        static ABSENT: QualityValue = QualityValue::Absent;
        self.0.get(&dimension).unwrap_or(&ABSENT)
    }

    /// Set a dimension; setting `Absent` clears it.
    pub fn set(&mut self, dimension: QualityDimension, value: QualityValue) {
        if value.is_present() {
            self.0.insert(dimension, value);
        } else {
            self.0.remove(&dimension);
        }
    }

    /// Non-absent tokens in dimension order (`mood`, `mood.closed`).
    pub fn signature(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, v)| v.is_present())
            .map(|(dim, value)| match value.subtype_name() {
                Some(sub) => format!("{}.{}", dim, sub),
                None => dim.to_string(),
            })
            .collect()
    }

    /// Number of non-absent dimensions.
    pub fn present_count(&self) -> usize {
        self.0.values().filter(|v| v.is_present()).count()
    }
}

/// A single structured memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Unique identifier.
    pub id: String,
    /// Free text content.
    pub content: String,
    /// Capture time.
    pub created: DateTime<Utc>,
    /// When the described event happened, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred: Option<DateTime<Utc>>,
    #[serde(default)]
    pub qualities: Qualities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiencer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<String>,
    /// Ids of experiences this one reflects on. May be cyclic.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reflects: Vec<String>,
}

impl Experience {
    /// Create a new experience captured now.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created: Utc::now(),
            occurred: None,
            qualities: Qualities::new(),
            experiencer: None,
            perspective: None,
            processing: None,
            reflects: Vec::new(),
        }
    }

    /// Best available timestamp: occurrence time, else capture time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.occurred.unwrap_or(self.created)
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_occurred(mut self, occurred: DateTime<Utc>) -> Self {
        self.occurred = Some(occurred);
        self
    }

    /// Set a dimension to a specific subtype.
    pub fn with_subtype(mut self, dimension: QualityDimension, subtype: &str) -> Self {
        self.qualities
            .set(dimension, QualityValue::subtype(subtype));
        self
    }

    /// Mark a dimension present without a subtype.
    pub fn with_present(mut self, dimension: QualityDimension) -> Self {
        self.qualities.set(dimension, QualityValue::Present);
        self
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

    pub fn with_reflects(mut self, ids: Vec<String>) -> Self {
        self.reflects = ids;
        self
    }
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.qualities.signature().join(", "))
    }
}

/// Anything that wraps an experience, so grouping works on raw records and
/// on scored hits alike.
pub trait HasExperience {
    fn experience(&self) -> &Experience;
}

impl HasExperience for Experience {
    fn experience(&self) -> &Experience {
        self
    }
}
