//! Grouping and clustering of result sets.

mod clustering;
mod groups;
mod keywords;

pub use clustering::{ClusterConfig, ClusterOutcome, ClusterStats, HardClusterer, Pattern};
pub use groups::{
    group_by_date, group_by_experiencer, group_by_perspective, group_by_quality_signature,
    ExperienceGroup, UNKNOWN_LABEL,
};
pub use keywords::extract_keywords;
