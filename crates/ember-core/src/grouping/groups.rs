//! Field-based grouping of result sets.
//!
//! All functions are pure and partition their input exactly.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::HasExperience;

/// Label for records missing the grouped field.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// One group of a partitioned result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceGroup {
    /// Stable machine key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Member ids in input order.
    pub member_ids: Vec<String>,
    /// Quality tokens shared by every member.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_tokens: Vec<String>,
}

impl ExperienceGroup {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// Group by experiencer, largest group first.
pub fn group_by_experiencer<T: HasExperience>(items: &[T]) -> Vec<ExperienceGroup> {
    group_by_field(items, |item| item.experience().experiencer.as_deref())
}

/// Group by perspective, largest group first.
pub fn group_by_perspective<T: HasExperience>(items: &[T]) -> Vec<ExperienceGroup> {
    group_by_field(items, |item| item.experience().perspective.as_deref())
}

fn group_by_field<'a, T, F>(items: &'a [T], field: F) -> Vec<ExperienceGroup>
where
    T: HasExperience,
    F: Fn(&'a T) -> Option<&'a str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<String>> = HashMap::new();

    for item in items {
        let label = field(item)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_LABEL)
            .to_string();
        buckets
            .entry(label.clone())
            .or_insert_with(|| {
                order.push(label);
                Vec::new()
            })
            .push(item.experience().id.clone());
    }

    let mut groups: Vec<ExperienceGroup> = order
        .into_iter()
        .filter_map(|label| {
            let members = buckets.remove(&label)?;
            Some(ExperienceGroup {
                key: label.to_lowercase(),
                label,
                member_ids: members,
                common_tokens: Vec::new(),
            })
        })
        .collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.label.cmp(&b.label)));
    groups
}

/// Group by UTC calendar day of the best-available timestamp, oldest first.
pub fn group_by_date<T: HasExperience>(items: &[T]) -> Vec<ExperienceGroup> {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in items {
        let exp = item.experience();
        let day = exp.timestamp().date_naive().format("%Y-%m-%d").to_string();
        buckets.entry(day).or_default().push(exp.id.clone());
    }

    buckets
        .into_iter()
        .map(|(day, member_ids)| ExperienceGroup {
            key: day.clone(),
            label: day,
            member_ids,
            common_tokens: Vec::new(),
        })
        .collect()
}

/// Group by exact quality signature, largest group first.
pub fn group_by_quality_signature<T: HasExperience>(items: &[T]) -> Vec<ExperienceGroup> {
    let mut buckets: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
    for item in items {
        let exp = item.experience();
        buckets
            .entry(exp.qualities.signature())
            .or_default()
            .push(exp.id.clone());
    }

    let mut groups: Vec<ExperienceGroup> = buckets
        .into_iter()
        .map(|(signature, member_ids)| {
            let key = if signature.is_empty() {
                "none".to_string()
            } else {
                signature.join("+")
            };
            ExperienceGroup {
                label: key.clone(),
                key,
                member_ids,
                common_tokens: signature,
            }
        })
        .collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.key.cmp(&b.key)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Experience, QualityDimension};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn sample() -> Vec<Experience> {
        let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap();
        vec![
            Experience::new("a", "x")
                .with_experiencer("Ada")
                .with_created(day(2, 9))
                .with_subtype(QualityDimension::Mood, "open"),
            Experience::new("b", "x")
                .with_experiencer("Bo")
                .with_created(day(1, 23))
                .with_subtype(QualityDimension::Mood, "open"),
            Experience::new("c", "x")
                .with_experiencer("Ada")
                .with_created(day(5, 1))
                .with_occurred(day(1, 2)),
            Experience::new("d", "x").with_created(day(2, 10)),
        ]
    }

    fn assert_partition(groups: &[ExperienceGroup], items: &[Experience]) {
        let mut seen = HashSet::new();
        for g in groups {
            for id in &g.member_ids {
                assert!(seen.insert(id.clone()), "{} in two groups", id);
            }
        }
        assert_eq!(seen.len(), items.len());
    }

    #[test]
    fn test_group_by_experiencer() {
        let items = sample();
        let groups = group_by_experiencer(&items);
        assert_partition(&groups, &items);
        assert_eq!(groups[0].label, "Ada");
        assert_eq!(groups[0].member_ids, vec!["a", "c"]);
        // Ties by label
        assert_eq!(groups[1].label, "Bo");
        assert_eq!(groups[2].label, UNKNOWN_LABEL);
    }

    #[test]
    fn test_group_by_perspective_all_unknown() {
        let items = sample();
        let groups = group_by_perspective(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, UNKNOWN_LABEL);
        assert_partition(&groups, &items);
    }

    #[test]
    fn test_group_by_date_uses_occurrence() {
        let items = sample();
        let groups = group_by_date(&items);
        assert_partition(&groups, &items);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-03-01", "2024-03-02"]);
        assert_eq!(groups[0].member_ids, vec!["b", "c"]);
    }

    #[test]
    fn test_group_by_quality_signature() {
        let items = sample();
        let groups = group_by_quality_signature(&items);
        assert_partition(&groups, &items);
        assert_eq!(groups[0].key, "mood.open");
        assert_eq!(groups[0].common_tokens, vec!["mood.open"]);
        assert_eq!(groups[1].key, "none");
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<Experience> = Vec::new();
        assert!(group_by_experiencer(&items).is_empty());
        assert!(group_by_date(&items).is_empty());
    }
}
