//! Hard similarity clustering into patterns.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::{cosine_similarity, mean_pairwise_similarity, mean_vector};
use crate::types::{Experience, HasExperience};

use super::keywords::extract_keywords;

/// Clustering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Minimum similarity to every current member for a candidate to join.
    pub similarity_threshold: f64,
    /// Clusters smaller than this are dissolved.
    pub min_cluster_size: usize,
    /// Keywords kept per pattern.
    pub max_keywords: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            min_cluster_size: 3,
            max_keywords: 5,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be between -1.0 and 1.0");
        }
        if self.min_cluster_size == 0 {
            return Err("min_cluster_size must be at least 1");
        }
        Ok(())
    }
}

/// A discovered cluster of similar experiences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Derived from the seed member, so a recurring cluster keeps its id.
    pub id: String,
    pub member_ids: Vec<String>,
    pub centroid: Vec<f32>,
    /// Mean pairwise cosine similarity of members.
    pub coherence: f64,
    pub keywords: Vec<String>,
    /// Quality tokens held by at least half the members.
    pub quality_signature: Vec<String>,
    pub created: DateTime<Utc>,
}

impl Pattern {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    /// Stable id for a cluster seeded by `seed_id`.
    pub fn id_for_seed(seed_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, seed_id.as_bytes()).to_string()
    }
}

/// Counters for one clustering pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub candidates: usize,
    pub with_vectors: usize,
    pub clusters: usize,
    pub clustered: usize,
    pub outliers: usize,
    pub elapsed_ms: u64,
}

/// Result of a complete clustering pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutcome {
    pub patterns: Vec<Pattern>,
    /// Ids not placed in any pattern, in timestamp order.
    pub outliers: Vec<String>,
    pub stats: ClusterStats,
}

/// Greedy complete-linkage clustering with a fixed threshold.
#[derive(Debug, Clone, Default)]
pub struct HardClusterer {
    config: ClusterConfig,
}

impl HardClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Cluster `items` using their vectors.
    ///
    /// Returns `None` if `cancel` fires before the pass completes; nothing
    /// partial is ever returned.
    pub fn cluster<T: HasExperience>(
        &self,
        items: &[T],
        vectors: &HashMap<String, Vec<f32>>,
        cancel: &CancellationToken,
    ) -> Option<ClusterOutcome> {
        let started = Instant::now();

        let mut ordered: Vec<&Experience> = items.iter().map(|i| i.experience()).collect();
        ordered.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.id.cmp(&b.id))
        });
        let mut unique = HashSet::new();
        ordered.retain(|&e| unique.insert(e.id.as_str()));

        let candidates: Vec<(&Experience, &[f32])> = ordered
            .iter()
            .filter_map(|e| vectors.get(&e.id).map(|v| (*e, v.as_slice())))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let mut assigned = vec![false; candidates.len()];
        let mut seeded = vec![false; candidates.len()];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for seed in 0..candidates.len() {
            if cancel.is_cancelled() {
                debug!(processed = seed, "Clustering cancelled");
                return None;
            }
            if assigned[seed] || seeded[seed] {
                continue;
            }
            seeded[seed] = true;

            let mut members = vec![seed];
            for other in 0..candidates.len() {
                if other == seed || assigned[other] {
                    continue;
                }
                let joins = members.iter().all(|&m| {
                    cosine_similarity(candidates[m].1, candidates[other].1)
                        >= self.config.similarity_threshold
                });
                if joins {
                    members.push(other);
                }
            }

            if members.len() >= self.config.min_cluster_size {
                for &m in &members {
                    assigned[m] = true;
                }
                clusters.push(members);
            }
        }

        let now = Utc::now();
        let patterns: Vec<Pattern> = clusters
            .iter()
            .map(|members| self.build_pattern(&candidates, members, now))
            .collect();

        let clustered: HashSet<&str> = patterns
            .iter()
            .flat_map(|p| p.member_ids.iter().map(String::as_str))
            .collect();
        let outliers: Vec<String> = ordered
            .iter()
            .filter(|e| !clustered.contains(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();

        let stats = ClusterStats {
            candidates: ordered.len(),
            with_vectors: candidates.len(),
            clusters: patterns.len(),
            clustered: clustered.len(),
            outliers: outliers.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            candidates = stats.candidates,
            clusters = stats.clusters,
            outliers = stats.outliers,
            "Clustering complete"
        );

        Some(ClusterOutcome {
            patterns,
            outliers,
            stats,
        })
    }

    fn build_pattern(
        &self,
        candidates: &[(&Experience, &[f32])],
        members: &[usize],
        now: DateTime<Utc>,
    ) -> Pattern {
        let vectors: Vec<&[f32]> = members.iter().map(|&m| candidates[m].1).collect();
        let experiences: Vec<&Experience> = members.iter().map(|&m| candidates[m].0).collect();

        Pattern {
            id: Pattern::id_for_seed(&experiences[0].id),
            member_ids: experiences.iter().map(|e| e.id.clone()).collect(),
            centroid: mean_vector(vectors.iter().copied()),
            coherence: mean_pairwise_similarity(&vectors),
            keywords: extract_keywords(
                experiences.iter().map(|e| e.content.as_str()),
                self.config.max_keywords,
            ),
            quality_signature: majority_signature(&experiences),
            created: now,
        }
    }
}

/// Quality tokens present on at least half of `experiences`, sorted.
fn majority_signature(experiences: &[&Experience]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for exp in experiences {
        for token in exp.qualities.signature() {
            *counts.entry(token).or_insert(0) += 1;
        }
    }
    let mut tokens: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| n * 2 >= experiences.len())
        .map(|(t, _)| t)
        .collect();
    tokens.sort();
    tokens
}
