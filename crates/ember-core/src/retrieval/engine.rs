//! Search engine combining dimension gating, text, semantic, filter and
//! recency signals into one ranked result set.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::embedding::{cosine_similarity, EmbeddingService, VectorStore};
use crate::error::{EmberError, EmberResult};
use crate::filter::{DimensionFilter, FilterEvaluator};
use crate::grouping::{
    group_by_date, group_by_experiencer, group_by_perspective, group_by_quality_signature,
    ClusterOutcome, ExperienceGroup, HardClusterer,
};
use crate::traits::{ExperienceStore, TemporalParser};
use crate::types::{
    DimensionPredicate, DimensionQuery, EmbeddingVector, Experience, GroupBy, HasExperience,
    QueryInput, SearchFilters, SortOrder,
};

use super::scorer::{RelevanceScorer, ScoreBreakdown};
use super::text::text_match;

/// A search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Raw query: text, a dimension token, a token array or predicates.
    pub query: Option<QueryInput>,
    /// Extra dimension predicates ANDed with the query.
    pub predicates: Vec<DimensionPredicate>,
    pub filters: SearchFilters,
    pub sort: SortOrder,
    /// Grouping key for the returned page.
    pub group_by: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<QueryInput>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Request with no query, for filter- or predicate-only searches.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: DimensionPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_group_by(mut self, key: impl Into<String>) -> Self {
        self.group_by = Some(key.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// One ranked experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub experience: Experience,
    /// Composite relevance score.
    pub relevance: f64,
    pub breakdown: ScoreBreakdown,
}

impl HasExperience for SearchHit {
    fn experience(&self) -> &Experience {
        &self.experience
    }
}

/// Counters describing how a search was answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub total_records: usize,
    pub dimension_matched: usize,
    pub scored: usize,
    pub returned: usize,
    /// The query was made only of dimension tokens or predicates.
    pub pure_dimension: bool,
    /// A query vector was available for semantic scoring.
    pub semantic_available: bool,
    /// Candidates that had a usable vector.
    pub embedded_candidates: usize,
    pub elapsed_ms: u64,
}

/// Ranked hits plus optional grouping of the returned page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<ExperienceGroup>>,
    pub stats: SearchStats,
}

/// Main entry point: search, indexing and clustering over a store.
pub struct ExperienceEngine {
    store: Arc<dyn ExperienceStore>,
    embeddings: Arc<EmbeddingService>,
    vectors: VectorStore,
    temporal: Option<Arc<dyn TemporalParser>>,
    clusterer: HardClusterer,
    config: EngineConfig,
}

impl std::fmt::Debug for ExperienceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperienceEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExperienceEngine {
    /// Create an engine. The vector store starts empty; call
    /// [`load_embeddings`](Self::load_embeddings) to populate it.
    ///
    /// Fails when `config` does not validate.
    pub fn new(
        store: Arc<dyn ExperienceStore>,
        embeddings: Arc<EmbeddingService>,
        config: EngineConfig,
    ) -> EmberResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            vectors: VectorStore::new(embeddings.dimension()),
            embeddings,
            temporal: None,
            clusterer: HardClusterer::new(config.clustering.clone()),
            config,
        })
    }

    /// Resolve natural-language time filters with `parser`.
    pub fn with_temporal_parser(mut self, parser: Arc<dyn TemporalParser>) -> Self {
        self.temporal = Some(parser);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embeddings(&self) -> &EmbeddingService {
        &self.embeddings
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    /// Load stored embeddings into the vector store.
    pub async fn load_embeddings(&self) -> EmberResult<usize> {
        self.vectors.load(self.store.as_ref()).await
    }

    /// Write the vector store back to storage.
    pub async fn persist_embeddings(&self) -> EmberResult<usize> {
        self.vectors.persist(self.store.as_ref()).await
    }

    /// Embed an experience and store (or replace) its vector.
    ///
    /// Returns `false` when no vector could be produced.
    pub async fn index_experience(&self, experience: &Experience) -> bool {
        match self.embeddings.try_embed(&experience.content).await {
            Some(vector) => {
                self.vectors
                    .upsert(EmbeddingVector::new(&experience.id, vector))
                    .await;
                true
            }
            None => {
                debug!(id = %experience.id, "No embedding produced, experience not indexed");
                false
            }
        }
    }

    /// Embed many experiences in one batch. Returns how many were indexed.
    pub async fn index_experiences(&self, experiences: &[Experience]) -> usize {
        let texts: Vec<String> = experiences.iter().map(|e| e.content.clone()).collect();
        let vectors = self.embeddings.try_embed_batch(&texts).await;

        let mut indexed = 0;
        for (experience, vector) in experiences.iter().zip(vectors) {
            if let Some(vector) = vector {
                self.vectors
                    .upsert(EmbeddingVector::new(&experience.id, vector))
                    .await;
                indexed += 1;
            }
        }
        debug!(requested = experiences.len(), indexed, "Batch indexing complete");
        indexed
    }

    /// Drop the vector of a deleted experience.
    pub async fn remove_experience(&self, id: &str) -> bool {
        self.vectors.remove(id).await.is_some()
    }

    /// Experience ids semantically closest to `text`. Defaults come from
    /// the embedding settings.
    pub async fn similar(
        &self,
        text: &str,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Vec<(String, f64)> {
        let Some(query) = self.embeddings.try_embed(text).await else {
            return Vec::new();
        };
        self.vectors
            .similar_to(
                &query,
                limit.unwrap_or(self.config.embedding.scan_limit),
                threshold.unwrap_or(self.config.embedding.scan_threshold),
            )
            .await
    }

    /// Run a search.
    pub async fn search(&self, request: &SearchRequest) -> EmberResult<SearchResponse> {
        let started = Instant::now();

        let group_by = request.group_by.as_deref().map(GroupBy::parse).transpose()?;
        let limit = request.limit.unwrap_or(self.config.scoring.default_limit);
        if limit == 0 {
            return Err(EmberError::out_of_range("limit", "must be at least 1"));
        }

        let records = self.store.list_all_records().await?;
        let total_records = records.len();

        let query = request
            .query
            .as_ref()
            .map(DimensionQuery::parse)
            .unwrap_or_else(|| DimensionQuery::Text(String::new()));
        let dimension_filter =
            DimensionFilter::from_query(&query).and(request.predicates.iter().cloned());
        let text = query.text();
        let pure_dimension = text.is_none() && dimension_filter.is_active();

        let candidates: Vec<Experience> = records
            .into_iter()
            .filter(|e| dimension_filter.matches(e))
            .collect();
        let dimension_matched = candidates.len();

        let query_vector = match text {
            Some(t) if !self.embeddings.is_fallback() => self.embeddings.try_embed(t).await,
            _ => None,
        }
        .filter(|q| {
            let usable = q.len() == self.vectors.dimension();
            if !usable {
                debug!(
                    query_dim = q.len(),
                    store_dim = self.vectors.dimension(),
                    "Query vector dimension mismatch, skipping semantic scoring"
                );
            }
            usable
        });
        let candidate_vectors = match &query_vector {
            Some(_) => {
                self.vectors
                    .usable_vectors(candidates.iter().map(|e| e.id.as_str()))
                    .await
            }
            None => HashMap::new(),
        };

        let weights = if pure_dimension {
            self.config.scoring.weights.without_semantic()
        } else {
            self.config.scoring.weights
        };
        let scorer = RelevanceScorer::new(
            weights,
            self.config.scoring.recency_half_life_days,
            Utc::now(),
        );
        let evaluator = FilterEvaluator::new(&request.filters, self.temporal.as_deref());
        let soft_gate = text.is_some() || evaluator.supplied() > 0;
        let semantic_threshold = self.config.scoring.semantic_threshold;

        let mut hits: Vec<SearchHit> = Vec::with_capacity(candidates.len());
        for experience in candidates {
            let semantic_similarity = match (&query_vector, candidate_vectors.get(&experience.id)) {
                (Some(q), Some(v)) => Some(cosine_similarity(q, v)),
                _ => None,
            };
            let breakdown = ScoreBreakdown {
                text_match: text.map(|t| text_match(t, &experience.content)).unwrap_or(0.0),
                semantic_similarity,
                dimension_match: dimension_filter.is_active().then_some(1.0),
                filter_relevance: evaluator.relevance(&experience),
                ..Default::default()
            };

            if soft_gate
                && breakdown.text_match <= 0.0
                && breakdown.semantic_similarity.unwrap_or(0.0) <= semantic_threshold
                && breakdown.filter_relevance.unwrap_or(0.0) <= 0.0
            {
                continue;
            }

            let breakdown = scorer.score(breakdown, experience.timestamp());
            hits.push(SearchHit {
                relevance: breakdown.composite,
                breakdown,
                experience,
            });
        }
        let scored = hits.len();

        sort_hits(&mut hits, request.sort);
        let results: Vec<SearchHit> = hits.into_iter().skip(request.offset).take(limit).collect();

        let groups = match group_by {
            Some(key) => Some(self.group(&results, key).await),
            None => None,
        };

        let stats = SearchStats {
            total_records,
            dimension_matched,
            scored,
            returned: results.len(),
            pure_dimension,
            semantic_available: query_vector.is_some(),
            embedded_candidates: candidate_vectors.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            total = stats.total_records,
            matched = stats.dimension_matched,
            returned = stats.returned,
            pure_dimension = stats.pure_dimension,
            semantic = stats.semantic_available,
            elapsed_ms = stats.elapsed_ms,
            "Search complete"
        );

        Ok(SearchResponse {
            results,
            groups,
            stats,
        })
    }

    async fn group(&self, hits: &[SearchHit], key: GroupBy) -> Vec<ExperienceGroup> {
        match key {
            GroupBy::Experiencer => group_by_experiencer(hits),
            GroupBy::Perspective => group_by_perspective(hits),
            GroupBy::Date => group_by_date(hits),
            GroupBy::Qualities => group_by_quality_signature(hits),
            GroupBy::Similarity => {
                let vectors = self
                    .vectors
                    .usable_vectors(hits.iter().map(|h| h.experience.id.as_str()))
                    .await;
                match self
                    .clusterer
                    .cluster(hits, &vectors, &CancellationToken::new())
                {
                    Some(outcome) => similarity_groups(outcome),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Cluster every stored experience that has a usable vector.
    ///
    /// Returns `Ok(None)` when `cancel` fires mid-pass.
    pub async fn cluster(&self, cancel: &CancellationToken) -> EmberResult<Option<ClusterOutcome>> {
        let records = self.store.list_all_records().await?;
        let vectors = self
            .vectors
            .usable_vectors(records.iter().map(|e| e.id.as_str()))
            .await;
        Ok(self.clusterer.cluster(&records, &vectors, cancel))
    }
}

fn sort_hits(hits: &mut [SearchHit], order: SortOrder) {
    match order {
        SortOrder::Relevance => hits.sort_by(|a, b| {
            OrderedFloat(b.relevance)
                .cmp(&OrderedFloat(a.relevance))
                .then_with(|| b.experience.timestamp().cmp(&a.experience.timestamp()))
                .then_with(|| a.experience.id.cmp(&b.experience.id))
        }),
        SortOrder::Newest => hits.sort_by(|a, b| {
            b.experience
                .timestamp()
                .cmp(&a.experience.timestamp())
                .then_with(|| a.experience.id.cmp(&b.experience.id))
        }),
        SortOrder::Oldest => hits.sort_by(|a, b| {
            a.experience
                .timestamp()
                .cmp(&b.experience.timestamp())
                .then_with(|| a.experience.id.cmp(&b.experience.id))
        }),
    }
}

/// One group per pattern, then one singleton group per outlier.
fn similarity_groups(outcome: ClusterOutcome) -> Vec<ExperienceGroup> {
    let mut groups: Vec<ExperienceGroup> = outcome
        .patterns
        .into_iter()
        .map(|p| ExperienceGroup {
            label: if p.keywords.is_empty() {
                p.id.clone()
            } else {
                p.keywords.join(", ")
            },
            key: p.id,
            member_ids: p.member_ids,
            common_tokens: p.quality_signature,
        })
        .collect();
    groups.extend(outcome.outliers.into_iter().map(|id| ExperienceGroup {
        key: id.clone(),
        label: id.clone(),
        member_ids: vec![id],
        common_tokens: Vec::new(),
    }));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingSettings;
    use crate::storage::MemoryStore;
    use crate::types::QualityDimension;
    use chrono::Duration;

    fn engine_with(records: Vec<Experience>) -> ExperienceEngine {
        let store = Arc::new(MemoryStore::with_records(records));
        let embeddings = Arc::new(EmbeddingService::noop(&EmbeddingSettings::default()));
        ExperienceEngine::new(store, embeddings, EngineConfig::default()).unwrap()
    }

    fn ids(response: &SearchResponse) -> Vec<&str> {
        response
            .results
            .iter()
            .map(|h| h.experience.id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_text_search_drops_non_matching() {
        let engine = engine_with(vec![
            Experience::new("a", "a walk by the river"),
            Experience::new("b", "reading in the library"),
        ]);
        let response = engine.search(&SearchRequest::new("river")).await.unwrap();
        assert_eq!(ids(&response), vec!["a"]);
        assert_eq!(response.results[0].breakdown.text_match, 1.0);
        assert!(!response.stats.semantic_available);
    }

    #[tokio::test]
    async fn test_pure_dimension_query() {
        let engine = engine_with(vec![
            Experience::new("a", "x").with_subtype(QualityDimension::Mood, "closed"),
            Experience::new("b", "y").with_subtype(QualityDimension::Mood, "open"),
        ]);
        let response = engine
            .search(&SearchRequest::new("mood.closed"))
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["a"]);
        assert!(response.stats.pure_dimension);
        assert_eq!(response.results[0].breakdown.dimension_match, Some(1.0));
        assert_eq!(response.results[0].breakdown.semantic_similarity, None);
    }

    #[tokio::test]
    async fn test_sort_and_paging() {
        let now = Utc::now();
        let engine = engine_with(vec![
            Experience::new("old", "x").with_created(now - Duration::days(10)),
            Experience::new("mid", "x").with_created(now - Duration::days(5)),
            Experience::new("new", "x").with_created(now),
        ]);

        let response = engine.search(&SearchRequest::all()).await.unwrap();
        assert_eq!(ids(&response), vec!["new", "mid", "old"]);

        let response = engine
            .search(
                &SearchRequest::all()
                    .with_sort(SortOrder::Oldest)
                    .with_offset(1)
                    .with_limit(1),
            )
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["mid"]);
        assert_eq!(response.stats.scored, 3);
    }

    #[tokio::test]
    async fn test_filters_are_soft() {
        let engine = engine_with(vec![
            Experience::new("a", "x")
                .with_experiencer("Ada")
                .with_perspective("first"),
            Experience::new("b", "x").with_experiencer("Ada"),
            Experience::new("c", "x").with_experiencer("Bo"),
        ]);
        let filters = SearchFilters::default()
            .with_experiencer("Ada")
            .with_perspective("first");
        let response = engine
            .search(&SearchRequest::all().with_filters(filters))
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["a", "b"]);
        assert_eq!(response.results[1].breakdown.filter_relevance, Some(0.5));
    }

    #[tokio::test]
    async fn test_unknown_group_by_is_rejected() {
        let engine = engine_with(vec![Experience::new("a", "x")]);
        let err = engine
            .search(&SearchRequest::all().with_group_by("colour"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("group_by"));
    }

    #[tokio::test]
    async fn test_zero_limit_is_rejected() {
        let engine = engine_with(vec![]);
        assert!(engine
            .search(&SearchRequest::all().with_limit(0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_groups_cover_page() {
        let engine = engine_with(vec![
            Experience::new("a", "x").with_experiencer("Ada"),
            Experience::new("b", "x").with_experiencer("Ada"),
            Experience::new("c", "x"),
        ]);
        let response = engine
            .search(&SearchRequest::all().with_group_by("experiencer"))
            .await
            .unwrap();
        let groups = response.groups.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), 3);
    }
}
