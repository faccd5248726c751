//! Quality-dimension gating.

use crate::types::{DimensionPredicate, DimensionQuery, Experience};

/// Conjunction of dimension predicates. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionFilter {
    predicates: Vec<DimensionPredicate>,
}

impl DimensionFilter {
    /// Filter implied by a parsed query. Text queries filter nothing.
    pub fn from_query(query: &DimensionQuery) -> Self {
        Self {
            predicates: query.predicates(),
        }
    }

    pub fn from_predicates(predicates: Vec<DimensionPredicate>) -> Self {
        Self { predicates }
    }

    /// Add further predicates (AND).
    pub fn and(mut self, predicates: impl IntoIterator<Item = DimensionPredicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Whether this filter constrains anything.
    pub fn is_active(&self) -> bool {
        !self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[DimensionPredicate] {
        &self.predicates
    }

    /// Whether `experience` satisfies every predicate.
    pub fn matches(&self, experience: &Experience) -> bool {
        self.predicates
            .iter()
            .all(|p| p.matches(&experience.qualities))
    }

    /// Experiences passing the filter, in input order.
    pub fn apply<'a>(&self, experiences: &'a [Experience]) -> Vec<&'a Experience> {
        experiences.iter().filter(|e| self.matches(e)).collect()
    }
}
