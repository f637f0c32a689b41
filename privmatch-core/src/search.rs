//! Search orchestration: filter and redact similarity-ranked candidates.
//!
//! For each candidate the searcher:
//!
//! 1. drops it if the entity is not searchable or scores below the floor,
//! 2. evaluates the filter against the entity's *full* attribute bag,
//! 3. copies out only the fields the requester may see.
//!
//! Filtering on the unredacted bag is deliberate. If filters ran on the
//! redacted view, a requester could probe hidden fields by comparing result
//! sets across requests with different visibility.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::Attributes;
use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::filter::{AttributeFilters, FilterExpression};
use crate::visibility::{NoRelationships, RelationshipCheck, VisibilityResolver};

/// Result count used when a request does not name one.
pub const DEFAULT_LIMIT: usize = 10;
/// Largest result count a request may ask for.
pub const MAX_LIMIT: usize = 1000;

/// An entity with its similarity to the query, higher is closer.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entity: Entity,
    pub score: f32,
}

impl Candidate {
    pub fn new(entity: Entity, score: f32) -> Self {
        Self { entity, score }
    }
}

/// One search hit, already redacted for the requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub entity_id: EntityId,
    pub entity_type: String,
    /// Display name, present only if visible to the requester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub similarity_score: f32,
    /// Attributes visible to the requester.
    pub attributes: Attributes,
}

/// A validated search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub embedding: Vec<f32>,
    pub filter: Option<FilterExpression>,
    pub requesting_user_id: Option<String>,
    pub limit: usize,
    pub min_similarity: Option<f32>,
}

impl SearchQuery {
    /// Creates a query with the default limit and no filter.
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            filter: None,
            requesting_user_id: None,
            limit: DEFAULT_LIMIT,
            min_similarity: None,
        }
    }

    /// Sets the filter. Chainable.
    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the requester. Chainable.
    pub fn with_requester(mut self, user_id: impl Into<String>) -> Self {
        self.requesting_user_id = Some(user_id.into());
        self
    }

    /// Sets the result limit. Chainable.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the similarity floor. Chainable.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }
}

fn default_enforce_privacy() -> bool {
    true
}

/// Search request as sent over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free-text label of the query. Embeddings are computed client-side, so
    /// the server never reads this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub query_embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_filters: Option<AttributeFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requesting_user_id: Option<String>,
    /// Accepted for compatibility. Redaction is always applied.
    #[serde(default = "default_enforce_privacy")]
    pub enforce_privacy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f32>,
}

impl SearchRequest {
    /// Validates the request and compiles its filters.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyVector`] without an embedding, [`Error::InvalidFilter`]
    /// for malformed filters, [`Error::InvalidRequest`] for a zero or
    /// oversized limit or a non-finite similarity floor.
    pub fn compile(&self, default_limit: usize) -> Result<SearchQuery> {
        if self.query_embedding.is_empty() {
            return Err(Error::EmptyVector);
        }

        let limit = self.limit.unwrap_or(default_limit);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(Error::InvalidRequest(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }

        if let Some(floor) = self.min_similarity {
            if !floor.is_finite() {
                return Err(Error::InvalidRequest("minSimilarity must be finite".into()));
            }
        }

        if !self.enforce_privacy {
            debug!("enforcePrivacy=false ignored, results are always redacted");
        }

        let filter = self
            .attribute_filters
            .as_ref()
            .map(AttributeFilters::compile)
            .transpose()?;

        Ok(SearchQuery {
            embedding: self.query_embedding.clone(),
            filter,
            requesting_user_id: self
                .requesting_user_id
                .clone()
                .filter(|id| !id.is_empty()),
            limit,
            min_similarity: self.min_similarity,
        })
    }
}

/// Applies searchability, filters and redaction to ranked candidates.
///
/// # Example
///
/// ```
/// use privmatch_core::{Attributes, Candidate, Entity, FilterExpression, SearchQuery, Searcher};
///
/// let dog_owner = Entity::new("person", "Ana", "u1")
///     .with_attributes(Attributes::new().with_field("petTypes", vec!["Dog"]));
/// let cat_owner = Entity::new("person", "Ben", "u2")
///     .with_attributes(Attributes::new().with_field("petTypes", vec!["Cat"]));
///
/// let candidates = vec![Candidate::new(dog_owner, 0.9), Candidate::new(cat_owner, 0.8)];
/// let query = SearchQuery::new(vec![1.0])
///     .with_filter(FilterExpression::field("petTypes").contains("Dog"));
///
/// let results = Searcher::new().search(candidates, &query);
/// assert_eq!(results.len(), 1);
/// // Everything is private by default, so an anonymous requester sees no attributes.
/// assert!(results[0].attributes.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Searcher<R = NoRelationships> {
    resolver: VisibilityResolver<R>,
}

impl Searcher<NoRelationships> {
    pub fn new() -> Self {
        Self {
            resolver: VisibilityResolver::new(),
        }
    }
}

impl<R: RelationshipCheck> Searcher<R> {
    /// Creates a searcher using a custom resolver.
    pub fn with_resolver(resolver: VisibilityResolver<R>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &VisibilityResolver<R> {
        &self.resolver
    }

    /// Filters and redacts `candidates`, returning at most `query.limit`
    /// items by descending score. Candidates are evaluated in parallel; ties
    /// keep their input order.
    pub fn search<I>(&self, candidates: I, query: &SearchQuery) -> Vec<SearchResultItem>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let candidates: Vec<Candidate> = candidates.into_iter().collect();
        let requester = query.requesting_user_id.as_deref();

        let mut hits: Vec<SearchResultItem> = candidates
            .par_iter()
            .filter_map(|candidate| self.evaluate(candidate, query, requester))
            .collect();

        hits.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(query.limit);

        debug!(
            candidates = candidates.len(),
            returned = hits.len(),
            filtered = query.filter.is_some(),
            "search evaluated"
        );
        hits
    }

    fn evaluate(
        &self,
        candidate: &Candidate,
        query: &SearchQuery,
        requester: Option<&str>,
    ) -> Option<SearchResultItem> {
        let entity = &candidate.entity;
        if !entity.is_searchable() {
            return None;
        }

        if let Some(floor) = query.min_similarity {
            if candidate.score.is_nan() || candidate.score < floor {
                return None;
            }
        }

        if let Some(filter) = &query.filter {
            if !filter.matches(entity.attributes()) {
                return None;
            }
        }

        Some(SearchResultItem {
            entity_id: entity.id(),
            entity_type: entity.entity_type().to_string(),
            name: self.resolver.visible_name(entity, requester),
            similarity_score: candidate.score,
            attributes: self.resolver.visible_attributes(entity, requester),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::{FieldVisibilityMap, Visibility};
    use serde_json::json;

    fn person(name: &str, owner: &str, risk: i32) -> Entity {
        Entity::new("person", name, owner)
            .with_attributes(
                Attributes::new()
                    .with_field("riskTolerance", risk)
                    .with_field("birthday", "1990-01-01"),
            )
            .with_privacy_settings(
                FieldVisibilityMap::with_default(Visibility::Public)
                    .unwrap()
                    .with_field("attributes.birthday", Visibility::Private),
            )
    }

    #[test]
    fn test_results_sorted_and_limited() {
        let candidates = vec![
            Candidate::new(person("a", "u1", 1), 0.5),
            Candidate::new(person("b", "u2", 1), 0.9),
            Candidate::new(person("c", "u3", 1), 0.7),
        ];
        let results = Searcher::new().search(candidates, &SearchQuery::new(vec![1.0]).with_limit(2));

        let names: Vec<_> = results.iter().map(|r| r.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| Candidate::new(person(n, "u", 1), 0.5))
            .collect();
        let results = Searcher::new().search(candidates, &SearchQuery::new(vec![1.0]));
        let names: Vec<_> = results.iter().map(|r| r.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_min_similarity_floor() {
        let candidates = vec![
            Candidate::new(person("a", "u1", 1), 0.2),
            Candidate::new(person("b", "u2", 1), 0.8),
            Candidate::new(person("c", "u3", 1), f32::NAN),
        ];
        let results = Searcher::new().search(
            candidates,
            &SearchQuery::new(vec![1.0]).with_min_similarity(0.5),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_non_searchable_excluded() {
        let hidden = person("hidden", "u1", 9).with_searchable(false);
        let results = Searcher::new().search(
            vec![Candidate::new(hidden, 1.0)],
            &SearchQuery::new(vec![1.0]).with_requester("u1"),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_filter_uses_unredacted_attributes() {
        // birthday is private, but filtering on it still works for strangers;
        // the value itself is never returned.
        let e = person("a", "owner", 5);
        let query = SearchQuery::new(vec![1.0])
            .with_filter(FilterExpression::field("birthday").equals("1990-01-01"))
            .with_requester("stranger");

        let results = Searcher::new().search(vec![Candidate::new(e, 0.9)], &query);
        assert_eq!(results.len(), 1);
        assert!(!results[0].attributes.contains_key("birthday"));
        assert!(results[0].attributes.contains_key("riskTolerance"));
    }

    #[test]
    fn test_owner_sees_private_fields() {
        let e = person("a", "owner", 5);
        let results = Searcher::new().search(
            vec![Candidate::new(e, 0.9)],
            &SearchQuery::new(vec![1.0]).with_requester("owner"),
        );
        assert!(results[0].attributes.contains_key("birthday"));
    }

    #[test]
    fn test_request_compile_defaults() {
        let req: SearchRequest = serde_json::from_value(json!({
            "query": "likes dogs",
            "queryEmbedding": [0.1, 0.2],
            "requestingUserId": ""
        }))
        .unwrap();
        assert!(req.enforce_privacy);

        let query = req.compile(DEFAULT_LIMIT).unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert!(query.filter.is_none());
        assert!(query.requesting_user_id.is_none());
    }

    #[test]
    fn test_request_compile_validation() {
        let base = SearchRequest {
            query_embedding: vec![1.0],
            enforce_privacy: true,
            ..Default::default()
        };

        let empty = SearchRequest {
            query_embedding: vec![],
            ..base.clone()
        };
        assert!(matches!(empty.compile(10), Err(Error::EmptyVector)));

        let zero = SearchRequest {
            limit: Some(0),
            ..base.clone()
        };
        assert!(matches!(zero.compile(10), Err(Error::InvalidRequest(_))));

        let nan = SearchRequest {
            min_similarity: Some(f32::NAN),
            ..base.clone()
        };
        assert!(nan.compile(10).is_err());

        let bad_filter: SearchRequest = serde_json::from_value(json!({
            "queryEmbedding": [1.0],
            "attributeFilters": {"filters": [
                {"fieldPath": "age", "operator": "InRange", "value": [1]}
            ]}
        }))
        .unwrap();
        assert!(matches!(bad_filter.compile(10), Err(Error::InvalidFilter(_))));
    }
}
