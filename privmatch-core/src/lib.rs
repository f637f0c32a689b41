//! # PrivMatch Core
//!
//! Core library for PrivMatch, a privacy-aware entity matching engine.
//!
//! Entities (people, jobs, anything with an owner) carry a free-form attribute
//! bag, an optional embedding and per-field visibility levels. A search ranks
//! entities by embedding similarity, keeps those matching an attribute filter
//! and returns only the fields the requester is allowed to see.
//!
//! ## Crate Features
//!
//! - `async` - Enables [`AsyncEntityStore`] for tokio-compatible async operations
//!
//! ## Core Types
//!
//! ### Privacy
//!
//! - [`Visibility`] - Per-field visibility level
//! - [`FieldVisibilityMap`] - Field path to level map with a default
//! - [`VisibilityResolver`] - Decides what a requester may see
//!
//! ### Filtering
//!
//! - [`FilterExpression`] - Boolean tree of attribute predicates
//! - [`AttributeFilters`] - Wire form of a filter tree
//!
//! ### Search and Storage
//!
//! - [`Searcher`] - Filters and redacts ranked candidates
//! - [`EntityStore`] - Thread-safe store with WAL durability
//! - [`AsyncEntityStore`] - Async wrapper (requires `async` feature)

pub mod attributes;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod filter;
pub mod search;
pub mod similarity;
pub mod store;
pub mod visibility;

pub use attributes::{AttributeValue, Attributes};
pub use embedding::Embedding;
pub use entity::{Entity, EntityId};
pub use error::{Error, Result};
pub use filter::{
    evaluate, AttributeFilter, AttributeFilters, Condition, FilterExpression, FilterNode,
    FilterOperator, LogicalOperator, Predicate,
};
pub use search::{Candidate, SearchQuery, SearchRequest, SearchResultItem, Searcher};
pub use similarity::SimilarityMetric;
#[cfg(feature = "async")]
pub use store::AsyncEntityStore;
pub use store::{EntityStore, StoreConfig, SyncMode};
pub use visibility::{
    any_field_visible, is_field_visible, EntityView, FieldVisibilityMap, NoRelationships,
    RelationshipCheck, Visibility, VisibilityResolver,
};

/// Re-export commonly used types for convenience.
///
/// # Example
///
/// ```rust
/// use privmatch_core::prelude::*;
///
/// let entity = Entity::new("person", "Ana", "user-1")
///     .with_attributes(Attributes::new().with_field("city", "Porto"))
///     .with_privacy_settings(
///         FieldVisibilityMap::new().with_field("attributes.city", Visibility::Public),
///     );
///
/// assert!(is_field_visible(&entity, "attributes.city", None));
/// assert!(FilterExpression::field("city").equals("Porto").matches(entity.attributes()));
/// ```
pub mod prelude {
    pub use crate::{
        any_field_visible, is_field_visible, Attributes, AttributeValue, Entity, EntityId,
        EntityStore, Error, FieldVisibilityMap, FilterExpression, Result, SearchQuery, Searcher,
        SimilarityMetric, StoreConfig, Visibility, VisibilityResolver,
    };
}
