//! # PrivMatch
//!
//! **Privacy-aware entity matching with semantic search and attribute filters.**
//!
//! PrivMatch stores entities owned by users and answers "who matches this?"
//! queries without leaking fields their owners chose to hide:
//!
//! - **Semantic ranking**: entities are ranked by embedding similarity
//! - **Attribute filters**: boolean trees over a free-form attribute bag
//! - **Field visibility**: every field is `Public`, `Private` or `FriendsOnly`
//! - **Redacted results**: hidden fields never leave the engine
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Visibility Resolver** | Per-field levels with owner bypass and a default |
//! | **Filter Evaluator** | 11 operators, nested AND/OR groups |
//! | **Similarity Metrics** | Cosine, DotProduct, Euclidean |
//! | **Persistence** | WAL plus JSON snapshot, crash-safe |
//! | **Async API** | Tokio-compatible async operations (feature flag) |
//!
//! ## Quick Start
//!
//! ### Visibility
//!
//! ```rust
//! use privmatch::prelude::*;
//!
//! let entity = Entity::new("person", "Ana", "user-1")
//!     .with_attributes(
//!         Attributes::new()
//!             .with_field("city", "Lisbon")
//!             .with_field("birthday", "1990-04-01"),
//!     )
//!     .with_privacy_settings(
//!         FieldVisibilityMap::with_default(Visibility::Public)
//!             .unwrap()
//!             .with_field("attributes.birthday", Visibility::Private),
//!     );
//!
//! assert!(is_field_visible(&entity, "attributes.city", Some("stranger")));
//! assert!(!is_field_visible(&entity, "attributes.birthday", Some("stranger")));
//! // Owners always see their own fields.
//! assert!(is_field_visible(&entity, "attributes.birthday", Some("user-1")));
//! ```
//!
//! ### Filtered, Redacted Search
//!
//! ```rust
//! use privmatch::prelude::*;
//!
//! let store = EntityStore::in_memory(StoreConfig::new(2, SimilarityMetric::Cosine));
//!
//! let public = FieldVisibilityMap::with_default(Visibility::Public).unwrap();
//! store.insert(
//!     Entity::new("person", "Ana", "user-1")
//!         .with_embedding(vec![1.0, 0.0])
//!         .with_attributes(Attributes::new().with_field("petTypes", vec!["Dog", "Cat"]))
//!         .with_privacy_settings(public.clone()),
//! ).unwrap();
//! store.insert(
//!     Entity::new("person", "Ben", "user-2")
//!         .with_embedding(vec![0.9, 0.1])
//!         .with_attributes(Attributes::new().with_field("petTypes", vec!["Fish"]))
//!         .with_privacy_settings(public),
//! ).unwrap();
//!
//! let query = SearchQuery::new(vec![1.0, 0.0])
//!     .with_filter(FilterExpression::field("petTypes").contains("Dog"));
//! let results = store.search(&Searcher::new(), &query).unwrap();
//!
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].name.as_deref(), Some("Ana"));
//! ```
//!
//! ### JSON Requests
//!
//! Filters usually arrive as JSON and are compiled before use:
//!
//! ```rust
//! use privmatch::SearchRequest;
//!
//! let request: SearchRequest = serde_json::from_str(r#"{
//!     "queryEmbedding": [0.1, 0.2],
//!     "attributeFilters": {
//!         "logicalOperator": "OR",
//!         "filters": [
//!             {"fieldPath": "attributes.riskTolerance", "operator": "GreaterThan", "value": 7},
//!             {"fieldPath": "remote", "operator": "IsTrue"}
//!         ]
//!     },
//!     "limit": 5
//! }"#).unwrap();
//!
//! let query = request.compile(10).unwrap();
//! assert_eq!(query.limit, 5);
//! assert!(query.filter.is_some());
//! ```
//!
//! ## Crate Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | Enables `AsyncEntityStore` for tokio compatibility |
//!
//! ## Architecture
//!
//! - **`privmatch-core`**: core library with no async runtime dependency
//! - **`privmatch`**: this crate, re-exports everything
//! - **`privmatch-server`**: HTTP service built on axum
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`](crate::Result), which uses
//! the [`Error`] enum. Filter evaluation and visibility checks never fail:
//! anything that cannot be evaluated counts as "no match" or "hidden".
//!
//! ## Thread Safety
//!
//! - [`EntityStore`] uses internal locks and can be shared behind an `Arc`
//! - [`Searcher`] and [`VisibilityResolver`] are immutable and `Sync`
//! - `AsyncEntityStore` is `Clone` and safe to share across tasks

// Re-export everything from core
pub use privmatch_core::*;
