//! Entity records: the matchable things (people, jobs, properties, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attributes::{AttributeValue, Attributes};
use crate::embedding::Embedding;
use crate::visibility::{FieldVisibilityMap, Visibility};

/// Unique identifier for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

fn default_searchable() -> bool {
    true
}

/// A matchable record.
///
/// Fields are private: every setter refreshes `last_modified`, which is what
/// lets the store tell stale copies apart.
///
/// # Example
///
/// ```
/// use privmatch_core::{Attributes, Entity};
///
/// let mut entity = Entity::new("job", "Backend engineer", "recruiter-7")
///     .with_attributes(Attributes::new().with_field("remote", true));
///
/// let before = entity.last_modified();
/// entity.set_attribute("seniority", "senior");
///
/// assert_eq!(entity.attributes().get_str("seniority"), Some("senior"));
/// assert!(entity.last_modified() >= before);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    id: EntityId,
    entity_type: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    metadata: Attributes,
    owned_by_user_id: String,
    #[serde(default = "default_searchable")]
    is_searchable: bool,
    #[serde(default)]
    privacy_settings: FieldVisibilityMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Embedding>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl Entity {
    /// Creates a searchable entity with a fresh ID, empty bags and
    /// all-private visibility.
    pub fn new(
        entity_type: impl Into<String>,
        name: impl Into<String>,
        owned_by_user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            entity_type: entity_type.into(),
            name: name.into(),
            description: None,
            attributes: Attributes::new(),
            metadata: Attributes::new(),
            owned_by_user_id: owned_by_user_id.into(),
            is_searchable: true,
            privacy_settings: FieldVisibilityMap::new(),
            embedding: None,
            created_at: now,
            last_modified: now,
        }
    }

    /// Replaces the ID. Chainable.
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Sets the description. Chainable.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(Some(description.into()));
        self
    }

    /// Replaces the attribute bag. Chainable.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self.touch();
        self
    }

    /// Replaces the metadata bag. Chainable.
    pub fn with_metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self.touch();
        self
    }

    /// Replaces the privacy settings. Chainable.
    pub fn with_privacy_settings(mut self, settings: FieldVisibilityMap) -> Self {
        self.set_privacy_settings(settings);
        self
    }

    /// Sets the embedding. Chainable.
    pub fn with_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.set_embedding(Some(embedding.into()));
        self
    }

    /// Sets searchability. Chainable.
    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.set_searchable(searchable);
        self
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[inline]
    pub fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    #[inline]
    pub fn owned_by_user_id(&self) -> &str {
        &self.owned_by_user_id
    }

    #[inline]
    pub fn is_searchable(&self) -> bool {
        self.is_searchable
    }

    #[inline]
    pub fn privacy_settings(&self) -> &FieldVisibilityMap {
        &self.privacy_settings
    }

    #[inline]
    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Returns true if `user_id` owns this entity. Empty IDs never own
    /// anything.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.owned_by_user_id == user_id
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    /// Sets one attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        let previous = self.attributes.set(key, value);
        self.touch();
        previous
    }

    /// Removes one attribute, returning its value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        let removed = self.attributes.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Sets one metadata field, returning the previous value.
    pub fn set_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        let previous = self.metadata.set(key, value);
        self.touch();
        previous
    }

    pub fn set_searchable(&mut self, searchable: bool) {
        self.is_searchable = searchable;
        self.touch();
    }

    pub fn set_embedding(&mut self, embedding: Option<Embedding>) {
        self.embedding = embedding;
        self.touch();
    }

    /// Replaces the privacy settings wholesale.
    pub fn set_privacy_settings(&mut self, settings: FieldVisibilityMap) {
        self.privacy_settings = settings;
        self.touch();
    }

    /// Sets the visibility of one field path.
    pub fn set_field_visibility(&mut self, path: impl Into<String>, level: Visibility) {
        self.privacy_settings.set(path, level);
        self.touch();
    }

    /// Drops the explicit visibility of one field path.
    pub fn remove_field_visibility(&mut self, path: &str) -> Option<Visibility> {
        let removed = self.privacy_settings.remove(path);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Sets the visibility of many field paths.
    pub fn set_field_visibilities<I, K>(&mut self, levels: I)
    where
        I: IntoIterator<Item = (K, Visibility)>,
        K: Into<String>,
    {
        self.privacy_settings.set_many(levels);
        self.touch();
    }

    fn touch(&mut self) {
        // Keep the clock monotonic per record even if the wall clock steps back.
        self.last_modified = Utc::now().max(self.last_modified);
    }
}
