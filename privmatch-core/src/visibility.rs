//! Field-level privacy for entity records.
//!
//! Every entity carries a [`FieldVisibilityMap`] assigning a [`Visibility`]
//! level to dot-delimited field paths such as `attributes.skills`. The
//! [`VisibilityResolver`] decides, per field and per requester, whether the
//! field may be exposed.
//!
//! Resolution order:
//!
//! 1. A non-searchable entity exposes nothing, not even to its owner.
//! 2. The path's level is looked up, falling back to the map's default.
//! 3. `Public` is visible to everyone, `Private` only to the owner, and
//!    `FriendsOnly` to the owner or anyone the [`RelationshipCheck`] connects
//!    to the owner. Anything else is hidden.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeValue, Attributes};
use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};

/// Path prefix for attribute fields.
pub const ATTRIBUTES_PREFIX: &str = "attributes.";
/// Path prefix for metadata fields.
pub const METADATA_PREFIX: &str = "metadata.";
/// Path of the entity's display name.
pub const NAME_PATH: &str = "name";
/// Path of the entity's description.
pub const DESCRIPTION_PATH: &str = "description";

/// Visibility level of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Only the owner can see the field.
    #[default]
    Private,
    /// Anyone can see the field.
    Public,
    /// The owner and the owner's connections can see the field.
    FriendsOnly,
    /// A level this build does not understand. Always hidden.
    #[serde(other)]
    Unrecognized,
}

impl Visibility {
    /// Returns true for the three levels a default may take.
    #[inline]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Visibility::Unrecognized)
    }
}

/// Per-field visibility levels plus a default for unmapped paths.
///
/// Serialized as `{"fieldVisibilityMap": {...}, "defaultVisibility": "..."}`.
///
/// # Example
///
/// ```
/// use privmatch_core::{FieldVisibilityMap, Visibility};
///
/// let mut map = FieldVisibilityMap::new();
/// map.set("attributes.skills", Visibility::Public);
///
/// assert_eq!(map.level_for("attributes.skills"), Visibility::Public);
/// assert_eq!(map.level_for("attributes.birthday"), Visibility::Private);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawVisibilitySettings")]
pub struct FieldVisibilityMap {
    field_visibility_map: HashMap<String, Visibility>,
    default_visibility: Visibility,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVisibilitySettings {
    #[serde(default)]
    field_visibility_map: HashMap<String, Visibility>,
    #[serde(default)]
    default_visibility: Visibility,
}

impl TryFrom<RawVisibilitySettings> for FieldVisibilityMap {
    type Error = Error;

    fn try_from(raw: RawVisibilitySettings) -> Result<Self> {
        let mut map = FieldVisibilityMap::with_default(raw.default_visibility)?;
        map.field_visibility_map = raw.field_visibility_map;
        Ok(map)
    }
}

impl Default for FieldVisibilityMap {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldVisibilityMap {
    /// Creates an empty map defaulting to `Private`.
    pub fn new() -> Self {
        Self {
            field_visibility_map: HashMap::new(),
            default_visibility: Visibility::Private,
        }
    }

    /// Creates an empty map with the given default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVisibility`] for an unrecognized default.
    pub fn with_default(default_visibility: Visibility) -> Result<Self> {
        let mut map = Self::new();
        map.set_default_visibility(default_visibility)?;
        Ok(map)
    }

    /// Sets the level for one path. Chainable.
    pub fn with_field(mut self, path: impl Into<String>, level: Visibility) -> Self {
        self.set(path, level);
        self
    }

    /// Sets the level for one path, returning the previous level.
    pub fn set(&mut self, path: impl Into<String>, level: Visibility) -> Option<Visibility> {
        self.field_visibility_map.insert(path.into(), level)
    }

    /// Removes the explicit level for a path so it falls back to the default.
    pub fn remove(&mut self, path: &str) -> Option<Visibility> {
        self.field_visibility_map.remove(path)
    }

    /// Sets many paths at once.
    pub fn set_many<I, K>(&mut self, levels: I)
    where
        I: IntoIterator<Item = (K, Visibility)>,
        K: Into<String>,
    {
        self.field_visibility_map
            .extend(levels.into_iter().map(|(k, v)| (k.into(), v)));
    }

    /// Returns the default level for unmapped paths.
    #[inline]
    pub fn default_visibility(&self) -> Visibility {
        self.default_visibility
    }

    /// Changes the default level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVisibility`] for an unrecognized level.
    pub fn set_default_visibility(&mut self, level: Visibility) -> Result<()> {
        if !level.is_recognized() {
            return Err(Error::InvalidVisibility(
                "default visibility must be Private, Public or FriendsOnly".into(),
            ));
        }
        self.default_visibility = level;
        Ok(())
    }

    /// Returns the explicit level for a path, if any.
    #[inline]
    pub fn get(&self, path: &str) -> Option<Visibility> {
        self.field_visibility_map.get(path).copied()
    }

    /// Returns the effective level for a path.
    #[inline]
    pub fn level_for(&self, path: &str) -> Visibility {
        self.get(path).unwrap_or(self.default_visibility)
    }

    /// Returns the number of explicitly mapped paths.
    #[inline]
    pub fn len(&self) -> usize {
        self.field_visibility_map.len()
    }

    /// Returns true if no path is explicitly mapped.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.field_visibility_map.is_empty()
    }

    /// Iterates over explicitly mapped paths.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Visibility)> {
        self.field_visibility_map.iter()
    }
}

/// Decides whether two users are connected for `FriendsOnly` fields.
pub trait RelationshipCheck: Send + Sync {
    /// Returns true if `requester_id` may see the owner's `FriendsOnly` fields.
    fn are_connected(&self, owner_id: &str, requester_id: &str) -> bool;
}

/// Relationship check used until a friendship graph exists: nobody is
/// connected, so `FriendsOnly` behaves like `Private`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelationships;

impl RelationshipCheck for NoRelationships {
    #[inline]
    fn are_connected(&self, _owner_id: &str, _requester_id: &str) -> bool {
        false
    }
}

impl<F> RelationshipCheck for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn are_connected(&self, owner_id: &str, requester_id: &str) -> bool {
        self(owner_id, requester_id)
    }
}

/// A requester's view of one entity with hidden fields removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: EntityId,
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Attributes,
    pub metadata: Attributes,
}

/// Resolves field visibility for requesters.
///
/// # Example
///
/// ```
/// use privmatch_core::{Attributes, Entity, FieldVisibilityMap, Visibility, VisibilityResolver};
///
/// let entity = Entity::new("person", "Alex", "owner-1")
///     .with_attributes(Attributes::new().with_field("city", "Lyon"))
///     .with_privacy_settings(
///         FieldVisibilityMap::new().with_field("attributes.city", Visibility::Public),
///     );
///
/// let resolver = VisibilityResolver::new();
/// assert!(resolver.is_field_visible(&entity, "attributes.city", None));
/// assert!(!resolver.is_field_visible(&entity, "name", None));
/// assert!(resolver.is_field_visible(&entity, "name", Some("owner-1")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct VisibilityResolver<R = NoRelationships> {
    relationships: R,
}

impl VisibilityResolver<NoRelationships> {
    /// Creates a resolver where `FriendsOnly` behaves like `Private`.
    pub fn new() -> Self {
        Self {
            relationships: NoRelationships,
        }
    }
}

impl<R: RelationshipCheck> VisibilityResolver<R> {
    /// Creates a resolver backed by a relationship check.
    pub fn with_relationships(relationships: R) -> Self {
        Self { relationships }
    }

    /// Returns true if `field_path` on `entity` is visible to the requester.
    ///
    /// `None` and `Some("")` both denote an anonymous requester.
    pub fn is_field_visible(
        &self,
        entity: &Entity,
        field_path: &str,
        requesting_user_id: Option<&str>,
    ) -> bool {
        if !entity.is_searchable() {
            return false;
        }

        match entity.privacy_settings().level_for(field_path) {
            Visibility::Public => true,
            Visibility::Private => is_owner(entity, requesting_user_id),
            Visibility::FriendsOnly => {
                is_owner(entity, requesting_user_id) || self.is_connected(entity, requesting_user_id)
            }
            Visibility::Unrecognized => false,
        }
    }

    /// Returns true if at least one of the paths is visible. An empty set of
    /// paths is never visible.
    pub fn any_field_visible<I, S>(
        &self,
        entity: &Entity,
        field_paths: I,
        requesting_user_id: Option<&str>,
    ) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        field_paths
            .into_iter()
            .any(|path| self.is_field_visible(entity, path.as_ref(), requesting_user_id))
    }

    /// Returns the attributes the requester may see.
    pub fn visible_attributes(&self, entity: &Entity, requesting_user_id: Option<&str>) -> Attributes {
        self.visible_in(entity, entity.attributes(), ATTRIBUTES_PREFIX, requesting_user_id)
    }

    /// Returns the metadata the requester may see.
    pub fn visible_metadata(&self, entity: &Entity, requesting_user_id: Option<&str>) -> Attributes {
        self.visible_in(entity, entity.metadata(), METADATA_PREFIX, requesting_user_id)
    }

    /// Returns the display name if the requester may see it.
    pub fn visible_name(&self, entity: &Entity, requesting_user_id: Option<&str>) -> Option<String> {
        self.is_field_visible(entity, NAME_PATH, requesting_user_id)
            .then(|| entity.name().to_string())
    }

    /// Builds the requester's redacted view of an entity.
    pub fn redact(&self, entity: &Entity, requesting_user_id: Option<&str>) -> EntityView {
        let description = entity
            .description()
            .filter(|_| self.is_field_visible(entity, DESCRIPTION_PATH, requesting_user_id))
            .map(str::to_string);

        EntityView {
            id: entity.id(),
            entity_type: entity.entity_type().to_string(),
            name: self.visible_name(entity, requesting_user_id),
            description,
            attributes: self.visible_attributes(entity, requesting_user_id),
            metadata: self.visible_metadata(entity, requesting_user_id),
        }
    }

    fn visible_in(
        &self,
        entity: &Entity,
        bag: &Attributes,
        prefix: &str,
        requesting_user_id: Option<&str>,
    ) -> Attributes {
        if !entity.is_searchable() {
            return Attributes::new();
        }
        bag.iter()
            .filter_map(|(key, value)| {
                let path = format!("{}{}", prefix, key);
                self.visible_value(entity, value, &path, requesting_user_id)
                    .map(|value| (key.clone(), value))
            })
            .collect()
    }

    // Nested maps are redacted key by key against their full dotted path.
    fn visible_value(
        &self,
        entity: &Entity,
        value: &AttributeValue,
        path: &str,
        requesting_user_id: Option<&str>,
    ) -> Option<AttributeValue> {
        if !self.is_field_visible(entity, path, requesting_user_id) {
            return None;
        }
        match value {
            AttributeValue::Map(map) => Some(AttributeValue::Map(
                map.iter()
                    .filter_map(|(key, inner)| {
                        let path = format!("{}.{}", path, key);
                        self.visible_value(entity, inner, &path, requesting_user_id)
                            .map(|inner| (key.clone(), inner))
                    })
                    .collect(),
            )),
            other => Some(other.clone()),
        }
    }

    fn is_connected(&self, entity: &Entity, requesting_user_id: Option<&str>) -> bool {
        let owner = entity.owned_by_user_id();
        match requesting_user_id {
            Some(requester) if !requester.is_empty() && !owner.is_empty() => {
                self.relationships.are_connected(owner, requester)
            }
            _ => false,
        }
    }
}

fn is_owner(entity: &Entity, requesting_user_id: Option<&str>) -> bool {
    let owner = entity.owned_by_user_id();
    match requesting_user_id {
        Some(requester) => !requester.is_empty() && !owner.is_empty() && owner == requester,
        None => false,
    }
}

/// Checks one field with the default resolver.
pub fn is_field_visible(entity: &Entity, field_path: &str, requesting_user_id: Option<&str>) -> bool {
    VisibilityResolver::new().is_field_visible(entity, field_path, requesting_user_id)
}

/// Checks a set of fields with the default resolver.
pub fn any_field_visible<I, S>(entity: &Entity, field_paths: I, requesting_user_id: Option<&str>) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    VisibilityResolver::new().any_field_visible(entity, field_paths, requesting_user_id)
}
