//! Registry of tile and entity types contributed by content packs.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use crate::{
    entity::{Entity, EntityType},
    fields::{FieldError, FieldValue},
    geometry::Vector2,
    tile::{Tile, TileType},
    GridPos,
};

/// Errors raised while registering or resolving catalog entries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No tile type is registered under the key.
    #[error("no tile type registered as `{key}`")]
    UnknownTileType {
        /// Key that failed to resolve.
        key: String,
    },
    /// No entity type is registered under the key.
    #[error("no entity type registered as `{key}`")]
    UnknownEntityType {
        /// Key that failed to resolve.
        key: String,
    },
    /// A type with the same key was registered earlier.
    #[error("type `{key}` is already registered")]
    DuplicateType {
        /// Key claimed twice.
        key: &'static str,
    },
    /// The type rejected the supplied fields.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Tile and entity types keyed by their namespaced identifier.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tiles: BTreeMap<&'static str, Arc<dyn TileType>>,
    entities: BTreeMap<&'static str, Arc<dyn EntityType>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tile type under its descriptor id.
    pub fn register_tile(&mut self, kind: Arc<dyn TileType>) -> Result<(), CatalogError> {
        let key = kind.descriptor().id;
        if self.tiles.contains_key(key) {
            return Err(CatalogError::DuplicateType { key });
        }
        let _ = self.tiles.insert(key, kind);
        Ok(())
    }

    /// Registers an entity type under its descriptor id.
    pub fn register_entity(&mut self, kind: Arc<dyn EntityType>) -> Result<(), CatalogError> {
        let key = kind.descriptor().id;
        if self.entities.contains_key(key) {
            return Err(CatalogError::DuplicateType { key });
        }
        let _ = self.entities.insert(key, kind);
        Ok(())
    }

    /// Resolves a tile type by key.
    pub fn tile(&self, key: &str) -> Result<Arc<dyn TileType>, CatalogError> {
        self.tiles
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownTileType {
                key: key.to_owned(),
            })
    }

    /// Resolves an entity type by key.
    pub fn entity(&self, key: &str) -> Result<Arc<dyn EntityType>, CatalogError> {
        self.entities
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownEntityType {
                key: key.to_owned(),
            })
    }

    /// Registered tile keys in sorted order.
    pub fn tile_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tiles.keys().copied()
    }

    /// Registered entity keys in sorted order.
    pub fn entity_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entities.keys().copied()
    }

    /// Builds a tile of the type registered as `key`.
    pub fn spawn_tile<'a, I>(&self, key: &str, position: GridPos, fields: I) -> Result<Tile, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        Ok(Tile::new(self.tile(key)?, position, fields)?)
    }

    /// Builds an entity of the type registered as `key`, centred on `position`.
    pub fn spawn_entity<'a, I>(
        &self,
        key: &str,
        position: Vector2,
        fields: I,
    ) -> Result<Entity, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        Ok(Entity::new(self.entity(key)?, position, fields)?)
    }
}
