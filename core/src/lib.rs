#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sidecraft engine.
//!
//! This crate defines the vocabulary that connects content packs, the
//! authoritative world, pure systems, and presentation adapters. Packs
//! register [`TileType`] and [`EntityType`] implementations into a
//! [`Catalog`], generators produce columns of [`Tile`] values through the
//! [`ColumnGenerator`] contract, and adapters or systems submit [`Command`]
//! values to the world, which answers with [`Event`] values describing what
//! actually happened.

pub mod catalog;
pub mod entity;
pub mod fields;
pub mod generator;
pub mod geometry;
pub mod tile;

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

pub use catalog::{Catalog, CatalogError};
pub use entity::{Entity, EntityAppearance, EntityDescriptor, EntityType};
pub use fields::{FieldDomain, FieldError, FieldSpec, FieldValue, FieldValues};
pub use generator::{ColumnGenerator, Configuration, Fingerprint, GenerationError};
pub use geometry::{GeometryError, PixelOffset, Rect, Vector2};
pub use tile::{Tile, TileAppearance, TileDescriptor, TileType};

/// Edge length of a tile image in pixels.
pub const TILE_PIXELS: u32 = 16;

/// Number of rows in every column of the world.
pub const WORLD_ROWS: i32 = 256;

/// Highest valid row index.
pub const MAX_ROW: i32 = WORLD_ROWS - 1;

/// Shared, immutable RGBA image used for tile and entity sprites.
pub type Sprite = Arc<image::RgbaImage>;

/// Digest of the state that determines an object's appearance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentHash(u64);

impl ContentHash {
    /// Wraps a raw digest.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw digest value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Last derived value together with the hash it was derived from.
#[derive(Clone, Debug)]
pub(crate) struct Memo<T> {
    pub(crate) hash: ContentHash,
    pub(crate) value: T,
}

/// Location of a single tile expressed as column and row indices.
///
/// Columns are unbounded; rows are valid in `0..WORLD_ROWS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    column: i32,
    row: i32,
}

impl GridPos {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index, growing to the right.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index, growing upwards from the bottom of the world.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Reports whether the row lies inside the world's vertical extent.
    #[must_use]
    pub const fn has_valid_row(&self) -> bool {
        self.row >= 0 && self.row <= MAX_ROW
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.column, self.row)
    }
}

/// Unique identifier assigned to an entity when it joins a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces the world's gravity vector.
    SetGravity {
        /// Acceleration applied to every entity, in tiles per second squared.
        gravity: Vector2,
    },
    /// Overwrites an entity's velocity.
    SetEntityVelocity {
        /// Entity to update.
        entity: EntityId,
        /// New velocity in tiles per second.
        velocity: Vector2,
    },
    /// Adds an instantaneous change of velocity to an entity.
    ApplyImpulse {
        /// Entity to push.
        entity: EntityId,
        /// Velocity delta in tiles per second.
        impulse: Vector2,
    },
    /// Changes a single field of an entity.
    SetEntityField {
        /// Entity to update.
        entity: EntityId,
        /// Declared field name.
        field: &'static str,
        /// Value to store.
        value: FieldValue,
    },
    /// Changes a single field of the tile stored at `position`.
    SetTileField {
        /// Cell holding the tile.
        position: GridPos,
        /// Declared field name.
        field: &'static str,
        /// Value to store.
        value: FieldValue,
    },
    /// Replaces the tile stored at the tile's own position.
    ReplaceTile {
        /// Tile to store.
        tile: Tile,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a new gravity vector.
    GravityChanged {
        /// Gravity in effect after the command.
        gravity: Vector2,
    },
    /// Reports that an entity touched the ground after being airborne.
    EntityLanded {
        /// Entity that landed.
        entity: EntityId,
    },
    /// Reports that an entity was stopped by a wall during the tick.
    EntityHitWall {
        /// Entity that hit the wall.
        entity: EntityId,
    },
    /// Confirms a velocity change requested through a command.
    EntityVelocityChanged {
        /// Entity whose velocity changed.
        entity: EntityId,
        /// Velocity after the change.
        velocity: Vector2,
    },
    /// Confirms an entity field change.
    EntityFieldChanged {
        /// Entity whose field changed.
        entity: EntityId,
        /// Field that changed.
        field: &'static str,
        /// Value stored after the change.
        value: FieldValue,
    },
    /// Announces that the tile stored at `position` changed.
    TileChanged {
        /// Cell whose tile changed.
        position: GridPos,
    },
    /// Reports a field change that failed validation.
    FieldRejected {
        /// Reason for the rejection.
        error: FieldError,
    },
    /// Reports a command addressed to an entity that is not in the world.
    EntityMissing {
        /// Identifier that failed to resolve.
        entity: EntityId,
    },
    /// Reports a tile command addressed to a row outside the world.
    TileRejected {
        /// Offending position.
        position: GridPos,
    },
}

/// Immutable snapshot of an entity's simulation state.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Collider in world units.
    pub rect: Rect,
    /// Velocity in tiles per second.
    pub velocity: Vector2,
    /// Whether the entity stood on the ground after the last step.
    pub on_ground: bool,
    /// Whether the entity pushed against a wall during the last step.
    pub hit_wall: bool,
    /// Current field values.
    pub fields: FieldValues,
}

impl EntitySnapshot {
    /// Captures the state of `entity` registered under `id`.
    #[must_use]
    pub fn capture(id: EntityId, entity: &Entity) -> Self {
        Self {
            id,
            rect: entity.rect(),
            velocity: entity.velocity(),
            on_ground: entity.on_ground(),
            hit_wall: entity.hit_wall(),
            fields: entity.fields().clone(),
        }
    }

    /// Centre of the collider.
    #[must_use]
    pub fn position(&self) -> Vector2 {
        self.rect.center()
    }
}
