#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Sidecraft.
//!
//! The world owns the lazily generated terrain, every registered entity, and
//! the cache of composited render windows. Mutations arrive through [`apply`]
//! or the inherent methods on [`World`]; read-only views live in [`query`].

mod physics;
mod render_cache;

use std::{
    collections::{hash_map::Entry, BTreeMap, BTreeSet, HashMap},
    fmt,
    rc::Rc,
    time::Duration,
};

use image::RgbaImage;
use sidecraft_core::{
    ColumnGenerator, Command, Entity, EntityId, Event, FieldError, FieldValue, Fingerprint,
    GenerationError, GridPos, PixelOffset, Sprite, Tile, Vector2, TILE_PIXELS, WORLD_ROWS,
};
use thiserror::Error;
use tracing::{debug, info};

pub use render_cache::{WindowCache, WindowKey};

use render_cache::CellRecord;

/// Number of render windows kept when no explicit capacity is configured.
pub const DEFAULT_WINDOW_CACHE_CAPACITY: usize = 100;

/// Tunables applied when constructing a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSettings {
    /// Maximum number of composited render windows kept alive.
    pub window_cache_capacity: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            window_cache_capacity: DEFAULT_WINDOW_CACHE_CAPACITY,
        }
    }
}

/// Errors raised by world operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// The position lies above or below the world's rows.
    #[error("row of ({position}) lies outside the world")]
    RowOutOfRange {
        /// Offending position.
        position: GridPos,
    },
    /// The generator failed to produce a column.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The generator produced the wrong number of tiles.
    #[error("column {column} holds {len} tiles instead of {expected}")]
    MalformedColumn {
        /// Column index requested.
        column: i32,
        /// Number of tiles produced.
        len: usize,
        /// Number of tiles required.
        expected: usize,
    },
    /// A generated tile reports a position other than the cell it fills.
    #[error("tile generated for ({expected}) claims ({found})")]
    MisplacedTile {
        /// Cell the tile was generated for.
        expected: GridPos,
        /// Position stored on the tile.
        found: GridPos,
    },
    /// A field change failed validation.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// The render window is too large to composite into a single image.
    #[error("render window {key:?} exceeds the largest composite")]
    WindowTooLarge {
        /// Normalized window that was requested.
        key: WindowKey,
    },
}

/// Identifier the world assigns to every stored tile instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileSerial(u64);

impl TileSerial {
    /// Numeric value of the serial.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Tiles are shared with the generator memo until a field change copies them.
#[derive(Clone, Debug)]
struct StoredTile {
    serial: TileSerial,
    tile: Rc<Tile>,
}

impl StoredTile {
    fn record(&self) -> CellRecord {
        CellRecord {
            serial: self.serial,
            hash: self.tile.content_hash(),
        }
    }
}

/// Lazily populated columns together with the generator feeding them.
struct TileStore<G> {
    generator: G,
    fingerprint: Fingerprint,
    columns: HashMap<i32, Vec<StoredTile>>,
    next_serial: u64,
}

impl<G: ColumnGenerator> TileStore<G> {
    fn new(generator: G) -> Self {
        let fingerprint = generator.fingerprint();
        Self {
            generator,
            fingerprint,
            columns: HashMap::new(),
            next_serial: 0,
        }
    }

    /// Drops every stored column when the generator configuration changed.
    fn sync(&mut self) {
        let current = self.generator.fingerprint();
        if current != self.fingerprint {
            info!(
                columns = self.columns.len(),
                "generator configuration changed, discarding stored terrain"
            );
            self.columns.clear();
            self.fingerprint = current;
        }
    }

    fn column(&mut self, index: i32) -> Result<&mut Vec<StoredTile>, WorldError> {
        match self.columns.entry(index) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let tiles = self.generator.column(index)?;
                let expected = WORLD_ROWS as usize;
                if tiles.len() != expected {
                    return Err(WorldError::MalformedColumn {
                        column: index,
                        len: tiles.len(),
                        expected,
                    });
                }
                let mut stored = Vec::with_capacity(expected);
                for (row, tile) in (0..WORLD_ROWS).zip(tiles) {
                    let position = GridPos::new(index, row);
                    if tile.position() != position {
                        return Err(WorldError::MisplacedTile {
                            expected: position,
                            found: tile.position(),
                        });
                    }
                    stored.push(StoredTile {
                        serial: allot_serial(&mut self.next_serial),
                        tile: Rc::clone(tile),
                    });
                }
                debug!(column = index, "stored generated column");
                Ok(entry.insert(stored))
            }
        }
    }

    fn stored_mut(&mut self, position: GridPos) -> Result<&mut StoredTile, WorldError> {
        if !position.has_valid_row() {
            return Err(WorldError::RowOutOfRange { position });
        }
        self.column(position.column())?
            .get_mut(position.row() as usize)
            .ok_or(WorldError::RowOutOfRange { position })
    }

    fn replace(&mut self, tile: Tile) -> Result<TileSerial, WorldError> {
        let serial = allot_serial(&mut self.next_serial);
        let stored = self.stored_mut(tile.position())?;
        *stored = StoredTile {
            serial,
            tile: Rc::new(tile),
        };
        Ok(serial)
    }
}

fn allot_serial(next: &mut u64) -> TileSerial {
    let serial = TileSerial(*next);
    *next += 1;
    serial
}

/// Sprite of an entity positioned relative to a render window's top-left corner.
#[derive(Clone, Debug)]
pub struct EntitySprite {
    /// Entity the sprite belongs to.
    pub entity: EntityId,
    /// Image to draw.
    pub image: Sprite,
    /// Top-left pixel of the sprite inside the composite.
    pub position: PixelOffset,
}

/// Result of a render window query.
#[derive(Debug)]
pub struct RenderedWindow<'a> {
    /// Normalized key the composite is cached under.
    pub key: WindowKey,
    /// Terrain composite, without entities.
    pub composite: &'a RgbaImage,
    /// Entities strictly inside the window, in identifier order.
    pub sprites: Vec<EntitySprite>,
}

/// Represents the authoritative Sidecraft world state.
pub struct World<G: ColumnGenerator = Box<dyn ColumnGenerator>> {
    tiles: TileStore<G>,
    entities: BTreeMap<EntityId, Entity>,
    next_entity: u32,
    gravity: Vector2,
    windows: WindowCache,
    composite_count: u64,
}

impl<G: ColumnGenerator> World<G> {
    /// Creates an empty world fed by `generator` with default settings.
    #[must_use]
    pub fn new(generator: G, gravity: Vector2) -> Self {
        Self::with_settings(generator, gravity, WorldSettings::default())
    }

    /// Creates an empty world fed by `generator`.
    #[must_use]
    pub fn with_settings(generator: G, gravity: Vector2, settings: WorldSettings) -> Self {
        Self {
            tiles: TileStore::new(generator),
            entities: BTreeMap::new(),
            next_entity: 0,
            gravity,
            windows: WindowCache::new(settings.window_cache_capacity),
            composite_count: 0,
        }
    }

    /// Generator feeding the world.
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.tiles.generator
    }

    /// Mutable access to the generator; configuration changes take effect on the next operation.
    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.tiles.generator
    }

    /// Registers `entity` and returns its identifier.
    pub fn add(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;
        let _ = self.entities.insert(id, entity);
        id
    }

    /// Entity registered under `id`.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access to the entity registered under `id`.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Current gravity in tiles per second squared.
    #[must_use]
    pub const fn gravity(&self) -> Vector2 {
        self.gravity
    }

    /// Replaces the gravity vector.
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.gravity = gravity;
    }

    /// Tile stored at `position`, generating its column if needed.
    pub fn tile(&mut self, position: GridPos) -> Result<&Tile, WorldError> {
        self.tiles.sync();
        Ok(self.tiles.stored_mut(position)?.tile.as_ref())
    }

    /// Serial of the tile instance stored at `position`.
    pub fn tile_serial(&mut self, position: GridPos) -> Result<TileSerial, WorldError> {
        self.tiles.sync();
        Ok(self.tiles.stored_mut(position)?.serial)
    }

    /// Changes a field of the tile at `position`, returning the previous value.
    pub fn set_tile_field(
        &mut self,
        position: GridPos,
        field: &str,
        value: FieldValue,
    ) -> Result<FieldValue, WorldError> {
        self.tiles.sync();
        let stored = self.tiles.stored_mut(position)?;
        Ok(Rc::make_mut(&mut stored.tile).set_field(field, value)?)
    }

    /// Stores `tile` at its own position under a fresh serial.
    pub fn replace_tile(&mut self, tile: Tile) -> Result<TileSerial, WorldError> {
        self.tiles.sync();
        self.tiles.replace(tile)
    }

    /// Advances every entity by `dt`.
    pub fn update(&mut self, dt: Duration) -> Result<(), WorldError> {
        let _ = self.step(dt)?;
        Ok(())
    }

    /// Runs the physics step and reports contact events.
    ///
    /// Every column the step can touch is loaded before any entity moves, so a
    /// failing generator leaves the entities as they were.
    fn step(&mut self, dt: Duration) -> Result<Vec<Event>, WorldError> {
        self.tiles.sync();
        let seconds = dt.as_secs_f32();
        let mut events = Vec::new();

        let mut columns = BTreeSet::new();
        for entity in self.entities.values() {
            let mut rect = entity.rect();
            rect.translate(entity.velocity() * seconds);
            columns.extend(physics::candidate_cells(&rect).map(|cell| cell.column()));
        }
        for column in columns {
            let _ = self.tiles.column(column)?;
        }

        for (&id, entity) in &mut self.entities {
            let was_grounded = entity.on_ground();
            entity.set_on_ground(false);
            entity.set_hit_wall(false);

            let velocity = entity.velocity();
            entity.rect_mut().translate(velocity * seconds);

            let rect = entity.rect();
            let mut blocking = Vec::new();
            for cell in physics::candidate_cells(&rect) {
                let tile = &self.tiles.stored_mut(cell)?.tile;
                if !tile.has_collision() {
                    continue;
                }
                let tile_rect = tile.rect();
                if rect.collides(&tile_rect) {
                    blocking.push(tile_rect);
                }
            }
            for tile_rect in &blocking {
                let _ = physics::resolve(entity, tile_rect);
            }

            *entity.velocity_mut() += self.gravity * seconds;

            if entity.on_ground() && !was_grounded {
                events.push(Event::EntityLanded { entity: id });
            }
            if entity.hit_wall() {
                events.push(Event::EntityHitWall { entity: id });
            }
        }
        Ok(events)
    }

    /// Composites the terrain inside the window and lists the entities within it.
    ///
    /// `columns` is half-open and `rows` inclusive; both may be given in either order.
    pub fn image(
        &mut self,
        columns: (i32, i32),
        rows: (i32, i32),
    ) -> Result<RenderedWindow<'_>, WorldError> {
        self.tiles.sync();
        let key = WindowKey::normalized(columns, rows);
        let (c0, c1) = key.columns();
        let (r0, r1) = key.rows();

        let size = key
            .pixel_size()
            .ok_or(WorldError::WindowTooLarge { key })?;
        let entry = self.windows.entry(key, size);
        for (x, column) in (c0..c1).enumerate() {
            for (y, row) in (r0..=r1).enumerate() {
                let stored = self.tiles.stored_mut(GridPos::new(column, row))?;
                if entry.refresh(x as u32, y as u32, stored.record(), &stored.tile) {
                    self.composite_count += 1;
                }
            }
        }

        let height = entry.composite().height() as i32;
        let pixels = TILE_PIXELS as f32;
        let sprites = self
            .entities
            .iter()
            .filter_map(|(&id, entity)| {
                let position = entity.position();
                let inside = (c0 as f32) < position.x
                    && position.x < c1 as f32
                    && (r0 as f32) < position.y
                    && position.y < r1 as f32;
                if !inside {
                    return None;
                }
                let appearance = entity.appearance();
                let x = ((position.x - c0 as f32) * pixels) as i32 + appearance.draw_offset.x;
                let y = height - ((position.y - r0 as f32) * pixels) as i32
                    + appearance.draw_offset.y;
                Some(EntitySprite {
                    entity: id,
                    image: appearance.image,
                    position: PixelOffset::new(x, y),
                })
            })
            .collect();

        Ok(RenderedWindow {
            key,
            composite: entry.composite(),
            sprites,
        })
    }
}

impl<G: ColumnGenerator> fmt::Debug for World<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("columns", &self.tiles.columns.len())
            .field("entities", &self.entities)
            .field("gravity", &self.gravity)
            .field("windows", &self.windows.len())
            .finish_non_exhaustive()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Rejections caused by the command itself are reported as events; errors are
/// reserved for failures of the terrain source.
pub fn apply<G: ColumnGenerator>(
    world: &mut World<G>,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::Tick { dt } => {
            let contacts = world.step(dt)?;
            out_events.push(Event::TimeAdvanced { dt });
            out_events.extend(contacts);
        }
        Command::SetGravity { gravity } => {
            world.set_gravity(gravity);
            out_events.push(Event::GravityChanged { gravity });
        }
        Command::SetEntityVelocity { entity, velocity } => match world.entity_mut(entity) {
            Some(target) => {
                target.set_velocity(velocity);
                out_events.push(Event::EntityVelocityChanged { entity, velocity });
            }
            None => out_events.push(Event::EntityMissing { entity }),
        },
        Command::ApplyImpulse { entity, impulse } => match world.entity_mut(entity) {
            Some(target) => {
                *target.velocity_mut() += impulse;
                out_events.push(Event::EntityVelocityChanged {
                    entity,
                    velocity: target.velocity(),
                });
            }
            None => out_events.push(Event::EntityMissing { entity }),
        },
        Command::SetEntityField {
            entity,
            field,
            value,
        } => match world.entity_mut(entity) {
            Some(target) => match target.set_field(field, value) {
                Ok(_) => out_events.push(Event::EntityFieldChanged {
                    entity,
                    field,
                    value,
                }),
                Err(error) => out_events.push(Event::FieldRejected { error }),
            },
            None => out_events.push(Event::EntityMissing { entity }),
        },
        Command::SetTileField {
            position,
            field,
            value,
        } => match world.set_tile_field(position, field, value) {
            Ok(_) => out_events.push(Event::TileChanged { position }),
            Err(WorldError::Field(error)) => out_events.push(Event::FieldRejected { error }),
            Err(WorldError::RowOutOfRange { position }) => {
                out_events.push(Event::TileRejected { position });
            }
            Err(error) => return Err(error),
        },
        Command::ReplaceTile { tile } => {
            let position = tile.position();
            match world.replace_tile(tile) {
                Ok(_) => out_events.push(Event::TileChanged { position }),
                Err(WorldError::RowOutOfRange { position }) => {
                    out_events.push(Event::TileRejected { position });
                }
                Err(error) => return Err(error),
            }
        }
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use sidecraft_core::{ColumnGenerator, EntityId, EntitySnapshot, Fingerprint, Vector2};

    use super::{WindowCache, World};

    /// Current gravity in tiles per second squared.
    #[must_use]
    pub fn gravity<G: ColumnGenerator>(world: &World<G>) -> Vector2 {
        world.gravity
    }

    /// Captures the state of a single entity.
    #[must_use]
    pub fn entity_snapshot<G: ColumnGenerator>(
        world: &World<G>,
        id: EntityId,
    ) -> Option<EntitySnapshot> {
        world
            .entities
            .get(&id)
            .map(|entity| EntitySnapshot::capture(id, entity))
    }

    /// Captures every entity in identifier order.
    #[must_use]
    pub fn entity_view<G: ColumnGenerator>(world: &World<G>) -> Vec<EntitySnapshot> {
        world
            .entities
            .iter()
            .map(|(&id, entity)| EntitySnapshot::capture(id, entity))
            .collect()
    }

    /// Number of per-cell composite operations performed so far.
    #[must_use]
    pub fn composite_count<G: ColumnGenerator>(world: &World<G>) -> u64 {
        world.composite_count
    }

    /// Cache of composited render windows.
    #[must_use]
    pub fn window_cache<G: ColumnGenerator>(world: &World<G>) -> &WindowCache {
        &world.windows
    }

    /// Number of columns currently held in storage.
    #[must_use]
    pub fn stored_columns<G: ColumnGenerator>(world: &World<G>) -> usize {
        world.tiles.columns.len()
    }

    /// Fingerprint of the configuration the stored terrain was generated with.
    #[must_use]
    pub fn terrain_fingerprint<G: ColumnGenerator>(world: &World<G>) -> Fingerprint {
        world.tiles.fingerprint
    }
}
