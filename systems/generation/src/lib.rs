#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic terrain column generation.
//!
//! A [`TerrainSource`] turns a column index into a full stack of tiles.
//! [`CachedGenerator`] wraps a source, memoizes the produced columns, and
//! forgets them as soon as the source's configuration fingerprint changes.
//! Memoized tiles are handed out as [`Rc`]s, so a world storing a column
//! shares the generator's tiles instead of copying them.

mod settings;

use std::{
    collections::{hash_map::Entry, HashMap},
    rc::Rc,
    sync::Arc,
};

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use sidecraft_core::{
    Catalog, ColumnGenerator, Configuration, FieldValue, Fingerprint, GenerationError, GridPos,
    Tile, TileType, WORLD_ROWS,
};
use tracing::{debug, info};

pub use settings::{FlatSettings, GeneratorSettings, Palette, SettingsError};

use settings::finalize_seed;

/// Produces complete columns from a fingerprinted configuration.
pub trait TerrainSource {
    /// Configuration consulted on every generated column.
    type Settings: Configuration;

    /// Current configuration.
    fn settings(&self) -> &Self::Settings;

    /// Mutable access to the configuration.
    fn settings_mut(&mut self) -> &mut Self::Settings;

    /// Builds the tiles of column `index`, row zero first.
    fn generate(&self, index: i32) -> Result<Vec<Tile>, GenerationError>;
}

/// Column generator that memoizes the output of a [`TerrainSource`].
#[derive(Debug)]
pub struct CachedGenerator<T> {
    source: T,
    fingerprint: Fingerprint,
    columns: HashMap<i32, Vec<Rc<Tile>>>,
}

impl<T: TerrainSource> CachedGenerator<T> {
    /// Wraps `source` with an empty memo.
    #[must_use]
    pub fn new(source: T) -> Self {
        let fingerprint = source.settings().fingerprint();
        Self {
            source,
            fingerprint,
            columns: HashMap::new(),
        }
    }

    /// Configuration of the wrapped source.
    #[must_use]
    pub fn config(&self) -> &T::Settings {
        self.source.settings()
    }

    /// Mutable configuration; the memo is discarded on the next call if the fingerprint moved.
    pub fn config_mut(&mut self) -> &mut T::Settings {
        self.source.settings_mut()
    }

    /// Wrapped source.
    #[must_use]
    pub fn source(&self) -> &T {
        &self.source
    }

    /// Number of memoized columns.
    #[must_use]
    pub fn cached_columns(&self) -> usize {
        self.columns.len()
    }
}

impl<T: TerrainSource> ColumnGenerator for CachedGenerator<T> {
    fn fingerprint(&self) -> Fingerprint {
        self.source.settings().fingerprint()
    }

    fn column(&mut self, index: i32) -> Result<&[Rc<Tile>], GenerationError> {
        let current = self.source.settings().fingerprint();
        if current != self.fingerprint {
            info!(
                discarded = self.columns.len(),
                "terrain configuration changed, clearing memoized columns"
            );
            self.columns.clear();
            self.fingerprint = current;
        }

        match self.columns.entry(index) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_slice()),
            Entry::Vacant(entry) => {
                let tiles = self.source.generate(index)?;
                let tiles: Vec<_> = tiles.into_iter().map(Rc::new).collect();
                debug!(column = index, "generated terrain column");
                Ok(entry.insert(tiles).as_slice())
            }
        }
    }
}

/// Noise-driven terrain: stone, a few rows of dirt, one grass row, then air.
#[derive(Debug)]
pub struct LayeredTerrain {
    catalog: Catalog,
    settings: GeneratorSettings,
}

impl LayeredTerrain {
    /// Creates a source drawing tile types from `catalog`.
    ///
    /// The settings must validate and every palette key must resolve. When
    /// coarse dirt can be rolled, the dirt type must accept `state = "coarse"`.
    pub fn new(catalog: Catalog, settings: GeneratorSettings) -> Result<Self, GenerationError> {
        settings
            .validate()
            .map_err(|error| GenerationError::InvalidConfiguration {
                reason: error.to_string(),
            })?;
        for key in [
            &settings.palette.stone,
            &settings.palette.grass,
            &settings.palette.air,
        ] {
            let _ = catalog.tile(key)?;
        }
        let dirt = catalog.tile(&settings.palette.dirt)?;
        if settings.coarse_dirt_chance > 0.0 {
            let _ = coarse_dirt(dirt, GridPos::new(0, 0))?;
        }
        Ok(Self { catalog, settings })
    }

    /// Number of stone rows in column `index`, before clamping.
    #[must_use]
    pub fn raw_stone_height(&self, index: i32) -> i64 {
        let perlin = Perlin::new(self.settings.seed);
        let sample = perlin.get([f64::from(index) * self.settings.frequency, 0.0]);
        ((sample + 1.0) * self.settings.amplitude).round() as i64
            + i64::from(self.settings.base_height)
    }

    /// Number of stone rows in column `index`, leaving room for dirt, grass and one air row.
    #[must_use]
    pub fn stone_height(&self, index: i32) -> i32 {
        let ceiling = i64::from(WORLD_ROWS) - i64::from(self.settings.dirt_depth) - 2;
        self.raw_stone_height(index).clamp(0, ceiling.max(0)) as i32
    }
}

impl TerrainSource for LayeredTerrain {
    type Settings = GeneratorSettings;

    fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut GeneratorSettings {
        &mut self.settings
    }

    fn generate(&self, index: i32) -> Result<Vec<Tile>, GenerationError> {
        let palette = &self.settings.palette;
        let stone = self.catalog.tile(&palette.stone)?;
        let dirt = self.catalog.tile(&palette.dirt)?;
        let grass = self.catalog.tile(&palette.grass)?;
        let air = self.catalog.tile(&palette.air)?;

        let stone_top = self.stone_height(index);
        let depth = i32::try_from(self.settings.dirt_depth).unwrap_or(i32::MAX);
        let dirt_top = stone_top.saturating_add(depth);
        let mut rng = ChaCha8Rng::seed_from_u64(column_seed(self.settings.seed, index));

        let mut tiles = Vec::with_capacity(WORLD_ROWS as usize);
        for row in 0..WORLD_ROWS {
            let position = GridPos::new(index, row);
            let tile = if row < stone_top {
                Tile::with_defaults(stone.clone(), position)?
            } else if row < dirt_top {
                let roll: f64 = rng.gen();
                if roll < self.settings.coarse_dirt_chance {
                    coarse_dirt(dirt.clone(), position)?
                } else {
                    Tile::with_defaults(dirt.clone(), position)?
                }
            } else if row == dirt_top {
                Tile::with_defaults(grass.clone(), position)?
            } else {
                Tile::with_defaults(air.clone(), position)?
            };
            tiles.push(tile);
        }
        Ok(tiles)
    }
}

/// Terrain of constant height, mainly for scenarios and tests.
#[derive(Debug)]
pub struct FlatTerrain {
    catalog: Catalog,
    settings: FlatSettings,
}

impl FlatTerrain {
    /// Creates a source drawing tile types from `catalog`.
    pub fn new(catalog: Catalog, settings: FlatSettings) -> Result<Self, GenerationError> {
        let _ = catalog.tile(&settings.fill)?;
        let _ = catalog.tile(&settings.air)?;
        Ok(Self { catalog, settings })
    }
}

impl TerrainSource for FlatTerrain {
    type Settings = FlatSettings;

    fn settings(&self) -> &FlatSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut FlatSettings {
        &mut self.settings
    }

    fn generate(&self, index: i32) -> Result<Vec<Tile>, GenerationError> {
        let fill = self.catalog.tile(&self.settings.fill)?;
        let air = self.catalog.tile(&self.settings.air)?;
        (0..WORLD_ROWS)
            .map(|row| {
                let kind = if row < self.settings.height {
                    fill.clone()
                } else {
                    air.clone()
                };
                Tile::with_defaults(kind, GridPos::new(index, row)).map_err(GenerationError::from)
            })
            .collect()
    }
}

fn coarse_dirt(dirt: Arc<dyn TileType>, position: GridPos) -> Result<Tile, GenerationError> {
    Ok(Tile::new(dirt, position, [("state", FieldValue::Name("coarse"))])?)
}

fn column_seed(seed: u32, index: i32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(index.to_le_bytes());
    finalize_seed(hasher)
}
