//! Fingerprinted terrain configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sidecraft_core::{Configuration, Fingerprint, WORLD_ROWS};
use thiserror::Error;

/// Errors raised while loading or validating generator settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The TOML document could not be parsed.
    #[error("failed to parse generator settings")]
    Parse(#[from] toml::de::Error),
    /// A field holds a value the generator cannot work with.
    #[error("invalid `{field}`: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

/// Catalog keys of the tiles placed by the layered generator.
///
/// The dirt type must declare a `state` field admitting `'coarse'` whenever
/// coarse dirt can be drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Palette {
    /// Bedrock layer.
    pub stone: String,
    /// Layer between stone and the surface.
    pub dirt: String,
    /// Surface layer.
    pub grass: String,
    /// Everything above the surface.
    pub air: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            stone: "classic:stone".to_owned(),
            dirt: "classic:dirt".to_owned(),
            grass: "classic:grass".to_owned(),
            air: "classic:air".to_owned(),
        }
    }
}

/// Parameters of [`crate::LayeredTerrain`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Seed for the height noise and the dirt variant draws.
    pub seed: u32,
    /// Horizontal noise frequency per column.
    pub frequency: f64,
    /// Lowest possible stone height.
    pub base_height: i32,
    /// Half the spread of the stone height above `base_height`.
    pub amplitude: f64,
    /// Dirt rows between stone and grass.
    pub dirt_depth: u32,
    /// Probability that a dirt tile is coarse.
    pub coarse_dirt_chance: f64,
    /// Tile keys used for each layer.
    pub palette: Palette,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            frequency: 0.01,
            base_height: 50,
            amplitude: 50.0,
            dirt_depth: 3,
            coarse_dirt_chance: 0.0,
            palette: Palette::default(),
        }
    }
}

impl GeneratorSettings {
    /// Parses and validates settings from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every field is usable by the generator.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.frequency.is_finite() {
            return Err(invalid("frequency", "must be finite"));
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(invalid("amplitude", "must be a finite, non-negative number"));
        }
        if self.base_height < 0 {
            return Err(invalid("base_height", "must not be negative"));
        }
        if i64::from(self.dirt_depth) + 2 > i64::from(WORLD_ROWS) {
            return Err(invalid(
                "dirt_depth",
                format!("leaves no room for grass and air in {WORLD_ROWS} rows"),
            ));
        }
        if !(0.0..=1.0).contains(&self.coarse_dirt_chance) {
            return Err(invalid("coarse_dirt_chance", "must lie in [0, 1]"));
        }
        Ok(())
    }
}

impl Configuration for GeneratorSettings {
    fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.frequency.to_bits().to_le_bytes());
        hasher.update(self.base_height.to_le_bytes());
        hasher.update(self.amplitude.to_bits().to_le_bytes());
        hasher.update(self.dirt_depth.to_le_bytes());
        hasher.update(self.coarse_dirt_chance.to_bits().to_le_bytes());
        for key in [
            &self.palette.stone,
            &self.palette.dirt,
            &self.palette.grass,
            &self.palette.air,
        ] {
            update_str(&mut hasher, key);
        }
        finalize_fingerprint(hasher)
    }
}

/// Parameters of [`crate::FlatTerrain`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlatSettings {
    /// Number of solid rows starting at row zero.
    pub height: i32,
    /// Tile key of the solid rows.
    pub fill: String,
    /// Tile key of every row above.
    pub air: String,
}

impl Default for FlatSettings {
    fn default() -> Self {
        Self {
            height: 53,
            fill: "classic:stone".to_owned(),
            air: "classic:air".to_owned(),
        }
    }
}

impl Configuration for FlatSettings {
    fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_le_bytes());
        update_str(&mut hasher, &self.fill);
        update_str(&mut hasher, &self.air);
        finalize_fingerprint(hasher)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Reads the first eight digest bytes as a little-endian integer.
pub(crate) fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn finalize_fingerprint(hasher: Sha256) -> Fingerprint {
    Fingerprint::new(finalize_seed(hasher))
}
