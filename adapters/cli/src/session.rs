//! Session configuration read from TOML and overridden from the command line.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use serde::Deserialize;
use sidecraft_system_generation::GeneratorSettings;
use sidecraft_world::DEFAULT_WINDOW_CACHE_CAPACITY;

/// Everything the headless session needs besides the content catalog.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionSettings {
    /// Frame size in pixels.
    pub(crate) resolution: [u32; 2],
    /// Number of frames to simulate.
    pub(crate) frames: u64,
    /// Simulated frames per second.
    pub(crate) fps: u32,
    /// Gravity in tiles per second squared.
    pub(crate) gravity: [f32; 2],
    /// Requested player centre; lifted above the terrain when buried.
    pub(crate) spawn: [f32; 2],
    /// Where the last frame is written.
    pub(crate) output: PathBuf,
    /// Composited windows kept by the world.
    pub(crate) window_cache_capacity: usize,
    /// Terrain parameters.
    pub(crate) generator: GeneratorSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            resolution: [640, 480],
            frames: 240,
            fps: 60,
            gravity: [0.0, -20.0],
            spawn: [-5.0, 110.0],
            output: PathBuf::from("sidecraft.png"),
            window_cache_capacity: DEFAULT_WINDOW_CACHE_CAPACITY,
            generator: GeneratorSettings::default(),
        }
    }
}

impl SessionSettings {
    /// Parses and validates a session document.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the frame loop cannot run with.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(self.fps > 0, "`fps` must be positive");
        ensure!(
            self.resolution.iter().all(|&side| side > 0),
            "`resolution` must be positive in both axes"
        );
        ensure!(
            self.gravity.iter().chain(&self.spawn).all(|value| value.is_finite()),
            "`gravity` and `spawn` must be finite"
        );
        self.generator.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionSettings;

    #[test]
    fn empty_document_uses_defaults() {
        let settings = SessionSettings::from_toml_str("").expect("defaults");
        assert_eq!(settings, SessionSettings::default());
    }

    #[test]
    fn nested_generator_section_is_read() {
        let settings = SessionSettings::from_toml_str(
            r#"
            frames = 10
            resolution = [320, 200]

            [generator]
            seed = 7
            coarse_dirt_chance = 0.25
            "#,
        )
        .expect("settings");
        assert_eq!(settings.frames, 10);
        assert_eq!(settings.resolution, [320, 200]);
        assert_eq!(settings.generator.seed, 7);
        assert_eq!(settings.generator.coarse_dirt_chance, 0.25);
        assert_eq!(settings.fps, 60);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SessionSettings::from_toml_str("fps = 0").is_err());
        assert!(SessionSettings::from_toml_str("resolution = [0, 10]").is_err());
        assert!(SessionSettings::from_toml_str("[generator]\ncoarse_dirt_chance = 2.0").is_err());
        assert!(SessionSettings::from_toml_str("unknown = true").is_err());
    }
}
