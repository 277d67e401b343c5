#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation glue between the Sidecraft world and a frame consumer.
//!
//! The [`Camera`] turns a scroll position into the render window requested
//! from the world and knows where the returned composite and sprites land on
//! screen. [`Camera::present`] produces the finished frame.

use anyhow::Result as AnyResult;
use glam::{IVec2, UVec2, Vec2};
use image::{imageops, Rgba, RgbaImage};
use sidecraft_core::{Vector2, TILE_PIXELS};
use sidecraft_world::{RenderedWindow, WindowKey};
use std::{error::Error, fmt};

/// Colour drawn behind the terrain.
pub const SKY: Rgba<u8> = Rgba([0, 136, 255, 255]);

/// Extra cells requested past the right and top screen edges.
const WINDOW_MARGIN: i32 = 2;

/// Viewport onto the world, measured in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    scroll: Vec2,
    resolution: UVec2,
}

impl Camera {
    /// Creates a camera whose bottom-left screen corner shows world pixel `scroll`.
    pub fn new(scroll: Vec2, resolution: UVec2) -> Result<Self, RenderingError> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(RenderingError::EmptyResolution { resolution });
        }
        Ok(Self { scroll, resolution })
    }

    /// World pixel shown at the bottom-left corner of the screen.
    #[must_use]
    pub const fn scroll(&self) -> Vec2 {
        self.scroll
    }

    /// Moves the camera to a new scroll position.
    pub fn set_scroll(&mut self, scroll: Vec2) {
        self.scroll = scroll;
    }

    /// Screen size in pixels.
    #[must_use]
    pub const fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// Centres the camera on a point given in tiles.
    pub fn follow(&mut self, center: Vector2) {
        let pixels = TILE_PIXELS as f32;
        let half = self.resolution.as_vec2() / 2.0;
        self.scroll = Vec2::new(center.x * pixels, center.y * pixels) - half;
    }

    /// Half-open column range covering the screen.
    #[must_use]
    pub fn visible_columns(&self) -> (i32, i32) {
        let pixels = TILE_PIXELS as f32;
        let first = (self.scroll.x / pixels).floor() as i32;
        let last = ((self.scroll.x + self.resolution.x as f32) / pixels).floor() as i32;
        (first, last + WINDOW_MARGIN)
    }

    /// Row range covering the screen, before the world clamps it.
    #[must_use]
    pub fn visible_rows(&self) -> (i32, i32) {
        let pixels = TILE_PIXELS as f32;
        let first = (self.scroll.y / pixels).floor() as i32;
        let last = ((self.scroll.y + self.resolution.y as f32) / pixels).floor() as i32;
        (first, last + WINDOW_MARGIN)
    }

    /// Screen position of a world point given in tiles, y pointing down.
    #[must_use]
    pub fn world_to_screen(&self, point: Vector2) -> Vec2 {
        let pixels = TILE_PIXELS as f32;
        Vec2::new(
            point.x * pixels - self.scroll.x,
            self.resolution.y as f32 - (point.y * pixels - self.scroll.y),
        )
    }

    /// Screen position of the composite's top-left corner for the window `key`.
    #[must_use]
    pub fn composite_origin(&self, key: &WindowKey) -> IVec2 {
        let (first_column, _) = key.columns();
        let (_, last_row) = key.rows();
        let top_left = Vector2::new(first_column as f32, (last_row + 1) as f32);
        let screen = self.world_to_screen(top_left);
        IVec2::new(screen.x.floor() as i32, screen.y.floor() as i32)
    }

    /// Draws the sky, the terrain composite, and every sprite into a new frame.
    #[must_use]
    pub fn present(&self, window: &RenderedWindow<'_>) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(self.resolution.x, self.resolution.y, SKY);
        let origin = self.composite_origin(&window.key);
        imageops::overlay(
            &mut frame,
            window.composite,
            i64::from(origin.x),
            i64::from(origin.y),
        );
        for sprite in &window.sprites {
            imageops::overlay(
                &mut frame,
                &*sprite.image,
                i64::from(origin.x + sprite.position.x),
                i64::from(origin.y + sprite.position.y),
            );
        }
        frame
    }
}

/// Consumer of finished frames, such as a window or an image writer.
pub trait FrameSink {
    /// Receives the frame with the given zero-based index.
    fn submit(&mut self, index: u64, frame: RgbaImage) -> AnyResult<()>;

    /// Called once after the last frame.
    fn finish(&mut self) -> AnyResult<()> {
        Ok(())
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Both screen dimensions must be positive.
    EmptyResolution {
        /// Provided resolution that failed validation.
        resolution: UVec2,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResolution { resolution } => {
                write!(
                    f,
                    "resolution must be positive in both axes (received {}x{})",
                    resolution.x, resolution.y
                )
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(scroll: Vec2) -> Camera {
        Camera::new(scroll, UVec2::new(640, 480)).expect("valid resolution")
    }

    #[test]
    fn camera_rejects_zero_resolution_without_panicking() {
        let error = Camera::new(Vec2::ZERO, UVec2::new(0, 480))
            .expect_err("zero width must be rejected");
        assert_eq!(
            error,
            RenderingError::EmptyResolution {
                resolution: UVec2::new(0, 480)
            }
        );
    }

    #[test]
    fn visible_window_matches_scroll() {
        let camera = camera(Vec2::new(0.0, 1600.0));
        assert_eq!(camera.visible_columns(), (0, 42));
        assert_eq!(camera.visible_rows(), (100, 132));

        let negative = camera_at(-40.0, 1605.0);
        assert_eq!(negative.visible_columns(), (-3, 39));
        assert_eq!(negative.visible_rows(), (100, 132));
    }

    fn camera_at(x: f32, y: f32) -> Camera {
        camera(Vec2::new(x, y))
    }

    #[test]
    fn follow_centres_the_point() {
        let mut camera = camera(Vec2::ZERO);
        camera.follow(Vector2::new(10.0, 100.0));
        assert_eq!(camera.scroll(), Vec2::new(-160.0, 1360.0));
        assert_eq!(
            camera.world_to_screen(Vector2::new(10.0, 100.0)),
            Vec2::new(320.0, 240.0)
        );
    }

    #[test]
    fn composite_origin_aligns_cells_with_scroll() {
        let camera = camera_at(-40.0, 1605.0);
        let key = WindowKey::normalized(camera.visible_columns(), camera.visible_rows());
        let origin = camera.composite_origin(&key);
        // Column -3 starts 8 pixels left of the screen edge.
        assert_eq!(origin.x, -8);
        // Row 100 starts 5 pixels below the bottom edge; the window is 33 rows tall.
        assert_eq!(origin.y, 480 + 5 - 33 * 16);
    }
}
