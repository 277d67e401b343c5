//! Procedurally painted sprites.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use sidecraft_core::{Sprite, TILE_PIXELS};

const STONE: [u8; 3] = [125, 125, 125];
const DIRT: [u8; 3] = [134, 96, 67];
const COARSE_DIRT: [u8; 3] = [119, 85, 59];
const GRASS: [u8; 3] = [95, 159, 53];

const SKIN: Rgba<u8> = Rgba([214, 163, 126, 255]);
const HAIR: Rgba<u8> = Rgba([60, 40, 22, 255]);
const EYE: Rgba<u8> = Rgba([64, 64, 190, 255]);
const SHIRT: Rgba<u8> = Rgba([0, 170, 170, 255]);
const TROUSERS: Rgba<u8> = Rgba([58, 58, 150, 255]);

/// Deterministic per-pixel noise in `0..=255`.
fn speckle(x: u32, y: u32, salt: u32) -> u8 {
    let mut hash = x
        .wrapping_mul(0x1656_67b1)
        ^ y.wrapping_mul(0x27d4_eb2f)
        ^ salt.wrapping_mul(0x9e37_79b9);
    hash = (hash ^ (hash >> 15)).wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    (hash >> 24) as u8
}

fn shade(base: [u8; 3], amount: i16) -> Rgba<u8> {
    let channel = |value: u8| (i16::from(value) + amount).clamp(0, 255) as u8;
    Rgba([channel(base[0]), channel(base[1]), channel(base[2]), 255])
}

fn textured(base: [u8; 3], salt: u32, spread: i16) -> RgbaImage {
    RgbaImage::from_fn(TILE_PIXELS, TILE_PIXELS, |x, y| {
        let offset = i16::from(speckle(x, y, salt)) % (2 * spread + 1) - spread;
        shade(base, offset)
    })
}

pub(crate) fn empty() -> Sprite {
    Arc::new(RgbaImage::new(TILE_PIXELS, TILE_PIXELS))
}

pub(crate) fn stone() -> RgbaImage {
    textured(STONE, 1, 18)
}

pub(crate) fn dirt(coarse: bool) -> RgbaImage {
    if !coarse {
        return textured(DIRT, 2, 14);
    }
    let mut image = textured(COARSE_DIRT, 3, 20);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if speckle(x, y, 4) > 225 {
            *pixel = shade(STONE, -20);
        }
    }
    image
}

pub(crate) fn grass() -> RgbaImage {
    let mut image = textured(DIRT, 5, 14);
    for x in 0..TILE_PIXELS {
        let depth = 3 + u32::from(speckle(x, 0, 6) % 3);
        for y in 0..depth {
            image.put_pixel(x, y, shade(GRASS, i16::from(speckle(x, y, 7) % 21) - 10));
        }
    }
    image
}

fn fill(image: &mut RgbaImage, left: i32, top: u32, width: u32, height: u32, colour: Rgba<u8>) {
    for y in top..top + height {
        for dx in 0..width as i32 {
            let x = left + dx;
            if x >= 0 && (x as u32) < image.width() && y < image.height() {
                image.put_pixel(x as u32, y, colour);
            }
        }
    }
}

/// Paints a 16x32 figure facing left or right with legs swung by `foot_step` degrees.
pub(crate) fn player(facing_left: bool, foot_step: f32, head_rotation: f32) -> RgbaImage {
    let mut image = RgbaImage::new(TILE_PIXELS, 2 * TILE_PIXELS);
    let swing = (foot_step / 45.0 * 2.0).round() as i32;

    fill(&mut image, 4 + swing, 20, 4, 12, TROUSERS);
    fill(&mut image, 8 - swing, 20, 4, 12, TROUSERS);
    fill(&mut image, 4, 8, 8, 12, SHIRT);
    fill(&mut image, 4, 0, 8, 8, SKIN);
    fill(&mut image, 4, 0, 8, 2, HAIR);

    let eye_x = if facing_left { 5 } else { 10 };
    let eye_y = (4.0 - head_rotation / 40.0).round().clamp(2.0, 6.0) as u32;
    fill(&mut image, eye_x, eye_y, 1, 1, EYE);
    image
}

#[cfg(test)]
mod tests {
    use super::{dirt, grass, player, speckle, stone};

    #[test]
    fn speckle_is_deterministic() {
        assert_eq!(speckle(3, 9, 1), speckle(3, 9, 1));
        assert_ne!(
            (0..16).map(|x| speckle(x, 0, 1)).collect::<Vec<_>>(),
            (0..16).map(|x| speckle(x, 0, 2)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn tile_swatches_are_opaque() {
        for image in [stone(), dirt(false), dirt(true), grass()] {
            assert_eq!(image.dimensions(), (16, 16));
            assert!(image.pixels().all(|pixel| pixel.0[3] == 255));
        }
    }

    #[test]
    fn facing_moves_the_eye() {
        assert_ne!(player(false, 0.0, 0.0), player(true, 0.0, 0.0));
        assert_eq!(player(true, 0.0, 0.0), player(true, 0.0, 0.0));
    }
}
