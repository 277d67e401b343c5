use glam::{UVec2, Vec2};
use sidecraft_core::Vector2;
use sidecraft_pack_classic::{self as classic, PLAYER};
use sidecraft_rendering::{Camera, SKY};
use sidecraft_system_generation::{CachedGenerator, FlatSettings, FlatTerrain};
use sidecraft_world::World;

#[test]
fn frame_shows_sky_terrain_and_player() {
    let catalog = classic::catalog().expect("classic catalog");
    let terrain = FlatTerrain::new(catalog.clone(), FlatSettings::default()).expect("palette");
    let mut world = World::new(CachedGenerator::new(terrain), Vector2::new(0.0, -20.0));
    let center = Vector2::new(0.5, 54.0);
    let _ = world.add(catalog.spawn_entity(PLAYER, center, []).expect("player"));

    let mut camera = Camera::new(Vec2::ZERO, UVec2::new(640, 480)).expect("camera");
    camera.follow(center);
    assert_eq!(camera.world_to_screen(center), Vec2::new(320.0, 240.0));

    let window = world
        .image(camera.visible_columns(), camera.visible_rows())
        .expect("window");
    assert_eq!(window.sprites.len(), 1);
    let frame = camera.present(&window);

    assert_eq!(frame.dimensions(), (640, 480));
    assert_eq!(frame.get_pixel(0, 0), &SKY);
    assert_eq!(frame.get_pixel(639, 200), &SKY);

    // The stone surface sits one tile below the player's centre.
    let ground = frame.get_pixel(100, 300);
    assert_ne!(ground, &SKY);
    assert_eq!(ground.0[3], 255);

    // Shirt pixels of the player sprite, just above its centre.
    let shirt = frame.get_pixel(320, 236);
    assert_ne!(shirt, &SKY);
}

#[test]
fn windows_near_the_top_of_the_world_are_clamped() {
    let catalog = classic::catalog().expect("classic catalog");
    let terrain = FlatTerrain::new(catalog, FlatSettings::default()).expect("palette");
    let mut world = World::new(CachedGenerator::new(terrain), Vector2::new(0.0, -20.0));

    let camera = Camera::new(Vec2::new(0.0, 250.0 * 16.0), UVec2::new(64, 64)).expect("camera");
    let window = world
        .image(camera.visible_columns(), camera.visible_rows())
        .expect("window");
    assert_eq!(window.key.rows(), (250, 255));

    let origin = camera.composite_origin(&window.key);
    // The top of row 255 lies 32 pixels above the screen's top edge.
    assert_eq!(origin.y, 64 - 6 * 16);
    let frame = camera.present(&window);
    assert!(frame.pixels().all(|pixel| *pixel == SKY));
}
