use image::Rgba;
use sidecraft_core::{Command, Event, FieldValue, GridPos, Vector2};
use sidecraft_pack_classic::{self as classic, DIRT, PLAYER};
use sidecraft_system_generation::{CachedGenerator, FlatSettings, FlatTerrain};
use sidecraft_world::{self as world, query, WindowKey, World, WorldError, WorldSettings};

fn flat_world(capacity: usize) -> World<CachedGenerator<FlatTerrain>> {
    let catalog = classic::catalog().expect("classic catalog");
    let terrain = FlatTerrain::new(catalog, FlatSettings::default()).expect("palette resolves");
    World::with_settings(
        CachedGenerator::new(terrain),
        Vector2::new(0.0, -20.0),
        WorldSettings {
            window_cache_capacity: capacity,
        },
    )
}

#[test]
fn window_composite_has_inclusive_row_height() {
    let mut world = flat_world(100);
    let rendered = world.image((0, 4), (50, 55)).expect("window");
    assert_eq!(rendered.composite.dimensions(), (64, 96));
    assert_eq!(rendered.key, WindowKey::normalized((0, 4), (50, 55)));
    assert_eq!(query::composite_count(&world), 24);
}

#[test]
fn stone_and_air_land_in_the_right_pixel_rows() {
    let mut world = flat_world(100);
    let rendered = world.image((0, 1), (52, 53)).expect("window");
    let composite = rendered.composite;
    assert_eq!(composite.dimensions(), (16, 32));
    // Row 53 is air and sits on top; row 52 is stone below it.
    assert_eq!(composite.get_pixel(8, 4), &Rgba([0, 0, 0, 0]));
    assert_eq!(composite.get_pixel(8, 20).0[3], 255);
}

#[test]
fn repeated_and_reversed_queries_reuse_the_composite() {
    let mut world = flat_world(100);
    let first = world.image((0, 4), (50, 55)).expect("window").composite.clone();
    let repeated = world.image((0, 4), (50, 55)).expect("window").composite.clone();
    assert_eq!(repeated, first);
    let reversed = world.image((4, 0), (55, 50)).expect("window").composite.clone();
    assert_eq!(reversed, first);
    assert_eq!(query::composite_count(&world), 24);
    assert_eq!(query::window_cache(&world).len(), 1);
}

#[test]
fn oversized_windows_are_refused() {
    let mut world = flat_world(100);
    let error = world
        .image((0, 300_000_000), (0, 0))
        .expect_err("composite would not fit in memory");
    assert_eq!(
        error,
        WorldError::WindowTooLarge {
            key: WindowKey::normalized((0, 300_000_000), (0, 0)),
        }
    );
    assert_eq!(query::window_cache(&world).len(), 0);
    assert_eq!(query::stored_columns(&world), 0);
}

#[test]
fn rows_are_clamped_into_the_world() {
    let mut world = flat_world(100);
    let rendered = world.image((0, 2), (250, 400)).expect("window");
    assert_eq!(rendered.key.rows(), (250, 255));
    assert_eq!(rendered.composite.dimensions(), (32, 96));
}

#[test]
fn only_changed_cells_are_recomposited() {
    let catalog = classic::catalog().expect("classic catalog");
    let mut world = flat_world(100);
    let _ = world.image((0, 4), (50, 55)).expect("window");

    let dirt = catalog
        .spawn_tile(DIRT, GridPos::new(1, 52), [])
        .expect("dirt");
    let mut events = Vec::new();
    world::apply(&mut world, Command::ReplaceTile { tile: dirt }, &mut events).expect("replace");
    assert_eq!(
        events,
        vec![Event::TileChanged {
            position: GridPos::new(1, 52)
        }]
    );
    let _ = world.image((0, 4), (50, 55)).expect("window");
    assert_eq!(query::composite_count(&world), 25);

    events.clear();
    world::apply(
        &mut world,
        Command::SetTileField {
            position: GridPos::new(1, 52),
            field: "state",
            value: FieldValue::Name("coarse"),
        },
        &mut events,
    )
    .expect("set field");
    let _ = world.image((0, 4), (50, 55)).expect("window");
    assert_eq!(query::composite_count(&world), 26);

    let _ = world.image((0, 4), (50, 55)).expect("window");
    assert_eq!(query::composite_count(&world), 26);
}

#[test]
fn oldest_window_is_evicted_at_capacity() {
    let mut world = flat_world(2);
    let a = world.image((0, 1), (50, 50)).expect("window").key;
    let b = world.image((1, 2), (50, 50)).expect("window").key;
    let _ = world.image((0, 1), (50, 50)).expect("window");
    let c = world.image((2, 3), (50, 50)).expect("window").key;

    let cache = query::window_cache(&world);
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&a));
    assert!(cache.contains(&b));
    assert!(cache.contains(&c));
}

#[test]
fn entities_are_listed_as_sprites_not_baked() {
    let catalog = classic::catalog().expect("classic catalog");
    let mut world = flat_world(100);
    let inside = world.add(
        catalog
            .spawn_entity(PLAYER, Vector2::new(2.5, 54.0), [])
            .expect("player"),
    );
    let _outside = world.add(
        catalog
            .spawn_entity(PLAYER, Vector2::new(9.5, 54.0), [])
            .expect("player"),
    );
    let _on_edge = world.add(
        catalog
            .spawn_entity(PLAYER, Vector2::new(4.0, 54.0), [])
            .expect("player"),
    );

    let rendered = world.image((0, 4), (50, 55)).expect("window");
    assert_eq!(rendered.sprites.len(), 1);
    let sprite = &rendered.sprites[0];
    assert_eq!(sprite.entity, inside);
    assert_eq!((sprite.position.x, sprite.position.y), (32, 16));
    assert_eq!(sprite.image.dimensions(), (16, 32));
    // The air cell behind the sprite stays transparent in the composite.
    assert_eq!(rendered.composite.get_pixel(40, 20), &Rgba([0, 0, 0, 0]));
}

#[test]
fn mutated_generator_configuration_refreshes_the_terrain() {
    let mut world = flat_world(100);
    let _ = world.image((0, 2), (52, 53)).expect("window");
    let before = query::composite_count(&world);
    assert_eq!(query::stored_columns(&world), 2);

    world.generator_mut().config_mut().height = 60;
    let rendered = world.image((0, 2), (52, 53)).expect("window");
    assert_eq!(rendered.composite.get_pixel(8, 4).0[3], 255);
    assert_eq!(query::composite_count(&world), before + 4);
    assert_eq!(query::stored_columns(&world), 2);
    assert_eq!(
        world.tile(GridPos::new(0, 59)).map(|tile| tile.kind_id()),
        Ok(classic::STONE)
    );
}
