use std::time::Duration;

use std::rc::Rc;

use sidecraft_core::{
    ColumnGenerator, Command, EntityId, Event, FieldError, FieldValue, GenerationError, GridPos,
    Tile, Vector2,
};
use sidecraft_pack_classic::{self as classic, DIRT, PLAYER, STONE};
use sidecraft_system_generation::{
    CachedGenerator, FlatSettings, FlatTerrain, GeneratorSettings, LayeredTerrain,
};
use sidecraft_world::{self as world, query, World, WorldError};

fn flat_world() -> World<CachedGenerator<FlatTerrain>> {
    let catalog = classic::catalog().expect("classic catalog");
    let terrain = FlatTerrain::new(catalog, FlatSettings::default()).expect("palette resolves");
    World::new(CachedGenerator::new(terrain), Vector2::new(0.0, -20.0))
}

fn run(world: &mut World<CachedGenerator<FlatTerrain>>, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events).expect("command");
    events
}

#[test]
fn tick_reports_elapsed_time_first() {
    let mut world = flat_world();
    let dt = Duration::from_millis(20);
    assert_eq!(
        run(&mut world, Command::Tick { dt }),
        vec![Event::TimeAdvanced { dt }]
    );
}

#[test]
fn gravity_changes_are_announced() {
    let mut world = flat_world();
    let gravity = Vector2::new(0.0, -9.5);
    assert_eq!(
        run(&mut world, Command::SetGravity { gravity }),
        vec![Event::GravityChanged { gravity }]
    );
    assert_eq!(query::gravity(&world), gravity);
}

#[test]
fn entity_commands_update_the_snapshot() {
    let catalog = classic::catalog().expect("classic catalog");
    let mut world = flat_world();
    let id = world.add(
        catalog
            .spawn_entity(PLAYER, Vector2::new(0.5, 80.0), [])
            .expect("player"),
    );

    let _ = run(
        &mut world,
        Command::SetEntityVelocity {
            entity: id,
            velocity: Vector2::new(2.0, 0.0),
        },
    );
    let events = run(
        &mut world,
        Command::ApplyImpulse {
            entity: id,
            impulse: Vector2::new(0.0, 7.0),
        },
    );
    assert_eq!(
        events,
        vec![Event::EntityVelocityChanged {
            entity: id,
            velocity: Vector2::new(2.0, 7.0),
        }]
    );

    let events = run(
        &mut world,
        Command::SetEntityField {
            entity: id,
            field: "look_direction",
            value: FieldValue::Name("left"),
        },
    );
    assert_eq!(
        events,
        vec![Event::EntityFieldChanged {
            entity: id,
            field: "look_direction",
            value: FieldValue::Name("left"),
        }]
    );

    let snapshot = query::entity_snapshot(&world, id).expect("snapshot");
    assert_eq!(snapshot.velocity, Vector2::new(2.0, 7.0));
    assert_eq!(snapshot.position(), Vector2::new(0.5, 80.0));
    assert_eq!(
        snapshot.fields.get("look_direction"),
        Some(FieldValue::Name("left"))
    );
    assert_eq!(query::entity_view(&world).len(), 1);
}

#[test]
fn invalid_field_values_are_rejected_without_change() {
    let catalog = classic::catalog().expect("classic catalog");
    let mut world = flat_world();
    let id = world.add(
        catalog
            .spawn_entity(PLAYER, Vector2::new(0.5, 80.0), [])
            .expect("player"),
    );

    let events = run(
        &mut world,
        Command::SetEntityField {
            entity: id,
            field: "foot_step",
            value: FieldValue::Float(60.0),
        },
    );
    assert!(matches!(
        events.as_slice(),
        [Event::FieldRejected {
            error: FieldError::InvalidValue {
                field: "foot_step",
                ..
            }
        }]
    ));
    let entity = world.entity(id).expect("entity");
    assert_eq!(entity.field("foot_step"), Some(FieldValue::Float(0.0)));

    let events = run(
        &mut world,
        Command::SetTileField {
            position: GridPos::new(0, 10),
            field: "state",
            value: FieldValue::Name("coarse"),
        },
    );
    assert!(matches!(events.as_slice(), [Event::FieldRejected { .. }]));
}

#[test]
fn unknown_entities_are_reported() {
    let mut world = flat_world();
    let ghost = EntityId::new(42);
    assert_eq!(
        run(
            &mut world,
            Command::SetEntityVelocity {
                entity: ghost,
                velocity: Vector2::ZERO,
            }
        ),
        vec![Event::EntityMissing { entity: ghost }]
    );
}

#[test]
fn tiles_outside_the_rows_are_rejected() {
    let catalog = classic::catalog().expect("classic catalog");
    let mut world = flat_world();
    let position = GridPos::new(3, 300);
    let stone = catalog.spawn_tile(STONE, position, []).expect("stone");
    assert_eq!(
        run(&mut world, Command::ReplaceTile { tile: stone }),
        vec![Event::TileRejected { position }]
    );
    assert_eq!(
        run(
            &mut world,
            Command::SetTileField {
                position: GridPos::new(0, -1),
                field: "state",
                value: FieldValue::Name("normal"),
            }
        ),
        vec![Event::TileRejected {
            position: GridPos::new(0, -1)
        }]
    );
}

#[test]
fn replacing_a_tile_assigns_a_fresh_serial() {
    let catalog = classic::catalog().expect("classic catalog");
    let mut world = flat_world();
    let position = GridPos::new(0, 60);
    let before = world.tile_serial(position).expect("serial");
    let stone = catalog.spawn_tile(STONE, position, []).expect("stone");
    let serial = world.replace_tile(stone).expect("replace");
    assert_ne!(serial, before);
    assert_eq!(world.tile_serial(position), Ok(serial));
    assert_eq!(
        world.tile(position).map(|tile| tile.kind_id()),
        Ok(STONE)
    );
}

#[test]
fn failed_generation_leaves_entities_untouched() {
    let catalog = classic::catalog().expect("classic catalog");
    let terrain =
        LayeredTerrain::new(catalog.clone(), GeneratorSettings::default()).expect("palette");
    let mut world = World::new(CachedGenerator::new(terrain), Vector2::new(0.0, -20.0));
    let player = world.add(
        catalog
            .spawn_entity(PLAYER, Vector2::new(500.5, 200.0), [])
            .expect("player"),
    );
    world
        .entity_mut(player)
        .expect("player")
        .set_velocity(Vector2::new(0.0, -10.0));
    let before = query::entity_snapshot(&world, player).expect("player");

    // Stone cannot be coarse, so every column now fails to generate.
    let config = world.generator_mut().config_mut();
    config.palette.dirt = STONE.to_owned();
    config.coarse_dirt_chance = 1.0;

    let dt = Duration::from_millis(100);
    let error = world.update(dt).expect_err("stone has no coarse state");
    assert!(
        matches!(error, WorldError::Generation(GenerationError::Field(_))),
        "{error:?}"
    );
    assert_eq!(query::entity_snapshot(&world, player), Some(before.clone()));

    let mut events = Vec::new();
    assert!(world::apply(&mut world, Command::Tick { dt }, &mut events).is_err());
    assert!(events.is_empty(), "{events:?}");
    assert_eq!(query::entity_snapshot(&world, player), Some(before));
}

#[test]
fn stored_tiles_are_shared_until_changed() {
    let catalog = classic::catalog().expect("classic catalog");
    let settings = FlatSettings {
        fill: DIRT.to_owned(),
        ..FlatSettings::default()
    };
    let terrain = FlatTerrain::new(catalog, settings).expect("palette resolves");
    let mut world = World::new(CachedGenerator::new(terrain), Vector2::new(0.0, -20.0));
    let position = GridPos::new(2, 10);

    let stored: *const Tile = world.tile(position).expect("tile");
    let memo = Rc::clone(&world.generator_mut().column(2).expect("column")[10]);
    assert!(std::ptr::eq(stored, Rc::as_ptr(&memo)));

    let events = run(
        &mut world,
        Command::SetTileField {
            position,
            field: "state",
            value: FieldValue::Name("coarse"),
        },
    );
    assert_eq!(events, vec![Event::TileChanged { position }]);
    assert_eq!(
        world.tile(position).expect("tile").field("state"),
        Some(FieldValue::Name("coarse"))
    );
    assert_eq!(memo.field("state"), Some(FieldValue::Name("normal")));
    assert_eq!(
        world.generator_mut().column(2).expect("column")[10].field("state"),
        Some(FieldValue::Name("normal"))
    );
}
