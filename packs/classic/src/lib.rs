#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Classic content pack: the basic terrain blocks and the player.
//!
//! Every sprite is painted procedurally when the pack is registered, so the
//! pack carries no asset files.

mod swatches;

use std::{collections::BTreeMap, sync::Arc};

use sidecraft_core::{
    Catalog, CatalogError, EntityAppearance, EntityDescriptor, EntityType, FieldSpec, FieldValue,
    FieldValues, GridPos, PixelOffset, Sprite, TileAppearance, TileDescriptor, TileType, Vector2,
};

/// Key of the transparent, non-colliding block.
pub const AIR: &str = "classic:air";
/// Key of the bedrock block.
pub const STONE: &str = "classic:stone";
/// Key of the dirt block, which comes in `normal` and `coarse` states.
pub const DIRT: &str = "classic:dirt";
/// Key of the surface block.
pub const GRASS: &str = "classic:grass";
/// Key of the player entity.
pub const PLAYER: &str = "classic:player";

/// Collider size of the player in tiles.
pub const PLAYER_SIZE: Vector2 = Vector2::new(0.75, 2.0);

static AIR_STATES: [FieldValue; 1] = [FieldValue::Name("empty")];
static DIRT_STATES: [FieldValue; 2] = [FieldValue::Name("normal"), FieldValue::Name("coarse")];
static PLAIN_STATES: [FieldValue; 1] = [FieldValue::Name("normal")];

static AIR_FIELDS: [FieldSpec; 1] = [FieldSpec::choices("state", &AIR_STATES)];
static DIRT_FIELDS: [FieldSpec; 1] = [FieldSpec::choices("state", &DIRT_STATES)];
static PLAIN_FIELDS: [FieldSpec; 1] = [FieldSpec::choices("state", &PLAIN_STATES)];

static LOOK_DIRECTIONS: [FieldValue; 2] = [FieldValue::Name("right"), FieldValue::Name("left")];
static PLAYER_FIELDS: [FieldSpec; 3] = [
    FieldSpec::range("head_rotation", -80.0, 80.0, 0.0),
    FieldSpec::choices("look_direction", &LOOK_DIRECTIONS),
    FieldSpec::range("foot_step", -45.0, 45.0, 0.0),
];

/// Block whose image is selected by its `state` field.
#[derive(Debug)]
pub struct StateBlock {
    descriptor: TileDescriptor,
    images: BTreeMap<&'static str, Sprite>,
}

impl StateBlock {
    fn new(
        id: &'static str,
        has_collision: bool,
        fields: &'static [FieldSpec],
        images: impl IntoIterator<Item = (&'static str, Sprite)>,
    ) -> Self {
        Self {
            descriptor: TileDescriptor {
                id,
                has_collision,
                fields,
            },
            images: images.into_iter().collect(),
        }
    }
}

impl TileType for StateBlock {
    fn descriptor(&self) -> &TileDescriptor {
        &self.descriptor
    }

    fn render(&self, fields: &FieldValues, position: GridPos) -> TileAppearance {
        let state = fields
            .get("state")
            .and_then(|value| value.as_name())
            .unwrap_or("normal");
        let image = self
            .images
            .get(state)
            .or_else(|| self.images.values().next())
            .cloned()
            .unwrap_or_else(swatches::empty);
        TileAppearance::sized_to_image(image, position)
    }
}

/// The player character.
#[derive(Debug)]
pub struct Player {
    descriptor: EntityDescriptor,
}

impl Player {
    fn new() -> Self {
        Self {
            descriptor: EntityDescriptor {
                id: PLAYER,
                size: PLAYER_SIZE,
                fields: &PLAYER_FIELDS,
            },
        }
    }
}

impl EntityType for Player {
    fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    fn render(&self, fields: &FieldValues) -> EntityAppearance {
        let facing_left = fields.get("look_direction") == Some(FieldValue::Name("left"));
        let foot_step = fields
            .get("foot_step")
            .and_then(|value| value.as_float())
            .unwrap_or(0.0);
        let head_rotation = fields
            .get("head_rotation")
            .and_then(|value| value.as_float())
            .unwrap_or(0.0);
        EntityAppearance {
            image: Arc::new(swatches::player(facing_left, foot_step, head_rotation)),
            draw_offset: PixelOffset::new(-8, -16),
        }
    }
}

/// Registers every classic tile and entity type into `catalog`.
pub fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.register_tile(Arc::new(StateBlock::new(
        AIR,
        false,
        &AIR_FIELDS,
        [("empty", swatches::empty())],
    )))?;
    catalog.register_tile(Arc::new(StateBlock::new(
        STONE,
        true,
        &PLAIN_FIELDS,
        [("normal", Arc::new(swatches::stone()))],
    )))?;
    catalog.register_tile(Arc::new(StateBlock::new(
        DIRT,
        true,
        &DIRT_FIELDS,
        [
            ("normal", Arc::new(swatches::dirt(false))),
            ("coarse", Arc::new(swatches::dirt(true))),
        ],
    )))?;
    catalog.register_tile(Arc::new(StateBlock::new(
        GRASS,
        true,
        &PLAIN_FIELDS,
        [("normal", Arc::new(swatches::grass()))],
    )))?;
    catalog.register_entity(Arc::new(Player::new()))?;
    Ok(())
}

/// Builds a catalog holding only the classic pack.
pub fn catalog() -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::new();
    register(&mut catalog)?;
    Ok(catalog)
}
