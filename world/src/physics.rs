//! Axis-aligned collision resolution between entities and terrain.

use sidecraft_core::{Entity, GridPos, Rect, Vector2, WORLD_ROWS};

/// Distance kept between an entity and a wall it was pushed out of.
pub(crate) const WALL_GAP: f32 = 0.05;

/// Extra cells searched around an entity's rounded bounds.
const SEARCH_MARGIN: i32 = 2;

/// Normal component beyond which a contact counts as a wall.
const WALL_THRESHOLD: f32 = 0.5;

/// Side of a tile an entity was pushed towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Contact {
    Wall,
    Floor,
    Ceiling,
    None,
}

/// Cells that may hold a tile touching `rect`, column-major.
///
/// Rows outside the world are skipped.
pub(crate) fn candidate_cells(rect: &Rect) -> impl Iterator<Item = GridPos> {
    let columns = (rect.left().round() as i32 - SEARCH_MARGIN)..(rect.right().round() as i32 + SEARCH_MARGIN);
    let first_row = (rect.bottom().round() as i32 - SEARCH_MARGIN).max(0);
    let last_row = (rect.top().round() as i32 + SEARCH_MARGIN).min(WORLD_ROWS);
    columns.flat_map(move |column| (first_row..last_row).map(move |row| GridPos::new(column, row)))
}

/// Pushes `entity` out of `tile` along the dominant axis of the centre offset.
pub(crate) fn resolve(entity: &mut Entity, tile: &Rect) -> Contact {
    let offset = entity.position() - tile.center();
    // Coincident centres have no direction; treat them as standing on the tile.
    let normal = offset.unit().unwrap_or(Vector2::new(0.0, 1.0));

    if normal.x > WALL_THRESHOLD {
        entity.rect_mut().set_left(tile.right() + WALL_GAP);
        entity.velocity_mut().x = 0.0;
        entity.set_hit_wall(true);
        Contact::Wall
    } else if normal.x < -WALL_THRESHOLD {
        entity.rect_mut().set_right(tile.left() - WALL_GAP);
        entity.velocity_mut().x = 0.0;
        entity.set_hit_wall(true);
        Contact::Wall
    } else if normal.y > 0.0 {
        entity.rect_mut().set_bottom(tile.top());
        entity.velocity_mut().y = 0.0;
        entity.set_on_ground(true);
        Contact::Floor
    } else if normal.y < 0.0 {
        entity.rect_mut().set_top(tile.bottom());
        entity.velocity_mut().y = 0.0;
        entity.set_on_ground(false);
        Contact::Ceiling
    } else {
        Contact::None
    }
}
