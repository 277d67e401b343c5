//! Grid-aligned blocks and the capability interface implemented by tile types.

use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    fields::{FieldError, FieldSpec, FieldValue, FieldValues},
    geometry::{PixelOffset, Rect},
    ContentHash, GridPos, Memo, Sprite, TILE_PIXELS,
};

/// Static description of a tile type registered by a content pack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileDescriptor {
    /// Namespaced identifier such as `classic:stone`.
    pub id: &'static str,
    /// Whether entities collide with tiles of this type.
    pub has_collision: bool,
    /// Fields understood by the type.
    pub fields: &'static [FieldSpec],
}

/// Derived visual state of a tile.
#[derive(Clone, Debug)]
pub struct TileAppearance {
    /// Image composited into render windows.
    pub image: Sprite,
    /// Collision rect in world units.
    pub rect: Rect,
    /// Pixel offset subtracted from the cell origin when compositing.
    pub draw_offset: PixelOffset,
}

impl TileAppearance {
    /// Appearance whose rect spans the image size starting at `position`.
    #[must_use]
    pub fn sized_to_image(image: Sprite, position: GridPos) -> Self {
        let pixels = TILE_PIXELS as f32;
        let rect = Rect::new(
            position.column() as f32,
            position.row() as f32,
            image.width() as f32 / pixels,
            image.height() as f32 / pixels,
        );
        Self {
            image,
            rect,
            draw_offset: PixelOffset::default(),
        }
    }
}

/// Behaviour supplied by a concrete tile type.
pub trait TileType: fmt::Debug + Send + Sync {
    /// Static description of the type.
    fn descriptor(&self) -> &TileDescriptor;

    /// Derives the appearance of a tile from its fields and position.
    fn render(&self, fields: &FieldValues, position: GridPos) -> TileAppearance;
}

/// A single block placed on the world grid.
#[derive(Clone)]
pub struct Tile {
    kind: Arc<dyn TileType>,
    position: GridPos,
    fields: FieldValues,
    appearance: RefCell<Option<Memo<TileAppearance>>>,
}

impl Tile {
    /// Creates a tile of `kind` at `position` with the provided field overrides.
    pub fn new<'a, I>(kind: Arc<dyn TileType>, position: GridPos, fields: I) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        let descriptor = kind.descriptor();
        let fields = FieldValues::from_schema(descriptor.id, descriptor.fields, fields)?;
        Ok(Self {
            kind,
            position,
            fields,
            appearance: RefCell::new(None),
        })
    }

    /// Creates a tile of `kind` at `position` with every field at its default.
    pub fn with_defaults(kind: Arc<dyn TileType>, position: GridPos) -> Result<Self, FieldError> {
        Self::new(kind, position, [])
    }

    /// Namespaced identifier of the tile's type.
    #[must_use]
    pub fn kind_id(&self) -> &'static str {
        self.kind.descriptor().id
    }

    /// Type object backing the tile.
    #[must_use]
    pub fn kind(&self) -> &Arc<dyn TileType> {
        &self.kind
    }

    /// Grid cell occupied by the tile.
    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    /// Whether entities collide with the tile.
    #[must_use]
    pub fn has_collision(&self) -> bool {
        self.kind.descriptor().has_collision
    }

    /// Validated field values.
    #[must_use]
    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    /// Current value of a single field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name)
    }

    /// Replaces a field value, returning the previous one.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<FieldValue, FieldError> {
        self.fields.set(name, value)
    }

    /// Hash of the type identifier, sorted fields, and position.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = DefaultHasher::new();
        self.kind_id().hash(&mut hasher);
        self.fields.hash(&mut hasher);
        self.position.hash(&mut hasher);
        ContentHash::new(hasher.finish())
    }

    /// Derived appearance, recomputed only when the content hash changed.
    #[must_use]
    pub fn appearance(&self) -> TileAppearance {
        let hash = self.content_hash();
        let mut memo = self.appearance.borrow_mut();
        if let Some(cached) = memo.as_ref().filter(|cached| cached.hash == hash) {
            return cached.value.clone();
        }
        let value = self.kind.render(&self.fields, self.position);
        *memo = Some(Memo {
            hash,
            value: value.clone(),
        });
        value
    }

    /// Image composited into render windows.
    #[must_use]
    pub fn image(&self) -> Sprite {
        self.appearance().image
    }

    /// Collision rect in world units.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.appearance().rect
    }

    /// Offset applied when compositing the image.
    #[must_use]
    pub fn draw_offset(&self) -> PixelOffset {
        self.appearance().draw_offset
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.content_hash() == other.content_hash()
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("kind", &self.kind_id())
            .field("position", &self.position)
            .field("fields", &self.fields)
            .finish()
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind_id(), self.fields, self.position)
    }
}
