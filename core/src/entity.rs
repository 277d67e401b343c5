//! Dynamic, physics-driven actors and the capability interface of entity types.

use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    fields::{FieldError, FieldSpec, FieldValue, FieldValues},
    geometry::{PixelOffset, Rect, Vector2},
    ContentHash, Memo, Sprite,
};

/// Static description of an entity type registered by a content pack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityDescriptor {
    /// Namespaced identifier such as `classic:player`.
    pub id: &'static str,
    /// Collider size in world units.
    pub size: Vector2,
    /// Fields understood by the type.
    pub fields: &'static [FieldSpec],
}

/// Derived visual state of an entity.
#[derive(Clone, Debug)]
pub struct EntityAppearance {
    /// Sprite drawn on top of the composited terrain.
    pub image: Sprite,
    /// Pixel offset added to the entity's centre when drawing.
    pub draw_offset: PixelOffset,
}

/// Behaviour supplied by a concrete entity type.
pub trait EntityType: fmt::Debug + Send + Sync {
    /// Static description of the type.
    fn descriptor(&self) -> &EntityDescriptor;

    /// Derives the appearance of an entity from its fields.
    fn render(&self, fields: &FieldValues) -> EntityAppearance;
}

/// A dynamic actor with a free-floating collider and velocity.
#[derive(Clone)]
pub struct Entity {
    kind: Arc<dyn EntityType>,
    fields: FieldValues,
    rect: Rect,
    velocity: Vector2,
    on_ground: bool,
    hit_wall: bool,
    appearance: RefCell<Option<Memo<EntityAppearance>>>,
}

impl Entity {
    /// Creates an entity of `kind` centred on `position`.
    pub fn new<'a, I>(kind: Arc<dyn EntityType>, position: Vector2, fields: I) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        let descriptor = kind.descriptor();
        let fields = FieldValues::from_schema(descriptor.id, descriptor.fields, fields)?;
        let rect = Rect::from_center(position, descriptor.size);
        Ok(Self {
            kind,
            fields,
            rect,
            velocity: Vector2::ZERO,
            on_ground: false,
            hit_wall: false,
            appearance: RefCell::new(None),
        })
    }

    /// Namespaced identifier of the entity's type.
    #[must_use]
    pub fn kind_id(&self) -> &'static str {
        self.kind.descriptor().id
    }

    /// Centre of the collider.
    #[must_use]
    pub fn position(&self) -> Vector2 {
        self.rect.center()
    }

    /// Moves the collider so its centre sits at `position`.
    pub fn set_position(&mut self, position: Vector2) {
        self.rect.set_center(position);
    }

    /// Collider in world units.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Mutable access to the collider.
    pub fn rect_mut(&mut self) -> &mut Rect {
        &mut self.rect
    }

    /// Current velocity in tiles per second.
    #[must_use]
    pub const fn velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Replaces the velocity.
    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.velocity = velocity;
    }

    /// Mutable access to the velocity.
    pub fn velocity_mut(&mut self) -> &mut Vector2 {
        &mut self.velocity
    }

    /// Whether the last physics step resolved a floor contact.
    #[must_use]
    pub const fn on_ground(&self) -> bool {
        self.on_ground
    }

    /// Records whether the entity is standing on something.
    pub fn set_on_ground(&mut self, on_ground: bool) {
        self.on_ground = on_ground;
    }

    /// Whether the last physics step resolved a wall contact.
    #[must_use]
    pub const fn hit_wall(&self) -> bool {
        self.hit_wall
    }

    /// Records whether the entity pushed against a wall.
    pub fn set_hit_wall(&mut self, hit_wall: bool) {
        self.hit_wall = hit_wall;
    }

    /// Collider area, used as the entity's mass.
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.rect.width * self.rect.height
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

    /// Hash of the sorted field values. Position and velocity are excluded.
    #[must_use]
    pub fn field_hash(&self) -> ContentHash {
        let mut hasher = DefaultHasher::new();
        self.fields.hash(&mut hasher);
        ContentHash::new(hasher.finish())
    }

    /// Derived appearance, recomputed only when the field hash changed.
    #[must_use]
    pub fn appearance(&self) -> EntityAppearance {
        let hash = self.field_hash();
        let mut memo = self.appearance.borrow_mut();
        if let Some(cached) = memo.as_ref().filter(|cached| cached.hash == hash) {
            return cached.value.clone();
        }
        let value = self.kind.render(&self.fields);
        *memo = Some(Memo {
            hash,
            value: value.clone(),
        });
        value
    }

    /// Sprite drawn on top of the terrain.
    #[must_use]
    pub fn image(&self) -> Sprite {
        self.appearance().image
    }

    /// Offset added to the entity's centre when drawing.
    #[must_use]
    pub fn draw_offset(&self) -> PixelOffset {
        self.appearance().draw_offset
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind_id())
            .field("rect", &self.rect)
            .field("velocity", &self.velocity)
            .field("on_ground", &self.on_ground)
            .field("fields", &self.fields)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind_id(), self.fields)
    }
}
