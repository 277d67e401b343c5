#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Walk and jump controller that turns an input snapshot into world commands.

use std::time::Duration;

use sidecraft_core::{Command, EntitySnapshot, FieldValue, Vector2};
use tracing::trace;

/// Field holding the facing of a walking entity.
pub const LOOK_DIRECTION: &str = "look_direction";
/// Field holding the leg swing angle in degrees.
pub const FOOT_STEP: &str = "foot_step";
/// Field holding the head tilt in degrees.
pub const HEAD_ROTATION: &str = "head_rotation";

/// Tunables for [`WalkController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkTuning {
    /// Horizontal speed while a direction is held, in tiles per second.
    pub walk_speed: f32,
    /// Upward velocity added by a jump, in tiles per second.
    pub jump_impulse: f32,
    /// Degrees of leg swing per tile walked.
    pub stride_rate: f32,
    /// Largest leg swing in either direction before the stride reverses.
    pub max_foot_step: f32,
    /// Largest head tilt in either direction.
    pub max_head_rotation: f32,
}

impl Default for WalkTuning {
    fn default() -> Self {
        Self {
            walk_speed: 200.0 / 60.0,
            jump_impulse: 7.0,
            stride_rate: 45.0,
            max_foot_step: 45.0,
            max_head_rotation: 80.0,
        }
    }
}

/// Input sampled for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WalkInput {
    /// Walk left.
    pub left: bool,
    /// Walk right.
    pub right: bool,
    /// Jump if standing on the ground.
    pub jump: bool,
    /// Cursor position relative to the entity's head in screen pixels, y pointing down.
    pub aim: Vector2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Facing {
    Left,
    Right,
}

impl Facing {
    const fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Pure system that steers a single walking entity.
#[derive(Clone, Debug)]
pub struct WalkController {
    tuning: WalkTuning,
    stride: f32,
}

impl WalkController {
    /// Creates a controller with the provided tuning.
    #[must_use]
    pub fn new(tuning: WalkTuning) -> Self {
        Self {
            tuning,
            stride: 1.0,
        }
    }

    /// Tuning the controller was created with.
    #[must_use]
    pub const fn tuning(&self) -> &WalkTuning {
        &self.tuning
    }

    /// Emits the commands that apply `input` to `entity` for a frame lasting `dt`.
    ///
    /// Field commands are only emitted when the value actually changes.
    pub fn handle(
        &mut self,
        input: &WalkInput,
        entity: &EntitySnapshot,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let facing = match (input.left, input.right) {
            (true, false) => Some(Facing::Left),
            (false, true) => Some(Facing::Right),
            _ => None,
        };
        let velocity_x = match facing {
            Some(Facing::Left) => -self.tuning.walk_speed,
            Some(Facing::Right) => self.tuning.walk_speed,
            None => 0.0,
        };
        out.push(Command::SetEntityVelocity {
            entity: entity.id,
            velocity: Vector2::new(velocity_x, entity.velocity.y),
        });

        if let Some(facing) = facing {
            push_field(out, entity, LOOK_DIRECTION, FieldValue::Name(facing.name()));
        }

        let foot_step = entity
            .fields
            .get(FOOT_STEP)
            .and_then(|value| value.as_float())
            .unwrap_or(0.0);
        let next_step = match facing {
            Some(_) => self.swing(foot_step, velocity_x * dt.as_secs_f32()),
            None => 0.0,
        };
        push_field(out, entity, FOOT_STEP, FieldValue::Float(next_step));

        if let Some(rotation) = self.head_rotation(input.aim) {
            push_field(out, entity, HEAD_ROTATION, FieldValue::Float(rotation));
        }

        if input.jump && entity.on_ground {
            trace!(entity = entity.id.get(), "jump");
            out.push(Command::ApplyImpulse {
                entity: entity.id,
                impulse: Vector2::new(0.0, self.tuning.jump_impulse),
            });
        }
    }

    /// Advances the leg swing by `distance` tiles, reversing at the limits.
    fn swing(&mut self, foot_step: f32, distance: f32) -> f32 {
        let limit = self.tuning.max_foot_step;
        let next = foot_step + distance * self.tuning.stride_rate * self.stride;
        if next.abs() >= limit {
            self.stride = -self.stride;
            return next.clamp(-limit, limit);
        }
        next
    }

    /// Head tilt towards `aim`, mirrored so either facing tilts the same way.
    fn head_rotation(&self, aim: Vector2) -> Option<f32> {
        if aim == Vector2::ZERO {
            return None;
        }
        let limit = self.tuning.max_head_rotation;
        let mirrored = Vector2::new(aim.x.abs(), aim.y);
        Some((mirrored.rotation() - 90.0).clamp(-limit, limit))
    }
}

impl Default for WalkController {
    fn default() -> Self {
        Self::new(WalkTuning::default())
    }
}

fn push_field(
    out: &mut Vec<Command>,
    entity: &EntitySnapshot,
    field: &'static str,
    value: FieldValue,
) {
    if entity.fields.get(field) != Some(value) {
        out.push(Command::SetEntityField {
            entity: entity.id,
            field,
            value,
        });
    }
}
