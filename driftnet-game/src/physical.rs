//! Built-in physical classes: the 2D vector embedded in netSchemes and
//! the positional base object with incremental error bending.

use std::any::Any;
use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Sub};

use crate::object::{sync_scalar_fields, GameObject, NetObject};
use crate::serializer::{NetFieldKind, NetScheme, NetValue, Registry, RegisterError};
use crate::{ObjectId, PlayerId};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Adopt another vector's components in place, preserving identity.
    pub fn copy_from(&mut self, other: Vec2) {
        self.x = other.x;
        self.y = other.y;
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl NetObject for Vec2 {
    fn class_name(&self) -> &'static str {
        "Vec2"
    }

    fn net_get(&self, field: &str) -> Option<NetValue> {
        match field {
            "x" => Some(NetValue::Float32(self.x)),
            "y" => Some(NetValue::Float32(self.y)),
            _ => None,
        }
    }

    fn net_set(&mut self, field: &str, value: NetValue) {
        match (field, value) {
            ("x", NetValue::Float32(v)) => self.x = v,
            ("y", NetValue::Float32(v)) => self.y = v,
            _ => (),
        }
    }

    fn clone_net(&self) -> Box<dyn NetObject> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn vec2_scheme() -> NetScheme {
    NetScheme::new()
        .field("x", NetFieldKind::Float32)
        .field("y", NetFieldKind::Float32)
}

/// Bending behavior of one field group. `percent: None` defers to the
/// strategy-supplied percent. A computed correction whose magnitude falls
/// outside `[min, max]` collapses to zero (snaps instead of bending).
#[derive(Clone, Copy, Debug)]
pub struct FieldBending {
    pub percent: Option<f32>,
    pub min: f32,
    pub max: f32,
}

impl Default for FieldBending {
    fn default() -> Self {
        Self {
            percent: None,
            min: 0.0,
            max: f32::INFINITY,
        }
    }
}

impl FieldBending {
    fn resolve_percent(self, fallback: f32) -> f32 {
        self.percent.unwrap_or(fallback)
    }

    fn collapses(self, magnitude: f32) -> bool {
        magnitude < self.min || magnitude > self.max
    }
}

/// Per-object bending configuration, as plain data. The `*_local`
/// variants, when set, take precedence for objects owned by the local
/// player.
#[derive(Clone, Copy, Debug, Default)]
pub struct BendingConfig {
    pub position: FieldBending,
    pub velocity: FieldBending,
    pub angle: FieldBending,
    pub angular_velocity: FieldBending,
    pub position_local: Option<FieldBending>,
    pub velocity_local: Option<FieldBending>,
    pub angle_local: Option<FieldBending>,
    pub angular_velocity_local: Option<FieldBending>,
}

impl BendingConfig {
    fn position_for(&self, is_local: bool) -> FieldBending {
        if is_local {
            self.position_local.unwrap_or(self.position)
        } else {
            self.position
        }
    }

    fn velocity_for(&self, is_local: bool) -> FieldBending {
        if is_local {
            self.velocity_local.unwrap_or(self.velocity)
        } else {
            self.velocity
        }
    }

    fn angle_for(&self, is_local: bool) -> FieldBending {
        if is_local {
            self.angle_local.unwrap_or(self.angle)
        } else {
            self.angle
        }
    }

    fn angular_velocity_for(&self, is_local: bool) -> FieldBending {
        if is_local {
            self.angular_velocity_local.unwrap_or(self.angular_velocity)
        } else {
            self.angular_velocity
        }
    }
}

/// The state bending converges to once all scheduled increments have been
/// applied at the nominal rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BendingTarget {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    angle.rem_euclid(TAU)
}

/// Signed shortest-path difference `to − from`, in `(−π, π]`.
fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    let delta = wrap_angle(to - from);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

/// A positional game entity: position, velocity, angle and angular
/// velocity, synchronized by netScheme and corrected by bending.
#[derive(Clone, Debug, Default)]
pub struct PhysicalObject2D {
    pub id: ObjectId,
    pub player_id: PlayerId,
    pub input_id: Option<u32>,
    pub room: Option<String>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub bending: BendingConfig,
    bending_position_delta: Vec2,
    bending_velocity_delta: Vec2,
    bending_angle_delta: f32,
    bending_av_delta: f32,
    bending_increments: u32,
    bending_target: Option<BendingTarget>,
}

impl PhysicalObject2D {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            ..Self::default()
        }
    }

    pub fn bending_target(&self) -> Option<&BendingTarget> {
        self.bending_target.as_ref()
    }

    pub fn bending_position_delta(&self) -> Vec2 {
        self.bending_position_delta
    }
}

impl NetObject for PhysicalObject2D {
    fn class_name(&self) -> &'static str {
        "PhysicalObject2D"
    }

    fn net_get(&self, field: &str) -> Option<NetValue> {
        match field {
            "id" => Some(NetValue::Int32(self.id.0 as i32)),
            "playerId" => Some(NetValue::Uint8(self.player_id.0)),
            "inputId" => Some(NetValue::Int32(
                self.input_id.map(|v| v as i32).unwrap_or(-1),
            )),
            "position" => Some(NetValue::Instance(Box::new(self.position))),
            "velocity" => Some(NetValue::Instance(Box::new(self.velocity))),
            "angle" => Some(NetValue::Float32(self.angle)),
            "angularVelocity" => Some(NetValue::Float32(self.angular_velocity)),
            _ => None,
        }
    }

    fn net_set(&mut self, field: &str, value: NetValue) {
        match (field, value) {
            ("id", NetValue::Int32(v)) => self.id = ObjectId(v.max(0) as u32),
            ("playerId", NetValue::Uint8(v)) => self.player_id = PlayerId(v),
            ("inputId", NetValue::Int32(v)) => {
                self.input_id = if v < 0 { None } else { Some(v as u32) };
            }
            ("position", NetValue::Instance(v)) => {
                if let Some(v) = v.as_any().downcast_ref::<Vec2>() {
                    self.position = *v;
                }
            }
            ("velocity", NetValue::Instance(v)) => {
                if let Some(v) = v.as_any().downcast_ref::<Vec2>() {
                    self.velocity = *v;
                }
            }
            ("angle", NetValue::Float32(v)) => self.angle = v,
            ("angularVelocity", NetValue::Float32(v)) => self.angular_velocity = v,
            _ => (),
        }
    }

    fn clone_net(&self) -> Box<dyn NetObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl GameObject for PhysicalObject2D {
    fn as_net(&self) -> &dyn NetObject {
        self
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn set_player_id(&mut self, player_id: PlayerId) {
        self.player_id = player_id;
    }

    fn input_id(&self) -> Option<u32> {
        self.input_id
    }

    fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    fn set_room(&mut self, room: Option<String>) {
        self.room = room;
    }

    fn clone_game(&self) -> Box<dyn GameObject> {
        Box::new(self.clone())
    }

    fn sync_to(&mut self, other: &dyn GameObject, scheme: &NetScheme) {
        sync_scalar_fields(self, other, scheme);
        // Nested vectors keep their identity; adopt components in place.
        if let Some(other) = other.as_any().downcast_ref::<PhysicalObject2D>() {
            self.position.copy_from(other.position);
            self.velocity.copy_from(other.velocity);
        }
    }

    fn bend_to_current(
        &mut self,
        original: &dyn GameObject,
        percent: f32,
        is_local: bool,
        increments: u32,
    ) {
        let original = match original.as_any().downcast_ref::<PhysicalObject2D>() {
            Some(original) => original,
            None => return,
        };
        if increments == 0 {
            return;
        }
        let increments_f = increments as f32;

        let position_bending = self.bending.position_for(is_local);
        let position_total =
            (self.position - original.position) * position_bending.resolve_percent(percent);
        let position_total = if position_bending.collapses(position_total.length()) {
            Vec2::ZERO
        } else {
            position_total
        };
        self.bending_position_delta = position_total * (1.0 / increments_f);

        let velocity_bending = self.bending.velocity_for(is_local);
        let velocity_total =
            (self.velocity - original.velocity) * velocity_bending.resolve_percent(percent);
        let velocity_total = if velocity_bending.collapses(velocity_total.length()) {
            Vec2::ZERO
        } else {
            velocity_total
        };
        self.bending_velocity_delta = velocity_total * (1.0 / increments_f);

        let angle_bending = self.bending.angle_for(is_local);
        let angle_total = shortest_angle_delta(original.angle, self.angle)
            * angle_bending.resolve_percent(percent);
        let angle_total = if angle_bending.collapses(angle_total.abs()) {
            0.0
        } else {
            angle_total
        };
        self.bending_angle_delta = angle_total / increments_f;

        let av_bending = self.bending.angular_velocity_for(is_local);
        let av_total = (self.angular_velocity - original.angular_velocity)
            * av_bending.resolve_percent(percent);
        let av_total = if av_bending.collapses(av_total.abs()) {
            0.0
        } else {
            av_total
        };
        self.bending_av_delta = av_total / increments_f;

        self.bending_target = Some(BendingTarget {
            position: original.position + position_total,
            velocity: original.velocity + velocity_total,
            angle: wrap_angle(original.angle + angle_total),
            angular_velocity: original.angular_velocity + av_total,
        });

        // Revert to the pre-sync state; the deltas walk us forward again.
        self.position = original.position;
        self.velocity = original.velocity;
        self.angle = original.angle;
        self.angular_velocity = original.angular_velocity;
        self.bending_increments = increments;
    }

    fn apply_incremental_bending(&mut self, time_factor: f32) {
        if self.bending_increments == 0 {
            return;
        }
        self.position += self.bending_position_delta * time_factor;
        self.velocity += self.bending_velocity_delta * time_factor;
        self.angle = wrap_angle(self.angle + self.bending_angle_delta * time_factor);
        self.angular_velocity += self.bending_av_delta * time_factor;
        self.bending_increments -= 1;
    }

    fn bending_increments(&self) -> u32 {
        self.bending_increments
    }
}

pub fn physical_object_2d_scheme() -> NetScheme {
    NetScheme::new()
        .field("id", NetFieldKind::Int32)
        .field("playerId", NetFieldKind::Uint8)
        .field("inputId", NetFieldKind::Int32)
        .field("position", NetFieldKind::ClassInstance)
        .field("velocity", NetFieldKind::ClassInstance)
        .field("angle", NetFieldKind::Float32)
        .field("angularVelocity", NetFieldKind::Float32)
}

/// Register the built-in classes every driftnet registry carries.
pub fn register_base_classes(registry: &mut Registry) -> Result<(), RegisterError> {
    registry.register::<Vec2>(vec2_scheme())?;
    registry.register_game::<PhysicalObject2D>(physical_object_2d_scheme())?;
    Ok(())
}
