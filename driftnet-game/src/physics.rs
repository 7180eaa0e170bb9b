//! The physics collaborator interface.
//!
//! The engine drives an abstract stepped integrator; implementations are
//! free to represent bodies however they like and copy authoritative
//! fields back through the objects themselves.

use crate::object::GameObject;
use crate::physical::{wrap_angle, PhysicalObject2D};
use crate::world::World;
use crate::NOMINAL_STEP_RATE;

pub trait Physics: Send {
    /// Advance every object accepted by `filter` by `dt_secs` seconds.
    fn step(&mut self, world: &mut World, dt_secs: f32, filter: &dyn Fn(&dyn GameObject) -> bool);
}

/// A velocity integrator for [`PhysicalObject2D`]. Enough for tests and
/// small games; real games plug in their own engine.
#[derive(Debug, Default)]
pub struct SimplePhysics;

impl Physics for SimplePhysics {
    fn step(&mut self, world: &mut World, dt_secs: f32, filter: &dyn Fn(&dyn GameObject) -> bool) {
        let time_factor = dt_secs * NOMINAL_STEP_RATE as f32;
        for (_, obj) in world.iter_mut() {
            if !filter(&**obj) {
                continue;
            }
            if let Some(obj) = obj.as_any_mut().downcast_mut::<PhysicalObject2D>() {
                let velocity = obj.velocity;
                obj.position += velocity * time_factor;
                obj.angle = wrap_angle(obj.angle + obj.angular_velocity * time_factor);
            }
        }
    }
}
