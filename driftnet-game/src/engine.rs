//! The simulation engine: owns the world, runs steps, and dispatches the
//! game-specific hooks.

use std::sync::Arc;

use thiserror::Error;

use crate::input::Input;
use crate::object::GameObject;
use crate::physics::Physics;
use crate::serializer::Registry;
use crate::time::SimDuration;
use crate::world::World;
use crate::{ObjectId, PlayerId, StepId, STEP_PERIOD_60HZ};

/// Description of the step being executed, passed to the hooks.
#[derive(Clone, Copy, Debug)]
pub struct StepInfo {
    pub step: StepId,
    pub is_reenact: bool,
    pub dt: SimDuration,
}

/// Game-specific behavior plugged into the engine.
///
/// This is the seam where a game lives: spawn objects on joins, apply
/// inputs, run per-step rules. Hooks receive the engine itself, so they
/// may add and remove objects; lifecycle notifications are not re-entered
/// from within another hook.
pub trait GameLogic: Send {
    fn pre_step(&mut self, engine: &mut GameEngine, info: &StepInfo) {
        let _ = (engine, info);
    }

    fn post_step(&mut self, engine: &mut GameEngine, info: &StepInfo) {
        let _ = (engine, info);
    }

    fn process_input(
        &mut self,
        engine: &mut GameEngine,
        input: &Input,
        player_id: PlayerId,
        from_server: bool,
    ) {
        let _ = (engine, input, player_id, from_server);
    }

    fn object_added(&mut self, engine: &mut GameEngine, id: ObjectId) {
        let _ = (engine, id);
    }

    fn object_removed(&mut self, engine: &mut GameEngine, id: ObjectId) {
        let _ = (engine, id);
    }

    fn player_joined(&mut self, engine: &mut GameEngine, player_id: PlayerId) {
        let _ = (engine, player_id);
    }

    fn player_disconnected(&mut self, engine: &mut GameEngine, player_id: PlayerId) {
        let _ = (engine, player_id);
    }
}

/// Logic stub for worlds driven entirely from outside (e.g. an
/// interpolating client).
pub struct NullLogic;

impl GameLogic for NullLogic {}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("cannot remove {0}: not in the world")]
    RemoveMissingObject(ObjectId),
}

pub struct GameEngine {
    pub world: World,
    registry: Arc<Registry>,
    physics: Box<dyn Physics>,
    physics_enabled: bool,
    logic: Option<Box<dyn GameLogic>>,
}

impl GameEngine {
    pub fn new(registry: Arc<Registry>, physics: Box<dyn Physics>, logic: Box<dyn GameLogic>) -> Self {
        Self {
            world: World::new(),
            registry,
            physics,
            physics_enabled: true,
            logic: Some(logic),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Interpolating clients disable local physics; the strategy owns all
    /// object motion.
    pub fn set_physics_enabled(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
    }

    /// Run one logical step: `pre_step`, physics, `post_step`.
    ///
    /// During re-enactment the physics filter skips shadow objects, which
    /// exist only as local predictions.
    pub fn step(&mut self, is_reenact: bool, dt: Option<SimDuration>) {
        let dt = dt.unwrap_or(STEP_PERIOD_60HZ);
        self.world.step_count = self.world.step_count.next();
        let info = StepInfo {
            step: self.world.step_count,
            is_reenact,
            dt,
        };

        self.with_logic(|logic, engine| logic.pre_step(engine, &info));
        self.run_physics(is_reenact, dt);
        self.with_logic(|logic, engine| logic.post_step(engine, &info));
    }

    /// Advance physics only: no step counting, no hooks.
    pub fn step_physics_only(&mut self, dt: Option<SimDuration>) {
        let dt = dt.unwrap_or(STEP_PERIOD_60HZ);
        self.run_physics(false, dt);
    }

    fn run_physics(&mut self, is_reenact: bool, dt: SimDuration) {
        if !self.physics_enabled {
            return;
        }
        let filter = move |obj: &dyn GameObject| !(is_reenact && obj.id().is_shadow());
        self.physics.step(&mut self.world, dt.as_secs_f32(), &filter);
    }

    /// Register an object in the world, assigning an id if it has none.
    ///
    /// A shadow add whose `input_id` matches any existing object is
    /// refused: the server twin already arrived, and a duplicate
    /// prediction would ghost it.
    pub fn add_object(&mut self, mut obj: Box<dyn GameObject>) -> Option<ObjectId> {
        if obj.id() == ObjectId::default() {
            let id = self.world.new_id();
            obj.set_id(id);
        }
        let id = obj.id();

        if id.is_shadow() {
            if let Some(input_id) = obj.input_id() {
                if let Some(existing) = self.object_with_input_id(input_id) {
                    log::debug!(
                        "Refusing shadow {id}: input id {input_id} already tracked by {existing}"
                    );
                    return None;
                }
            }
        }
        if self.world.contains(id) {
            log::warn!("Refusing to add {id}: id already in the world");
            return None;
        }

        self.world.insert(obj);
        if let Some(obj) = self.world.get_mut(id) {
            obj.on_add_to_world();
        }
        self.with_logic(|logic, engine| logic.object_added(engine, id));
        Some(id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Result<Box<dyn GameObject>, EngineError> {
        let mut obj = self
            .world
            .take(id)
            .ok_or(EngineError::RemoveMissingObject(id))?;
        obj.on_remove_from_world();
        self.with_logic(|logic, engine| logic.object_removed(engine, id));
        Ok(obj)
    }

    /// Dispatch one input to the game logic.
    pub fn process_input(&mut self, input: &Input, player_id: PlayerId, from_server: bool) {
        self.with_logic(|logic, engine| logic.process_input(engine, input, player_id, from_server));
    }

    pub fn notify_player_joined(&mut self, player_id: PlayerId) {
        self.with_logic(|logic, engine| logic.player_joined(engine, player_id));
    }

    pub fn notify_player_disconnected(&mut self, player_id: PlayerId) {
        self.with_logic(|logic, engine| logic.player_disconnected(engine, player_id));
    }

    /// The locally-predicted object whose `input_id` matches the server
    /// object's, if any. First match wins.
    pub fn find_local_shadow(&self, server_obj: &dyn GameObject) -> Option<ObjectId> {
        let input_id = server_obj.input_id()?;
        self.world
            .iter()
            .find(|(id, obj)| id.is_shadow() && obj.input_id() == Some(input_id))
            .map(|(id, _)| id)
    }

    fn object_with_input_id(&self, input_id: u32) -> Option<ObjectId> {
        self.world
            .iter()
            .find(|(_, obj)| obj.input_id() == Some(input_id))
            .map(|(id, _)| id)
    }

    fn with_logic(&mut self, f: impl FnOnce(&mut dyn GameLogic, &mut GameEngine)) {
        if let Some(mut logic) = self.logic.take() {
            f(&mut *logic, self);
            self.logic = Some(logic);
        }
    }
}
