//! The three reconciliation strategies, as one tagged variant.

use std::collections::HashSet;
use std::str::FromStr;

use driftnet_game::engine::GameEngine;
use driftnet_game::input::Input;
use driftnet_game::object::GameObject;
use driftnet_game::sync::{Sync, SyncEventKind};
use driftnet_game::time::SimDuration;
use driftnet_game::{ObjectId, PlayerId, StepId};
use thiserror::Error;

pub mod extrapolate;
pub mod frame_sync;
pub mod interpolate;

use crate::strategy::extrapolate::ExtrapolateStrategy;
use crate::strategy::frame_sync::FrameSyncStrategy;
use crate::strategy::interpolate::InterpolateStrategy;

/// Step-drift tolerances, in steps. `client_reset` is the lag beyond
/// which the client abandons correction and snaps its step counter.
#[derive(Clone, Copy, Debug)]
pub struct DriftThresholds {
    pub max_lead: i64,
    pub max_lag: i64,
    pub client_reset: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    Extrapolate,
    Interpolate,
    FrameSync,
}

#[derive(Error, Debug)]
#[error("unknown sync strategy {0:?}")]
pub struct UnknownSyncStrategyError(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownSyncStrategyError;

    fn from_str(s: &str) -> Result<Self, UnknownSyncStrategyError> {
        match s {
            "extrapolate" => Ok(Self::Extrapolate),
            "interpolate" => Ok(Self::Interpolate),
            "frameSync" | "frame-sync" => Ok(Self::FrameSync),
            _ => Err(UnknownSyncStrategyError(s.to_owned())),
        }
    }
}

/// Result of attempting to apply one buffered sync.
pub(crate) enum ApplyOutcome {
    Applied(StepId),
    /// Too early; put it back and try again after the next local step.
    Deferred(Sync),
    Discarded,
}

pub enum Strategy {
    Extrapolate(ExtrapolateStrategy),
    Interpolate(InterpolateStrategy),
    FrameSync(FrameSyncStrategy),
}

impl Strategy {
    /// Build a strategy by name with its default options.
    pub fn from_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Extrapolate => Self::Extrapolate(ExtrapolateStrategy::default()),
            StrategyKind::Interpolate => Self::Interpolate(InterpolateStrategy::default()),
            StrategyKind::FrameSync => Self::FrameSync(FrameSyncStrategy::default()),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Extrapolate(_) => StrategyKind::Extrapolate,
            Self::Interpolate(_) => StrategyKind::Interpolate,
            Self::FrameSync(_) => StrategyKind::FrameSync,
        }
    }

    /// Whether the strategy is still waiting for its first applied sync.
    /// Until then, locally-originated object additions are suppressed.
    pub fn needs_first_sync(&self) -> bool {
        match self {
            Self::Extrapolate(s) => s.need_first_sync,
            Self::Interpolate(s) => s.need_first_sync,
            Self::FrameSync(s) => s.need_first_sync,
        }
    }

    /// Whether inputs are predicted locally before the server confirms.
    pub fn processes_inputs_locally(&self) -> bool {
        match self {
            Self::Extrapolate(_) | Self::FrameSync(_) => true,
            Self::Interpolate(_) => false,
        }
    }

    /// Interpolating clients never run local physics.
    pub fn runs_physics(&self) -> bool {
        !matches!(self, Self::Interpolate(_))
    }

    pub fn drift_thresholds(&self) -> DriftThresholds {
        match self {
            Self::Extrapolate(s) => s.drift_thresholds(),
            Self::Interpolate(s) => s.drift_thresholds(),
            Self::FrameSync(s) => s.drift_thresholds(),
        }
    }

    /// Steps the local clock should sit ahead (positive) or behind
    /// (negative) of the latest applied server step.
    pub fn step_offset(&self) -> i64 {
        match self {
            Self::Extrapolate(s) => s.options.rtt_estimate as i64,
            Self::Interpolate(s) => -(s.options.client_step_hold as i64),
            Self::FrameSync(s) => -(s.options.client_step_lag as i64),
        }
    }

    /// Buffer an arrived sync for application between steps.
    pub fn receive_sync(&mut self, sync: Sync) {
        match self {
            Self::Extrapolate(s) => s.receive_sync(sync),
            Self::Interpolate(s) => s.receive_sync(sync),
            Self::FrameSync(s) => s.receive_sync(sync),
        }
    }

    /// Apply every due buffered sync; returns the applied server steps.
    pub fn apply_pending(
        &mut self,
        engine: &mut GameEngine,
        my_player_id: PlayerId,
    ) -> Vec<StepId> {
        match self {
            Self::Extrapolate(s) => s.apply_pending(engine, my_player_id),
            Self::Interpolate(s) => s.apply_pending(engine, my_player_id),
            Self::FrameSync(s) => s.apply_pending(engine, my_player_id),
        }
    }

    /// Record a locally processed input for later re-enactment.
    pub fn on_local_input(&mut self, input: &Input) {
        if let Self::Extrapolate(s) = self {
            s.on_local_input(input);
        }
    }

    /// Per-step work after a non-reenact step: incremental bending.
    pub fn post_step(&mut self, engine: &mut GameEngine, dt: SimDuration) {
        match self {
            Self::Extrapolate(_) | Self::Interpolate(_) => apply_incremental_bending(engine, dt),
            Self::FrameSync(_) => (),
        }
    }
}

fn apply_incremental_bending(engine: &mut GameEngine, dt: SimDuration) {
    let time_factor = dt.as_secs_f32() * driftnet_game::NOMINAL_STEP_RATE as f32;
    for (_, obj) in engine.world.iter_mut() {
        obj.apply_incremental_bending(time_factor);
    }
}

/// Register a server-originated instance under its wire id.
pub(crate) fn add_new_object(
    engine: &mut GameEngine,
    id: ObjectId,
    mut instance: Box<dyn GameObject>,
) -> Option<ObjectId> {
    instance.set_id(id);
    engine.add_object(instance)
}

/// Adopt one synced object's fields onto the matching local object.
pub(crate) fn sync_existing(engine: &mut GameEngine, id: ObjectId, server_obj: &dyn GameObject) {
    let registry = engine.registry().clone();
    let descriptor = match registry.descriptor_by_name(server_obj.class_name()) {
        Some(descriptor) => descriptor,
        None => {
            log::error!("Sync for unregistered class {:?}", server_obj.class_name());
            return;
        }
    };
    if let Some(obj) = engine.world.get_mut(id) {
        obj.sync_to(server_obj, &descriptor.scheme);
    }
}

/// Destroy rules shared by all strategies: a full update removes
/// server-space objects missing from the payload, and explicit destroy
/// events remove their server-space targets.
pub(crate) fn apply_destroy_rules(engine: &mut GameEngine, sync: &Sync) {
    if sync.full_update {
        let present: HashSet<ObjectId> = sync
            .objects
            .iter()
            .filter(|(_, events)| {
                events
                    .iter()
                    .any(|event| event.kind != SyncEventKind::ObjectDestroy)
            })
            .map(|(&id, _)| id)
            .collect();
        for id in engine.world.ids() {
            if !id.is_shadow() && !present.contains(&id) {
                log::debug!("Removing {id}: absent from full sync");
                let _ = engine.remove_object(id);
            }
        }
    }

    for (&id, _) in sync.objects.iter() {
        if sync.destroys(id) && !id.is_shadow() && engine.world.contains(id) {
            let _ = engine.remove_object(id);
        }
    }
}
