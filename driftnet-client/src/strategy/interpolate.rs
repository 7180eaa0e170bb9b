//! No local simulation: the client holds a few steps behind the server
//! and glides each object toward every arriving snapshot.

use std::collections::{HashMap, VecDeque};

use driftnet_game::engine::GameEngine;
use driftnet_game::object::GameObject;
use driftnet_game::sync::{Sync, SyncEventKind};
use driftnet_game::{ObjectId, PlayerId, StepId};

use crate::strategy::{
    add_new_object, apply_destroy_rules, sync_existing, ApplyOutcome, DriftThresholds,
};

/// Buffered syncs beyond this force application of stale ones.
const SYNC_QUEUE_SLACK: usize = 4;

#[derive(Clone, Debug)]
pub struct InterpolateOptions {
    /// Steps the client clock holds behind the server.
    pub client_step_hold: u32,
    pub local_obj_bending: f32,
    pub remote_obj_bending: f32,
    pub bending_increments: u32,
}

impl Default for InterpolateOptions {
    fn default() -> Self {
        Self {
            client_step_hold: 6,
            local_obj_bending: 1.0,
            remote_obj_bending: 1.0,
            bending_increments: 6,
        }
    }
}

pub struct InterpolateStrategy {
    pub options: InterpolateOptions,
    pub(crate) need_first_sync: bool,
    pending: VecDeque<Sync>,
}

impl Default for InterpolateStrategy {
    fn default() -> Self {
        Self::new(InterpolateOptions::default())
    }
}

impl InterpolateStrategy {
    pub fn new(options: InterpolateOptions) -> Self {
        Self {
            options,
            need_first_sync: true,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn drift_thresholds(&self) -> DriftThresholds {
        DriftThresholds {
            max_lead: 1,
            max_lag: 3,
            client_reset: 60,
        }
    }

    pub(crate) fn receive_sync(&mut self, sync: Sync) {
        self.pending.push_back(sync);
    }

    pub(crate) fn apply_pending(
        &mut self,
        engine: &mut GameEngine,
        my_player_id: PlayerId,
    ) -> Vec<StepId> {
        let mut applied = Vec::new();
        while let Some(sync) = self.pending.pop_front() {
            let required = self.pending.len() >= SYNC_QUEUE_SLACK;
            match self.apply_sync(engine, my_player_id, sync, required) {
                ApplyOutcome::Applied(step) => applied.push(step),
                ApplyOutcome::Deferred(sync) => {
                    self.pending.push_front(sync);
                    break;
                }
                ApplyOutcome::Discarded => (),
            }
        }
        applied
    }

    fn apply_sync(
        &mut self,
        engine: &mut GameEngine,
        my_player_id: PlayerId,
        sync: Sync,
        required: bool,
    ) -> ApplyOutcome {
        let server_step = sync.step_count;
        // Interpolation wants strictly future data; anything else only
        // applies under pressure.
        if server_step <= engine.world.step_count && !required && !self.need_first_sync {
            log::debug!(
                "Discarding stale sync for {server_step} at local {}",
                engine.world.step_count,
            );
            return ApplyOutcome::Discarded;
        }

        let mut saved: HashMap<ObjectId, Box<dyn GameObject>> = HashMap::new();
        for (&id, events) in &sync.objects {
            for event in events {
                if event.kind == SyncEventKind::ObjectDestroy {
                    continue;
                }
                let server_obj = &*event.object;
                if engine.world.contains(id) {
                    if !saved.contains_key(&id) {
                        saved.insert(id, engine.world.get(id).unwrap().clone_game());
                    }
                    sync_existing(engine, id, server_obj);
                } else {
                    add_new_object(engine, id, server_obj.clone_game());
                }
            }
        }

        // Glide from the previous state to the adopted one over the next
        // increments; with percent 1.0 this is pure interpolation.
        for (id, original) in &saved {
            if let Some(obj) = engine.world.get_mut(*id) {
                let is_local =
                    my_player_id != PlayerId::UNOWNED && obj.player_id() == my_player_id;
                let percent = if is_local {
                    self.options.local_obj_bending
                } else {
                    self.options.remote_obj_bending
                };
                obj.bend_to_current(&**original, percent, is_local, self.options.bending_increments);
            }
        }

        apply_destroy_rules(engine, &sync);
        self.need_first_sync = false;
        ApplyOutcome::Applied(server_step)
    }
}
