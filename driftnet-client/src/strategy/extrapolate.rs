//! Client-side prediction: adopt the server snapshot, re-enact buffered
//! inputs forward to "now", then bend the visible error away over the
//! following steps.

use std::collections::{BTreeMap, HashMap, VecDeque};

use driftnet_game::engine::GameEngine;
use driftnet_game::input::Input;
use driftnet_game::object::GameObject;
use driftnet_game::sync::{Sync, SyncEventKind};
use driftnet_game::{ObjectId, PlayerId, StepId};

use crate::strategy::{
    add_new_object, apply_destroy_rules, sync_existing, ApplyOutcome, DriftThresholds,
};

#[derive(Clone, Debug)]
pub struct ExtrapolateOptions {
    /// Syncs held before application becomes mandatory.
    pub syncs_buffer_length: usize,
    /// Upper bound on steps replayed after adopting a server snapshot.
    pub max_reenact_steps: u32,
    /// Assumed server lead, in steps, for drift discipline.
    pub rtt_estimate: u32,
    pub local_obj_bending: f32,
    pub remote_obj_bending: f32,
    pub bending_increments: u32,
}

impl Default for ExtrapolateOptions {
    fn default() -> Self {
        Self {
            syncs_buffer_length: 5,
            max_reenact_steps: 60,
            rtt_estimate: 2,
            local_obj_bending: 0.1,
            remote_obj_bending: 0.6,
            bending_increments: 10,
        }
    }
}

pub struct ExtrapolateStrategy {
    pub options: ExtrapolateOptions,
    pub(crate) need_first_sync: bool,
    pending: VecDeque<Sync>,
    /// Locally processed inputs by step, replayed during re-enactment.
    recent_inputs: BTreeMap<u32, Vec<Input>>,
}

impl Default for ExtrapolateStrategy {
    fn default() -> Self {
        Self::new(ExtrapolateOptions::default())
    }
}

impl ExtrapolateStrategy {
    pub fn new(options: ExtrapolateOptions) -> Self {
        Self {
            options,
            need_first_sync: true,
            pending: VecDeque::new(),
            recent_inputs: BTreeMap::new(),
        }
    }

    pub(crate) fn drift_thresholds(&self) -> DriftThresholds {
        DriftThresholds {
            max_lead: 1,
            max_lag: 3,
            client_reset: 40,
        }
    }

    pub(crate) fn receive_sync(&mut self, sync: Sync) {
        self.pending.push_back(sync);
    }

    pub(crate) fn on_local_input(&mut self, input: &Input) {
        self.recent_inputs
            .entry(input.step.0)
            .or_default()
            .push(input.clone());
    }

    pub(crate) fn apply_pending(
        &mut self,
        engine: &mut GameEngine,
        my_player_id: PlayerId,
    ) -> Vec<StepId> {
        let mut applied = Vec::new();
        while let Some(sync) = self.pending.pop_front() {
            // An overfull buffer forces application of early syncs.
            let required = self.pending.len() >= self.options.syncs_buffer_length;
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
        let local_step = engine.world.step_count;
        if server_step > local_step && !required {
            return ApplyOutcome::Deferred(sync);
        }
        log::debug!("Applying sync for {server_step} at local {local_step}");

        // Stage 1: adopt the server snapshot, remembering each touched
        // object's pre-sync state for bending.
        let mut saved: HashMap<ObjectId, Box<dyn GameObject>> = HashMap::new();
        for (&id, events) in &sync.objects {
            for event in events {
                if event.kind == SyncEventKind::ObjectDestroy {
                    continue;
                }
                let server_obj = &*event.object;
                if let Some(shadow_id) = engine.find_local_shadow(server_obj) {
                    // The server twin of a local prediction arrived.
                    if !engine.world.contains(id) {
                        let shadow_state =
                            engine.world.get(shadow_id).map(|shadow| shadow.clone_game());
                        if add_new_object(engine, id, server_obj.clone_game()).is_some() {
                            if let Some(shadow_state) = shadow_state {
                                // Bend from where the prediction left it.
                                saved.insert(id, shadow_state);
                            }
                        }
                    }
                    log::debug!("Reclaiming shadow {shadow_id} for {id}");
                    let _ = engine.remove_object(shadow_id);
                } else if engine.world.contains(id) {
                    if !saved.contains_key(&id) {
                        saved.insert(id, engine.world.get(id).unwrap().clone_game());
                    }
                    sync_existing(engine, id, server_obj);
                } else {
                    add_new_object(engine, id, server_obj.clone_game());
                }
            }
        }

        // Stage 2: re-enact buffered movement inputs from the server's
        // step forward, clamped so a long gap cannot stall the loop.
        let reenact_from = server_step
            .0
            .max(local_step.0.saturating_sub(self.options.max_reenact_steps));
        engine.world.step_count = StepId(reenact_from);
        while engine.world.step_count < local_step {
            let step = engine.world.step_count.0;
            if let Some(inputs) = self.recent_inputs.get(&step) {
                for input in inputs.clone() {
                    if input.options.movement {
                        engine.process_input(&input, my_player_id, false);
                    }
                }
            }
            engine.step(true, None);
        }
        self.recent_inputs.retain(|&step, _| step > server_step.0);

        // Stage 3: schedule bending from each saved state toward the
        // re-enacted present.
        for (id, original) in &saved {
            if id.is_shadow() {
                continue;
            }
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
