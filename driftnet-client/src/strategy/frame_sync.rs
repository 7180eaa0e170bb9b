//! Trust the server every frame: adopt each snapshot directly, with no
//! re-enactment and no bending. Suited to small worlds synced often.

use std::collections::VecDeque;

use driftnet_game::engine::GameEngine;
use driftnet_game::sync::{Sync, SyncEventKind};
use driftnet_game::{PlayerId, StepId};

use crate::strategy::{add_new_object, apply_destroy_rules, sync_existing, DriftThresholds};

#[derive(Clone, Debug)]
pub struct FrameSyncOptions {
    /// Syncs retained while the loop is stalled.
    pub world_buffer_length: usize,
    /// Steps the client intentionally trails the server.
    pub client_step_lag: u32,
}

impl Default for FrameSyncOptions {
    fn default() -> Self {
        Self {
            world_buffer_length: 60,
            client_step_lag: 0,
        }
    }
}

pub struct FrameSyncStrategy {
    pub options: FrameSyncOptions,
    pub(crate) need_first_sync: bool,
    pending: VecDeque<Sync>,
}

impl Default for FrameSyncStrategy {
    fn default() -> Self {
        Self::new(FrameSyncOptions::default())
    }
}

impl FrameSyncStrategy {
    pub fn new(options: FrameSyncOptions) -> Self {
        Self {
            options,
            need_first_sync: true,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn drift_thresholds(&self) -> DriftThresholds {
        DriftThresholds {
            max_lead: 1,
            max_lag: 1,
            client_reset: 20,
        }
    }

    pub(crate) fn receive_sync(&mut self, sync: Sync) {
        self.pending.push_back(sync);
        while self.pending.len() > self.options.world_buffer_length {
            self.pending.pop_front();
        }
    }

    pub(crate) fn apply_pending(
        &mut self,
        engine: &mut GameEngine,
        _my_player_id: PlayerId,
    ) -> Vec<StepId> {
        let mut applied = Vec::new();
        while let Some(sync) = self.pending.pop_front() {
            applied.push(self.apply_sync(engine, sync));
        }
        applied
    }

    fn apply_sync(&mut self, engine: &mut GameEngine, sync: Sync) -> StepId {
        for (&id, events) in &sync.objects {
            for event in events {
                if event.kind == SyncEventKind::ObjectDestroy {
                    continue;
                }
                let server_obj = &*event.object;
                if engine.world.contains(id) {
                    sync_existing(engine, id, server_obj);
                } else {
                    add_new_object(engine, id, server_obj.clone_game());
                }
            }
        }
        apply_destroy_rules(engine, &sync);
        self.need_first_sync = false;
        sync.step_count
    }
}
