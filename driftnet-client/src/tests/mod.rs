use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use driftnet_game::engine::{GameEngine, GameLogic, NullLogic};
use driftnet_game::input::Input;
use driftnet_game::physical::{register_base_classes, PhysicalObject2D, Vec2};
use driftnet_game::physics::SimplePhysics;
use driftnet_game::serializer::Registry;
use driftnet_game::sync::{PayloadWriter, Sync, SyncEvent, SyncEventKind};
use driftnet_game::{ObjectId, PlayerId, StepId};


pub(crate) fn test_registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    register_base_classes(&mut registry).unwrap();
    Arc::new(registry)
}

pub(crate) fn null_engine() -> GameEngine {
    GameEngine::new(test_registry(), Box::new(SimplePhysics), Box::new(NullLogic))
}

pub(crate) fn physical(id: u32, x: f32, y: f32) -> Box<PhysicalObject2D> {
    let mut obj = PhysicalObject2D::new(Vec2::new(x, y), Vec2::ZERO);
    obj.id = ObjectId(id);
    Box::new(obj)
}

/// Build a parsed sync directly, as the wire layer would produce it.
pub(crate) fn sync_with(
    step_count: StepId,
    full_update: bool,
    entries: Vec<(ObjectId, SyncEventKind, PhysicalObject2D)>,
) -> Sync {
    let mut objects: HashMap<ObjectId, Vec<SyncEvent>> = HashMap::new();
    for (id, kind, object) in entries {
        objects.entry(id).or_default().push(SyncEvent {
            kind,
            step: step_count,
            object: Box::new(object),
        });
    }
    Sync {
        step_count,
        full_update,
        objects,
    }
}

/// Counts input applications by message index.
pub(crate) struct CountingLogic {
    pub(crate) applied: Arc<Mutex<HashMap<u32, u32>>>,
}

impl GameLogic for CountingLogic {
    fn process_input(
        &mut self,
        _engine: &mut GameEngine,
        input: &Input,
        _player_id: PlayerId,
        _from_server: bool,
    ) {
        *self
            .applied
            .lock()
            .unwrap()
            .entry(input.message_index)
            .or_insert(0) += 1;
    }
}

pub(crate) fn counting_engine() -> (GameEngine, Arc<Mutex<HashMap<u32, u32>>>) {
    let applied = Arc::new(Mutex::new(HashMap::new()));
    let engine = GameEngine::new(
        test_registry(),
        Box::new(SimplePhysics),
        Box::new(CountingLogic {
            applied: Arc::clone(&applied),
        }),
    );
    (engine, applied)
}

/// Round a parsed sync through payload bytes, exercising the wire path.
pub(crate) fn reparse(registry: &Registry, sync: Sync) -> Sync {
    let mut writer = PayloadWriter::new(sync.step_count, sync.full_update);
    let mut ids: Vec<ObjectId> = sync.objects.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        for event in &sync.objects[&id] {
            writer
                .add_object(registry, event.kind, event.step, id, &*event.object)
                .unwrap();
        }
    }
    let payload = writer.serialize_payload();
    driftnet_game::sync::read_sync(registry, &mut payload.as_slice()).unwrap()
}
