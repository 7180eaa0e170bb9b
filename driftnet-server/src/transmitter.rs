//! Per-room payload assembly with byte-level diffing.
//!
//! The transmitter remembers the last serialized form of every object it
//! has sent. A diff sync skips objects whose bytes are unchanged and
//! prunes string fields whose value matches the previous send; a full
//! sync includes everything verbatim. Tracked objects that have left the
//! world turn into destroy events on their room's next sync, after which
//! their memory is pruned.

use std::collections::HashMap;
use std::sync::Arc;

use driftnet_game::object::GameObject;
use driftnet_game::serializer::{EncodeError, NetFieldKind, NetValue, Registry};
use driftnet_game::sync::{PayloadWriter, SyncEventKind};
use driftnet_game::world::World;
use driftnet_game::{ObjectId, StepId};

use crate::DEFAULT_ROOM;

struct ObjMemory {
    /// Canonical (unpruned) bytes of the last transmitted state.
    bytes: Vec<u8>,
    /// Last transmitted value of each string field, by field name.
    strings: HashMap<&'static str, Option<String>>,
    /// Room the object was last transmitted to.
    room: String,
}

pub struct Transmitter {
    registry: Arc<Registry>,
    obj_memory: HashMap<ObjectId, ObjMemory>,
}

impl Transmitter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            obj_memory: HashMap::new(),
        }
    }

    /// Whether `id` has been transmitted before.
    pub fn knows(&self, id: ObjectId) -> bool {
        self.obj_memory.contains_key(&id)
    }

    /// Assemble one room's payload for the step that just completed.
    pub fn build_sync(
        &mut self,
        world: &World,
        room: &str,
        full_update: bool,
        step: StepId,
    ) -> Result<Vec<u8>, EncodeError> {
        let mut writer = PayloadWriter::new(step, full_update);

        // Tracked objects that left the world: emit a destroy carrying
        // their last known state, then forget them.
        let mut departed: Vec<ObjectId> = self
            .obj_memory
            .iter()
            .filter(|(id, memory)| memory.room == room && !world.contains(**id))
            .map(|(&id, _)| id)
            .collect();
        departed.sort_unstable();
        for id in departed {
            let memory = self.obj_memory.remove(&id).unwrap();
            writer.add_raw(SyncEventKind::ObjectDestroy, step, id, &memory.bytes);
        }

        // Room residents, in id order so payload bytes are deterministic.
        let mut ids: Vec<ObjectId> = world
            .iter()
            .filter(|(_, obj)| object_room(*obj) == room)
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();

        for id in ids {
            let obj = world.get(id).unwrap();
            let mut bytes = Vec::new();
            self.registry.encode(obj.as_net(), &mut bytes)?;

            let known = match self.obj_memory.get(&id) {
                Some(memory) => {
                    if !full_update && memory.bytes == bytes {
                        // Unchanged since last send; diff syncs skip it.
                        continue;
                    }
                    true
                }
                None => false,
            };
            let kind = if known {
                SyncEventKind::ObjectUpdate
            } else {
                SyncEventKind::ObjectCreate
            };

            let strings = self.string_fields(obj);
            let send_bytes = if known && !full_update {
                self.encode_with_pruned_strings(obj, &strings)?
            } else {
                bytes.clone()
            };
            writer.add_raw(kind, step, id, &send_bytes);

            self.obj_memory.insert(
                id,
                ObjMemory {
                    bytes,
                    strings,
                    room: room.to_owned(),
                },
            );
        }

        Ok(writer.serialize_payload())
    }

    fn string_fields(&self, obj: &dyn GameObject) -> HashMap<&'static str, Option<String>> {
        let mut strings = HashMap::new();
        if let Some(descriptor) = self.registry.descriptor_by_name(obj.class_name()) {
            for field in descriptor.scheme.fields() {
                if field.kind == NetFieldKind::Str {
                    if let Some(NetValue::Str(value)) = obj.net_get(field.name) {
                        strings.insert(field.name, value);
                    }
                }
            }
        }
        strings
    }

    /// Serialize a clone of `obj` with every string field unchanged since
    /// the previous send replaced by the pruned marker.
    fn encode_with_pruned_strings(
        &self,
        obj: &dyn GameObject,
        current: &HashMap<&'static str, Option<String>>,
    ) -> Result<Vec<u8>, EncodeError> {
        let memory = &self.obj_memory[&obj.id()];
        let mut unchanged: Vec<&'static str> = Vec::new();
        for (&name, value) in current {
            if memory.strings.get(name) == Some(value) {
                unchanged.push(name);
            }
        }
        if unchanged.is_empty() {
            let mut bytes = Vec::new();
            self.registry.encode(obj.as_net(), &mut bytes)?;
            return Ok(bytes);
        }

        let mut pruned = obj.clone_game();
        for name in unchanged {
            pruned.net_set(name, NetValue::Str(None));
        }
        let mut bytes = Vec::new();
        self.registry.encode(pruned.as_net(), &mut bytes)?;
        Ok(bytes)
    }
}

/// Room an object is synced to.
pub fn object_room(obj: &dyn GameObject) -> &str {
    obj.room().unwrap_or(DEFAULT_ROOM)
}
