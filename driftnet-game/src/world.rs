//! The in-memory object map.
//!
//! Iteration order is unspecified; every consumer must tolerate any
//! order. Call sites that need deterministic output (payload assembly)
//! sort ids themselves.

use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::object::GameObject;
use crate::{ObjectId, PlayerId, StepId};

pub struct World {
    objects: HashMap<ObjectId, Box<dyn GameObject>>,
    pub step_count: StepId,
    pub player_count: u32,
    id_count: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            step_count: StepId(0),
            player_count: 0,
            // Id zero is reserved as the "not yet assigned" marker.
            id_count: 1,
        }
    }

    /// Move id allocation to start at `base`. The client engine uses this
    /// to allocate its locally-predicted objects from the shadow space.
    pub fn set_id_base(&mut self, base: ObjectId) {
        self.id_count = self.id_count.max(base.0);
    }

    /// Smallest unused id at or above the allocation cursor.
    pub fn new_id(&mut self) -> ObjectId {
        while self.objects.contains_key(&ObjectId(self.id_count)) {
            self.id_count += 1;
        }
        let id = ObjectId(self.id_count);
        self.id_count += 1;
        id
    }

    /// Insert an object under its own id. The caller (the engine) is
    /// responsible for id uniqueness.
    pub(crate) fn insert(&mut self, obj: Box<dyn GameObject>) {
        self.objects.insert(obj.id(), obj);
    }

    pub(crate) fn take(&mut self, id: ObjectId) -> Option<Box<dyn GameObject>> {
        self.objects.remove(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&dyn GameObject> {
        self.objects.get(&id).map(|obj| &**obj)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Box<dyn GameObject>> {
        self.objects.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &dyn GameObject)> {
        self.objects.iter().map(|(&id, obj)| (id, &**obj))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut Box<dyn GameObject>)> {
        self.objects.iter_mut().map(|(&id, obj)| (id, obj))
    }

    /// Visit objects until the callback breaks.
    pub fn for_each(&self, mut cb: impl FnMut(&dyn GameObject) -> ControlFlow<()>) {
        for obj in self.objects.values() {
            if cb(&**obj).is_break() {
                return;
            }
        }
    }

    pub fn query(&self, query: &Query) -> Vec<ObjectId> {
        self.iter()
            .filter(|(id, obj)| query.matches(*id, *obj))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn query_one(&self, query: &Query) -> Option<ObjectId> {
        self.iter()
            .find(|(id, obj)| query.matches(*id, *obj))
            .map(|(id, _)| id)
    }
}

/// An object filter. Empty matches everything; each populated criterion
/// narrows the match.
#[derive(Debug, Default)]
pub struct Query {
    pub id: Option<ObjectId>,
    pub player_id: Option<PlayerId>,
    pub class_name: Option<&'static str>,
    pub components: Vec<&'static str>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn player_id(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn class_name(mut self, class_name: &'static str) -> Self {
        self.class_name = Some(class_name);
        self
    }

    pub fn component(mut self, type_name: &'static str) -> Self {
        self.components.push(type_name);
        self
    }

    fn matches(&self, id: ObjectId, obj: &dyn GameObject) -> bool {
        if let Some(want) = self.id {
            if id != want {
                return false;
            }
        }
        if let Some(want) = self.player_id {
            if obj.player_id() != want {
                return false;
            }
        }
        if let Some(want) = self.class_name {
            if obj.class_name() != want {
                return false;
            }
        }
        self.components
            .iter()
            .all(|component| obj.has_component(component))
    }
}
