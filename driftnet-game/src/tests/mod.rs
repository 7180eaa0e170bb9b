use std::any::Any;
use std::sync::Arc;

use crate::engine::{GameEngine, GameLogic};
use crate::object::{GameObject, NetObject};
use crate::physical::register_base_classes;
use crate::physics::SimplePhysics;
use crate::serializer::{NetFieldKind, NetScheme, NetValue, Registry};
use crate::{ObjectId, PlayerId};

mod message;
mod object;
mod scheduler;
mod serializer;
mod sync_payload;

pub(crate) fn test_registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    register_base_classes(&mut registry).unwrap();
    registry.register_game::<Beacon>(beacon_scheme()).unwrap();
    Arc::new(registry)
}

pub(crate) fn test_engine(logic: Box<dyn GameLogic>) -> GameEngine {
    GameEngine::new(test_registry(), Box::new(SimplePhysics), logic)
}

/// A class exercising string and list fields plus the component query.
#[derive(Clone, Debug, Default)]
pub(crate) struct Beacon {
    pub id: ObjectId,
    pub player_id: PlayerId,
    pub label: String,
    pub codes: Vec<i32>,
}

pub(crate) fn beacon_scheme() -> NetScheme {
    NetScheme::new()
        .field("id", NetFieldKind::Int32)
        .field("playerId", NetFieldKind::Uint8)
        .field("label", NetFieldKind::Str)
        .field("codes", NetFieldKind::List(Box::new(NetFieldKind::Int32)))
}

impl NetObject for Beacon {
    fn class_name(&self) -> &'static str {
        "Beacon"
    }

    fn net_get(&self, field: &str) -> Option<NetValue> {
        match field {
            "id" => Some(NetValue::Int32(self.id.0 as i32)),
            "playerId" => Some(NetValue::Uint8(self.player_id.0)),
            "label" => Some(NetValue::Str(Some(self.label.clone()))),
            "codes" => Some(NetValue::List(
                self.codes.iter().map(|&code| NetValue::Int32(code)).collect(),
            )),
            _ => None,
        }
    }

    fn net_set(&mut self, field: &str, value: NetValue) {
        match (field, value) {
            ("id", NetValue::Int32(v)) => self.id = ObjectId(v.max(0) as u32),
            ("playerId", NetValue::Uint8(v)) => self.player_id = PlayerId(v),
            ("label", NetValue::Str(Some(v))) => self.label = v,
            ("codes", NetValue::List(items)) => {
                self.codes = items
                    .into_iter()
                    .filter_map(|item| match item {
                        NetValue::Int32(code) => Some(code),
                        _ => None,
                    })
                    .collect();
            }
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

impl GameObject for Beacon {
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

    fn has_component(&self, type_name: &str) -> bool {
        type_name == "Beaconing"
    }

    fn clone_game(&self) -> Box<dyn GameObject> {
        Box::new(self.clone())
    }
}
