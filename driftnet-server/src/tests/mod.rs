use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};

use driftnet_game::engine::{GameEngine, GameLogic};
use driftnet_game::input::Input;
use driftnet_game::object::{GameObject, NetObject};
use driftnet_game::physical::register_base_classes;
use driftnet_game::physics::SimplePhysics;
use driftnet_game::serializer::{NetFieldKind, NetScheme, NetValue, Registry};
use driftnet_game::{ObjectId, PlayerId};
use driftnet_socket::{TransportEvent, TransportRequest};
use tokio::sync::mpsc;

use crate::{ServerEngine, ServerEvent, ServerOptions, ServerRequest};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FakeAddr {
    Client1,
    Client2,
}

impl Display for FakeAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        <Self as Debug>::fmt(self, f)
    }
}

pub(crate) fn test_registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    register_base_classes(&mut registry).unwrap();
    registry.register_game::<Sign>(sign_scheme()).unwrap();
    Arc::new(registry)
}

/// Records dispatched inputs so tests can assert exactly-once delivery.
pub(crate) struct RecordingLogic {
    pub(crate) inputs: Arc<Mutex<Vec<String>>>,
}

impl GameLogic for RecordingLogic {
    fn process_input(
        &mut self,
        _engine: &mut GameEngine,
        input: &Input,
        player_id: PlayerId,
        from_server: bool,
    ) {
        assert!(from_server);
        self.inputs.lock().unwrap().push(format!(
            "{}:{}:{}",
            input.tag, input.message_index, player_id.0
        ));
    }
}

pub(crate) fn recording_engine() -> (GameEngine, Arc<Mutex<Vec<String>>>) {
    let inputs = Arc::new(Mutex::new(Vec::new()));
    let engine = GameEngine::new(
        test_registry(),
        Box::new(SimplePhysics),
        Box::new(RecordingLogic {
            inputs: Arc::clone(&inputs),
        }),
    );
    (engine, inputs)
}

/// Hand-driven server plus both ends of its channels.
pub(crate) struct TestServer {
    pub(crate) server: ServerEngine<FakeAddr>,
    pub(crate) request_tx: mpsc::Sender<ServerRequest>,
    pub(crate) event_rx: mpsc::Receiver<ServerEvent>,
    pub(crate) transport_request_rx: mpsc::Receiver<TransportRequest<FakeAddr>>,
    pub(crate) transport_event_tx: mpsc::Sender<TransportEvent<FakeAddr>>,
}

pub(crate) fn test_server(options: ServerOptions, engine: GameEngine) -> TestServer {
    let (request_tx, request_rx) = mpsc::channel(256);
    let (event_tx, event_rx) = mpsc::channel(256);
    let (transport_request_tx, transport_request_rx) = mpsc::channel(256);
    let (transport_event_tx, transport_event_rx) = mpsc::channel(256);
    let server = ServerEngine::new(
        options,
        engine,
        request_rx,
        event_tx,
        transport_request_tx,
        transport_event_rx,
    );
    TestServer {
        server,
        request_tx,
        event_rx,
        transport_request_rx,
        transport_event_tx,
    }
}

/// A sign with a label, for string-pruning coverage.
#[derive(Clone, Debug, Default)]
pub(crate) struct Sign {
    pub(crate) id: ObjectId,
    pub(crate) player_id: PlayerId,
    pub(crate) label: String,
    pub(crate) milepost: i32,
    pub(crate) room: Option<String>,
}

pub(crate) fn sign_scheme() -> NetScheme {
    NetScheme::new()
        .field("id", NetFieldKind::Int32)
        .field("playerId", NetFieldKind::Uint8)
        .field("label", NetFieldKind::Str)
        .field("milepost", NetFieldKind::Int32)
}

impl NetObject for Sign {
    fn class_name(&self) -> &'static str {
        "Sign"
    }

    fn net_get(&self, field: &str) -> Option<NetValue> {
        match field {
            "id" => Some(NetValue::Int32(self.id.0 as i32)),
            "playerId" => Some(NetValue::Uint8(self.player_id.0)),
            "label" => Some(NetValue::Str(Some(self.label.clone()))),
            "milepost" => Some(NetValue::Int32(self.milepost)),
            _ => None,
        }
    }

    fn net_set(&mut self, field: &str, value: NetValue) {
        match (field, value) {
            ("id", NetValue::Int32(v)) => self.id = ObjectId(v.max(0) as u32),
            ("playerId", NetValue::Uint8(v)) => self.player_id = PlayerId(v),
            ("label", NetValue::Str(Some(v))) => self.label = v,
            ("milepost", NetValue::Int32(v)) => self.milepost = v,
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

impl GameObject for Sign {
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

    fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    fn set_room(&mut self, room: Option<String>) {
        self.room = room;
    }

    fn clone_game(&self) -> Box<dyn GameObject> {
        Box::new(self.clone())
    }
}
