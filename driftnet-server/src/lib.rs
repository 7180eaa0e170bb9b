//! The authoritative server engine.
//!
//! One spawned task owns the game engine, the per-player input queues,
//! the room table and the transmitter. Each scheduler tick drains due
//! inputs, runs one authoritative step and emits per-room syncs; between
//! ticks the task services transport events and application requests.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use driftnet_game::engine::GameEngine;
use driftnet_game::input::Input;
use driftnet_game::message::player_joined_message::PlayerJoinedMessage;
use driftnet_game::message::room_update_message::RoomUpdateMessage;
use driftnet_game::message::rtt_response_message::RttResponseMessage;
use driftnet_game::message::world_update_message::WorldUpdateMessage;
use driftnet_game::message::Message;
use driftnet_game::scheduler::{Scheduler, TickOutcome};
use driftnet_game::time::{ServerEpoch, ServerMarker, ServerTime, SimDuration};
use driftnet_game::{ObjectId, PlayerId};
use driftnet_socket::{AddrBound, TransportEvent, TransportRequest};
use driftnet_stream_codec::StreamCodec;
use tokio::select;
use tokio::sync::mpsc;

pub mod transmitter;

#[cfg(test)]
mod tests;

use crate::transmitter::{object_room, Transmitter};

pub const DEFAULT_ROOM: &str = "/lobby";

const REQUEST_BUFFER_SIZE: usize = 256;
const EVENT_BUFFER_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Steps per sync emission.
    pub update_rate: u32,
    /// Authoritative steps per second.
    pub step_rate: u32,
    /// Every Nth sync to a room is a full update.
    pub full_sync_rate: u32,
    /// Idle sockets are disconnected after this long.
    pub timeout_interval: Duration,
    /// Request an immediate sync for a room when an object appears in it.
    pub update_on_object_creation: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            update_rate: 6,
            step_rate: 60,
            full_sync_rate: 20,
            timeout_interval: Duration::from_secs(180),
            update_on_object_creation: true,
        }
    }
}

/// Runtime commands from the embedding application.
#[derive(Debug)]
pub enum ServerRequest {
    CreateRoom(String),
    AssignPlayerToRoom { player_id: PlayerId, room: String },
    AssignObjectToRoom { object_id: ObjectId, room: String },
    /// Sync a room outside the regular cadence.
    RequestSync { room: String, full: bool },
}

/// Lifecycle notifications to the embedding application.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    PlayerJoined {
        player_id: PlayerId,
    },
    PlayerDisconnected {
        player_id: PlayerId,
    },
    RoomUpdate {
        player_id: PlayerId,
        from: String,
        to: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlayerSyncState {
    /// Connected but yet to receive a full world; forces the next sync
    /// of its room to be full.
    New,
    Synced,
}

struct PlayerRecord {
    player_id: PlayerId,
    state: PlayerSyncState,
    room_name: String,
    /// Highest input message index received from this socket.
    last_handled_input: u32,
    last_activity: ServerTime,
}

#[derive(Default)]
struct Room {
    sync_counter: u32,
    request_immediate_sync: bool,
    request_full_sync: bool,
}

enum InternalEvent<Addr> {
    Cancelled,
    Transport(Option<TransportEvent<Addr>>),
    Request(Option<ServerRequest>),
    Tick(TickOutcome),
}

pub struct ServerEngine<Addr> {
    options: ServerOptions,
    step_period: SimDuration,
    timeout_interval: SimDuration,
    engine: GameEngine,
    epoch: ServerEpoch,
    scheduler: Scheduler<ServerMarker>,
    transmitter: Transmitter,
    requests: Option<mpsc::Receiver<ServerRequest>>,
    events: mpsc::Sender<ServerEvent>,
    transport_requests: mpsc::Sender<TransportRequest<Addr>>,
    transport_events: mpsc::Receiver<TransportEvent<Addr>>,
    connected_players: HashMap<Addr, PlayerRecord>,
    addr_by_player: HashMap<PlayerId, Addr>,
    /// Flat input queue keyed by `(player, step)`; popped one due bucket
    /// per player per tick, preserving arrival order within a bucket.
    input_queues: BTreeMap<(PlayerId, u32), Vec<Input>>,
    rooms: HashMap<String, Room>,
}

impl<Addr: AddrBound> ServerEngine<Addr> {
    pub fn spawn(
        options: ServerOptions,
        engine: GameEngine,
        transport_requests: mpsc::Sender<TransportRequest<Addr>>,
        transport_events: mpsc::Receiver<TransportEvent<Addr>>,
    ) -> (
        cancel::Guard,
        mpsc::Sender<ServerRequest>,
        mpsc::Receiver<ServerEvent>,
    ) {
        let cancel_token = cancel::Token::new();
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

        let server = Self::new(
            options,
            engine,
            request_rx,
            event_tx,
            transport_requests,
            transport_events,
        );
        tokio::spawn(server.run(cancel_token.clone()));

        (cancel_token.guard(), request_tx, event_rx)
    }

    fn new(
        options: ServerOptions,
        engine: GameEngine,
        requests: mpsc::Receiver<ServerRequest>,
        events: mpsc::Sender<ServerEvent>,
        transport_requests: mpsc::Sender<TransportRequest<Addr>>,
        transport_events: mpsc::Receiver<TransportEvent<Addr>>,
    ) -> Self {
        let step_period = SimDuration::from_micros(1_000_000 / options.step_rate as i64);
        let timeout_interval =
            SimDuration::from_micros(options.timeout_interval.as_micros() as i64);
        let epoch = ServerEpoch::at_now();
        let transmitter = Transmitter::new(engine.registry().clone());
        let mut rooms = HashMap::new();
        rooms.insert(DEFAULT_ROOM.to_owned(), Room::default());
        Self {
            options,
            step_period,
            timeout_interval,
            engine,
            epoch,
            scheduler: Scheduler::new(epoch, step_period, SimDuration::ZERO),
            transmitter,
            requests: Some(requests),
            events,
            transport_requests,
            transport_events,
            connected_players: HashMap::new(),
            addr_by_player: HashMap::new(),
            input_queues: BTreeMap::new(),
            rooms,
        }
    }

    async fn run(mut self, cancel_token: cancel::Token) {
        log::info!(
            "Server running at {} steps/s, syncing every {} steps",
            self.options.step_rate,
            self.options.update_rate,
        );
        loop {
            let requests = &mut self.requests;
            let event = select! {
                biased;

                _ = cancel_token.cancelled() => InternalEvent::Cancelled,

                event = self.transport_events.recv() => InternalEvent::Transport(event),

                request = recv_opt(requests) => InternalEvent::Request(request),

                outcome = self.scheduler.tick() => InternalEvent::Tick(outcome),
            };

            match event {
                InternalEvent::Cancelled => break,
                InternalEvent::Transport(Some(event)) => self.handle_transport_event(event).await,
                InternalEvent::Transport(None) => break,
                InternalEvent::Request(Some(request)) => self.handle_request(request).await,
                InternalEvent::Request(None) => self.requests = None,
                InternalEvent::Tick(outcome) => self.handle_tick(outcome).await,
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent<Addr>) {
        match event {
            TransportEvent::Connected { addr } => self.handle_connect(addr).await,
            TransportEvent::Message { addr, data } => self.handle_message(addr, data).await,
            TransportEvent::Disconnected { addr } => self.remove_player(addr).await,
        }
    }

    async fn handle_connect(&mut self, addr: Addr) {
        self.engine.world.player_count += 1;
        let player_id = PlayerId(self.engine.world.player_count as u8);
        log::info!("Peer {addr} connected as {player_id}");

        self.connected_players.insert(
            addr,
            PlayerRecord {
                player_id,
                state: PlayerSyncState::New,
                room_name: DEFAULT_ROOM.to_owned(),
                last_handled_input: 0,
                last_activity: self.epoch.now(),
            },
        );
        self.addr_by_player.insert(player_id, addr);

        self.engine.notify_player_joined(player_id);
        let _ = self.events.send(ServerEvent::PlayerJoined { player_id }).await;
        self.send_message(
            addr,
            Message::PlayerJoined(PlayerJoinedMessage {
                player_id,
                join_time: self.epoch.now().as_millis(),
                disconnect_time: 0,
            }),
        )
        .await;
    }

    async fn handle_message(&mut self, addr: Addr, data: Vec<u8>) {
        let mut r = data.as_slice();
        let message = match Message::read_from(&mut r) {
            Ok(message) => message,
            Err(e) => {
                log::error!("Error decoding message from {addr}: {e}");
                return;
            }
        };
        if !r.is_empty() {
            log::error!(
                "Dropping {:?} message from {addr}: {} unexpected trailing byte(s)",
                message.kind(),
                r.len(),
            );
            return;
        }

        let record = match self.connected_players.get_mut(&addr) {
            Some(record) => record,
            None => {
                log::warn!("Dropping {:?} message from unknown peer {addr}", message.kind());
                return;
            }
        };
        // Any traffic proves the socket is alive.
        record.last_activity = self.epoch.now();

        match message {
            Message::Move(message) => {
                record.last_handled_input = message.input.message_index;
                let player_id = record.player_id;
                log::debug!(
                    "Queued input {:?} #{} from {player_id} for {}",
                    message.input.tag,
                    record.last_handled_input,
                    message.input.step,
                );
                self.input_queues
                    .entry((player_id, message.input.step.0))
                    .or_default()
                    .push(message.input);
            }
            Message::RttQuery(message) => {
                self.send_message(
                    addr,
                    Message::RttResponse(RttResponseMessage { id: message.id }),
                )
                .await;
            }
            Message::Trace(message) => {
                for record in message.records {
                    log::debug!(
                        "Trace [{addr}] {} at {}ms: {}",
                        record.step,
                        record.time,
                        record.data,
                    );
                }
            }
            other => {
                log::error!("Unexpected {:?} message from {addr}", other.kind());
            }
        }
    }

    async fn handle_request(&mut self, request: ServerRequest) {
        match request {
            ServerRequest::CreateRoom(name) => {
                if self.rooms.contains_key(&name) {
                    log::warn!("Room {name:?} already exists");
                    return;
                }
                log::info!("Created room {name:?}");
                self.rooms.insert(name, Room::default());
            }
            ServerRequest::AssignPlayerToRoom { player_id, room } => {
                self.assign_player_to_room(player_id, room).await;
            }
            ServerRequest::AssignObjectToRoom { object_id, room } => {
                if !self.rooms.contains_key(&room) {
                    log::error!("Cannot assign {object_id} to unknown room {room:?}");
                    return;
                }
                match self.engine.world.get_mut(object_id) {
                    Some(obj) => obj.set_room(Some(room)),
                    None => log::warn!("Cannot assign {object_id} to {room:?}: not in the world"),
                }
            }
            ServerRequest::RequestSync { room, full } => {
                if let Some(room) = self.rooms.get_mut(&room) {
                    room.request_immediate_sync = true;
                    room.request_full_sync |= full;
                }
            }
        }
    }

    async fn assign_player_to_room(&mut self, player_id: PlayerId, room: String) {
        if !self.rooms.contains_key(&room) {
            log::error!("Cannot assign {player_id} to unknown room {room:?}");
            return;
        }
        let addr = match self.addr_by_player.get(&player_id) {
            Some(addr) => *addr,
            None => {
                log::warn!("Cannot assign disconnected {player_id} to room {room:?}");
                return;
            }
        };
        let record = self.connected_players.get_mut(&addr).unwrap();
        let from = std::mem::replace(&mut record.room_name, room.clone());
        log::info!("{player_id} moved from {from:?} to {room:?}");

        {
            let entry = self.rooms.get_mut(&room).unwrap();
            entry.request_immediate_sync = true;
            entry.request_full_sync = true;
        }
        self.send_message(
            addr,
            Message::RoomUpdate(RoomUpdateMessage {
                player_id,
                from: from.clone(),
                to: room.clone(),
            }),
        )
        .await;
        let _ = self
            .events
            .send(ServerEvent::RoomUpdate {
                player_id,
                from,
                to: room,
            })
            .await;
    }

    async fn handle_tick(&mut self, outcome: TickOutcome) {
        if outcome == TickOutcome::RunningSlow {
            log::warn!("Server step loop is running slow");
        }
        self.disconnect_idle_players().await;
        self.dispatch_due_inputs();
        self.engine.step(false, Some(self.step_period));
        if self.options.update_on_object_creation {
            self.flag_rooms_with_new_objects();
        }
        self.emit_room_syncs().await;
    }

    async fn disconnect_idle_players(&mut self) {
        let now = self.epoch.now();
        let idle: Vec<Addr> = self
            .connected_players
            .iter()
            .filter(|(_, record)| now - record.last_activity > self.timeout_interval)
            .map(|(&addr, _)| addr)
            .collect();
        for addr in idle {
            log::info!("Disconnecting idle peer {addr}");
            let _ = self
                .transport_requests
                .send(TransportRequest::Disconnect { addr })
                .await;
            self.remove_player(addr).await;
        }
    }

    /// Pop the oldest due input bucket for each player, preserving
    /// arrival order within the bucket. A popped bucket can never be
    /// re-dispatched.
    fn dispatch_due_inputs(&mut self) {
        let current_step = self.engine.world.step_count.0;
        let players: Vec<PlayerId> = self.addr_by_player.keys().copied().collect();
        for player_id in players {
            let min_step = self
                .input_queues
                .range((player_id, 0)..=(player_id, u32::MAX))
                .next()
                .map(|(&(_, step), _)| step);
            let min_step = match min_step {
                Some(step) if step <= current_step => step,
                _ => continue,
            };
            let inputs = self.input_queues.remove(&(player_id, min_step)).unwrap();
            for input in inputs {
                self.engine.process_input(&input, player_id, true);
            }
        }
    }

    fn flag_rooms_with_new_objects(&mut self) {
        for (id, obj) in self.engine.world.iter() {
            if self.transmitter.knows(id) {
                continue;
            }
            if let Some(room) = self.rooms.get_mut(object_room(obj)) {
                room.request_immediate_sync = true;
            }
        }
    }

    async fn emit_room_syncs(&mut self) {
        let step = self.engine.world.step_count;
        let room_names: Vec<String> = self.rooms.keys().cloned().collect();
        for name in room_names {
            let on_cadence = step.0 % self.options.update_rate == 0;
            if !on_cadence && !self.rooms[&name].request_immediate_sync {
                continue;
            }
            let new_player = self
                .connected_players
                .values()
                .any(|record| record.room_name == name && record.state == PlayerSyncState::New);

            let full = {
                let room = self.rooms.get_mut(&name).unwrap();
                let full = room.request_full_sync
                    || new_player
                    || room.sync_counter % self.options.full_sync_rate == 0;
                room.sync_counter += 1;
                room.request_immediate_sync = false;
                room.request_full_sync = false;
                full
            };

            let payload = match self
                .transmitter
                .build_sync(&self.engine.world, &name, full, step)
            {
                Ok(payload) => payload,
                Err(e) => {
                    log::error!("Error serializing sync for room {name:?}: {e}");
                    continue;
                }
            };
            log::debug!(
                "Sync for room {name:?} at {step}: {} byte(s), full={full}",
                payload.len(),
            );

            let targets: Vec<Addr> = self
                .connected_players
                .iter()
                .filter(|(_, record)| record.room_name == name)
                .map(|(&addr, _)| addr)
                .collect();
            for addr in targets {
                self.send_message(
                    addr,
                    Message::WorldUpdate(WorldUpdateMessage {
                        payload: payload.clone(),
                    }),
                )
                .await;
            }
            for record in self.connected_players.values_mut() {
                if record.room_name == name {
                    record.state = PlayerSyncState::Synced;
                }
            }
        }
    }

    async fn remove_player(&mut self, addr: Addr) {
        let record = match self.connected_players.remove(&addr) {
            Some(record) => record,
            None => return,
        };
        let player_id = record.player_id;
        log::info!("{player_id} disconnected");
        self.addr_by_player.remove(&player_id);

        // Pending inputs from a departed player are dropped.
        let stale: Vec<(PlayerId, u32)> = self
            .input_queues
            .range((player_id, 0)..=(player_id, u32::MAX))
            .map(|(&key, _)| key)
            .collect();
        for key in stale {
            self.input_queues.remove(&key);
        }

        self.engine.notify_player_disconnected(player_id);
        let _ = self
            .events
            .send(ServerEvent::PlayerDisconnected { player_id })
            .await;
    }

    async fn send_message(&mut self, addr: Addr, message: Message) {
        let mut data = Vec::new();
        match message.write_to(&mut data) {
            Ok(()) => {
                let _ = self
                    .transport_requests
                    .send(TransportRequest::Send { addr, data })
                    .await;
            }
            Err(e) => log::error!("Error encoding {:?} message: {e}", message.kind()),
        }
    }
}

async fn recv_opt<T>(requests: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match requests {
        Some(requests) => requests.recv().await,
        None => std::future::pending().await,
    }
}
