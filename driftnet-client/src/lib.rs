//! The client engine: drives the local step loop, submits inputs,
//! receives world updates, and hands them to the active sync strategy.

use std::collections::{BTreeMap, HashMap};
use std::mem;

use driftnet_game::engine::GameEngine;
use driftnet_game::input::{Input, InputOptions};
use driftnet_game::message::move_message::MoveMessage;
use driftnet_game::message::rtt_query_message::RttQueryMessage;
use driftnet_game::message::trace_message::{TraceMessage, TraceRecord};
use driftnet_game::message::Message;
use driftnet_game::scheduler::{Scheduler, TickOutcome};
use driftnet_game::sync::read_sync;
use driftnet_game::time::{ClientEpoch, ClientMarker, ClientTime, SimDuration};
use driftnet_game::{PlayerId, StepId, CLIENT_ID_SPACE};
use driftnet_socket::{ClientTransportEvent, ClientTransportRequest};
use driftnet_stream_codec::StreamCodec;
use tokio::select;
use tokio::sync::mpsc;

pub mod strategy;

#[cfg(test)]
mod tests;

use crate::strategy::Strategy;

const REQUEST_BUFFER_SIZE: usize = 256;
const EVENT_BUFFER_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Local steps per second; matches the server's nominal rate.
    pub step_rate: u32,
    /// Artificial delay, in steps, stamped onto submitted inputs.
    pub input_delay_steps: u32,
    /// Cadence of round-trip probes, in steps. Zero disables them.
    pub rtt_query_interval_steps: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            step_rate: 60,
            input_delay_steps: 0,
            rtt_query_interval_steps: 60,
        }
    }
}

/// Commands from the embedding application.
#[derive(Debug)]
pub enum ClientRequest {
    SendInput { tag: String, options: InputOptions },
    Trace { data: String },
}

/// Notifications to the embedding application.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    Joined { player_id: PlayerId },
    RoomUpdate { from: String, to: String },
    /// A server snapshot was reconciled into the local world.
    SyncApplied { server_step: StepId },
}

enum InternalEvent {
    Cancelled,
    Transport(Option<ClientTransportEvent>),
    Request(Option<ClientRequest>),
    Tick(TickOutcome),
}

struct RttTracker {
    next_id: u32,
    outstanding: HashMap<u32, ClientTime>,
    estimate_millis: Option<f64>,
}

impl RttTracker {
    fn new() -> Self {
        Self {
            next_id: 1,
            outstanding: HashMap::new(),
            estimate_millis: None,
        }
    }

    fn begin(&mut self, now: ClientTime) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.outstanding.insert(id, now);
        id
    }

    fn complete(&mut self, id: u32, now: ClientTime) -> Option<f64> {
        let sent = self.outstanding.remove(&id)?;
        let sample = (now - sent).as_millis_f64();
        let estimate = match self.estimate_millis {
            None => sample,
            Some(estimate) => 0.9 * estimate + 0.1 * sample,
        };
        self.estimate_millis = Some(estimate);
        Some(estimate)
    }
}

pub struct ClientEngine {
    options: ClientOptions,
    step_period: SimDuration,
    engine: GameEngine,
    strategy: Strategy,
    epoch: ClientEpoch,
    scheduler: Scheduler<ClientMarker>,
    requests: Option<mpsc::Receiver<ClientRequest>>,
    events: mpsc::Sender<ClientEvent>,
    transport_requests: mpsc::Sender<ClientTransportRequest>,
    transport_events: mpsc::Receiver<ClientTransportEvent>,
    player_id: PlayerId,
    /// Next input message index; monotonic per connection.
    message_index: u32,
    highest_server_step: StepId,
    /// Inputs stamped ahead by the input delay, waiting for their step.
    pending_local_inputs: BTreeMap<u32, Vec<Input>>,
    traces: Vec<TraceRecord>,
    rtt: RttTracker,
}

impl ClientEngine {
    pub fn spawn(
        options: ClientOptions,
        engine: GameEngine,
        strategy: Strategy,
        transport_requests: mpsc::Sender<ClientTransportRequest>,
        transport_events: mpsc::Receiver<ClientTransportEvent>,
    ) -> (
        cancel::Guard,
        mpsc::Sender<ClientRequest>,
        mpsc::Receiver<ClientEvent>,
    ) {
        let cancel_token = cancel::Token::new();
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

        let client = Self::new(
            options,
            engine,
            strategy,
            request_rx,
            event_tx,
            transport_requests,
            transport_events,
        );
        tokio::spawn(client.run(cancel_token.clone()));

        (cancel_token.guard(), request_tx, event_rx)
    }

    fn new(
        options: ClientOptions,
        mut engine: GameEngine,
        strategy: Strategy,
        requests: mpsc::Receiver<ClientRequest>,
        events: mpsc::Sender<ClientEvent>,
        transport_requests: mpsc::Sender<ClientTransportRequest>,
        transport_events: mpsc::Receiver<ClientTransportEvent>,
    ) -> Self {
        // Locally-created objects allocate from the shadow id space.
        engine.world.set_id_base(CLIENT_ID_SPACE);
        if !strategy.runs_physics() {
            engine.set_physics_enabled(false);
        }
        let step_period = SimDuration::from_micros(1_000_000 / options.step_rate as i64);
        let epoch = ClientEpoch::at_now();
        Self {
            options,
            step_period,
            engine,
            strategy,
            epoch,
            scheduler: Scheduler::new(epoch, step_period, step_period / 4),
            requests: Some(requests),
            events,
            transport_requests,
            transport_events,
            player_id: PlayerId::UNOWNED,
            message_index: 1,
            highest_server_step: StepId(0),
            pending_local_inputs: BTreeMap::new(),
            traces: Vec::new(),
            rtt: RttTracker::new(),
        }
    }

    async fn run(mut self, cancel_token: cancel::Token) {
        log::info!(
            "Client running at {} steps/s with the {:?} strategy",
            self.options.step_rate,
            self.strategy.kind(),
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
                InternalEvent::Transport(Some(event)) => {
                    if !self.handle_transport_event(event).await {
                        break;
                    }
                }
                InternalEvent::Transport(None) => break,
                InternalEvent::Request(Some(request)) => self.handle_request(request).await,
                InternalEvent::Request(None) => self.requests = None,
                InternalEvent::Tick(outcome) => self.handle_tick(outcome).await,
            }
        }
    }

    /// Returns false once the connection is gone.
    async fn handle_transport_event(&mut self, event: ClientTransportEvent) -> bool {
        match event {
            ClientTransportEvent::Message(data) => {
                self.handle_message(data).await;
                true
            }
            ClientTransportEvent::Dropped => {
                log::info!("Connection dropped");
                false
            }
        }
    }

    async fn handle_message(&mut self, data: Vec<u8>) {
        let mut r = data.as_slice();
        let message = match Message::read_from(&mut r) {
            Ok(message) => message,
            Err(e) => {
                log::error!("Error decoding message: {e}");
                return;
            }
        };
        if !r.is_empty() {
            log::error!(
                "Dropping {:?} message: {} unexpected trailing byte(s)",
                message.kind(),
                r.len(),
            );
            return;
        }

        match message {
            Message::PlayerJoined(message) => {
                log::info!("Joined as {}", message.player_id);
                self.player_id = message.player_id;
                let _ = self
                    .events
                    .send(ClientEvent::Joined {
                        player_id: message.player_id,
                    })
                    .await;
            }
            Message::WorldUpdate(message) => self.handle_world_update(&message.payload).await,
            Message::RoomUpdate(message) => {
                log::info!("Moved from room {:?} to {:?}", message.from, message.to);
                let _ = self
                    .events
                    .send(ClientEvent::RoomUpdate {
                        from: message.from,
                        to: message.to,
                    })
                    .await;
            }
            Message::RttResponse(message) => {
                if let Some(estimate) = self.rtt.complete(message.id, self.epoch.now()) {
                    log::debug!("RTT estimate {estimate:.1} ms");
                }
            }
            other => {
                log::error!("Unexpected {:?} message", other.kind());
            }
        }
    }

    async fn handle_world_update(&mut self, payload: &[u8]) {
        let registry = self.engine.registry().clone();
        let mut r = payload;
        let sync = match read_sync(&registry, &mut r) {
            Ok(sync) => sync,
            Err(e) => {
                // The next full sync repairs whatever this one carried.
                log::error!("Error decoding sync payload: {e}");
                return;
            }
        };
        if sync.step_count > self.highest_server_step {
            self.highest_server_step = sync.step_count;
        }
        self.strategy.receive_sync(sync);
        self.apply_pending_syncs().await;
    }

    async fn apply_pending_syncs(&mut self) {
        let applied = self.strategy.apply_pending(&mut self.engine, self.player_id);
        for server_step in applied {
            self.discipline_step_drift(server_step);
            let _ = self.events.send(ClientEvent::SyncApplied { server_step }).await;
        }
    }

    /// Compare the local step count against where the strategy wants it
    /// relative to the server, and nudge or snap the clock.
    fn discipline_step_drift(&mut self, server_step: StepId) {
        let thresholds = self.strategy.drift_thresholds();
        let target = server_step.0 as i64 + self.strategy.step_offset();
        let lead = self.engine.world.step_count.0 as i64 - target;

        if lead > thresholds.max_lead {
            log::debug!("Leading the server by {lead} steps; delaying a tick");
            self.scheduler.delay_tick();
        } else if lead < -thresholds.max_lag {
            log::debug!("Trailing the server by {} steps; hurrying a tick", -lead);
            self.scheduler.hurry_tick();
        }

        if -lead > thresholds.client_reset {
            log::warn!(
                "Step lag {} exceeds the reset threshold; snapping to {server_step}",
                -lead,
            );
            self.engine.world.step_count = server_step;
        }
    }

    async fn handle_request(&mut self, request: ClientRequest) {
        match request {
            ClientRequest::SendInput { tag, options } => self.send_input(tag, options).await,
            ClientRequest::Trace { data } => {
                self.traces.push(TraceRecord {
                    time: self.epoch.now().as_millis(),
                    step: self.engine.world.step_count,
                    data,
                });
            }
        }
    }

    async fn send_input(&mut self, tag: String, options: InputOptions) {
        let step = StepId(self.engine.world.step_count.0 + self.options.input_delay_steps);
        let input = Input {
            tag,
            message_index: self.message_index,
            step,
            options,
        };
        self.message_index += 1;

        if self.options.input_delay_steps == 0 {
            self.process_local_input(&input);
        } else {
            self.pending_local_inputs
                .entry(step.0)
                .or_default()
                .push(input.clone());
        }
        self.send_message(Message::Move(MoveMessage { input })).await;
    }

    fn process_local_input(&mut self, input: &Input) {
        if !self.strategy.processes_inputs_locally() || self.strategy.needs_first_sync() {
            return;
        }
        self.engine.process_input(input, self.player_id, false);
        self.strategy.on_local_input(input);
    }

    async fn handle_tick(&mut self, outcome: TickOutcome) {
        if outcome == TickOutcome::RunningSlow {
            log::warn!("Client step loop is running slow");
        }

        // Deliver delayed inputs due at the step about to run.
        let upcoming = self.engine.world.step_count.0 + 1;
        let due: Vec<u32> = self
            .pending_local_inputs
            .range(..=upcoming)
            .map(|(&step, _)| step)
            .collect();
        for step in due {
            for input in self.pending_local_inputs.remove(&step).unwrap() {
                self.process_local_input(&input);
            }
        }

        self.engine.step(false, Some(self.step_period));
        self.strategy.post_step(&mut self.engine, self.step_period);
        self.apply_pending_syncs().await;

        let step = self.engine.world.step_count.0;
        if self.options.rtt_query_interval_steps > 0
            && step % self.options.rtt_query_interval_steps == 0
        {
            let id = self.rtt.begin(self.epoch.now());
            self.send_message(Message::RttQuery(RttQueryMessage { id })).await;
        }

        if !self.traces.is_empty() {
            let records = mem::take(&mut self.traces);
            self.send_message(Message::Trace(TraceMessage { records })).await;
        }
    }

    async fn send_message(&mut self, message: Message) {
        let mut data = Vec::new();
        match message.write_to(&mut data) {
            Ok(()) => {
                let _ = self
                    .transport_requests
                    .send(ClientTransportRequest::Send(data))
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
