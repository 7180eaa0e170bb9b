//! In-memory transport hub: one server end, any number of client ends,
//! message boundaries preserved, per-pipe FIFO order guaranteed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::{
    AddrBound, ClientTransportEvent, ClientTransportRequest, TransportEvent, TransportRequest,
    EVENT_BUFFER_SIZE, REQUEST_BUFFER_SIZE,
};

#[derive(Clone)]
pub struct LoopbackNetwork<Addr> {
    inner: Arc<Mutex<Inner<Addr>>>,
}

struct Inner<Addr> {
    server_events: Option<mpsc::Sender<TransportEvent<Addr>>>,
    clients: HashMap<Addr, mpsc::Sender<ClientTransportEvent>>,
}

impl<Addr: AddrBound> LoopbackNetwork<Addr> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                server_events: None,
                clients: HashMap::new(),
            })),
        }
    }

    /// Attach the server end. Call once, before any client connects.
    pub fn open_server(
        &self,
    ) -> (
        mpsc::Sender<TransportRequest<Addr>>,
        mpsc::Receiver<TransportEvent<Addr>>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
        {
            let mut inner = self.inner.lock().unwrap();
            assert!(inner.server_events.is_none());
            inner.server_events = Some(event_tx);
        }
        tokio::spawn(route_server_requests(Arc::clone(&self.inner), request_rx));
        (request_tx, event_rx)
    }

    /// Connect a client under `addr`. The server observes
    /// [`TransportEvent::Connected`] before any message from this peer.
    pub async fn connect(
        &self,
        addr: Addr,
    ) -> (
        mpsc::Sender<ClientTransportRequest>,
        mpsc::Receiver<ClientTransportEvent>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);

        let server_events = {
            let mut inner = self.inner.lock().unwrap();
            assert!(
                !inner.clients.contains_key(&addr),
                "loopback address {addr} is already bound"
            );
            inner.clients.insert(addr, event_tx);
            inner
                .server_events
                .clone()
                .expect("loopback server end not open")
        };
        let _ = server_events.send(TransportEvent::Connected { addr }).await;

        tokio::spawn(forward_client_requests(
            Arc::clone(&self.inner),
            addr,
            request_rx,
        ));
        (request_tx, event_rx)
    }
}

impl<Addr: AddrBound> Default for LoopbackNetwork<Addr> {
    fn default() -> Self {
        Self::new()
    }
}

async fn route_server_requests<Addr: AddrBound>(
    inner: Arc<Mutex<Inner<Addr>>>,
    mut requests: mpsc::Receiver<TransportRequest<Addr>>,
) {
    while let Some(request) = requests.recv().await {
        match request {
            TransportRequest::Send { addr, data } => {
                let client = inner.lock().unwrap().clients.get(&addr).cloned();
                match client {
                    Some(client) => {
                        let _ = client.send(ClientTransportEvent::Message(data)).await;
                    }
                    None => log::debug!("Dropping message for unbound address {addr}"),
                }
            }
            TransportRequest::Disconnect { addr } => {
                let client = inner.lock().unwrap().clients.remove(&addr);
                if let Some(client) = client {
                    let _ = client.send(ClientTransportEvent::Dropped).await;
                }
            }
        }
    }
}

async fn forward_client_requests<Addr: AddrBound>(
    inner: Arc<Mutex<Inner<Addr>>>,
    addr: Addr,
    mut requests: mpsc::Receiver<ClientTransportRequest>,
) {
    loop {
        let server_events = inner.lock().unwrap().server_events.clone();
        let server_events = match server_events {
            Some(server_events) => server_events,
            None => return,
        };
        match requests.recv().await {
            Some(ClientTransportRequest::Send(data)) => {
                let _ = server_events
                    .send(TransportEvent::Message { addr, data })
                    .await;
            }
            None => {
                // Client handle dropped: the peer hung up.
                let still_bound = inner.lock().unwrap().clients.remove(&addr).is_some();
                if still_bound {
                    let _ = server_events.send(TransportEvent::Disconnected { addr }).await;
                }
                return;
            }
        }
    }
}
