//! Simulated latency for a client's pipes.
//!
//! Each direction runs through a forwarding task that sleeps an
//! exponentially distributed delay per message before passing it on.
//! Delays apply sequentially, so ordering is preserved (late messages
//! queue behind later-scheduled earlier ones, like a congested link).

use std::time::Duration;

use rand::{thread_rng, Rng};
use rand_distr::Exp;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::{ClientTransportEvent, ClientTransportRequest, EVENT_BUFFER_SIZE, REQUEST_BUFFER_SIZE};

/// Wrap a client's transport pipes with `mean_delay` of one-way lag.
///
/// The forwarding tasks exit when either underlying pipe closes; dropping
/// the returned sender hangs up exactly like dropping the original.
pub fn with_fake_lag(
    requests: mpsc::Sender<ClientTransportRequest>,
    events: mpsc::Receiver<ClientTransportEvent>,
    mean_delay: Duration,
) -> (
    mpsc::Sender<ClientTransportRequest>,
    mpsc::Receiver<ClientTransportEvent>,
) {
    let delay_secs = Exp::new(1.0 / mean_delay.as_secs_f64()).unwrap();

    let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

    tokio::spawn(delay_requests(request_rx, requests, delay_secs));
    tokio::spawn(delay_events(events, event_tx, delay_secs));

    (request_tx, event_rx)
}

async fn delay_requests(
    mut rx: mpsc::Receiver<ClientTransportRequest>,
    tx: mpsc::Sender<ClientTransportRequest>,
    delay_secs: Exp<f64>,
) {
    while let Some(request) = rx.recv().await {
        let delay = thread_rng().sample(delay_secs);
        sleep(Duration::from_secs_f64(delay)).await;
        if tx.send(request).await.is_err() {
            return;
        }
    }
}

async fn delay_events(
    mut rx: mpsc::Receiver<ClientTransportEvent>,
    tx: mpsc::Sender<ClientTransportEvent>,
    delay_secs: Exp<f64>,
) {
    while let Some(event) = rx.recv().await {
        let dropped = matches!(event, ClientTransportEvent::Dropped);
        let delay = thread_rng().sample(delay_secs);
        sleep(Duration::from_secs_f64(delay)).await;
        if tx.send(event).await.is_err() || dropped {
            return;
        }
    }
}
