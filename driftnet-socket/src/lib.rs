//! The transport contract between the engines and whatever carries their
//! bytes: ordered, reliable message pipes, expressed as channel pairs.
//!
//! The server end addresses peers; the client end talks to exactly one
//! server. [`loopback`] provides the in-memory implementation used by
//! tests and same-process play; [`fakelag`] wraps a client's pipes with
//! simulated latency.

use std::fmt::{Debug, Display};
use std::hash::Hash;

pub mod fakelag;
pub mod loopback;


pub const REQUEST_BUFFER_SIZE: usize = 256;
pub const EVENT_BUFFER_SIZE: usize = 256;

/// Bound alias for peer addresses.
pub trait AddrBound: Debug + Display + Copy + Eq + Hash + Send + Sync + 'static {}

impl<T> AddrBound for T where T: Debug + Display + Copy + Eq + Hash + Send + Sync + 'static {}

/// Delivered to the server engine by its transport.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent<Addr> {
    Connected { addr: Addr },
    Message { addr: Addr, data: Vec<u8> },
    Disconnected { addr: Addr },
}

/// Issued by the server engine to its transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportRequest<Addr> {
    Send { addr: Addr, data: Vec<u8> },
    Disconnect { addr: Addr },
}

/// Delivered to a client engine by its transport.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientTransportEvent {
    Message(Vec<u8>),
    /// The server closed the connection, or the pipe collapsed.
    Dropped,
}

/// Issued by a client engine to its transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientTransportRequest {
    Send(Vec<u8>),
}
