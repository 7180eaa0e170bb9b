//! Transport messages exchanged between server and client. Each message
//! is one framed datagram on the ordered reliable pipe.

use std::convert::Infallible;

use driftnet_stream_codec::{ReadError, ReadStringError, StreamCodec, WriteStringError};
use thiserror::Error;

use crate::input::ReadInputError;

pub mod move_message;
pub mod player_joined_message;
pub mod room_update_message;
pub mod rtt_query_message;
pub mod rtt_response_message;
pub mod trace_message;
pub mod world_update_message;

use crate::message::move_message::MoveMessage;
use crate::message::player_joined_message::PlayerJoinedMessage;
use crate::message::room_update_message::RoomUpdateMessage;
use crate::message::rtt_query_message::RttQueryMessage;
use crate::message::rtt_response_message::RttResponseMessage;
use crate::message::trace_message::TraceMessage;
use crate::message::world_update_message::WorldUpdateMessage;

#[derive(Debug, Error)]
pub enum ReadMessageError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("{0}")]
    ReadStringError(#[from] ReadStringError),

    #[error("{0}")]
    ReadInputError(#[from] ReadInputError),

    #[error("invalid message type encoding: 0x{0:02x}")]
    InvalidMessageType(u8),
}

impl From<Infallible> for ReadMessageError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    PlayerJoined,
    WorldUpdate,
    RoomUpdate,
    Move,
    Trace,
    RttQuery,
    RttResponse,
}

impl StreamCodec for MessageKind {
    type ReadError = ReadMessageError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadMessageError> {
        u8::read_from(r)?.try_into()
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        (*self as u8).write_to(w)
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = ReadMessageError;

    fn try_from(value: u8) -> Result<Self, ReadMessageError> {
        match value {
            x if x == Self::PlayerJoined as u8 => Ok(Self::PlayerJoined),
            x if x == Self::WorldUpdate as u8 => Ok(Self::WorldUpdate),
            x if x == Self::RoomUpdate as u8 => Ok(Self::RoomUpdate),
            x if x == Self::Move as u8 => Ok(Self::Move),
            x if x == Self::Trace as u8 => Ok(Self::Trace),
            x if x == Self::RttQuery as u8 => Ok(Self::RttQuery),
            x if x == Self::RttResponse as u8 => Ok(Self::RttResponse),
            x => Err(ReadMessageError::InvalidMessageType(x)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    PlayerJoined(PlayerJoinedMessage),
    WorldUpdate(WorldUpdateMessage),
    RoomUpdate(RoomUpdateMessage),
    Move(MoveMessage),
    Trace(TraceMessage),
    RttQuery(RttQueryMessage),
    RttResponse(RttResponseMessage),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::PlayerJoined(_) => MessageKind::PlayerJoined,
            Self::WorldUpdate(_) => MessageKind::WorldUpdate,
            Self::RoomUpdate(_) => MessageKind::RoomUpdate,
            Self::Move(_) => MessageKind::Move,
            Self::Trace(_) => MessageKind::Trace,
            Self::RttQuery(_) => MessageKind::RttQuery,
            Self::RttResponse(_) => MessageKind::RttResponse,
        }
    }
}

impl StreamCodec for Message {
    type ReadError = ReadMessageError;
    type WriteError = WriteStringError;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadMessageError> {
        match MessageKind::read_from(r)? {
            MessageKind::PlayerJoined => Ok(Self::PlayerJoined(PlayerJoinedMessage::read_from(r)?)),
            MessageKind::WorldUpdate => Ok(Self::WorldUpdate(WorldUpdateMessage::read_from(r)?)),
            MessageKind::RoomUpdate => Ok(Self::RoomUpdate(RoomUpdateMessage::read_from(r)?)),
            MessageKind::Move => Ok(Self::Move(MoveMessage::read_from(r)?)),
            MessageKind::Trace => Ok(Self::Trace(TraceMessage::read_from(r)?)),
            MessageKind::RttQuery => Ok(Self::RttQuery(RttQueryMessage::read_from(r)?)),
            MessageKind::RttResponse => Ok(Self::RttResponse(RttResponseMessage::read_from(r)?)),
        }
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), WriteStringError> {
        self.kind().write_to(w)?;
        match self {
            Self::PlayerJoined(message) => message.write_to(w)?,
            Self::WorldUpdate(message) => message.write_to(w)?,
            Self::RoomUpdate(message) => message.write_to(w)?,
            Self::Move(message) => message.write_to(w)?,
            Self::Trace(message) => message.write_to(w)?,
            Self::RttQuery(message) => message.write_to(w)?,
            Self::RttResponse(message) => message.write_to(w)?,
        }
        Ok(())
    }
}
