use driftnet_stream_codec::{StreamCodec, WriteStringError};

use crate::message::ReadMessageError;
use crate::PlayerId;

/// Notifies a socket that its player moved between rooms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomUpdateMessage {
    pub player_id: PlayerId,
    pub from: String,
    pub to: String,
}

impl StreamCodec for RoomUpdateMessage {
    type ReadError = ReadMessageError;
    type WriteError = WriteStringError;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadMessageError> {
        Ok(Self {
            player_id: PlayerId::read_from(r)?,
            from: String::read_from(r)?,
            to: String::read_from(r)?,
        })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), WriteStringError> {
        self.player_id.write_to(w)?;
        self.from.write_to(w)?;
        self.to.write_to(w)
    }
}
