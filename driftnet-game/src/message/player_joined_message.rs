use std::convert::Infallible;

use driftnet_stream_codec::{ReadError, StreamCodec};

use crate::PlayerId;

/// Sent to a socket once its player id is allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerJoinedMessage {
    pub player_id: PlayerId,
    /// Server clock at join, in milliseconds since the server epoch.
    pub join_time: i64,
    /// Always zero at join; reserved for reconnect bookkeeping.
    pub disconnect_time: i64,
}

impl StreamCodec for PlayerJoinedMessage {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            player_id: PlayerId::read_from(r)?,
            join_time: i64::read_from(r)?,
            disconnect_time: i64::read_from(r)?,
        })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        self.player_id.write_to(w)?;
        self.join_time.write_to(w)?;
        self.disconnect_time.write_to(w)
    }
}
