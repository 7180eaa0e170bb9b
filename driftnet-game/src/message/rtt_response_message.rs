use std::convert::Infallible;

use driftnet_stream_codec::{ReadError, StreamCodec};

/// Echo of an [`RttQueryMessage`](crate::message::rtt_query_message::RttQueryMessage).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RttResponseMessage {
    pub id: u32,
}

impl StreamCodec for RttResponseMessage {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            id: u32::read_from(r)?,
        })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        self.id.write_to(w)
    }
}
