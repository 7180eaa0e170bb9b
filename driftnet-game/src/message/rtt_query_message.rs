use std::convert::Infallible;

use driftnet_stream_codec::{ReadError, StreamCodec};

/// Round-trip probe; the server echoes the id back unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RttQueryMessage {
    pub id: u32,
}

impl StreamCodec for RttQueryMessage {
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
