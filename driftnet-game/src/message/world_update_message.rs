use std::convert::Infallible;

use driftnet_stream_codec::{ExternalStreamCodec, StreamCodec, UnframedByteVec};

/// A serialized sync payload (see [`crate::sync`]). The payload occupies
/// the rest of the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldUpdateMessage {
    pub payload: Vec<u8>,
}

impl StreamCodec for WorldUpdateMessage {
    type ReadError = Infallible;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, Infallible> {
        Ok(Self {
            payload: UnframedByteVec::read_from_ext(r)?,
        })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        UnframedByteVec::write_to_ext(w, &self.payload)
    }
}
