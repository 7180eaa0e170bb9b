use driftnet_stream_codec::{StreamCodec, WriteStringError};

use crate::input::Input;
use crate::message::ReadMessageError;

/// An input submitted by a client.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveMessage {
    pub input: Input,
}

impl StreamCodec for MoveMessage {
    type ReadError = ReadMessageError;
    type WriteError = WriteStringError;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadMessageError> {
        Ok(Self {
            input: Input::read_from(r)?,
        })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), WriteStringError> {
        self.input.write_to(w)
    }
}
