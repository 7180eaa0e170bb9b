//! Player input descriptors, as captured on the client and replayed on
//! both ends.

use std::collections::BTreeMap;
use std::convert::Infallible;

use driftnet_stream_codec::{
    ReadBoolError, ReadError, ReadStringError, StreamCodec, WriteStringError,
};
use thiserror::Error;

use crate::StepId;

/// One captured input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Input {
    /// Game-specific tag, e.g. `"up"`.
    pub tag: String,
    /// Monotonic per-player counter stamped at capture time.
    pub message_index: u32,
    /// The logical step the input was produced at.
    pub step: StepId,
    pub options: InputOptions,
}

/// Opaque game-specific input options. `movement` marks inputs that are
/// replayed during re-enactment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputOptions {
    pub movement: bool,
    /// Ordered so the wire form is deterministic.
    pub extra: BTreeMap<String, String>,
}

impl InputOptions {
    pub fn movement() -> Self {
        Self {
            movement: true,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReadInputError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("{0}")]
    ReadBoolError(#[from] ReadBoolError),

    #[error("{0}")]
    ReadStringError(#[from] ReadStringError),
}

impl From<Infallible> for ReadInputError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

impl StreamCodec for Input {
    type ReadError = ReadInputError;
    type WriteError = WriteStringError;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadInputError> {
        let tag = String::read_from(r)?;
        let message_index = u32::read_from(r)?;
        let step = StepId::read_from(r)?;
        let movement = bool::read_from(r)?;
        let count = u16::read_from(r)?;
        let mut extra = BTreeMap::new();
        for _ in 0..count {
            let key = String::read_from(r)?;
            let value = String::read_from(r)?;
            extra.insert(key, value);
        }
        Ok(Self {
            tag,
            message_index,
            step,
            options: InputOptions { movement, extra },
        })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), WriteStringError> {
        self.tag.write_to(w)?;
        self.message_index.write_to(w).unwrap();
        self.step.write_to(w).unwrap();
        self.options.movement.write_to(w).unwrap();
        (self.options.extra.len() as u16).write_to(w).unwrap();
        for (key, value) in &self.options.extra {
            key.write_to(w)?;
            value.write_to(w)?;
        }
        Ok(())
    }
}
