use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};

use driftnet_stream_codec::{ReadError, StreamCodec};

pub mod engine;
pub mod input;
pub mod message;
pub mod object;
pub mod physical;
pub mod physics;
pub mod scheduler;
pub mod serializer;
pub mod sync;
pub mod time;
pub mod world;

#[cfg(test)]
mod tests;

use crate::time::SimDuration;

/// Nominal simulation rate shared by server and clients.
pub const NOMINAL_STEP_RATE: u32 = 60;

/// Duration of one step at the nominal rate.
pub const STEP_PERIOD_60HZ: SimDuration = SimDuration::from_micros(1_000_000 / 60);

/// First id of the client-allocated ("shadow") id space. Objects with ids
/// at or above this value were predicted locally; everything below came
/// from the server. This partition is the sole marker of authority.
pub const CLIENT_ID_SPACE: ObjectId = ObjectId(1_000_000);

/// A unique integer identifying an object within a [`world::World`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Whether this id lies in the client-allocated id space.
    pub fn is_shadow(self) -> bool {
        self >= CLIENT_ID_SPACE
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Object {}", self.0)
    }
}

impl StreamCodec for ObjectId {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        Ok(Self(u32::read_from(r)?))
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        self.0.write_to(w)
    }
}

/// A small integer identifying a connected player. Zero means unowned (a
/// server-controlled object, or an input from a not-yet-assigned socket).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const UNOWNED: PlayerId = PlayerId(0);
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

impl StreamCodec for PlayerId {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        Ok(Self(u8::read_from(r)?))
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        self.0.write_to(w)
    }
}

/// One logical simulation tick. Monotonically non-decreasing on the
/// server; a client may rewind it during re-enactment but restores it
/// before yielding back to its scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(pub u32);

impl StepId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for StepId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Step {}", self.0)
    }
}

impl StreamCodec for StepId {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        Ok(Self(u32::read_from(r)?))
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        self.0.write_to(w)
    }
}
