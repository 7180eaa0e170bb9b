//! The world-update payload: one sync header followed by object events.
//!
//! The server assembles payloads with [`PayloadWriter`] (the transmitter
//! layer adds diffing on top); clients parse them back into a [`Sync`]
//! keyed by object id.

use std::collections::HashMap;
use std::convert::Infallible;

use driftnet_stream_codec::{ReadBoolError, ReadError, StreamCodec};
use thiserror::Error;

use crate::object::GameObject;
use crate::serializer::{DecodeError, EncodeError, Registry};
use crate::{ObjectId, StepId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncEventKind {
    SyncHeader,
    ObjectCreate,
    ObjectUpdate,
    ObjectDestroy,
}

#[derive(Error, Debug)]
pub enum ReadSyncError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("{0}")]
    ReadBoolError(#[from] ReadBoolError),

    #[error("{0}")]
    DecodeError(#[from] DecodeError),

    #[error("invalid sync event kind 0x{0:02x}")]
    InvalidEventKind(u8),

    #[error("payload does not begin with a sync header")]
    MissingHeader,
}

impl From<Infallible> for ReadSyncError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

impl StreamCodec for SyncEventKind {
    type ReadError = ReadSyncError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadSyncError> {
        match u8::read_from(r)? {
            x if x == Self::SyncHeader as u8 => Ok(Self::SyncHeader),
            x if x == Self::ObjectCreate as u8 => Ok(Self::ObjectCreate),
            x if x == Self::ObjectUpdate as u8 => Ok(Self::ObjectUpdate),
            x if x == Self::ObjectDestroy as u8 => Ok(Self::ObjectDestroy),
            x => Err(ReadSyncError::InvalidEventKind(x)),
        }
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        (*self as u8).write_to(w)
    }
}

/// One object event parsed from a payload.
#[derive(Debug)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    pub step: StepId,
    pub object: Box<dyn GameObject>,
}

/// A parsed world update.
#[derive(Debug)]
pub struct Sync {
    pub step_count: StepId,
    pub full_update: bool,
    pub objects: HashMap<ObjectId, Vec<SyncEvent>>,
}

impl Sync {
    /// Whether any event in the payload destroys `id`.
    pub fn destroys(&self, id: ObjectId) -> bool {
        self.objects
            .get(&id)
            .map(|events| {
                events
                    .iter()
                    .any(|event| event.kind == SyncEventKind::ObjectDestroy)
            })
            .unwrap_or(false)
    }
}

/// Accumulates object events behind a header, then frames the payload.
pub struct PayloadWriter {
    step_count: StepId,
    full_update: bool,
    count: u16,
    events: Vec<u8>,
}

impl PayloadWriter {
    pub fn new(step_count: StepId, full_update: bool) -> Self {
        Self {
            step_count,
            full_update,
            count: 0,
            events: Vec::new(),
        }
    }

    /// Append an event for an object serialized here and now.
    pub fn add_object(
        &mut self,
        registry: &Registry,
        kind: SyncEventKind,
        step: StepId,
        id: ObjectId,
        obj: &dyn GameObject,
    ) -> Result<(), EncodeError> {
        let mut bytes = Vec::new();
        registry.encode(obj.as_net(), &mut bytes)?;
        self.add_raw(kind, step, id, &bytes);
        Ok(())
    }

    /// Append an event whose instance bytes were serialized earlier (the
    /// transmitter reuses the bytes it diffed against).
    pub fn add_raw(&mut self, kind: SyncEventKind, step: StepId, id: ObjectId, bytes: &[u8]) {
        kind.write_to(&mut self.events).unwrap();
        step.write_to(&mut self.events).unwrap();
        id.write_to(&mut self.events).unwrap();
        self.events.extend_from_slice(bytes);
        self.count += 1;
    }

    pub fn event_count(&self) -> u16 {
        self.count
    }

    /// Frame the payload: header event, event count, then the events.
    pub fn serialize_payload(self) -> Vec<u8> {
        let mut w = Vec::new();
        SyncEventKind::SyncHeader.write_to(&mut w).unwrap();
        self.step_count.write_to(&mut w).unwrap();
        self.full_update.write_to(&mut w).unwrap();
        self.count.write_to(&mut w).unwrap();
        w.extend_from_slice(&self.events);
        w
    }
}

/// Parse a framed payload back into a [`Sync`].
pub fn read_sync(registry: &Registry, r: &mut &[u8]) -> Result<Sync, ReadSyncError> {
    match SyncEventKind::read_from(r)? {
        SyncEventKind::SyncHeader => (),
        _ => return Err(ReadSyncError::MissingHeader),
    }
    let step_count = StepId::read_from(r)?;
    let full_update = bool::read_from(r)?;
    let count = u16::read_from(r)?;

    let mut objects: HashMap<ObjectId, Vec<SyncEvent>> = HashMap::new();
    for _ in 0..count {
        let kind = SyncEventKind::read_from(r)?;
        if kind == SyncEventKind::SyncHeader {
            return Err(ReadSyncError::InvalidEventKind(kind as u8));
        }
        let step = StepId::read_from(r)?;
        let id = ObjectId::read_from(r)?;
        let object = registry.decode_game(r)?;
        objects
            .entry(id)
            .or_default()
            .push(SyncEvent { kind, step, object });
    }

    Ok(Sync {
        step_count,
        full_update,
        objects,
    })
}
