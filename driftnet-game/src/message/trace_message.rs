use driftnet_stream_codec::{StreamCodec, WriteStringError};

use crate::message::ReadMessageError;
use crate::StepId;

/// One client-side trace record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// Client clock in milliseconds since the client epoch.
    pub time: i64,
    pub step: StepId,
    pub data: String,
}

/// A batch of trace records flushed by a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceMessage {
    pub records: Vec<TraceRecord>,
}

impl StreamCodec for TraceMessage {
    type ReadError = ReadMessageError;
    type WriteError = WriteStringError;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadMessageError> {
        let count = u16::read_from(r)?;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(TraceRecord {
                time: i64::read_from(r)?,
                step: StepId::read_from(r)?,
                data: String::read_from(r)?,
            });
        }
        Ok(Self { records })
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), WriteStringError> {
        (self.records.len() as u16).write_to(w)?;
        for record in &self.records {
            record.time.write_to(w)?;
            record.step.write_to(w)?;
            record.data.write_to(w)?;
        }
        Ok(())
    }
}
