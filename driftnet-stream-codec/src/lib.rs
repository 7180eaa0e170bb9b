use std::io;

use thiserror::Error;

mod std_impls;
#[cfg(test)]
mod tests;

type O = byteorder::BigEndian;

pub use crate::std_impls::{
    PrunableString, ReadBoolError, ReadStringError, UnframedByteVec, WriteStringError,
    MAX_STRING_CODE_UNITS, PRUNED_STRING_MARKER,
};

/// Raised when a decoder runs off the end of its input buffer.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("unexpected end of input")]
    UnexpectedEof,
}

impl From<ReadError> for io::Error {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::UnexpectedEof => Self::new(io::ErrorKind::UnexpectedEof, e),
        }
    }
}

fn eof<T>(e: Result<T, io::Error>) -> Result<T, ReadError> {
    e.map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ReadError::UnexpectedEof,
        _ => unreachable!(),
    })
}

/// Big-endian wire serialization for a fixed-layout value.
///
/// Reading consumes from the front of a byte slice; writing appends to a
/// growable buffer. All multi-byte values are big-endian for portability.
pub trait StreamCodec: Sized {
    type ReadError;
    type WriteError;

    fn read_from(r: &mut &[u8]) -> Result<Self, Self::ReadError>;
    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Self::WriteError>;
}

/// A codec for a type that cannot carry the impl itself, or that has more
/// than one useful wire form (e.g. prunable vs. plain strings).
pub trait ExternalStreamCodec {
    type Item;
    type ReadError;
    type WriteError;

    fn read_from_ext(r: &mut &[u8]) -> Result<Self::Item, Self::ReadError>;
    fn write_to_ext(w: &mut Vec<u8>, value: &Self::Item) -> Result<(), Self::WriteError>;
}

impl<C> ExternalStreamCodec for C
where
    C: StreamCodec,
{
    type Item = C;
    type ReadError = C::ReadError;
    type WriteError = C::WriteError;

    fn read_from_ext(r: &mut &[u8]) -> Result<C, Self::ReadError> {
        C::read_from(r)
    }

    fn write_to_ext(w: &mut Vec<u8>, value: &C) -> Result<(), Self::WriteError> {
        value.write_to(w)
    }
}
