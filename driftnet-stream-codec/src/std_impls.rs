use std::convert::Infallible;
use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use paste::paste;
use thiserror::Error;

use crate::{eof, ExternalStreamCodec, ReadError, StreamCodec, O};

/// String length prefix reserved to mean "field pruned, keep your value".
pub const PRUNED_STRING_MARKER: u16 = 0xffff;

/// Longest encodable string, in UTF-16 code units. One length value is
/// reserved for the pruned marker.
pub const MAX_STRING_CODE_UNITS: usize = PRUNED_STRING_MARKER as usize - 1;

impl StreamCodec for () {
    type ReadError = Infallible;
    type WriteError = Infallible;

    fn read_from(_r: &mut &[u8]) -> Result<Self, Infallible> {
        Ok(())
    }

    fn write_to(&self, _w: &mut Vec<u8>) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ReadBoolError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("invalid bool encoding 0x{0:02x}")]
    InvalidEncoding(u8),
}

impl StreamCodec for bool {
    type ReadError = ReadBoolError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadBoolError> {
        match u8::read_from(r)? {
            0 => Ok(false),
            1 => Ok(true),
            x => Err(ReadBoolError::InvalidEncoding(x)),
        }
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        w.write_u8(if *self { 1 } else { 0 }).unwrap();
        Ok(())
    }
}

impl StreamCodec for u8 {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        eof(r.read_u8())
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        Ok(w.write_u8(*self).unwrap())
    }
}

impl StreamCodec for i8 {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        eof(r.read_i8())
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        Ok(w.write_i8(*self).unwrap())
    }
}

impl<const N: usize> StreamCodec for [u8; N] {
    type ReadError = ReadError;
    type WriteError = Infallible;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
        let mut value = [0; N];
        eof(r.read_exact(&mut value))?;
        Ok(value)
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
        Ok(w.write_all(self).unwrap())
    }
}

macro_rules! impl_stream_codec_for_num {
    ($t:ty) => {
        paste! {
            impl StreamCodec for $t {
                type ReadError = ReadError;
                type WriteError = Infallible;

                fn read_from(r: &mut &[u8]) -> Result<Self, ReadError> {
                    eof(r.[<read_ $t>]::<O>())
                }

                fn write_to(&self, w: &mut Vec<u8>) -> Result<(), Infallible> {
                    Ok(w.[<write_ $t>]::<O>(*self).unwrap())
                }
            }
        }
    };
}

impl_stream_codec_for_num!(u16);
impl_stream_codec_for_num!(u32);
impl_stream_codec_for_num!(u64);
impl_stream_codec_for_num!(i16);
impl_stream_codec_for_num!(i32);
impl_stream_codec_for_num!(i64);
impl_stream_codec_for_num!(f32);
impl_stream_codec_for_num!(f64);

#[derive(Error, Debug)]
pub enum ReadStringError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("invalid UTF-16 in string payload")]
    InvalidUtf16,

    #[error("pruned marker in a non-prunable string field")]
    UnexpectedPrunedMarker,
}

#[derive(Error, Debug)]
pub enum WriteStringError {
    #[error("string of {0} UTF-16 code units exceeds wire framing")]
    TooLong(usize),
}

impl From<Infallible> for WriteStringError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

fn read_utf16(r: &mut &[u8], units: u16) -> Result<String, ReadStringError> {
    let mut buf = Vec::with_capacity(units as usize);
    for _ in 0..units {
        buf.push(u16::read_from(r)?);
    }
    String::from_utf16(&buf).map_err(|_| ReadStringError::InvalidUtf16)
}

fn write_utf16(w: &mut Vec<u8>, value: &str) -> Result<(), WriteStringError> {
    let units: Vec<u16> = value.encode_utf16().collect();
    if units.len() > MAX_STRING_CODE_UNITS {
        return Err(WriteStringError::TooLong(units.len()));
    }
    (units.len() as u16).write_to(w).unwrap();
    for unit in units {
        unit.write_to(w).unwrap();
    }
    Ok(())
}

/// Strings are a `u16` count of UTF-16 code units followed by the code
/// units themselves, two big-endian bytes each.
impl StreamCodec for String {
    type ReadError = ReadStringError;
    type WriteError = WriteStringError;

    fn read_from(r: &mut &[u8]) -> Result<Self, ReadStringError> {
        match u16::read_from(r)? {
            PRUNED_STRING_MARKER => Err(ReadStringError::UnexpectedPrunedMarker),
            units => read_utf16(r, units),
        }
    }

    fn write_to(&self, w: &mut Vec<u8>) -> Result<(), WriteStringError> {
        write_utf16(w, self)
    }
}

/// String codec admitting the pruned marker: `None` encodes as length
/// 0xffff and tells the receiver to keep its current value. Distinct from
/// `Some("")`, which encodes as length zero.
pub enum PrunableString {}

impl ExternalStreamCodec for PrunableString {
    type Item = Option<String>;
    type ReadError = ReadStringError;
    type WriteError = WriteStringError;

    fn read_from_ext(r: &mut &[u8]) -> Result<Option<String>, ReadStringError> {
        match u16::read_from(r)? {
            PRUNED_STRING_MARKER => Ok(None),
            units => Ok(Some(read_utf16(r, units)?)),
        }
    }

    fn write_to_ext(w: &mut Vec<u8>, value: &Option<String>) -> Result<(), WriteStringError> {
        match value {
            None => {
                PRUNED_STRING_MARKER.write_to(w).unwrap();
                Ok(())
            }
            Some(value) => write_utf16(w, value),
        }
    }
}

pub enum UnframedByteVec {}

impl ExternalStreamCodec for UnframedByteVec {
    type Item = Vec<u8>;
    type ReadError = Infallible;
    type WriteError = Infallible;

    fn read_from_ext(r: &mut &[u8]) -> Result<Vec<u8>, Infallible> {
        let mut value = Vec::new();
        r.read_to_end(&mut value).unwrap();
        Ok(value)
    }

    fn write_to_ext(w: &mut Vec<u8>, value: &Vec<u8>) -> Result<(), Infallible> {
        Ok(w.write_all(value).unwrap())
    }
}
