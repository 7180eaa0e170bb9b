//! The class registry and netScheme-driven binary codec.
//!
//! Every synchronized class registers a scheme (an ordered list of typed
//! fields) and a constructor. On the wire an instance is its one-byte
//! class id followed by its fields in scheme order, big-endian throughout.
//! The class id is a stable 8-bit hash of the class name, so both ends
//! derive the same id without negotiation; colliding names are rejected
//! at registration.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use driftnet_stream_codec::{
    ExternalStreamCodec, PrunableString, ReadError, ReadStringError, StreamCodec, WriteStringError,
};
use thiserror::Error;

use crate::object::{GameObject, NetObject};

/// Wire type of one netScheme field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetFieldKind {
    Uint8,
    Int16,
    Int32,
    Float32,
    Str,
    ClassInstance,
    List(Box<NetFieldKind>),
}

#[derive(Clone, Debug)]
pub struct NetField {
    pub name: &'static str,
    pub kind: NetFieldKind,
}

/// Ordered field layout of one class. Order is significant: it fixes both
/// the wire layout and the byte-stable output the server's diffing
/// depends on.
#[derive(Clone, Debug, Default)]
pub struct NetScheme {
    fields: Vec<NetField>,
}

impl NetScheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, kind: NetFieldKind) -> Self {
        self.fields.push(NetField { name, kind });
        self
    }

    pub fn fields(&self) -> &[NetField] {
        &self.fields
    }
}

/// A dynamically typed field value.
#[derive(Debug)]
pub enum NetValue {
    Uint8(u8),
    Int16(i16),
    Int32(i32),
    Float32(f32),
    /// `None` is the pruned marker: the sender elided an unchanged string.
    Str(Option<String>),
    Instance(Box<dyn NetObject>),
    List(Vec<NetValue>),
}

impl Clone for NetValue {
    fn clone(&self) -> Self {
        match self {
            Self::Uint8(v) => Self::Uint8(*v),
            Self::Int16(v) => Self::Int16(*v),
            Self::Int32(v) => Self::Int32(*v),
            Self::Float32(v) => Self::Float32(*v),
            Self::Str(v) => Self::Str(v.clone()),
            Self::Instance(v) => Self::Instance(v.clone_net()),
            Self::List(v) => Self::List(v.clone()),
        }
    }
}

pub struct ClassDescriptor {
    pub name: &'static str,
    pub class_id: u8,
    pub scheme: NetScheme,
    construct: fn() -> Box<dyn NetObject>,
    construct_game: Option<fn() -> Box<dyn GameObject>>,
}

impl Debug for ClassDescriptor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("class_id", &self.class_id)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("class {0:?} is already registered")]
    DuplicateClass(&'static str),

    #[error("class id 0x{id:02x} collides between {existing:?} and {new:?}")]
    ClassIdCollision {
        id: u8,
        existing: &'static str,
        new: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("class {0:?} is not registered")]
    UnregisteredClass(&'static str),

    #[error("object of class {class:?} did not produce field {field:?}")]
    MissingField {
        class: &'static str,
        field: &'static str,
    },

    #[error("field {field:?} holds a value of the wrong kind")]
    FieldKindMismatch { field: &'static str },

    #[error("list field {field:?} of {len} items exceeds u16 framing")]
    ListTooLong { field: &'static str, len: usize },

    #[error("{0}")]
    String(#[from] WriteStringError),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unknown class id 0x{0:02x}")]
    UnknownClassId(u8),

    #[error("class {0:?} is not decodable as a game object")]
    NotAGameObject(&'static str),

    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("{0}")]
    ReadString(#[from] ReadStringError),
}

/// Maps class ids to descriptors for polymorphic encode/decode.
#[derive(Debug, Default)]
pub struct Registry {
    by_id: HashMap<u8, ClassDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable 8-bit hash of a class name (djb2 folded to one byte).
    pub fn class_hash(name: &str) -> u8 {
        let mut hash: u32 = 5381;
        for byte in name.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
        }
        let [a, b, c, d] = hash.to_be_bytes();
        a ^ b ^ c ^ d
    }

    /// Register a non-entity class (e.g. a vector embedded as a
    /// `ClassInstance` field).
    pub fn register<T>(&mut self, scheme: NetScheme) -> Result<u8, RegisterError>
    where
        T: NetObject + Default,
    {
        fn make_net<T: NetObject + Default>() -> Box<dyn NetObject> {
            Box::new(T::default())
        }
        self.insert(T::default().class_name(), scheme, make_net::<T>, None)
    }

    /// Register a game-entity class, decodable into world objects.
    pub fn register_game<T>(&mut self, scheme: NetScheme) -> Result<u8, RegisterError>
    where
        T: GameObject + Default,
    {
        fn make_net<T: NetObject + Default>() -> Box<dyn NetObject> {
            Box::new(T::default())
        }
        fn make_game<T: GameObject + Default>() -> Box<dyn GameObject> {
            Box::new(T::default())
        }
        self.insert(
            T::default().class_name(),
            scheme,
            make_net::<T>,
            Some(make_game::<T>),
        )
    }

    fn insert(
        &mut self,
        name: &'static str,
        scheme: NetScheme,
        construct: fn() -> Box<dyn NetObject>,
        construct_game: Option<fn() -> Box<dyn GameObject>>,
    ) -> Result<u8, RegisterError> {
        let class_id = Self::class_hash(name);
        if let Some(existing) = self.by_id.get(&class_id) {
            if existing.name == name {
                return Err(RegisterError::DuplicateClass(name));
            }
            return Err(RegisterError::ClassIdCollision {
                id: class_id,
                existing: existing.name,
                new: name,
            });
        }
        self.by_id.insert(
            class_id,
            ClassDescriptor {
                name,
                class_id,
                scheme,
                construct,
                construct_game,
            },
        );
        Ok(class_id)
    }

    pub fn descriptor(&self, class_id: u8) -> Option<&ClassDescriptor> {
        self.by_id.get(&class_id)
    }

    pub fn descriptor_by_name(&self, name: &str) -> Option<&ClassDescriptor> {
        self.by_id.get(&Self::class_hash(name)).filter(|d| d.name == name)
    }

    /// Encode `class_id · fields in scheme order`.
    pub fn encode(&self, obj: &dyn NetObject, w: &mut Vec<u8>) -> Result<(), EncodeError> {
        let descriptor = self
            .descriptor_by_name(obj.class_name())
            .ok_or(EncodeError::UnregisteredClass(obj.class_name()))?;
        descriptor.class_id.write_to(w).unwrap();
        for field in descriptor.scheme.fields() {
            let value = obj.net_get(field.name).ok_or(EncodeError::MissingField {
                class: descriptor.name,
                field: field.name,
            })?;
            self.write_value(field.name, &field.kind, &value, w)?;
        }
        Ok(())
    }

    fn write_value(
        &self,
        field: &'static str,
        kind: &NetFieldKind,
        value: &NetValue,
        w: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        match (kind, value) {
            (NetFieldKind::Uint8, NetValue::Uint8(v)) => v.write_to(w).unwrap(),
            (NetFieldKind::Int16, NetValue::Int16(v)) => v.write_to(w).unwrap(),
            (NetFieldKind::Int32, NetValue::Int32(v)) => v.write_to(w).unwrap(),
            (NetFieldKind::Float32, NetValue::Float32(v)) => v.write_to(w).unwrap(),
            (NetFieldKind::Str, NetValue::Str(v)) => PrunableString::write_to_ext(w, v)?,
            (NetFieldKind::ClassInstance, NetValue::Instance(v)) => self.encode(&**v, w)?,
            (NetFieldKind::List(item_kind), NetValue::List(items)) => {
                let len =
                    u16::try_from(items.len()).map_err(|_| EncodeError::ListTooLong {
                        field,
                        len: items.len(),
                    })?;
                len.write_to(w).unwrap();
                for item in items {
                    self.write_value(field, &**item_kind, item, w)?;
                }
            }
            _ => return Err(EncodeError::FieldKindMismatch { field }),
        }
        Ok(())
    }

    /// Decode one instance, dispatching on the leading class id.
    pub fn decode(&self, r: &mut &[u8]) -> Result<Box<dyn NetObject>, DecodeError> {
        let class_id = u8::read_from(r)?;
        let descriptor = self
            .descriptor(class_id)
            .ok_or(DecodeError::UnknownClassId(class_id))?;
        let mut obj = (descriptor.construct)();
        self.decode_fields(descriptor, &mut |field, value| obj.net_set(field, value), r)?;
        Ok(obj)
    }

    /// Decode one instance that must be a game-entity class.
    pub fn decode_game(&self, r: &mut &[u8]) -> Result<Box<dyn GameObject>, DecodeError> {
        let class_id = u8::read_from(r)?;
        let descriptor = self
            .descriptor(class_id)
            .ok_or(DecodeError::UnknownClassId(class_id))?;
        let construct = descriptor
            .construct_game
            .ok_or(DecodeError::NotAGameObject(descriptor.name))?;
        let mut obj = construct();
        self.decode_fields(descriptor, &mut |field, value| obj.net_set(field, value), r)?;
        Ok(obj)
    }

    fn decode_fields(
        &self,
        descriptor: &ClassDescriptor,
        set_field: &mut dyn FnMut(&str, NetValue),
        r: &mut &[u8],
    ) -> Result<(), DecodeError> {
        for field in descriptor.scheme.fields() {
            let value = self.read_value(&field.kind, r)?;
            set_field(field.name, value);
        }
        Ok(())
    }

    fn read_value(&self, kind: &NetFieldKind, r: &mut &[u8]) -> Result<NetValue, DecodeError> {
        Ok(match kind {
            NetFieldKind::Uint8 => NetValue::Uint8(u8::read_from(r)?),
            NetFieldKind::Int16 => NetValue::Int16(i16::read_from(r)?),
            NetFieldKind::Int32 => NetValue::Int32(i32::read_from(r)?),
            NetFieldKind::Float32 => NetValue::Float32(f32::read_from(r)?),
            NetFieldKind::Str => NetValue::Str(PrunableString::read_from_ext(r)?),
            NetFieldKind::ClassInstance => NetValue::Instance(self.decode(r)?),
            NetFieldKind::List(item_kind) => {
                let len = u16::read_from(r)?;
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(self.read_value(&**item_kind, r)?);
                }
                NetValue::List(items)
            }
        })
    }
}
