//! Object traits: anything that serializes by netScheme, and the game
//! entities tracked by a [`World`](crate::world::World).

use std::any::Any;
use std::fmt::Debug;

use crate::serializer::{NetFieldKind, NetScheme, NetValue};
use crate::{ObjectId, PlayerId};

/// A value serialized field-by-field under a registered netScheme.
///
/// `net_get`/`net_set` are the dynamic field surface the serializer and
/// `sync_to` drive; implementations match on the scheme's field names.
/// Setting an unknown field or a mismatched value kind is ignored.
pub trait NetObject: Any + Debug + Send {
    fn class_name(&self) -> &'static str;

    fn net_get(&self, field: &str) -> Option<NetValue>;

    fn net_set(&mut self, field: &str, value: NetValue);

    fn clone_net(&self) -> Box<dyn NetObject>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An entity registered in a world.
pub trait GameObject: NetObject {
    /// View as the serializable supertrait object.
    fn as_net(&self) -> &dyn NetObject;

    fn id(&self) -> ObjectId;

    fn set_id(&mut self, id: ObjectId);

    /// Owning player, or [`PlayerId::UNOWNED`].
    fn player_id(&self) -> PlayerId;

    fn set_player_id(&mut self, player_id: PlayerId);

    /// Pairs a client-predicted shadow with the server object it
    /// foreshadows.
    fn input_id(&self) -> Option<u32> {
        None
    }

    fn room(&self) -> Option<&str> {
        None
    }

    fn set_room(&mut self, room: Option<String>) {
        let _ = room;
    }

    fn has_component(&self, type_name: &str) -> bool {
        let _ = type_name;
        false
    }

    fn on_add_to_world(&mut self) {}

    fn on_remove_from_world(&mut self) {}

    fn clone_game(&self) -> Box<dyn GameObject>;

    /// Adopt `other`'s synchronized fields. The default copies scalar and
    /// string scheme fields; `ClassInstance` and `List` fields keep their
    /// local identity, and pruned strings are skipped.
    fn sync_to(&mut self, other: &dyn GameObject, scheme: &NetScheme) {
        sync_scalar_fields(self, other, scheme);
    }

    /// Schedule an incremental correction from `original` (the pre-sync
    /// state) toward this object's current state. No-op for objects
    /// without bendable fields.
    fn bend_to_current(
        &mut self,
        original: &dyn GameObject,
        percent: f32,
        is_local: bool,
        increments: u32,
    ) {
        let _ = (original, percent, is_local, increments);
    }

    /// Apply one scheduled bending increment, scaled by `time_factor`
    /// (1.0 at the nominal step rate).
    fn apply_incremental_bending(&mut self, time_factor: f32) {
        let _ = time_factor;
    }

    /// Remaining bending applications.
    fn bending_increments(&self) -> u32 {
        0
    }
}

/// Copy `src`'s scalar and string fields onto `dst` per the scheme.
///
/// Shared by the default [`GameObject::sync_to`] and by overriders that
/// add nested-field handling on top.
pub fn sync_scalar_fields<T: GameObject + ?Sized>(
    dst: &mut T,
    src: &dyn GameObject,
    scheme: &NetScheme,
) {
    for field in scheme.fields() {
        match field.kind {
            NetFieldKind::ClassInstance | NetFieldKind::List(_) => continue,
            NetFieldKind::Str => {
                // A pruned string means "sender saw no change"; keep ours.
                if let Some(NetValue::Str(Some(value))) = src.net_get(field.name) {
                    dst.net_set(field.name, NetValue::Str(Some(value)));
                }
            }
            _ => {
                if let Some(value) = src.net_get(field.name) {
                    dst.net_set(field.name, value);
                }
            }
        }
    }
}
