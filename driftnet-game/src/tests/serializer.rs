use driftnet_stream_codec::ReadError;

use crate::physical::{PhysicalObject2D, Vec2};
use crate::serializer::{DecodeError, RegisterError, Registry};
use crate::tests::{beacon_scheme, test_registry, Beacon};
use crate::{ObjectId, PlayerId};

#[test]
fn class_hash_is_stable() {
    // The id must never drift between builds: both ends derive it
    // independently from the class name.
    assert_eq!(
        Registry::class_hash("PhysicalObject2D"),
        Registry::class_hash("PhysicalObject2D"),
    );
    assert_ne!(
        Registry::class_hash("PhysicalObject2D"),
        Registry::class_hash("Vec2"),
    );
}

#[test]
fn physical_object_round_trips() {
    let registry = test_registry();
    let mut obj = PhysicalObject2D::new(Vec2::new(1.5, -2.25), Vec2::new(0.25, 0.0));
    obj.id = ObjectId(7);
    obj.player_id = PlayerId(3);
    obj.input_id = Some(42);
    obj.angle = 1.25;
    obj.angular_velocity = -0.5;

    let mut bytes = Vec::new();
    registry.encode(&obj, &mut bytes).unwrap();

    let mut r = bytes.as_slice();
    let decoded = registry.decode_game(&mut r).unwrap();
    assert!(r.is_empty());

    let decoded = decoded.as_any().downcast_ref::<PhysicalObject2D>().unwrap();
    assert_eq!(decoded.id, ObjectId(7));
    assert_eq!(decoded.player_id, PlayerId(3));
    assert_eq!(decoded.input_id, Some(42));
    assert_eq!(decoded.position, Vec2::new(1.5, -2.25));
    assert_eq!(decoded.velocity, Vec2::new(0.25, 0.0));
    assert_eq!(decoded.angle, 1.25);
    assert_eq!(decoded.angular_velocity, -0.5);
}

#[test]
fn encoding_is_byte_stable() {
    // The server's diffing compares raw bytes, so re-encoding a decoded
    // instance must reproduce them exactly.
    let registry = test_registry();
    let mut obj = PhysicalObject2D::new(Vec2::new(0.1, 0.2), Vec2::new(-0.3, 0.4));
    obj.id = ObjectId(9);

    let mut bytes = Vec::new();
    registry.encode(&obj, &mut bytes).unwrap();

    let mut r = bytes.as_slice();
    let decoded = registry.decode_game(&mut r).unwrap();

    let mut reencoded = Vec::new();
    registry.encode(decoded.as_net(), &mut reencoded).unwrap();
    assert_eq!(bytes, reencoded);
}

#[test]
fn string_and_list_fields_round_trip() {
    let registry = test_registry();
    let beacon = Beacon {
        id: ObjectId(12),
        player_id: PlayerId(1),
        label: String::from("north \u{2191}"),
        codes: vec![-1, 0, 70000],
    };

    let mut bytes = Vec::new();
    registry.encode(&beacon, &mut bytes).unwrap();
    let mut r = bytes.as_slice();
    let decoded = registry.decode_game(&mut r).unwrap();
    assert!(r.is_empty());

    let decoded = decoded.as_any().downcast_ref::<Beacon>().unwrap();
    assert_eq!(decoded.label, "north \u{2191}");
    assert_eq!(decoded.codes, vec![-1, 0, 70000]);
}

#[test]
fn empty_string_and_list_round_trip() {
    let registry = test_registry();
    let beacon = Beacon {
        id: ObjectId(13),
        ..Beacon::default()
    };

    let mut bytes = Vec::new();
    registry.encode(&beacon, &mut bytes).unwrap();
    let decoded = registry.decode_game(&mut bytes.as_slice()).unwrap();
    let decoded = decoded.as_any().downcast_ref::<Beacon>().unwrap();
    assert_eq!(decoded.label, "");
    assert!(decoded.codes.is_empty());
}

#[test]
fn unknown_class_id_is_an_error() {
    let registry = test_registry();
    let free_id = (0..=255u8)
        .find(|&id| registry.descriptor(id).is_none())
        .unwrap();
    let bytes = [free_id, 0, 0, 0, 0];
    let mut r = bytes.as_slice();
    assert!(matches!(
        registry.decode(&mut r),
        Err(DecodeError::UnknownClassId(id)) if id == free_id
    ));
}

#[test]
fn truncated_buffer_is_an_error() {
    let registry = test_registry();
    let obj = PhysicalObject2D::new(Vec2::new(1.0, 2.0), Vec2::ZERO);

    let mut bytes = Vec::new();
    registry.encode(&obj, &mut bytes).unwrap();
    bytes.truncate(bytes.len() - 3);

    let mut r = bytes.as_slice();
    assert!(matches!(
        registry.decode_game(&mut r),
        Err(DecodeError::Read(ReadError::UnexpectedEof))
    ));
}

#[test]
fn vector_class_is_not_a_game_object() {
    let registry = test_registry();
    let mut bytes = Vec::new();
    registry.encode(&Vec2::new(1.0, 2.0), &mut bytes).unwrap();

    let mut r = bytes.as_slice();
    assert!(matches!(
        registry.decode_game(&mut r),
        Err(DecodeError::NotAGameObject("Vec2"))
    ));
}

#[test]
fn duplicate_registration_is_an_error() {
    let mut registry = Registry::new();
    registry.register_game::<Beacon>(beacon_scheme()).unwrap();
    assert!(matches!(
        registry.register_game::<Beacon>(beacon_scheme()),
        Err(RegisterError::DuplicateClass("Beacon"))
    ));
}
