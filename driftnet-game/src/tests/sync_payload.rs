use crate::physical::{PhysicalObject2D, Vec2};
use crate::sync::{read_sync, PayloadWriter, ReadSyncError, SyncEventKind};
use crate::tests::test_registry;
use crate::{ObjectId, StepId};

fn physical(id: u32, x: f32) -> PhysicalObject2D {
    let mut obj = PhysicalObject2D::new(Vec2::new(x, 0.0), Vec2::ZERO);
    obj.id = ObjectId(id);
    obj
}

#[test]
fn payload_round_trips_grouped_by_object() {
    let registry = test_registry();
    let step = StepId(96);

    let mut writer = PayloadWriter::new(step, false);
    writer
        .add_object(
            &registry,
            SyncEventKind::ObjectCreate,
            step,
            ObjectId(1),
            &physical(1, 1.0),
        )
        .unwrap();
    writer
        .add_object(
            &registry,
            SyncEventKind::ObjectUpdate,
            step,
            ObjectId(1),
            &physical(1, 2.0),
        )
        .unwrap();
    writer
        .add_object(
            &registry,
            SyncEventKind::ObjectUpdate,
            step,
            ObjectId(2),
            &physical(2, 5.0),
        )
        .unwrap();
    assert_eq!(writer.event_count(), 3);

    let payload = writer.serialize_payload();
    let mut r = payload.as_slice();
    let sync = read_sync(&registry, &mut r).unwrap();
    assert!(r.is_empty());

    assert_eq!(sync.step_count, step);
    assert!(!sync.full_update);
    assert_eq!(sync.objects.len(), 2);
    // Events for one object arrive in payload order.
    let events = &sync.objects[&ObjectId(1)];
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, SyncEventKind::ObjectCreate);
    assert_eq!(events[1].kind, SyncEventKind::ObjectUpdate);
    let last = events[1]
        .object
        .as_any()
        .downcast_ref::<PhysicalObject2D>()
        .unwrap();
    assert_eq!(last.position.x, 2.0);
}

#[test]
fn destroy_events_are_flagged() {
    let registry = test_registry();
    let step = StepId(10);
    let mut writer = PayloadWriter::new(step, true);
    writer
        .add_object(
            &registry,
            SyncEventKind::ObjectDestroy,
            step,
            ObjectId(4),
            &physical(4, 0.0),
        )
        .unwrap();

    let payload = writer.serialize_payload();
    let sync = read_sync(&registry, &mut payload.as_slice()).unwrap();
    assert!(sync.full_update);
    assert!(sync.destroys(ObjectId(4)));
    assert!(!sync.destroys(ObjectId(5)));
}

#[test]
fn header_must_come_first() {
    let registry = test_registry();
    let bytes = [SyncEventKind::ObjectUpdate as u8, 0, 0, 0, 0];
    assert!(matches!(
        read_sync(&registry, &mut bytes.as_slice()),
        Err(ReadSyncError::MissingHeader),
    ));
}

#[test]
fn bad_event_kind_is_an_error() {
    let registry = test_registry();
    let bytes = [0xee];
    assert!(matches!(
        read_sync(&registry, &mut bytes.as_slice()),
        Err(ReadSyncError::InvalidEventKind(0xee)),
    ));
}

#[test]
fn empty_payload_carries_only_the_header() {
    let registry = test_registry();
    let payload = PayloadWriter::new(StepId(42), false).serialize_payload();
    let sync = read_sync(&registry, &mut payload.as_slice()).unwrap();
    assert_eq!(sync.step_count, StepId(42));
    assert!(sync.objects.is_empty());
}
