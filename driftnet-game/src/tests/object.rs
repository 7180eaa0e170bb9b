use crate::object::GameObject;
use crate::physical::{physical_object_2d_scheme, PhysicalObject2D, Vec2};
use crate::serializer::NetValue;
use crate::tests::{beacon_scheme, Beacon};
use crate::{ObjectId, PlayerId};

#[test]
fn sync_to_copies_scalar_fields() {
    let mut local = PhysicalObject2D::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
    local.id = ObjectId(5);

    let mut server = PhysicalObject2D::new(Vec2::new(10.0, -4.0), Vec2::new(0.5, 0.0));
    server.id = ObjectId(5);
    server.player_id = PlayerId(2);
    server.angle = 0.75;
    server.angular_velocity = 0.1;

    local.sync_to(&server, &physical_object_2d_scheme());

    assert_eq!(local.player_id, PlayerId(2));
    assert_eq!(local.angle, 0.75);
    assert_eq!(local.angular_velocity, 0.1);
    // Vector fields are adopted component-wise, not replaced.
    assert_eq!(local.position, Vec2::new(10.0, -4.0));
    assert_eq!(local.velocity, Vec2::new(0.5, 0.0));
}

#[test]
fn sync_to_skips_pruned_strings() {
    let mut local = Beacon {
        id: ObjectId(3),
        label: String::from("keep me"),
        ..Beacon::default()
    };

    // A pruned server instance reports its string field as None.
    #[derive(Clone, Debug, Default)]
    struct PrunedBeacon(Beacon);

    impl crate::object::NetObject for PrunedBeacon {
        fn class_name(&self) -> &'static str {
            "Beacon"
        }

        fn net_get(&self, field: &str) -> Option<NetValue> {
            match field {
                "label" => Some(NetValue::Str(None)),
                _ => self.0.net_get(field),
            }
        }

        fn net_set(&mut self, field: &str, value: NetValue) {
            self.0.net_set(field, value);
        }

        fn clone_net(&self) -> Box<dyn crate::object::NetObject> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    impl GameObject for PrunedBeacon {
        fn as_net(&self) -> &dyn crate::object::NetObject {
            self
        }

        fn id(&self) -> ObjectId {
            self.0.id
        }

        fn set_id(&mut self, id: ObjectId) {
            self.0.id = id;
        }

        fn player_id(&self) -> PlayerId {
            self.0.player_id
        }

        fn set_player_id(&mut self, player_id: PlayerId) {
            self.0.player_id = player_id;
        }

        fn clone_game(&self) -> Box<dyn GameObject> {
            Box::new(self.clone())
        }
    }

    let server = PrunedBeacon(Beacon {
        id: ObjectId(3),
        player_id: PlayerId(7),
        label: String::new(),
        codes: vec![1],
    });

    local.sync_to(&server, &beacon_scheme());

    assert_eq!(local.player_id, PlayerId(7));
    // The pruned string kept its local value; the list field kept local
    // identity per the nested-field rule.
    assert_eq!(local.label, "keep me");
    assert!(local.codes.is_empty());
}
