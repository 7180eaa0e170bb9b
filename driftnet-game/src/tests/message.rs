use driftnet_stream_codec::StreamCodec;

use crate::input::{Input, InputOptions};
use crate::message::move_message::MoveMessage;
use crate::message::player_joined_message::PlayerJoinedMessage;
use crate::message::room_update_message::RoomUpdateMessage;
use crate::message::rtt_query_message::RttQueryMessage;
use crate::message::rtt_response_message::RttResponseMessage;
use crate::message::trace_message::{TraceMessage, TraceRecord};
use crate::message::world_update_message::WorldUpdateMessage;
use crate::message::{Message, ReadMessageError};
use crate::{PlayerId, StepId};

fn round_trip(message: Message) -> Message {
    let mut data = Vec::new();
    message.write_to(&mut data).unwrap();
    let mut r = data.as_slice();
    let decoded = Message::read_from(&mut r).unwrap();
    assert!(r.is_empty(), "trailing bytes after {:?}", decoded.kind());
    decoded
}

#[test]
fn messages_round_trip() {
    let mut extra = std::collections::BTreeMap::new();
    extra.insert(String::from("axis"), String::from("-1"));

    let messages = [
        Message::PlayerJoined(PlayerJoinedMessage {
            player_id: PlayerId(3),
            join_time: 123_456,
            disconnect_time: 0,
        }),
        Message::WorldUpdate(WorldUpdateMessage {
            payload: vec![0, 1, 2, 250],
        }),
        Message::RoomUpdate(RoomUpdateMessage {
            player_id: PlayerId(3),
            from: String::from("/lobby"),
            to: String::from("/match-1"),
        }),
        Message::Move(MoveMessage {
            input: Input {
                tag: String::from("up"),
                message_index: 17,
                step: StepId(204),
                options: InputOptions {
                    movement: true,
                    extra,
                },
            },
        }),
        Message::Trace(TraceMessage {
            records: vec![TraceRecord {
                time: 99,
                step: StepId(5),
                data: String::from("bent 0.4 units"),
            }],
        }),
        Message::RttQuery(RttQueryMessage { id: 8 }),
        Message::RttResponse(RttResponseMessage { id: 8 }),
    ];

    for message in messages {
        let decoded = round_trip(message.clone());
        assert_eq!(decoded, message);
    }
}

#[test]
fn unknown_message_tag_is_an_error() {
    let mut r: &[u8] = &[0xf0, 0, 0];
    assert!(matches!(
        Message::read_from(&mut r),
        Err(ReadMessageError::InvalidMessageType(0xf0)),
    ));
}

#[test]
fn world_update_payload_takes_the_rest_of_the_message() {
    let message = Message::WorldUpdate(WorldUpdateMessage {
        payload: vec![9; 300],
    });
    let decoded = round_trip(message);
    match decoded {
        Message::WorldUpdate(decoded) => assert_eq!(decoded.payload.len(), 300),
        _ => unreachable!(),
    }
}
