use crate::{
    ExternalStreamCodec, PrunableString, ReadBoolError, ReadError, ReadStringError, StreamCodec,
    PRUNED_STRING_MARKER,
};

fn encode<T: StreamCodec>(value: &T) -> Vec<u8>
where
    T::WriteError: std::fmt::Debug,
{
    let mut w = Vec::new();
    value.write_to(&mut w).unwrap();
    w
}

#[test]
fn integers_are_big_endian() {
    assert_eq!(encode(&0x1234u16), [0x12, 0x34]);
    assert_eq!(encode(&0x12345678u32), [0x12, 0x34, 0x56, 0x78]);
    assert_eq!(encode(&-2i16), [0xff, 0xfe]);
    assert_eq!(encode(&1.0f32), [0x3f, 0x80, 0x00, 0x00]);
}

#[test]
fn numeric_round_trips() {
    for value in [0u32, 1, 0xdead_beef, u32::MAX] {
        let buf = encode(&value);
        let mut r = buf.as_slice();
        assert_eq!(u32::read_from(&mut r).unwrap(), value);
        assert!(r.is_empty());
    }
    for value in [0.0f32, -1.5, f32::MIN_POSITIVE, 1234.5678] {
        let buf = encode(&value);
        let mut r = buf.as_slice();
        assert_eq!(f32::read_from(&mut r).unwrap(), value);
    }
}

#[test]
fn short_buffer_is_unexpected_eof() {
    let mut r: &[u8] = &[0x12];
    assert!(matches!(
        u32::read_from(&mut r),
        Err(ReadError::UnexpectedEof)
    ));
}

#[test]
fn bool_rejects_bad_encodings() {
    let mut r: &[u8] = &[2];
    assert!(matches!(
        bool::read_from(&mut r),
        Err(ReadBoolError::InvalidEncoding(2))
    ));
}

#[test]
fn string_is_utf16_code_units() {
    let buf = encode(&String::from("hi"));
    assert_eq!(buf, [0x00, 0x02, 0x00, b'h', 0x00, b'i']);

    let mut r = buf.as_slice();
    assert_eq!(String::read_from(&mut r).unwrap(), "hi");
    assert!(r.is_empty());
}

#[test]
fn string_round_trips_surrogate_pairs() {
    let value = String::from("step \u{1f3ae}");
    let buf = encode(&value);
    let mut r = buf.as_slice();
    assert_eq!(String::read_from(&mut r).unwrap(), value);
}

#[test]
fn pruned_marker_is_distinct_from_empty() {
    let mut w = Vec::new();
    PrunableString::write_to_ext(&mut w, &None).unwrap();
    assert_eq!(w, PRUNED_STRING_MARKER.to_be_bytes());

    let mut r = w.as_slice();
    assert_eq!(PrunableString::read_from_ext(&mut r).unwrap(), None);

    let mut w = Vec::new();
    PrunableString::write_to_ext(&mut w, &Some(String::new())).unwrap();
    assert_eq!(w, [0x00, 0x00]);
    let mut r = w.as_slice();
    assert_eq!(
        PrunableString::read_from_ext(&mut r).unwrap(),
        Some(String::new())
    );
}

#[test]
fn plain_string_rejects_pruned_marker() {
    let mut r: &[u8] = &PRUNED_STRING_MARKER.to_be_bytes();
    assert!(matches!(
        String::read_from(&mut r),
        Err(ReadStringError::UnexpectedPrunedMarker)
    ));
}
