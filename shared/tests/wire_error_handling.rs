/// Tests for wire parsing error handling
/// Covers malformed, truncated and hostile packet bytes: everything off
/// the network must surface a typed error, never a panic.

use realm_shared::{
    frame_packet, parse_frame, ByteReader, DataFrame, PacketType, SerdeErr, StandardHeader,
};

#[test]
fn empty_buffer_is_an_error() {
    let result = parse_frame(&[]);
    assert!(matches!(result, Err(SerdeErr::UnexpectedEnd { .. })));
}

#[test]
fn length_prefix_beyond_buffer_is_an_error() {
    // claims 1000 bytes of remainder, provides 2
    let bytes = [0x00u8, 0x00, 0x03, 0xE8, 0x01, 0x02];
    let result = parse_frame(&bytes);
    assert!(matches!(result, Err(SerdeErr::BadLength { length: 1000, .. })));
}

#[test]
fn unknown_packet_type_is_an_error() {
    let header = StandardHeader::new(PacketType::Data, 1, 0);
    let mut framed = frame_packet(&header, b"body");
    // corrupt the 2-byte type code right after the length prefix
    framed[4] = 0xFF;
    framed[5] = 0xFF;

    let result = parse_frame(&framed);
    assert!(matches!(
        result,
        Err(SerdeErr::UnknownDiscriminant {
            type_name: "PacketType",
            ..
        })
    ));
}

#[test]
fn truncated_data_frame_is_an_error() {
    let frame = DataFrame {
        delta: false,
        reliability: realm_shared::Reliability::Reliable,
        stream: 1,
        message_index: 0,
        payload: b"payload".to_vec(),
    };
    let bytes = frame.to_bytes();

    for cut in 1..bytes.len() {
        let mut reader = ByteReader::new(&bytes[..cut]);
        assert!(
            DataFrame::de(&mut reader).is_err(),
            "cut at {cut} must not parse"
        );
    }
}

#[test]
fn hostile_reliability_code_is_an_error() {
    let frame = DataFrame {
        delta: false,
        reliability: realm_shared::Reliability::Unreliable,
        stream: 1,
        message_index: 0,
        payload: Vec::new(),
    };
    let mut bytes = frame.to_bytes();
    bytes[1] = 0x77; // invalid reliability discriminant

    let mut reader = ByteReader::new(&bytes);
    assert!(matches!(
        DataFrame::de(&mut reader),
        Err(SerdeErr::UnknownDiscriminant {
            type_name: "Reliability",
            ..
        })
    ));
}
