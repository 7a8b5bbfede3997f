//! Codec tests: decoding known payloads, bit-exact re-encoding, and decode/encode failures.

use aisdsl::bits::BitError;
use aisdsl::schema::{schema, zero_struct};
use aisdsl::sentence::dearmor;
use aisdsl::{Codec, CodecConfig, CodecError, Header, Message, MessageKind, Record, Value};
use proptest::prelude::*;
use proptest::strategy::Union;

const POSITION_REPORT: &str = "10bb7q@P0lPGHlVMhbl0Qgw>2>`<";

fn armored(text: &str, fill: usize) -> Vec<u8> {
    dearmor(text.as_bytes(), fill).expect("valid armor")
}

fn bits(s: &str) -> Vec<u8> {
    s.bytes().filter(|b| *b == b'0' || *b == b'1').map(|b| b - b'0').collect()
}

fn set_valid(message: &mut Message, field: &str) {
    message
        .get_mut(field)
        .and_then(Value::as_record_mut)
        .unwrap_or_else(|| panic!("{} is not a struct", field))
        .valid = true;
}

fn set_all_valid(message: &mut Message, field: &str) {
    for item in message.get_mut(field).and_then(Value::as_list_mut).expect("list") {
        item.as_record_mut().expect("struct").valid = true;
    }
}

/// A message of `kind` with every mandatory sub-record filled in.
fn sample(kind: MessageKind) -> Message {
    let mut m = Message::new(kind, Header::new(kind.ids()[0], 1337));
    match kind {
        MessageKind::AddressedBinaryMessage | MessageKind::BinaryBroadcastMessage => {
            set_valid(&mut m, "application_id")
        }
        MessageKind::BinaryAcknowledge => set_all_valid(&mut m, "destinations"),
        MessageKind::AssignedModeCommand => set_all_valid(&mut m, "commands"),
        MessageKind::DataLinkManagementMessage => set_all_valid(&mut m, "data"),
        MessageKind::Interrogation => {
            set_valid(&mut m, "station1_msg1");
            set_valid(&mut m, "station1_msg2");
            set_valid(&mut m, "station2");
            let msg2 = m.get_mut("station1_msg2").and_then(Value::as_record_mut).expect("struct");
            msg2.set("message_id", Value::Uint(3));
        }
        MessageKind::StaticDataReport => set_valid(&mut m, "report_a"),
        _ => {}
    }
    m
}

#[test]
fn decode_position_report() {
    let codec = Codec::default();
    let m = codec.decode_packet(&armored(POSITION_REPORT, 0)).expect("decode");
    assert_eq!(m.kind, MessageKind::PositionReport);
    assert!(m.is_valid());
    assert_eq!(
        m.header(),
        Header {
            message_id: 1,
            repeat_indicator: 0,
            user_id: 44730341
        }
    );
    let r = &m.record;
    assert_eq!(r.uint("navigational_status"), Some(0));
    assert_eq!(r.int("rate_of_turn"), Some(-128));
    assert_eq!(r.float("sog"), Some(5.2));
    assert_eq!(r.flag("position_accuracy"), Some(true));
    assert_eq!(r.float("longitude"), Some(3065491.0 / 600000.0));
    assert_eq!(r.float("latitude"), Some(31206096.0 / 600000.0));
    assert_eq!(r.float("cog"), Some(13.4));
    assert_eq!(r.uint("true_heading"), Some(511));
    assert_eq!(r.uint("timestamp"), Some(39));
    assert_eq!(r.flag("raim"), Some(true));
    assert_eq!(r.record("communication_state").and_then(|c| c.uint("state")), Some(59916));
}

#[test]
fn decode_without_float_conversion_keeps_raw_values() {
    let codec = Codec::new(CodecConfig::new().float_without_conversion(true));
    let m = codec.decode_packet(&armored(POSITION_REPORT, 0)).expect("decode");
    assert_eq!(m.record.float("sog"), Some(52.0));
    assert_eq!(m.record.float("longitude"), Some(3065491.0));
}

#[test]
fn reencode_is_bit_exact() {
    let payload = armored(POSITION_REPORT, 0);
    for config in [CodecConfig::new(), CodecConfig::new().float_without_conversion(true)] {
        let codec = Codec::new(config);
        let m = codec.decode_packet(&payload).expect("decode");
        assert_eq!(codec.encode_packet(&m).expect("encode"), payload);
    }
}

#[test]
fn round_trip_every_kind() {
    let codec = Codec::new(CodecConfig::new().float_without_conversion(true));
    for kind in MessageKind::ALL {
        let m = sample(kind);
        let encoded = codec
            .encode_packet(&m)
            .unwrap_or_else(|e| panic!("{}: {}", kind, e));
        assert_eq!(encoded.len() % 8, 0, "{}", kind);
        let decoded = codec
            .decode_packet(&encoded)
            .unwrap_or_else(|e| panic!("{}: {}", kind, e));
        assert_eq!(decoded, m, "{}", kind);
    }
}

#[test]
fn round_trip_every_message_id() {
    let codec = Codec::default();
    for id in 1..=27u8 {
        let kind = MessageKind::from_id(id).expect("kind");
        let mut m = sample(kind);
        m.set_header(Header::new(id, 987654321));
        let decoded = codec.decode_packet(&codec.encode_packet(&m).expect("encode")).expect("decode");
        assert_eq!(decoded.kind, kind);
        assert_eq!(decoded.message_id(), id);
        assert_eq!(decoded.header().user_id, 987654321);
    }
}

#[test]
fn float_fields_survive_conversion() {
    let codec = Codec::new(CodecConfig::new().strict_byte_alignment(true).check_fixed_values(true));
    let mut m = Message::new(MessageKind::PositionReport, Header::new(2, 1337));
    m.set("longitude", Value::Float(12.345));
    m.set("latitude", Value::Float(1.2345));
    m.set("cog", Value::Float(123.2));
    let decoded = codec.decode_packet(&codec.encode_packet(&m).expect("encode")).expect("decode");
    for field in ["longitude", "latitude", "cog"] {
        let a = m.record.float(field).expect("float");
        let b = decoded.record.float(field).expect("float");
        assert!((a - b).abs() < 0.001, "{}: {} vs {}", field, a, b);
    }
}

#[test]
fn tenths_are_read_unsigned() {
    let raw = Codec::new(CodecConfig::new().float_without_conversion(true));
    let mut m = Message::new(MessageKind::PositionReport, Header::new(1, 1337));
    m.set("sog", Value::Float(1023.0));
    let encoded = raw.encode_packet(&m).expect("encode");
    assert_eq!(&encoded[50..60], &[1; 10]);
    let decoded = Codec::default().decode_packet(&encoded).expect("decode");
    assert_eq!(decoded.record.float("sog"), Some(102.3));
}

#[test]
fn rest_fields_take_the_remaining_bits() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::SafetyBroadcastMessage, Header::new(14, 1337));
    m.set("text", Value::Text("HELLO WORLD".to_string()));
    let encoded = codec.encode_packet(&m).expect("encode");
    assert_eq!(encoded.len(), 40 + 66 + 6);
    let decoded = codec.decode_packet(&encoded).expect("decode");
    // The byte padding decodes as one `@` and is stripped.
    assert_eq!(decoded.record.text("text"), Some("HELLO WORLD"));
}

#[test]
fn multi_slot_binary_message_keeps_trailing_fields() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::MultiSlotBinaryMessage, Header::new(26, 1));
    m.set("payload", Value::Bits(vec![1; 16]));
    let mut state = Record::new(true);
    state.set("is_itdma", Value::Bool(true));
    state.set("state", Value::Uint(0x1234));
    m.set("communication_state", Value::Struct(state.clone()));
    let decoded = codec.decode_packet(&codec.encode_packet(&m).expect("encode")).expect("decode");
    assert_eq!(decoded.record.get("payload"), Some(&Value::Bits(vec![1; 16])));
    assert_eq!(decoded.record.record("communication_state"), Some(&state));
}

#[test]
fn encode_fails_when_too_long() {
    let codec = Codec::default();
    let with_payload = |n: usize| {
        let mut m = Message::new(MessageKind::SingleSlotBinaryMessage, Header::new(25, 1337));
        m.set("payload", Value::Bits(vec![0; n]));
        codec.encode_packet(&m)
    };
    assert!(matches!(with_payload(129), Err(CodecError::TooLong { len: 169, max: 168, .. })));
    assert_eq!(with_payload(128).expect("encode").len(), 168);
}

#[test]
fn encode_fails_on_illegal_character() {
    let codec = Codec::default();
    let with_text = |s: &str| {
        let mut m = Message::new(MessageKind::SafetyBroadcastMessage, Header::new(14, 1337));
        m.set("text", Value::Text(s.to_string()));
        codec.encode_packet(&m)
    };
    assert!(matches!(
        with_text("ILLeGAL"),
        Err(CodecError::Field {
            source: BitError::InvalidCharacter('e'),
            ..
        })
    ));
    assert!(with_text("LEGAL").is_ok());
}

#[test]
fn encode_fails_without_useful_data() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::BinaryAcknowledge, Header::new(7, 1337));
    assert!(matches!(codec.encode_packet(&m), Err(CodecError::NotValid(_))));

    m.get_mut("destinations").and_then(Value::as_list_mut).expect("list")[0]
        .as_record_mut()
        .expect("struct")
        .valid = true;
    assert_eq!(codec.encode_packet(&m).expect("encode").len(), 72);
}

#[test]
fn encode_checks_message_id_against_kind() {
    let codec = Codec::default();
    let with_id = |id: u8| codec.encode_packet(&Message::new(MessageKind::PositionReport, Header::new(id, 1337)));
    for id in [1, 2, 3] {
        assert!(with_id(id).is_ok(), "id {}", id);
    }
    for id in [4, 0, 28] {
        assert!(matches!(with_id(id), Err(CodecError::KindMismatch { .. })), "id {}", id);
    }
}

#[test]
fn encode_fails_on_out_of_range_numbers() {
    let codec = Codec::default();
    let with_dimension_a = |a: u64| {
        let mut m = Message::new(MessageKind::ShipStaticData, Header::new(5, 1337));
        m.get_mut("dimension")
            .and_then(Value::as_record_mut)
            .expect("struct")
            .set("a", Value::Uint(a));
        codec.encode_packet(&m)
    };
    assert!(with_dimension_a(1).is_ok());
    assert!(matches!(
        with_dimension_a(65535),
        Err(CodecError::Field {
            source: BitError::OutOfRange { .. },
            ..
        })
    ));

    let mut m = Message::new(MessageKind::ShipStaticData, Header::new(5, 1337));
    m.set("maximum_static_draught", Value::Float(1000.0));
    assert!(codec.encode_packet(&m).is_err());
}

#[test]
fn encode_rejects_invalid_message() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::PositionReport, Header::new(1, 1));
    m.record.valid = false;
    assert!(matches!(codec.encode_packet(&m), Err(CodecError::NotValid(_))));
}

#[test]
fn decode_fails_without_message_id() {
    let codec = Codec::default();
    assert_eq!(codec.decode_packet(&bits("0101")), Err(CodecError::NoMessageId(4)));
    assert_eq!(codec.decode_packet(&bits("000000")), Err(CodecError::UnknownMessage(0)));
}

#[test]
fn decode_strict_alignment() {
    let mut data = bits("001010011001011110100011010100000010010001000001001010100000100001010000");
    let codec = Codec::new(CodecConfig::new().strict_byte_alignment(true));
    assert_eq!(codec.decode_packet(&data).expect("decode").kind, MessageKind::CoordinatedUtcInquiry);
    data.push(0);
    assert_eq!(codec.decode_packet(&data), Err(CodecError::Misaligned(73)));
}

#[test]
fn decode_fails_when_dependency_bit_missing() {
    let mut data = bits(
        "010110000000000010001000110010000110000010000010011110000010100000000011010100000111000011010101\
         010010000110101000001110000110101010100100000010000000000000000000000000",
    );
    let codec = Codec::default();
    let m = codec.decode_packet(&data).expect("decode");
    assert_eq!(m.kind, MessageKind::ChannelManagement);
    data.truncate(139);
    assert!(matches!(
        codec.decode_packet(&data),
        Err(CodecError::DependencyOutOfRange { bit: 139, len: 139, .. })
    ));
}

#[test]
fn decode_fails_on_truncated_payload() {
    let codec = Codec::default();
    let mut data = armored(POSITION_REPORT, 0);
    data.truncate(100);
    assert!(matches!(codec.decode_packet(&data), Err(CodecError::Truncated { .. })));
}

#[test]
fn reserved_bit_checked_on_request() {
    let codec = Codec::default();
    let strict = Codec::new(CodecConfig::new().check_fixed_values(true));
    let mut m = sample(MessageKind::StaticDataReport);
    m.get_mut("report_a")
        .and_then(Value::as_record_mut)
        .expect("struct")
        .set("name", Value::Text("VESSEL".to_string()));
    let mut data = codec.encode_packet(&m).expect("encode");
    assert!(strict.decode_packet(&data).is_ok());
    data[38] = 1;
    let decoded = codec.decode_packet(&data).expect("decode");
    assert_eq!(decoded.record.uint("reserved"), Some(1));
    assert!(matches!(
        strict.decode_packet(&data),
        Err(CodecError::FixedValueMismatch { expected: 0, found: 1, .. })
    ));
}

/// Real-world 24B report with the reserved bit set.
#[test]
fn static_data_report_b_with_reserved_bit() {
    let data = armored("HTRBMh>T<wwFj443@24?pJKt00p0", 0);
    let m = Codec::default().decode_packet(&data).expect("decode");
    assert_eq!(m.kind, MessageKind::StaticDataReport);
    assert_eq!(
        m.header(),
        Header {
            message_id: 24,
            repeat_indicator: 2,
            user_id: 304389568
        }
    );
    assert_eq!(m.record.uint("reserved"), Some(1));
    assert_eq!(m.record.flag("part_number"), Some(true));
    assert!(!m.record.record("report_a").expect("report a").valid);
    let b = m.record.record("report_b").expect("report b");
    assert!(b.valid);
    assert_eq!(b.uint("ship_type"), Some(164));
    assert_eq!(b.uint("vendor_id_model"), Some(5));
    assert_eq!(b.uint("vendor_id_serial"), Some(729348));
    assert_eq!(b.text("call_sign"), Some("CPBDO8Z"));

    let strict = Codec::new(CodecConfig::new().check_fixed_values(true));
    assert!(matches!(
        strict.decode_packet(&data),
        Err(CodecError::FixedValueMismatch { expected: 0, found: 1, .. })
    ));
}

#[test]
fn spare_bits_checked_on_request() {
    let mut data = armored(POSITION_REPORT, 0);
    data[145] = 1;
    assert!(Codec::default().decode_packet(&data).is_ok());
    let strict = Codec::new(CodecConfig::new().check_fixed_values(true));
    assert!(matches!(strict.decode_packet(&data), Err(CodecError::FixedValueMismatch { .. })));
}

#[test]
fn short_ship_static_data_accepted_on_request() {
    let codec = Codec::default();
    let mut data = codec.encode_packet(&sample(MessageKind::ShipStaticData)).expect("encode");
    assert_eq!(data.len(), 424);
    data.truncate(420);
    assert!(matches!(codec.decode_packet(&data), Err(CodecError::Truncated { .. })));
    let lenient = Codec::new(CodecConfig::new().accept_short_ship_static_data(true));
    assert!(lenient.decode_packet(&data).expect("decode").is_valid());
}

#[test]
fn short_acknowledge_entries_accepted_on_request() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::BinaryAcknowledge, Header::new(7, 1337));
    m.get_mut("destinations").and_then(Value::as_list_mut).expect("list")[0]
        .as_record_mut()
        .expect("struct")
        .valid = true;
    let mut data = codec.encode_packet(&m).expect("encode");
    data.extend([0; 8]);

    let valid = |m: &Message| -> Vec<bool> {
        m.record
            .list("destinations")
            .expect("list")
            .iter()
            .map(|v| v.as_record().expect("struct").valid)
            .collect()
    };
    let decoded = codec.decode_packet(&data).expect("decode");
    assert_eq!(valid(&decoded), vec![true, false, false, false]);
    let lenient = Codec::new(CodecConfig::new().accept_short_ack(true));
    let decoded = lenient.decode_packet(&data).expect("decode");
    assert_eq!(valid(&decoded), vec![true, true, false, false]);
}

#[test]
fn interrogation_of_station2_only() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::Interrogation, Header::new(15, 1337));
    set_valid(&mut m, "station1_msg1");
    set_valid(&mut m, "station2");
    let data = codec.encode_packet(&m).expect("encode");
    assert_eq!(data.len(), 160);

    let decoded = codec.decode_packet(&data).expect("decode");
    assert!(!decoded.record.record("station1_msg2").expect("struct").valid);
    assert!(decoded.record.record("station2").expect("struct").valid);
}

#[test]
fn interrogation_of_station1_only() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::Interrogation, Header::new(15, 1337));
    set_valid(&mut m, "station1_msg1");
    let data = codec.encode_packet(&m).expect("encode");
    assert_eq!(data.len(), 88);
    let decoded = codec.decode_packet(&data).expect("decode");
    assert!(decoded.record.record("station1_msg1").expect("struct").valid);
    assert!(!decoded.record.record("station1_msg2").expect("struct").valid);
    assert!(!decoded.record.record("station2").expect("struct").valid);
}

#[test]
fn channel_management_dependency() {
    let codec = Codec::default();
    let mut m = Message::new(MessageKind::ChannelManagement, Header::new(22, 1337));
    m.set("is_addressed", Value::Bool(true));
    m.get_mut("unicast")
        .and_then(Value::as_record_mut)
        .expect("struct")
        .set("address_station1", Value::Uint(244123456));
    let data = codec.encode_packet(&m).expect("encode");
    assert_eq!(data.len(), 168);
    assert_eq!(data[139], 1);
    let decoded = codec.decode_packet(&data).expect("decode");
    assert_eq!(
        decoded.record.record("unicast").and_then(|u| u.uint("address_station1")),
        Some(244123456)
    );
}

/// Off-air payloads with their fill bits, message id and MMSI.
const OFF_AIR: &[(&str, usize, u8, u32)] = &[
    ("13u?etPv2;0n:dDPwUM1U1Cb069D", 0, 1, 265547250),
    ("25Cjtd0Oj;Jp7ilG7=UkKBoB0<06", 0, 2, 356302000),
    ("38Id705000rRVJhE7cl9n;160000", 0, 3, 563808000),
    ("403OviQuMGCqWrRO9>E6fE700@GO", 0, 4, 3669702),
    (
        "55?MbV02;H;s<HtKR20EHE:0@T4@Dn2222222216L961O5Gf0NSQEp6ClRp888888888880",
        2,
        5,
        351759000,
    ),
    ("6B?n;be:cbapalgc;i6?Ow4", 2, 6, 150834090),
    ("702R5`hwCjq8", 0, 7, 2655651),
    ("85Mwp`1Kf3aCnsNvBWLi=wQuNhA5t43N`5nCuI=p<IBfVqnMgPGs", 0, 8, 366999712),
    ("91b55wi;hbOS@OdQAC062Ch2089h", 0, 9, 111232511),
    (":5MlU41GMK6@", 0, 10, 366814480),
    (";4R33:1uUK2F`q?mOt@@GoQ00000", 0, 11, 304137000),
    ("<5?SIj1;GbD07??4", 0, 12, 351853000),
    ("=39UOj0jFs9R", 0, 13, 211378120),
    (">5?Per18=HB1U:1@E=B0m<L", 2, 14, 351809000),
    ("?5OP=l00052HD00", 2, 15, 368578000),
    ("@01uEO@mMk7P<P00", 0, 16, 2053501),
    (
        "A02VqLPA4I6C07h5Ed1h<OrsuBTTwS?r:C?w`?la<gno1RTRwSP9:BcurA8a:Oko02TSwu8<:Jbb",
        0,
        17,
        2734450,
    ),
    ("B52K>;h00Fc>jpUlNV@ikwpUoP06", 0, 18, 338087471),
    ("C69DqeP0Ar8;JH3R6<4O7wWPl@:62L>jcaQgh0000000?104222P", 0, 19, 412432822),
    ("Dh3OvjB8IN>4", 0, 20, 3669705),
    ("E>jHC=c6:W2h22R`@1:WdP00000Opa@H?KTcP00003v010", 4, 21, 992351030),
    ("F030p:j2N2P5aJR0r;6f3rj10000", 0, 22, 3160107),
    ("H42O55i18tMET00000000000000", 2, 24, 271041815),
    ("H42O55lti4hhhilD3nink000?050", 0, 24, 271041815),
    ("I6SWo?<P00a00;Cwwwwwwwwwwww0", 0, 25, 440006460),
    ("I8IRGB40QPPa0:<HP::V=gwv0l48", 0, 25, 563648328),
    ("J0@00@370>t0Lh3P0000200H:2rN92", 4, 26, 16777280),
    ("K5DfMB9FLsM?P00d", 0, 27, 357277000),
];

#[test]
fn off_air_payloads_reencode_bit_exact() {
    let codec = Codec::new(CodecConfig::new().float_without_conversion(true));
    for &(text, fill, id, user_id) in OFF_AIR {
        let payload = armored(text, fill);
        let m = codec.decode_packet(&payload).unwrap_or_else(|e| panic!("{}: {}", text, e));
        assert_eq!(m.message_id(), id, "{}", text);
        assert_eq!(m.header().user_id, user_id, "{}", text);
        let encoded = codec.encode_packet(&m).unwrap_or_else(|e| panic!("{}: {}", text, e));
        assert_eq!(encoded, payload, "{}", text);
    }

    // Every id except 23, whose widely circulated sample is cut short.
    let mut ids: Vec<u8> = OFF_AIR.iter().map(|v| v.2).collect();
    ids.dedup();
    assert_eq!(ids, (1..=27).filter(|id| *id != 23).collect::<Vec<u8>>());
}

#[test]
fn off_air_field_values() {
    let codec = Codec::new(CodecConfig::new().float_without_conversion(true));
    let decode = |text: &str, fill: usize| codec.decode_packet(&armored(text, fill)).expect("decode");

    let m = decode("25Cjtd0Oj;Jp7ilG7=UkKBoB0<06", 0);
    assert_eq!(m.record.int("rate_of_turn"), Some(127));
    assert_eq!(m.record.float("longitude"), Some(-42975686.0));
    assert_eq!(m.record.float("cog"), Some(877.0));

    let m = decode(
        "55?MbV02;H;s<HtKR20EHE:0@T4@Dn2222222216L961O5Gf0NSQEp6ClRp888888888880",
        2,
    );
    assert_eq!(m.record.uint("imo_number"), Some(9134270));
    assert_eq!(m.record.text("call_sign"), Some("3FOF8  "));
    assert_eq!(m.record.text("name"), Some("EVER DIADEM         "));
    assert_eq!(m.record.text("destination"), Some("NEW YORK            "));
    assert_eq!(m.record.float("maximum_static_draught"), Some(122.0));

    let m = decode(">5?Per18=HB1U:1@E=B0m<L", 2);
    assert_eq!(m.record.text("text"), Some("RCVD YR TEST MSG"));

    let m = decode("E>jHC=c6:W2h22R`@1:WdP00000Opa@H?KTcP00003v010", 4);
    assert_eq!(m.record.text("name"), Some("LUNE DEEP BUOY"));
    assert_eq!(m.record.flag("virtual_aton"), Some(true));

    let m = decode("I8IRGB40QPPa0:<HP::V=gwv0l48", 0);
    assert_eq!(m.record.flag("destination_id_valid"), Some(false));
    assert!(m.record.record("application_id").expect("struct").valid);

    let m = decode("K5DfMB9FLsM?P00d", 0);
    assert_eq!(m.record.uint("navigational_status"), Some(5));
    assert_eq!(m.record.float("latitude"), Some(-22592.0));

    let spaced = Codec::new(CodecConfig::new().drop_space(true));
    let m = spaced
        .decode_packet(&armored(
            "55?MbV02;H;s<HtKR20EHE:0@T4@Dn2222222216L961O5Gf0NSQEp6ClRp888888888880",
            2,
        ))
        .expect("decode");
    assert_eq!(m.record.text("name"), Some("EVER DIADEM"));
}

#[test]
fn short_group_assignment_is_truncated() {
    let codec = Codec::default();
    assert_eq!(
        codec.decode_packet(&armored("G02:Kn01R`sn@291nj600000", 0)),
        Err(CodecError::Truncated {
            name: "GroupAssignmentCommand".to_string(),
            available: 144,
            required: 160,
        })
    );
}

type FieldStrategies = Vec<(&'static str, BoxedStrategy<Value>)>;

fn any_uint(width: u32) -> BoxedStrategy<Value> {
    (0u64..1 << width).prop_map(Value::Uint).boxed()
}

fn any_int(width: u32) -> BoxedStrategy<Value> {
    let half = 1i64 << (width - 1);
    (-half..half).prop_map(Value::Int).boxed()
}

fn any_flag() -> BoxedStrategy<Value> {
    any::<bool>().prop_map(Value::Bool).boxed()
}

/// Raw scaled value, as kept with float conversion disabled.
fn any_raw(width: u32, signed: bool) -> BoxedStrategy<Value> {
    let range = if signed {
        -(1i64 << (width - 1))..1i64 << (width - 1)
    } else {
        0..1i64 << width
    };
    range.prop_map(|v| Value::Float(v as f64)).boxed()
}

fn any_text(max_chars: usize) -> BoxedStrategy<Value> {
    proptest::string::string_regex(&format!("[A-Z0-9 ,.-]{{0,{}}}", max_chars))
        .expect("regex")
        .prop_map(Value::Text)
        .boxed()
}

/// Whole bytes, so that the payload needs no padding.
fn any_bytes(max_bytes: usize) -> BoxedStrategy<Value> {
    (0..=max_bytes)
        .prop_flat_map(|n| proptest::collection::vec(0u8..=1, n * 8))
        .prop_map(Value::Bits)
        .boxed()
}

fn values(spec: FieldStrategies) -> BoxedStrategy<Vec<(&'static str, Value)>> {
    let (names, strategies): (Vec<_>, Vec<_>) = spec.into_iter().unzip();
    strategies
        .prop_map(move |values| names.iter().copied().zip(values).collect())
        .boxed()
}

/// A valid struct of layout `name` with the given fields populated.
fn nested(name: &'static str, spec: FieldStrategies) -> BoxedStrategy<Value> {
    values(spec)
        .prop_map(move |values| {
            let mut record = zero_struct(schema(), name);
            record.valid = true;
            for (field, value) in values {
                record.set(field, value);
            }
            Value::Struct(record)
        })
        .boxed()
}

/// Between one and `count` valid entries followed by empty ones.
fn list(name: &'static str, count: usize, item: fn() -> FieldStrategies) -> BoxedStrategy<Value> {
    (1..=count)
        .prop_flat_map(move |k| proptest::collection::vec(nested(name, item()), k))
        .prop_map(move |mut items| {
            items.resize_with(count, || Value::Struct(zero_struct(schema(), name)));
            Value::List(items)
        })
        .boxed()
}

fn message(kind: MessageKind, spec: FieldStrategies) -> BoxedStrategy<Message> {
    let header = (proptest::sample::select(kind.ids()), 0u8..4, 0u32..1 << 30).prop_map(
        |(message_id, repeat_indicator, user_id)| Header {
            message_id,
            repeat_indicator,
            user_id,
        },
    );
    (header, values(spec))
        .prop_map(move |(header, values)| {
            let mut m = Message::new(kind, header);
            for (field, value) in values {
                m.set(field, value);
            }
            m
        })
        .boxed()
}

fn dimension() -> BoxedStrategy<Value> {
    nested(
        "Dimension",
        vec![("a", any_uint(9)), ("b", any_uint(9)), ("c", any_uint(6)), ("d", any_uint(6))],
    )
}

fn application_id() -> BoxedStrategy<Value> {
    nested(
        "ApplicationId",
        vec![("designated_area_code", any_uint(10)), ("function_identifier", any_uint(6))],
    )
}

fn itdma() -> BoxedStrategy<Value> {
    nested("CommunicationStateItdma", vec![("is_itdma", any_flag()), ("state", any_uint(19))])
}

fn position_fix() -> FieldStrategies {
    vec![
        ("position_accuracy", any_flag()),
        ("longitude", any_raw(28, true)),
        ("latitude", any_raw(27, true)),
    ]
}

fn position_report() -> BoxedStrategy<Message> {
    let mut spec = vec![
        ("navigational_status", any_uint(4)),
        ("rate_of_turn", any_int(8)),
        ("sog", any_raw(10, false)),
        ("cog", any_raw(12, false)),
        ("true_heading", any_uint(9)),
        ("timestamp", any_uint(6)),
        ("special_manoeuvre_indicator", any_uint(2)),
        ("raim", any_flag()),
        ("communication_state", nested("CommunicationState", vec![("state", any_uint(19))])),
    ];
    spec.extend(position_fix());
    message(MessageKind::PositionReport, spec)
}

fn base_station_report() -> BoxedStrategy<Message> {
    let mut spec = vec![
        ("utc_year", any_uint(14)),
        ("utc_month", any_uint(4)),
        ("utc_day", any_uint(5)),
        ("utc_hour", any_uint(5)),
        ("utc_minute", any_uint(6)),
        ("utc_second", any_uint(6)),
        ("fix_type", any_uint(4)),
        ("long_range_enable", any_flag()),
        ("raim", any_flag()),
    ];
    spec.extend(position_fix());
    message(MessageKind::BaseStationReport, spec)
}

fn ship_static_data() -> BoxedStrategy<Message> {
    message(
        MessageKind::ShipStaticData,
        vec![
            ("ais_version", any_uint(2)),
            ("imo_number", any_uint(30)),
            ("call_sign", any_text(7)),
            ("name", any_text(20)),
            ("ship_type", any_uint(8)),
            ("dimension", dimension()),
            ("fix_type", any_uint(4)),
            (
                "eta",
                nested(
                    "Eta",
                    vec![
                        ("month", any_uint(4)),
                        ("day", any_uint(5)),
                        ("hour", any_uint(5)),
                        ("minute", any_uint(6)),
                    ],
                ),
            ),
            ("maximum_static_draught", any_raw(8, false)),
            ("destination", any_text(20)),
            ("dte", any_flag()),
        ],
    )
}

fn addressed_binary_message() -> BoxedStrategy<Message> {
    message(
        MessageKind::AddressedBinaryMessage,
        vec![
            ("sequence_number", any_uint(2)),
            ("destination_id", any_uint(30)),
            ("retransmission", any_flag()),
            ("application_id", application_id()),
            ("binary_data", any_bytes(60)),
        ],
    )
}

fn binary_acknowledge() -> BoxedStrategy<Message> {
    message(
        MessageKind::BinaryAcknowledge,
        vec![(
            "destinations",
            list("BinaryAcknowledgeData", 4, || {
                vec![("destination_id", any_uint(30)), ("sequence_number", any_uint(2))]
            }),
        )],
    )
}

fn binary_broadcast_message() -> BoxedStrategy<Message> {
    message(
        MessageKind::BinaryBroadcastMessage,
        vec![("application_id", application_id()), ("binary_data", any_bytes(100))],
    )
}

fn search_and_rescue_aircraft_report() -> BoxedStrategy<Message> {
    let mut spec = vec![
        ("altitude", any_uint(12)),
        ("sog", any_uint(10)),
        ("cog", any_raw(12, false)),
        ("timestamp", any_uint(6)),
        ("alt_from_baro", any_flag()),
        ("dte", any_flag()),
        ("assigned_mode", any_flag()),
        ("raim", any_flag()),
        ("communication_state", itdma()),
    ];
    spec.extend(position_fix());
    message(MessageKind::StandardSearchAndRescueAircraftReport, spec)
}

fn safety_broadcast_message() -> BoxedStrategy<Message> {
    message(MessageKind::SafetyBroadcastMessage, vec![("text", any_text(80))])
}

fn interrogation() -> BoxedStrategy<Message> {
    let msg1 = nested(
        "InterrogationStation1Message1",
        vec![("station_id", any_uint(30)), ("message_id", any_uint(6)), ("slot_offset", any_uint(12))],
    );
    // A zero second request next to station 2 reads back as absent.
    let msg2 = nested(
        "InterrogationStation1Message2",
        vec![
            ("message_id", (1u64..64).prop_map(Value::Uint).boxed()),
            ("slot_offset", any_uint(12)),
        ],
    );
    let station2 = nested(
        "InterrogationStation2",
        vec![("station_id", any_uint(30)), ("message_id", any_uint(6)), ("slot_offset", any_uint(12))],
    );
    (
        message(MessageKind::Interrogation, vec![("station1_msg1", msg1)]),
        proptest::option::of(msg2),
        proptest::option::of(station2),
    )
        .prop_map(|(mut m, msg2, station2)| {
            if let Some(v) = msg2 {
                m.set("station1_msg2", v);
            }
            if let Some(v) = station2 {
                m.set("station2", v);
            }
            m
        })
        .boxed()
}

fn assigned_mode_command() -> BoxedStrategy<Message> {
    message(
        MessageKind::AssignedModeCommand,
        vec![(
            "commands",
            list("AssignedModeCommandData", 2, || {
                vec![
                    ("destination_id", any_uint(30)),
                    ("offset", any_uint(12)),
                    ("increment", any_uint(10)),
                ]
            }),
        )],
    )
}

fn gnss_broadcast_binary_message() -> BoxedStrategy<Message> {
    message(
        MessageKind::GnssBroadcastBinaryMessage,
        vec![
            ("longitude", any_raw(18, true)),
            ("latitude", any_raw(17, true)),
            ("data", any_bytes(90)),
        ],
    )
}

fn extended_class_b_position_report() -> BoxedStrategy<Message> {
    let mut spec = vec![
        ("sog", any_raw(10, false)),
        ("cog", any_raw(12, false)),
        ("true_heading", any_uint(9)),
        ("timestamp", any_uint(6)),
        ("name", any_text(20)),
        ("ship_type", any_uint(8)),
        ("dimension", dimension()),
        ("fix_type", any_uint(4)),
        ("raim", any_flag()),
        ("dte", any_flag()),
        ("assigned_mode", any_flag()),
    ];
    spec.extend(position_fix());
    message(MessageKind::ExtendedClassBPositionReport, spec)
}

fn data_link_management_message() -> BoxedStrategy<Message> {
    message(
        MessageKind::DataLinkManagementMessage,
        vec![(
            "data",
            list("DataLinkManagementData", 4, || {
                vec![
                    ("offset", any_uint(12)),
                    ("number_of_slots", any_uint(4)),
                    ("time_out", any_uint(3)),
                    ("increment", any_uint(11)),
                ]
            }),
        )],
    )
}

fn aids_to_navigation_report() -> BoxedStrategy<Message> {
    let mut spec = vec![
        ("aid_type", any_uint(5)),
        ("name", any_text(20)),
        ("dimension", dimension()),
        ("fix_type", any_uint(4)),
        ("timestamp", any_uint(6)),
        ("off_position", any_flag()),
        ("aton_status", any_uint(8)),
        ("raim", any_flag()),
        ("virtual_aton", any_flag()),
        ("assigned_mode", any_flag()),
        ("name_extension", any_text(14)),
    ];
    spec.extend(position_fix());
    message(MessageKind::AidsToNavigationReport, spec)
}

fn channel_management() -> BoxedStrategy<Message> {
    let base = message(
        MessageKind::ChannelManagement,
        vec![
            ("channel_a", any_uint(12)),
            ("channel_b", any_uint(12)),
            ("tx_rx_mode", any_uint(4)),
            ("low_power", any_flag()),
            ("bw_a", any_flag()),
            ("bw_b", any_flag()),
            ("transitional_zone_size", any_uint(3)),
        ],
    );
    let area = nested(
        "ChannelManagementArea",
        vec![
            ("longitude1", any_raw(18, true)),
            ("latitude1", any_raw(17, true)),
            ("longitude2", any_raw(18, true)),
            ("latitude2", any_raw(17, true)),
        ],
    );
    let unicast = nested(
        "ChannelManagementUnicast",
        vec![("address_station1", any_uint(30)), ("address_station2", any_uint(30))],
    );
    (base, any::<bool>(), area, unicast)
        .prop_map(|(mut m, addressed, area, unicast)| {
            m.set("is_addressed", Value::Bool(addressed));
            if addressed {
                m.set("unicast", unicast);
            } else {
                m.set("area", area);
            }
            m
        })
        .boxed()
}

fn group_assignment_command() -> BoxedStrategy<Message> {
    message(
        MessageKind::GroupAssignmentCommand,
        vec![
            ("longitude1", any_raw(18, true)),
            ("latitude1", any_raw(17, true)),
            ("longitude2", any_raw(18, true)),
            ("latitude2", any_raw(17, true)),
            ("station_type", any_uint(4)),
            ("ship_type", any_uint(8)),
            ("tx_rx_mode", any_uint(2)),
            ("reporting_interval", any_uint(4)),
            ("quiet_time", any_uint(4)),
        ],
    )
}

fn static_data_report() -> BoxedStrategy<Message> {
    let report_a = nested("StaticDataReportA", vec![("name", any_text(20))]);
    let report_b = nested(
        "StaticDataReportB",
        vec![
            ("ship_type", any_uint(8)),
            ("vendor_id_name", any_text(3)),
            ("vendor_id_model", any_uint(4)),
            ("vendor_id_serial", any_uint(20)),
            ("call_sign", any_text(7)),
            ("dimension", dimension()),
            ("fix_type", any_uint(4)),
        ],
    );
    (message(MessageKind::StaticDataReport, vec![]), any::<bool>(), report_a, report_b)
        .prop_map(|(mut m, part_b, report_a, report_b)| {
            m.set("part_number", Value::Bool(part_b));
            if part_b {
                m.set("report_b", report_b);
            } else {
                m.set("report_a", report_a);
            }
            m
        })
        .boxed()
}

/// Message 25 or 26 with its addressed and structured flags drawn at random.
fn slot_binary_message(kind: MessageKind, max_bytes: usize) -> BoxedStrategy<Message> {
    let mut spec = vec![("payload", any_bytes(max_bytes))];
    if kind == MessageKind::MultiSlotBinaryMessage {
        spec.push(("spare2", any_uint(4)));
        spec.push(("communication_state", itdma()));
    }
    (
        message(kind, spec),
        proptest::option::of(any_uint(30)),
        proptest::option::of(application_id()),
    )
        .prop_map(|(mut m, destination, application)| {
            m.set("destination_id_valid", Value::Bool(destination.is_some()));
            m.set("application_id_valid", Value::Bool(application.is_some()));
            if let Some(v) = destination {
                m.set("destination_id", v);
            }
            if let Some(v) = application {
                m.set("application_id", v);
            }
            m
        })
        .boxed()
}

fn long_range_broadcast() -> BoxedStrategy<Message> {
    message(
        MessageKind::LongRangeAisBroadcastMessage,
        vec![
            ("position_accuracy", any_flag()),
            ("raim", any_flag()),
            ("navigational_status", any_uint(4)),
            ("longitude", any_raw(18, true)),
            ("latitude", any_raw(17, true)),
            ("sog", any_uint(6)),
            ("cog", any_uint(9)),
            ("position_latency", any_flag()),
        ],
    )
}

fn populated() -> impl Strategy<Value = Message> {
    Union::new(vec![
        position_report(),
        base_station_report(),
        ship_static_data(),
        addressed_binary_message(),
        binary_acknowledge(),
        binary_broadcast_message(),
        search_and_rescue_aircraft_report(),
        safety_broadcast_message(),
        interrogation(),
        assigned_mode_command(),
        gnss_broadcast_binary_message(),
        extended_class_b_position_report(),
        data_link_management_message(),
        aids_to_navigation_report(),
        channel_management(),
        group_assignment_command(),
        static_data_report(),
        slot_binary_message(MessageKind::SingleSlotBinaryMessage, 10),
        slot_binary_message(MessageKind::MultiSlotBinaryMessage, 100),
        long_range_broadcast(),
    ])
}

proptest! {
    #[test]
    fn prop_populated_messages_round_trip(m in populated()) {
        let codec = Codec::new(
            CodecConfig::new()
                .float_without_conversion(true)
                .check_fixed_values(true)
                .strict_byte_alignment(true),
        );
        let encoded = codec.encode_packet(&m);
        prop_assert!(encoded.is_ok(), "{}: {:?}", m.kind, encoded);
        let encoded = encoded.unwrap_or_default();
        let decoded = codec.decode_packet(&encoded);
        prop_assert_eq!(decoded, Ok(m));
    }
}
