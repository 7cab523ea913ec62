/// Protocol conformance and decoder tests

use byteorder::{BigEndian, ByteOrder};
use itch_feed_handler::{
    DecodeError, Decoder, FrameStop, Framer, Message, MessageType, Price, Side, Symbol,
};

fn create_message(msg_type: MessageType, locate: u16, tracking: u16) -> Vec<u8> {
    let mut msg = vec![0u8; msg_type.wire_len()];
    msg[0] = msg_type as u8;
    BigEndian::write_u16(&mut msg[1..3], locate);
    BigEndian::write_u16(&mut msg[3..5], tracking);
    msg
}

fn create_add_order(tracking: u16, order_ref: u64, shares: u32, symbol: &[u8; 8], price: u32) -> Vec<u8> {
    let mut msg = create_message(MessageType::AddOrder, 1, tracking);
    BigEndian::write_u64(&mut msg[11..19], order_ref);
    msg[19] = b'B';
    BigEndian::write_u32(&mut msg[20..24], shares);
    msg[24..32].copy_from_slice(symbol);
    BigEndian::write_u32(&mut msg[32..36], price);
    msg
}

#[test]
fn test_decode_add_order_host_values() {
    let msg = create_add_order(7, 0x0102030405060708, 100, b"AAPL    ", 1_250_000);
    assert_eq!(&msg[20..24], &[0x00, 0x00, 0x00, 0x64]);

    let decoded = Decoder::decode(MessageType::AddOrder, &msg).unwrap();
    let Message::AddOrder(m) = decoded else {
        panic!("expected AddOrder, got {decoded:?}");
    };
    assert_eq!(m.header.tracking_number, 7);
    assert_eq!(m.header.stock_locate, 1);
    assert_eq!(m.order_reference_number, 0x0102030405060708);
    assert_eq!(m.shares, 100);
    assert_eq!(m.buy_sell_indicator, b'B');
    assert_eq!(m.side(), Some(Side::Buy));
    assert_eq!(m.price, Price::from_raw(1_250_000));
    assert_eq!(m.price.as_f64(), 125.0);
    assert_eq!(m.stock.as_bytes(), b"AAPL    ");
    assert_eq!(m.stock.as_str(), "AAPL");
    assert_eq!(m.stock, Symbol::new("AAPL"));
}

#[test]
fn test_decode_every_kind() {
    for msg_type in MessageType::ALL {
        let msg = create_message(msg_type, 3, 11);
        let decoded = Decoder::decode_tagged(&msg).unwrap();
        assert_eq!(decoded.message_type(), msg_type);
        assert_eq!(decoded.tracking_number(), 11);
        assert_eq!(decoded.header().stock_locate, 3);
    }
}

#[test]
fn test_catalog_lengths() {
    let expected = [
        (b'S', 12),
        (b'R', 39),
        (b'A', 36),
        (b'F', 40),
        (b'E', 31),
        (b'C', 36),
        (b'X', 23),
        (b'D', 19),
        (b'U', 35),
    ];
    for (tag, len) in expected {
        assert_eq!(itch_feed_handler::length_of(tag), Some(len), "tag {}", tag as char);
    }
    assert_eq!(itch_feed_handler::length_of(0x99), None);
    assert_eq!(itch_feed_handler::length_of(b'P'), None);
}

#[test]
fn test_timestamp_six_byte_fold() {
    let mut msg = create_message(MessageType::SystemEvent, 0, 0);
    msg[5..11].copy_from_slice(&[0x00, 0x00, 0x0B, 0xEB, 0xC2, 0x00]);
    msg[11] = b'O';
    let decoded = Decoder::decode(MessageType::SystemEvent, &msg).unwrap();
    assert_eq!(decoded.timestamp(), 200_000_000);

    msg[5..11].copy_from_slice(&[0xFF; 6]);
    let decoded = Decoder::decode(MessageType::SystemEvent, &msg).unwrap();
    assert_eq!(decoded.timestamp(), (1u64 << 48) - 1);
}

#[test]
fn test_decode_order_replace() {
    let mut msg = create_message(MessageType::OrderReplace, 2, 40);
    BigEndian::write_u64(&mut msg[11..19], 500);
    BigEndian::write_u64(&mut msg[19..27], 501);
    BigEndian::write_u32(&mut msg[27..31], 300);
    BigEndian::write_u32(&mut msg[31..35], 1_005_000);

    let Message::OrderReplace(m) = Decoder::decode_tagged(&msg).unwrap() else {
        panic!("expected OrderReplace");
    };
    assert_eq!(m.original_order_reference_number, 500);
    assert_eq!(m.new_order_reference_number, 501);
    assert_eq!(m.shares, 300);
    assert_eq!(m.price.to_string(), "100.5000");
}

#[test]
fn test_decode_add_order_with_mpid() {
    let mut msg = create_message(MessageType::AddOrderWithMpid, 9, 12);
    BigEndian::write_u64(&mut msg[11..19], 42);
    msg[19] = b'S';
    BigEndian::write_u32(&mut msg[20..24], 50);
    msg[24..32].copy_from_slice(b"MSFT    ");
    BigEndian::write_u32(&mut msg[32..36], 3_101_000);
    msg[36..40].copy_from_slice(b"GSCO");

    let Message::AddOrderWithMpid(m) = Decoder::decode_tagged(&msg).unwrap() else {
        panic!("expected AddOrderWithMpid");
    };
    assert_eq!(m.side(), Some(Side::Sell));
    assert_eq!(m.stock.as_str(), "MSFT");
    assert_eq!(m.attribution.as_str(), "GSCO");
    assert_eq!(m.price.raw(), 3_101_000);
}

#[test]
fn test_decode_stock_directory_text_fields() {
    let mut msg = create_message(MessageType::StockDirectory, 5, 0);
    msg[11..19].copy_from_slice(b"ZVZZT   ");
    msg[19] = b'Q';
    msg[20] = b'N';
    BigEndian::write_u32(&mut msg[21..25], 100);
    msg[25] = b'N';
    msg[26] = b'C';
    msg[27..29].copy_from_slice(b"Z ");

    let Message::StockDirectory(m) = Decoder::decode_tagged(&msg).unwrap() else {
        panic!("expected StockDirectory");
    };
    assert_eq!(m.stock.as_str(), "ZVZZT");
    assert_eq!(m.stock.as_bytes(), b"ZVZZT   ");
    assert_eq!(m.market_category, b'Q');
    assert_eq!(m.round_lot_size, 100);
    assert_eq!(&m.issue_sub_type, b"Z ");
}

#[test]
fn test_length_mismatch() {
    let msg = create_message(MessageType::OrderDelete, 1, 1);
    let result = Decoder::decode(MessageType::OrderDelete, &msg[..18]);
    assert_eq!(
        result,
        Err(DecodeError::MalformedMessage { tag: b'D', need: 19, have: 18 })
    );

    let mut long = msg.clone();
    long.push(0);
    assert!(matches!(
        Decoder::decode(MessageType::OrderDelete, &long),
        Err(DecodeError::MalformedMessage { need: 19, have: 20, .. })
    ));
}

#[test]
fn test_invalid_message_type() {
    let mut msg = vec![0u8; 19];
    msg[0] = 0x99;
    assert_eq!(Decoder::decode_tagged(&msg), Err(DecodeError::InvalidMessageType(0x99)));
}

#[test]
fn test_framing_boundary() {
    let mut buf = create_message(MessageType::OrderDelete, 1, 1);
    buf.extend(create_message(MessageType::OrderCancel, 1, 2));
    let tail = create_message(MessageType::AddOrder, 1, 3);
    buf.extend(&tail[..20]);

    let mut framer = Framer::new(&buf);
    let seen: Vec<_> = framer.by_ref().map(|(t, raw)| (t, raw.tracking_number())).collect();
    assert_eq!(seen, vec![(MessageType::OrderDelete, 1), (MessageType::OrderCancel, 2)]);
    assert_eq!(
        framer.finish(),
        FrameStop::Truncated { offset: 42, msg_type: MessageType::AddOrder, need: 36, have: 20 }
    );
}

#[test]
fn test_unknown_tag_isolation() {
    let mut buf = create_message(MessageType::SystemEvent, 0, 0);
    buf[11] = b'S';
    buf.push(0x99);
    buf.extend(create_message(MessageType::OrderDelete, 1, 1));

    let mut framer = Framer::new(&buf);
    let decoded: Vec<Message> = framer.by_ref().map(|(_, raw)| raw.decode().unwrap()).collect();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].message_type(), MessageType::SystemEvent);
    assert_eq!(framer.finish(), FrameStop::UnknownTag { offset: 12, tag: 0x99 });
}

#[test]
fn test_encode_matches_hand_built_bytes() {
    let msg = create_add_order(7, 0x0102030405060708, 100, b"AAPL    ", 1_250_000);
    let decoded = Decoder::decode_tagged(&msg).unwrap();
    assert_eq!(decoded.encode(), msg);
}
