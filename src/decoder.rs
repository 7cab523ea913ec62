/// Typed message decoder
///
/// Each raw message is decoded field by field from its fixed offsets into an owned
/// `Message`. Integers are converted from network byte order, timestamps are
/// folded from 6 bytes, prices stay fixed-point and text fields are copied verbatim.

use crate::protocol::*;
use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed message: tag {tag:#04x} needs {need} bytes, have {have}")]
    MalformedMessage { tag: u8, need: usize, have: usize },

    #[error("invalid message type: {0:#04x}")]
    InvalidMessageType(u8),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Fields shared by every kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub stock_locate: u16,
    pub tracking_number: u16,
    /// Nanoseconds since midnight
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemEvent {
    pub header: Header,
    pub event_code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDirectory {
    pub header: Header,
    pub stock: Symbol,
    pub market_category: u8,
    pub financial_status_indicator: u8,
    pub round_lot_size: u32,
    pub round_lots_only: u8,
    pub issue_classification: u8,
    pub issue_sub_type: [u8; 2],
    pub authenticity: u8,
    pub short_sale_threshold_indicator: u8,
    pub ipo_flag: u8,
    pub luld_reference_price_tier: u8,
    pub etp_flag: u8,
    pub etp_leverage_factor: u32,
    pub inverse_indicator: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrder {
    pub header: Header,
    pub order_reference_number: u64,
    pub buy_sell_indicator: u8,
    pub shares: u32,
    pub stock: Symbol,
    pub price: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrderWithMpid {
    pub header: Header,
    pub order_reference_number: u64,
    pub buy_sell_indicator: u8,
    pub shares: u32,
    pub stock: Symbol,
    pub price: Price,
    pub attribution: Mpid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecuted {
    pub header: Header,
    pub order_reference_number: u64,
    pub executed_shares: u32,
    pub match_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecutedWithPrice {
    pub header: Header,
    pub order_reference_number: u64,
    pub executed_shares: u32,
    pub match_number: u64,
    pub printable: u8,
    pub execution_price: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCancel {
    pub header: Header,
    pub order_reference_number: u64,
    pub canceled_shares: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDelete {
    pub header: Header,
    pub order_reference_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReplace {
    pub header: Header,
    pub original_order_reference_number: u64,
    pub new_order_reference_number: u64,
    pub shares: u32,
    pub price: Price,
}

impl AddOrder {
    pub fn side(&self) -> Option<Side> {
        Side::from_u8(self.buy_sell_indicator)
    }
}

impl AddOrderWithMpid {
    pub fn side(&self) -> Option<Side> {
        Side::from_u8(self.buy_sell_indicator)
    }
}

/// A decoded message, one variant per catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    SystemEvent(SystemEvent),
    StockDirectory(StockDirectory),
    AddOrder(AddOrder),
    AddOrderWithMpid(AddOrderWithMpid),
    OrderExecuted(OrderExecuted),
    OrderExecutedWithPrice(OrderExecutedWithPrice),
    OrderCancel(OrderCancel),
    OrderDelete(OrderDelete),
    OrderReplace(OrderReplace),
}

impl Message {
    pub fn header(&self) -> &Header {
        match self {
            Message::SystemEvent(m) => &m.header,
            Message::StockDirectory(m) => &m.header,
            Message::AddOrder(m) => &m.header,
            Message::AddOrderWithMpid(m) => &m.header,
            Message::OrderExecuted(m) => &m.header,
            Message::OrderExecutedWithPrice(m) => &m.header,
            Message::OrderCancel(m) => &m.header,
            Message::OrderDelete(m) => &m.header,
            Message::OrderReplace(m) => &m.header,
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::SystemEvent(_) => MessageType::SystemEvent,
            Message::StockDirectory(_) => MessageType::StockDirectory,
            Message::AddOrder(_) => MessageType::AddOrder,
            Message::AddOrderWithMpid(_) => MessageType::AddOrderWithMpid,
            Message::OrderExecuted(_) => MessageType::OrderExecuted,
            Message::OrderExecutedWithPrice(_) => MessageType::OrderExecutedWithPrice,
            Message::OrderCancel(_) => MessageType::OrderCancel,
            Message::OrderDelete(_) => MessageType::OrderDelete,
            Message::OrderReplace(_) => MessageType::OrderReplace,
        }
    }

    pub fn tracking_number(&self) -> u16 {
        self.header().tracking_number
    }

    pub fn timestamp(&self) -> u64 {
        self.header().timestamp
    }
}

/// Sequential big-endian field reader over one message
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Positioned just past the timestamp. Caller guarantees the length.
    fn body(buf: &'a [u8]) -> Self {
        FieldReader { buf, pos: BODY_OFFSET }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    fn u32(&mut self) -> u32 {
        let v = BigEndian::read_u32(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        v
    }

    fn u64(&mut self) -> u64 {
        let v = BigEndian::read_u64(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        v
    }

    fn price(&mut self) -> Price {
        Price::from_raw(self.u32())
    }

    fn alpha<const N: usize>(&mut self) -> Alpha<N> {
        Alpha::from_bytes(self.take::<N>())
    }
}

fn decode_header(buf: &[u8]) -> Header {
    let mut ts = [0u8; TIMESTAMP_SIZE];
    ts.copy_from_slice(&buf[TIMESTAMP_OFFSET..BODY_OFFSET]);
    Header {
        stock_locate: BigEndian::read_u16(&buf[1..3]),
        tracking_number: BigEndian::read_u16(&buf[3..5]),
        timestamp: reconstruct_timestamp(&ts),
    }
}

pub struct Decoder;

impl Decoder {
    /// Decode one message of kind `msg_type`
    ///
    /// `bytes` must be exactly `msg_type.wire_len()` long, starting at the tag byte.
    pub fn decode(msg_type: MessageType, bytes: &[u8]) -> DecodeResult<Message> {
        let need = msg_type.wire_len();
        if bytes.len() != need {
            return Err(DecodeError::MalformedMessage {
                tag: msg_type.tag(),
                need,
                have: bytes.len(),
            });
        }

        let header = decode_header(bytes);
        let mut r = FieldReader::body(bytes);

        let msg = match msg_type {
            MessageType::SystemEvent => Message::SystemEvent(SystemEvent {
                header,
                event_code: r.u8(),
            }),
            MessageType::StockDirectory => Message::StockDirectory(StockDirectory {
                header,
                stock: r.alpha(),
                market_category: r.u8(),
                financial_status_indicator: r.u8(),
                round_lot_size: r.u32(),
                round_lots_only: r.u8(),
                issue_classification: r.u8(),
                issue_sub_type: r.take(),
                authenticity: r.u8(),
                short_sale_threshold_indicator: r.u8(),
                ipo_flag: r.u8(),
                luld_reference_price_tier: r.u8(),
                etp_flag: r.u8(),
                etp_leverage_factor: r.u32(),
                inverse_indicator: r.u8(),
            }),
            MessageType::AddOrder => Message::AddOrder(AddOrder {
                header,
                order_reference_number: r.u64(),
                buy_sell_indicator: r.u8(),
                shares: r.u32(),
                stock: r.alpha(),
                price: r.price(),
            }),
            MessageType::AddOrderWithMpid => Message::AddOrderWithMpid(AddOrderWithMpid {
                header,
                order_reference_number: r.u64(),
                buy_sell_indicator: r.u8(),
                shares: r.u32(),
                stock: r.alpha(),
                price: r.price(),
                attribution: r.alpha(),
            }),
            MessageType::OrderExecuted => Message::OrderExecuted(OrderExecuted {
                header,
                order_reference_number: r.u64(),
                executed_shares: r.u32(),
                match_number: r.u64(),
            }),
            MessageType::OrderExecutedWithPrice => {
                Message::OrderExecutedWithPrice(OrderExecutedWithPrice {
                    header,
                    order_reference_number: r.u64(),
                    executed_shares: r.u32(),
                    match_number: r.u64(),
                    printable: r.u8(),
                    execution_price: r.price(),
                })
            }
            MessageType::OrderCancel => Message::OrderCancel(OrderCancel {
                header,
                order_reference_number: r.u64(),
                canceled_shares: r.u32(),
            }),
            MessageType::OrderDelete => Message::OrderDelete(OrderDelete {
                header,
                order_reference_number: r.u64(),
            }),
            MessageType::OrderReplace => Message::OrderReplace(OrderReplace {
                header,
                original_order_reference_number: r.u64(),
                new_order_reference_number: r.u64(),
                shares: r.u32(),
                price: r.price(),
            }),
        };

        debug_assert_eq!(r.pos, need);
        Ok(msg)
    }

    /// Decode a message whose kind is taken from its own leading tag byte
    pub fn decode_tagged(bytes: &[u8]) -> DecodeResult<Message> {
        let tag = *bytes.first().ok_or(DecodeError::MalformedMessage {
            tag: 0,
            need: COMMON_HEADER_SIZE,
            have: 0,
        })?;
        let msg_type = MessageType::from_u8(tag).ok_or(DecodeError::InvalidMessageType(tag))?;
        Self::decode(msg_type, bytes)
    }
}

fn ch(b: u8) -> char {
    char::from(b)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.header();
        write!(
            f,
            "[{} '{}'] #{} locate={} ts={}",
            self.message_type().name(),
            ch(self.message_type().tag()),
            h.tracking_number,
            h.stock_locate,
            h.timestamp
        )?;
        match self {
            Message::SystemEvent(m) => write!(f, " | event={}", ch(m.event_code)),
            Message::StockDirectory(m) => write!(
                f,
                " | symbol={} round_lot={} category={}",
                m.stock,
                m.round_lot_size,
                ch(m.market_category)
            ),
            Message::AddOrder(m) => write!(
                f,
                " | ref={} side={} shares={} symbol={} price={}",
                m.order_reference_number,
                ch(m.buy_sell_indicator),
                m.shares,
                m.stock,
                m.price
            ),
            Message::AddOrderWithMpid(m) => write!(
                f,
                " | ref={} side={} shares={} symbol={} price={} mpid={}",
                m.order_reference_number,
                ch(m.buy_sell_indicator),
                m.shares,
                m.stock,
                m.price,
                m.attribution
            ),
            Message::OrderExecuted(m) => write!(
                f,
                " | ref={} executed={} match={}",
                m.order_reference_number, m.executed_shares, m.match_number
            ),
            Message::OrderExecutedWithPrice(m) => write!(
                f,
                " | ref={} executed={} match={} printable={} price={}",
                m.order_reference_number,
                m.executed_shares,
                m.match_number,
                ch(m.printable),
                m.execution_price
            ),
            Message::OrderCancel(m) => write!(
                f,
                " | ref={} canceled={}",
                m.order_reference_number, m.canceled_shares
            ),
            Message::OrderDelete(m) => write!(f, " | ref={}", m.order_reference_number),
            Message::OrderReplace(m) => write!(
                f,
                " | ref={} -> {} shares={} price={}",
                m.original_order_reference_number,
                m.new_order_reference_number,
                m.shares,
                m.price
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_add_order_msg(tracking: u16) -> Vec<u8> {
        let mut msg = vec![0u8; 36];
        msg[0] = b'A';
        BigEndian::write_u16(&mut msg[1..3], 9);
        BigEndian::write_u16(&mut msg[3..5], tracking);
        msg[5..11].copy_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x10, 0x00]);
        BigEndian::write_u64(&mut msg[11..19], 0x0102030405060708);
        msg[19] = b'B';
        BigEndian::write_u32(&mut msg[20..24], 100);
        msg[24..32].copy_from_slice(b"AAPL    ");
        BigEndian::write_u32(&mut msg[32..36], 1_250_000);
        msg
    }

    #[test]
    fn test_decode_add_order() {
        let msg = create_add_order_msg(7);
        let decoded = Decoder::decode(MessageType::AddOrder, &msg).unwrap();
        assert_eq!(decoded.message_type(), MessageType::AddOrder);
        assert_eq!(decoded.tracking_number(), 7);
        assert_eq!(decoded.timestamp(), 0x1000);
        match decoded {
            Message::AddOrder(m) => {
                assert_eq!(m.header.stock_locate, 9);
                assert_eq!(m.order_reference_number, 0x0102030405060708);
                assert_eq!(m.buy_sell_indicator, b'B');
                assert_eq!(m.shares, 100);
                assert_eq!(m.stock.as_bytes(), b"AAPL    ");
                assert_eq!(m.price.as_f64(), 125.0);
            }
            other => panic!("expected AddOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_length_mismatch() {
        let msg = create_add_order_msg(1);
        let result = Decoder::decode(MessageType::AddOrder, &msg[..35]);
        assert_eq!(
            result,
            Err(DecodeError::MalformedMessage { tag: b'A', need: 36, have: 35 })
        );
        let result = Decoder::decode(MessageType::OrderDelete, &msg);
        assert!(matches!(result, Err(DecodeError::MalformedMessage { need: 19, .. })));
    }

    #[test]
    fn test_decode_tagged() {
        let msg = create_add_order_msg(3);
        assert!(matches!(Decoder::decode_tagged(&msg), Ok(Message::AddOrder(_))));
        assert_eq!(Decoder::decode_tagged(&[0x99; 12]), Err(DecodeError::InvalidMessageType(0x99)));
        assert!(Decoder::decode_tagged(&[]).is_err());
    }

    #[test]
    fn test_display() {
        let decoded = Decoder::decode(MessageType::AddOrder, &create_add_order_msg(7)).unwrap();
        let line = decoded.to_string();
        assert!(line.starts_with("[Add Order 'A'] #7"));
        assert!(line.contains("symbol=AAPL price=125.0000"));
    }
}
