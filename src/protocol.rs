/// ITCH 5.0 wire catalog
///
/// Every message starts with a 5-byte common header followed by a 6-byte timestamp:
///   - msg_type: u8 (1 byte) - ASCII tag, also the framing key
///   - stock_locate: u16 (2 bytes) - big-endian
///   - tracking_number: u16 (2 bytes) - big-endian, 0 = unsequenced
///   - timestamp: u48 (6 bytes) - big-endian nanoseconds since midnight
///
/// Message boundaries are implicit: each tag has a fixed total length.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

pub const COMMON_HEADER_SIZE: usize = 5;
pub const TIMESTAMP_OFFSET: usize = 5;
pub const TIMESTAMP_SIZE: usize = 6;
/// Offset of the first kind-specific field.
pub const BODY_OFFSET: usize = TIMESTAMP_OFFSET + TIMESTAMP_SIZE;

pub const PRICE_SCALE: u32 = 10_000;

const TIMESTAMP_MASK: u64 = (1 << 48) - 1;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SystemEvent = b'S',
    StockDirectory = b'R',
    AddOrder = b'A',
    AddOrderWithMpid = b'F',
    OrderExecuted = b'E',
    OrderExecutedWithPrice = b'C',
    OrderCancel = b'X',
    OrderDelete = b'D',
    OrderReplace = b'U',
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::SystemEvent,
        MessageType::StockDirectory,
        MessageType::AddOrder,
        MessageType::AddOrderWithMpid,
        MessageType::OrderExecuted,
        MessageType::OrderExecutedWithPrice,
        MessageType::OrderCancel,
        MessageType::OrderDelete,
        MessageType::OrderReplace,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'S' => Some(MessageType::SystemEvent),
            b'R' => Some(MessageType::StockDirectory),
            b'A' => Some(MessageType::AddOrder),
            b'F' => Some(MessageType::AddOrderWithMpid),
            b'E' => Some(MessageType::OrderExecuted),
            b'C' => Some(MessageType::OrderExecutedWithPrice),
            b'X' => Some(MessageType::OrderCancel),
            b'D' => Some(MessageType::OrderDelete),
            b'U' => Some(MessageType::OrderReplace),
            _ => None,
        }
    }

    /// Fixed wire length of the whole message, header included
    pub const fn wire_len(self) -> usize {
        match self {
            MessageType::SystemEvent => 12,
            MessageType::StockDirectory => 39,
            MessageType::AddOrder => 36,
            MessageType::AddOrderWithMpid => 40,
            MessageType::OrderExecuted => 31,
            MessageType::OrderExecutedWithPrice => 36,
            MessageType::OrderCancel => 23,
            MessageType::OrderDelete => 19,
            MessageType::OrderReplace => 35,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::SystemEvent => "System Event",
            MessageType::StockDirectory => "Stock Directory",
            MessageType::AddOrder => "Add Order",
            MessageType::AddOrderWithMpid => "Add Order w/ MPID",
            MessageType::OrderExecuted => "Order Executed",
            MessageType::OrderExecutedWithPrice => "Order Executed w/ Price",
            MessageType::OrderCancel => "Order Cancel",
            MessageType::OrderDelete => "Order Delete",
            MessageType::OrderReplace => "Order Replace",
        }
    }
}

/// Fixed wire length for a raw tag byte, `None` if the tag is not in the catalog
pub fn length_of(tag: u8) -> Option<usize> {
    MessageType::from_u8(tag).map(MessageType::wire_len)
}

/// The 5 bytes every message kind starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub msg_type: u8,
    pub stock_locate: u16,
    pub tracking_number: u16,
}

/// Fold 6 big-endian bytes into a nanosecond timestamp
pub fn reconstruct_timestamp(bytes: &[u8; TIMESTAMP_SIZE]) -> u64 {
    bytes.iter().fold(0u64, |ts, &b| (ts << 8) | u64::from(b))
}

/// Inverse of [`reconstruct_timestamp`]; bits above 48 are dropped
pub fn timestamp_to_wire(ts: u64) -> [u8; TIMESTAMP_SIZE] {
    let mut out = [0u8; TIMESTAMP_SIZE];
    BigEndian::write_uint(&mut out, ts & TIMESTAMP_MASK, TIMESTAMP_SIZE);
    out
}

/// Fixed-point price, 4 implied decimals (wire value = price * 10_000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(u32);

impl Price {
    pub const fn from_raw(raw: u32) -> Self {
        Price(raw)
    }

    /// Round a decimal price to the nearest 1/10_000
    ///
    /// `None` for NaN, negative prices and prices too large for the wire field.
    pub fn from_decimal(price: f64) -> Option<Self> {
        let scaled = (price * f64::from(PRICE_SCALE)).round();
        if !(0.0..=f64::from(u32::MAX)).contains(&scaled) {
            return None;
        }
        Some(Price(scaled as u32))
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10000.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / PRICE_SCALE, self.0 % PRICE_SCALE)
    }
}

/// Fixed-width, space-padded ASCII field
///
/// The wire bytes are kept verbatim (padding included). `as_str` and `Display`
/// trim trailing spaces; equality compares the padded bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alpha<const N: usize>([u8; N]);

/// 8-byte stock symbol
pub type Symbol = Alpha<8>;
/// 4-byte market participant identifier
pub type Mpid = Alpha<4>;

impl<const N: usize> Alpha<N> {
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Alpha(bytes)
    }

    /// Left-justify `s` and pad with spaces; input longer than `N` is truncated
    pub fn new(s: &str) -> Self {
        let mut bytes = [b' '; N];
        let src = s.as_bytes();
        let n = src.len().min(N);
        bytes[..n].copy_from_slice(&src[..n]);
        Alpha(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Value with trailing padding removed. Non-UTF-8 content yields `""`.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl<const N: usize> Default for Alpha<N> {
    fn default() -> Self {
        Alpha([b' '; N])
    }
}

impl<const N: usize> fmt::Debug for Alpha<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl<const N: usize> fmt::Display for Alpha<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buy/sell indicator helper; the raw byte is what gets decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'B' => Some(Side::Buy),
            b'S' => Some(Side::Sell),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_conversion() {
        assert_eq!(MessageType::from_u8(b'A'), Some(MessageType::AddOrder));
        assert_eq!(MessageType::from_u8(b'U'), Some(MessageType::OrderReplace));
        assert_eq!(MessageType::from_u8(0x99), None);
        assert_eq!(MessageType::from_u8(b'P'), None);
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_u8(t.tag()), Some(t));
        }
    }

    #[test]
    fn test_catalog_lengths() {
        assert_eq!(length_of(b'S'), Some(12));
        assert_eq!(length_of(b'R'), Some(39));
        assert_eq!(length_of(b'A'), Some(36));
        assert_eq!(length_of(b'F'), Some(40));
        assert_eq!(length_of(b'E'), Some(31));
        assert_eq!(length_of(b'C'), Some(36));
        assert_eq!(length_of(b'X'), Some(23));
        assert_eq!(length_of(b'D'), Some(19));
        assert_eq!(length_of(b'U'), Some(35));
        assert_eq!(length_of(b'Z'), None);
    }

    #[test]
    fn test_timestamp_fold() {
        let ts = reconstruct_timestamp(&[0x00, 0x00, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(ts, 0x0102_0304);
        let ts = reconstruct_timestamp(&[0xff; 6]);
        assert_eq!(ts, 0xffff_ffff_ffff);
        assert_eq!(timestamp_to_wire(0x0102_0304), [0, 0, 1, 2, 3, 4]);
        // high bits beyond 48 are dropped
        assert_eq!(timestamp_to_wire(1 << 48), [0; 6]);
    }

    #[test]
    fn test_price_conversions() {
        let price = Price::from_raw(1_250_000);
        assert_eq!(price.as_f64(), 125.0);
        assert_eq!(price.to_string(), "125.0000");
        assert_eq!(Price::from_raw(1_234_567).to_string(), "123.4567");
        assert_eq!(Price::from_decimal(123.4567), Some(Price::from_raw(1_234_567)));
    }

    #[test]
    fn test_price_from_decimal_out_of_range() {
        assert_eq!(Price::from_decimal(0.0), Some(Price::from_raw(0)));
        assert_eq!(Price::from_decimal(429_496.7295), Some(Price::from_raw(u32::MAX)));
        assert_eq!(Price::from_decimal(-0.01), None);
        assert_eq!(Price::from_decimal(429_496.73), None);
        assert_eq!(Price::from_decimal(f64::NAN), None);
        assert_eq!(Price::from_decimal(f64::INFINITY), None);
    }

    #[test]
    fn test_alpha_padding() {
        let sym = Symbol::new("AAPL");
        assert_eq!(sym.as_bytes(), b"AAPL    ");
        assert_eq!(sym.as_str(), "AAPL");
        assert_eq!(sym.to_string(), "AAPL");
        assert_eq!(Symbol::from_bytes(*b"AAPL    "), sym);
        assert_eq!(Mpid::new("GSCOXX").as_str(), "GSCO");
        assert_eq!(Symbol::default().as_str(), "");
    }
}
