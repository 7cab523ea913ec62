/// Wire encoder
///
/// Inverse of the decoder: writes a `Message` back to its exact fixed-length wire
/// form. Used to synthesize feeds for the generator, benches and tests.

use crate::decoder::*;
use crate::protocol::*;
use byteorder::{BigEndian, ByteOrder};

struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(buf: &'a mut [u8], msg_type: MessageType, header: &Header) -> Self {
        buf[0] = msg_type.tag();
        BigEndian::write_u16(&mut buf[1..3], header.stock_locate);
        BigEndian::write_u16(&mut buf[3..5], header.tracking_number);
        buf[TIMESTAMP_OFFSET..BODY_OFFSET].copy_from_slice(&timestamp_to_wire(header.timestamp));
        FieldWriter { buf, pos: BODY_OFFSET }
    }

    fn bytes(&mut self, src: &[u8]) {
        self.buf[self.pos..self.pos + src.len()].copy_from_slice(src);
        self.pos += src.len();
    }

    fn u8(&mut self, v: u8) {
        self.buf[self.pos] = v;
        self.pos += 1;
    }

    fn u32(&mut self, v: u32) {
        BigEndian::write_u32(&mut self.buf[self.pos..self.pos + 4], v);
        self.pos += 4;
    }

    fn u64(&mut self, v: u64) {
        BigEndian::write_u64(&mut self.buf[self.pos..self.pos + 8], v);
        self.pos += 8;
    }
}

impl Message {
    /// Append the wire form of this message to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let msg_type = self.message_type();
        let start = out.len();
        out.resize(start + msg_type.wire_len(), 0);
        let mut w = FieldWriter::new(&mut out[start..], msg_type, self.header());

        match self {
            Message::SystemEvent(m) => w.u8(m.event_code),
            Message::StockDirectory(m) => {
                w.bytes(m.stock.as_bytes());
                w.u8(m.market_category);
                w.u8(m.financial_status_indicator);
                w.u32(m.round_lot_size);
                w.u8(m.round_lots_only);
                w.u8(m.issue_classification);
                w.bytes(&m.issue_sub_type);
                w.u8(m.authenticity);
                w.u8(m.short_sale_threshold_indicator);
                w.u8(m.ipo_flag);
                w.u8(m.luld_reference_price_tier);
                w.u8(m.etp_flag);
                w.u32(m.etp_leverage_factor);
                w.u8(m.inverse_indicator);
            }
            Message::AddOrder(m) => {
                w.u64(m.order_reference_number);
                w.u8(m.buy_sell_indicator);
                w.u32(m.shares);
                w.bytes(m.stock.as_bytes());
                w.u32(m.price.raw());
            }
            Message::AddOrderWithMpid(m) => {
                w.u64(m.order_reference_number);
                w.u8(m.buy_sell_indicator);
                w.u32(m.shares);
                w.bytes(m.stock.as_bytes());
                w.u32(m.price.raw());
                w.bytes(m.attribution.as_bytes());
            }
            Message::OrderExecuted(m) => {
                w.u64(m.order_reference_number);
                w.u32(m.executed_shares);
                w.u64(m.match_number);
            }
            Message::OrderExecutedWithPrice(m) => {
                w.u64(m.order_reference_number);
                w.u32(m.executed_shares);
                w.u64(m.match_number);
                w.u8(m.printable);
                w.u32(m.execution_price.raw());
            }
            Message::OrderCancel(m) => {
                w.u64(m.order_reference_number);
                w.u32(m.canceled_shares);
            }
            Message::OrderDelete(m) => w.u64(m.order_reference_number),
            Message::OrderReplace(m) => {
                w.u64(m.original_order_reference_number);
                w.u64(m.new_order_reference_number);
                w.u32(m.shares);
                w.u32(m.price.raw());
            }
        }

        debug_assert_eq!(w.pos, msg_type.wire_len());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.message_type().wire_len());
        self.encode_into(&mut out);
        out
    }

    /// Same message with a different tracking number
    pub fn with_tracking_number(mut self, tracking_number: u16) -> Self {
        let header = match &mut self {
            Message::SystemEvent(m) => &mut m.header,
            Message::StockDirectory(m) => &mut m.header,
            Message::AddOrder(m) => &mut m.header,
            Message::AddOrderWithMpid(m) => &mut m.header,
            Message::OrderExecuted(m) => &mut m.header,
            Message::OrderExecutedWithPrice(m) => &mut m.header,
            Message::OrderCancel(m) => &mut m.header,
            Message::OrderDelete(m) => &mut m.header,
            Message::OrderReplace(m) => &mut m.header,
        };
        header.tracking_number = tracking_number;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(tracking_number: u16) -> Header {
        Header { stock_locate: 1, tracking_number, timestamp: 34_200_000_000_000 }
    }

    #[test]
    fn test_encode_lengths() {
        let msgs = [
            Message::SystemEvent(SystemEvent { header: header(0), event_code: b'O' }),
            Message::OrderDelete(OrderDelete { header: header(2), order_reference_number: 5 }),
            Message::OrderCancel(OrderCancel {
                header: header(3),
                order_reference_number: 5,
                canceled_shares: 10,
            }),
        ];
        for m in msgs {
            let bytes = m.encode();
            assert_eq!(bytes.len(), m.message_type().wire_len());
            assert_eq!(bytes[0], m.message_type().tag());
        }
    }

    #[test]
    fn test_replace_round_trip() {
        let msg = Message::OrderReplace(OrderReplace {
            header: header(11),
            original_order_reference_number: u64::MAX - 1,
            new_order_reference_number: 0x0a0b_0c0d_0e0f_1011,
            shares: 250,
            price: Price::from_raw(99_9900),
        });
        let bytes = msg.encode();
        assert_eq!(&bytes[11..19], &(u64::MAX - 1).to_be_bytes());
        assert_eq!(Decoder::decode(MessageType::OrderReplace, &bytes), Ok(msg));
    }

    #[test]
    fn test_encode_into_appends() {
        let mut out = vec![0xaa];
        let msg = Message::OrderDelete(OrderDelete { header: header(4), order_reference_number: 1 });
        msg.encode_into(&mut out);
        assert_eq!(out.len(), 1 + 19);
        assert_eq!(out[0], 0xaa);
        assert_eq!(out[1], b'D');
    }

    #[test]
    fn test_with_tracking_number() {
        let msg = Message::OrderDelete(OrderDelete { header: header(4), order_reference_number: 1 })
            .with_tracking_number(900);
        assert_eq!(msg.tracking_number(), 900);
        assert_eq!(&msg.encode()[3..5], &900u16.to_be_bytes());
    }
}
