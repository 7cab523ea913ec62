/// Datagram framer
///
/// Splits one received datagram into complete messages by reading the leading tag
/// byte and advancing by that tag's fixed length. Framing stops at the first
/// unknown tag or incomplete trailing message and never resynchronizes.

use crate::decoder::{DecodeError, DecodeResult, Decoder, Message};
use crate::protocol::{CommonHeader, MessageType};
use byteorder::{BigEndian, ByteOrder};
use std::iter::FusedIterator;

/// Borrowed view of one complete message inside a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage<'a> {
    msg_type: MessageType,
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> RawMessage<'a> {
    /// Caller guarantees `bytes.len() == msg_type.wire_len()`
    pub(crate) fn new(msg_type: MessageType, offset: usize, bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len(), msg_type.wire_len());
        RawMessage { msg_type, offset, bytes }
    }

    /// Validate a standalone message: known tag and exact length
    pub fn from_bytes(bytes: &'a [u8]) -> DecodeResult<Self> {
        let tag = *bytes.first().ok_or(DecodeError::InvalidMessageType(0))?;
        let msg_type = MessageType::from_u8(tag).ok_or(DecodeError::InvalidMessageType(tag))?;
        if bytes.len() != msg_type.wire_len() {
            return Err(DecodeError::MalformedMessage {
                tag,
                need: msg_type.wire_len(),
                have: bytes.len(),
            });
        }
        Ok(RawMessage::new(msg_type, 0, bytes))
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    /// Offset of the tag byte within the source buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn tracking_number(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[3..5])
    }

    pub fn header(&self) -> CommonHeader {
        CommonHeader {
            msg_type: self.bytes[0],
            stock_locate: BigEndian::read_u16(&self.bytes[1..3]),
            tracking_number: self.tracking_number(),
        }
    }

    pub fn decode(&self) -> DecodeResult<Message> {
        Decoder::decode(self.msg_type, self.bytes)
    }
}

/// Why framing of a buffer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStop {
    /// Every byte was consumed by complete messages
    Complete,
    /// Tag byte not in the catalog; the rest of the buffer is discarded
    UnknownTag { offset: usize, tag: u8 },
    /// Known tag with fewer bytes left than its fixed length
    Truncated {
        offset: usize,
        msg_type: MessageType,
        need: usize,
        have: usize,
    },
}

impl FrameStop {
    pub fn is_clean(&self) -> bool {
        matches!(self, FrameStop::Complete)
    }

    /// Bytes left unparsed
    pub fn discarded(&self, buffer_len: usize) -> usize {
        match *self {
            FrameStop::Complete => 0,
            FrameStop::UnknownTag { offset, .. } | FrameStop::Truncated { offset, .. } => {
                buffer_len - offset
            }
        }
    }
}

/// Lazy, finite iterator of `(MessageType, RawMessage)` over one buffer
pub struct Framer<'a> {
    buf: &'a [u8],
    pos: usize,
    stop: Option<FrameStop>,
}

impl<'a> Framer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Framer { buf, pos: 0, stop: None }
    }

    /// Stop reason, available once the iterator has returned `None`
    pub fn stop_reason(&self) -> Option<FrameStop> {
        self.stop
    }

    /// Drain any remaining messages and return why framing ended
    pub fn finish(mut self) -> FrameStop {
        while self.next().is_some() {}
        self.stop.unwrap_or(FrameStop::Complete)
    }
}

impl<'a> Iterator for Framer<'a> {
    type Item = (MessageType, RawMessage<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop.is_some() {
            return None;
        }

        let remaining = &self.buf[self.pos..];
        let Some(&tag) = remaining.first() else {
            self.stop = Some(FrameStop::Complete);
            return None;
        };

        let Some(msg_type) = MessageType::from_u8(tag) else {
            self.stop = Some(FrameStop::UnknownTag { offset: self.pos, tag });
            return None;
        };

        let need = msg_type.wire_len();
        if remaining.len() < need {
            self.stop = Some(FrameStop::Truncated {
                offset: self.pos,
                msg_type,
                need,
                have: remaining.len(),
            });
            return None;
        }

        let raw = RawMessage::new(msg_type, self.pos, &remaining[..need]);
        self.pos += need;
        Some((msg_type, raw))
    }
}

impl FusedIterator for Framer<'_> {}
