//! AMQP 0-9-1 frame constants and the heartbeat frame builder.
//!
//! Every frame on the wire is laid out as:
//!
//! ```text
//! +------+---------+---------+-------------+-----------+
//! | type | channel |  size   |   payload   | frame-end |
//! |  u8  |   u16   |   u32   | size bytes  |   0xCE    |
//! +------+---------+---------+-------------+-----------+
//! ```
//!
//! All integers are big-endian. The transport only ever builds heartbeat
//! frames itself; everything else is produced by the method codec above it.

use bytes::{BufMut, Bytes, BytesMut};

/// Protocol header sent by the client before any frame.
pub const PROTOCOL_HEADER: &[u8; 8] = b"AMQP\x00\x00\x09\x01";

/// Length of the fixed frame header (type + channel + size).
pub const FRAME_HEADER_SIZE: usize = 7;

/// Frame-end marker octet.
pub const FRAME_END: u8 = 0xCE;

/// Size of a heartbeat frame on the wire.
pub const HEARTBEAT_FRAME_SIZE: usize = FRAME_HEADER_SIZE + 1;

/// Frame type octets.
pub mod frame_types {
    pub const METHOD: u8 = 1;
    pub const HEADER: u8 = 2;
    pub const BODY: u8 = 3;
    pub const HEARTBEAT: u8 = 8;
}

/// Producer of heartbeat frame bytes.
///
/// The transport calls this every time it decides a heartbeat is due.
pub type HeartbeatFrameFn = fn() -> Bytes;

/// Build the fixed 8-byte heartbeat frame: type 8, channel 0, empty payload.
#[must_use]
pub fn heartbeat_frame() -> Bytes {
    let mut buf = BytesMut::with_capacity(HEARTBEAT_FRAME_SIZE);
    buf.put_u8(frame_types::HEARTBEAT);
    buf.put_u16(0);
    buf.put_u32(0);
    buf.put_u8(FRAME_END);
    buf.freeze()
}

/// Decoded general frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: u8,
    pub channel: u16,
    pub size: u32,
}

impl FrameHeader {
    /// Parse the 7-byte header at the start of `buf`.
    ///
    /// Returns `None` if fewer than 7 bytes are available.
    #[must_use]
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < FRAME_HEADER_SIZE {
            return None;
        }
        Some(Self {
            frame_type: buf[0],
            channel: u16::from_be_bytes([buf[1], buf[2]]),
            size: u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]),
        })
    }

    /// Whether this header announces a heartbeat frame.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.frame_type == frame_types::HEARTBEAT && self.channel == 0 && self.size == 0
    }

    /// Bytes still to read after the header: the payload plus the frame-end octet.
    #[must_use]
    pub fn remaining_len(&self) -> usize {
        self.size as usize + 1
    }
}
