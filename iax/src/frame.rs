//! IAX2 frame parsing and construction.
//!
//! Two wire shapes share one UDP port and are discriminated by the top bit
//! of the first byte:
//!
//! ```text
//! Full frame (F bit set):
//! +---------------+---------------+----------------+---------+---------+
//! | 1 | src call  | R | dst call  | timestamp (4B) | oseqno  | iseqno  |
//! |   | (15 bits) |   | (15 bits) | big-endian ms  | (1B)    | (1B)    |
//! +---------------+---------------+----------------+---------+---------+
//! | type (1B) | C | subclass (7 bits) | payload ...                    |
//! +-----------+-------------------+------------------------------------+
//!
//! Mini voice frame (F bit clear):
//! +---------------+----------------+-------------------+
//! | 0 | src call  | timestamp low  | mu-law payload ...|
//! |   | (15 bits) | 16 bits        |                   |
//! +---------------+----------------+-------------------+
//! ```

use crate::error::{Error, Result};
use crate::ie::{self, InfoElements};

/// Size of the full frame header.
pub const FULL_HEADER_LEN: usize = 12;

/// Size of the mini voice frame header.
pub const MINI_HEADER_LEN: usize = 4;

/// Frame type: voice media.
pub const TYPE_VOICE: u8 = 2;
/// Frame type: call control.
pub const TYPE_CONTROL: u8 = 4;
/// Frame type: IAX protocol management.
pub const TYPE_IAX: u8 = 6;

/// IAX subclass: call initiation.
pub const IAX_NEW: u8 = 1;
/// IAX subclass: ping.
pub const IAX_PING: u8 = 2;
/// IAX subclass: pong.
pub const IAX_PONG: u8 = 3;
/// IAX subclass: acknowledgement.
pub const IAX_ACK: u8 = 4;
/// IAX subclass: hangup.
pub const IAX_HANGUP: u8 = 5;
/// IAX subclass: call accepted.
pub const IAX_ACCEPT: u8 = 7;
/// IAX subclass: authentication request.
pub const IAX_AUTHREQ: u8 = 8;
/// IAX subclass: authentication reply.
pub const IAX_AUTHREP: u8 = 9;
/// IAX subclass: lag request.
pub const IAX_LAGRQ: u8 = 11;
/// IAX subclass: lag reply.
pub const IAX_LAGRP: u8 = 12;
/// IAX subclass: call token challenge.
pub const IAX_CALLTOKEN: u8 = 40;

/// Control subclass: ringing.
pub const CONTROL_RINGING: u8 = 3;
/// Control subclass: answer.
pub const CONTROL_ANSWER: u8 = 4;
/// Control subclass: stop ringback/progress sounds.
///
/// Note this value occupies the full subclass byte, compression flag
/// included.
pub const CONTROL_STOP_SOUNDS: u8 = 255;

/// Voice subclass: G.711 mu-law format code.
pub const FORMAT_ULAW: u8 = 4;

/// A parsed full frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullFrame {
    /// Sender's call number (15 bits).
    pub source_call: u16,
    /// Receiver's call number (15 bits).
    pub dest_call: u16,
    /// Set when the frame is a retransmission.
    pub retransmit: bool,
    /// Call-relative timestamp in milliseconds.
    pub timestamp: u32,
    /// Sender's outbound sequence number.
    pub out_seq: u8,
    /// Sender's expected inbound sequence number.
    pub in_seq: u8,
    /// Frame type.
    pub frame_type: u8,
    /// Raw subclass byte: 7-bit value plus top-bit compression flag.
    pub subclass: u8,
    /// Bytes following the header.
    pub payload: Vec<u8>,
}

impl FullFrame {
    /// Serializes the frame. The full-frame marker bit is always set.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FULL_HEADER_LEN + self.payload.len());
        let src = (self.source_call & 0x7FFF) | 0x8000;
        let mut dst = self.dest_call & 0x7FFF;
        if self.retransmit {
            dst |= 0x8000;
        }
        out.extend_from_slice(&src.to_be_bytes());
        out.extend_from_slice(&dst.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.push(self.out_seq);
        out.push(self.in_seq);
        out.push(self.frame_type);
        out.push(self.subclass);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Returns the 7-bit subclass value.
    pub fn subclass_bits(&self) -> u8 {
        self.subclass & 0x7F
    }

    /// Returns the subclass compression flag (power-of-two encoding marker).
    pub fn c_bit(&self) -> bool {
        self.subclass & 0x80 != 0
    }

    /// Parses the information elements carried in the payload.
    pub fn elements(&self) -> Result<InfoElements> {
        InfoElements::decode(&self.payload)
    }

    fn is_iax(&self, subclass: u8) -> bool {
        self.frame_type == TYPE_IAX && self.subclass == subclass
    }

    /// True for a call-initiation frame.
    pub fn is_new(&self) -> bool {
        self.is_iax(IAX_NEW)
    }

    /// True for an acknowledgement frame.
    pub fn is_ack(&self) -> bool {
        self.is_iax(IAX_ACK)
    }

    /// True for a hangup frame.
    pub fn is_hangup(&self) -> bool {
        self.is_iax(IAX_HANGUP)
    }

    /// True for a ping frame.
    pub fn is_ping(&self) -> bool {
        self.is_iax(IAX_PING)
    }

    /// True for a lag-request frame.
    pub fn is_lagrq(&self) -> bool {
        self.is_iax(IAX_LAGRQ)
    }

    /// True for an authentication reply frame.
    pub fn is_authrep(&self) -> bool {
        self.is_iax(IAX_AUTHREP)
    }

    /// True for a full voice frame carrying mu-law audio.
    pub fn is_voice(&self) -> bool {
        self.frame_type == TYPE_VOICE && self.subclass == FORMAT_ULAW
    }
}

/// A parsed mini voice frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniFrame {
    /// Sender's call number (15 bits).
    pub source_call: u16,
    /// Low 16 bits of the running call timestamp.
    pub timestamp: u16,
    /// Raw mu-law audio.
    pub payload: Vec<u8>,
}

impl MiniFrame {
    /// Serializes the frame. The full-frame marker bit is always clear.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MINI_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&(self.source_call & 0x7FFF).to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// A transport unit: either shape sharing the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Complete header with sequence numbers and type information.
    Full(FullFrame),
    /// Compact voice-only frame used after call setup.
    Mini(MiniFrame),
}

impl Frame {
    /// Parses a datagram into either frame shape.
    pub fn parse(data: &[u8]) -> Result<Frame> {
        if data.is_empty() {
            return Err(Error::ShortFrame { got: 0, need: MINI_HEADER_LEN });
        }
        if data[0] & 0x80 != 0 {
            if data.len() < FULL_HEADER_LEN {
                return Err(Error::ShortFrame { got: data.len(), need: FULL_HEADER_LEN });
            }
            Ok(Frame::Full(FullFrame {
                source_call: u16::from_be_bytes([data[0] & 0x7F, data[1]]),
                retransmit: data[2] & 0x80 != 0,
                dest_call: u16::from_be_bytes([data[2] & 0x7F, data[3]]),
                timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
                out_seq: data[8],
                in_seq: data[9],
                frame_type: data[10],
                subclass: data[11],
                payload: data[FULL_HEADER_LEN..].to_vec(),
            }))
        } else {
            if data.len() < MINI_HEADER_LEN {
                return Err(Error::ShortFrame { got: data.len(), need: MINI_HEADER_LEN });
            }
            Ok(Frame::Mini(MiniFrame {
                source_call: u16::from_be_bytes([data[0] & 0x7F, data[1]]),
                timestamp: u16::from_be_bytes([data[2], data[3]]),
                payload: data[MINI_HEADER_LEN..].to_vec(),
            }))
        }
    }
}

fn full(
    source_call: u16,
    dest_call: u16,
    timestamp: u32,
    out_seq: u8,
    in_seq: u8,
    frame_type: u8,
    subclass: u8,
    payload: Vec<u8>,
) -> Vec<u8> {
    FullFrame {
        source_call,
        dest_call,
        retransmit: false,
        timestamp,
        out_seq,
        in_seq,
        frame_type,
        subclass,
        payload,
    }
    .encode()
}

/// Builds a CALLTOKEN challenge frame carrying the token element.
pub fn calltoken(
    source_call: u16,
    dest_call: u16,
    timestamp: u32,
    out_seq: u8,
    in_seq: u8,
    token: &[u8],
) -> Vec<u8> {
    let mut ies = InfoElements::new();
    ies.push(ie::CALL_TOKEN, token.to_vec());
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_IAX, IAX_CALLTOKEN, ies.encode())
}

/// Builds an ACK frame.
pub fn ack(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_IAX, IAX_ACK, Vec::new())
}

/// Builds an AUTHREQ frame carrying the version, challenge, and username
/// elements.
pub fn authreq(
    source_call: u16,
    dest_call: u16,
    timestamp: u32,
    out_seq: u8,
    in_seq: u8,
    challenge: &str,
) -> Vec<u8> {
    let mut ies = InfoElements::new();
    ies.push(ie::VERSION, 4u16.to_be_bytes().to_vec());
    ies.push(ie::CHALLENGE, challenge.as_bytes().to_vec());
    ies.push(ie::USERNAME, b"allstar-sys".to_vec());
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_IAX, IAX_AUTHREQ, ies.encode())
}

/// Builds an ACCEPT frame advertising the mu-law format.
pub fn accept(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    let mut ies = InfoElements::new();
    ies.push(ie::FORMAT, (FORMAT_ULAW as u32).to_be_bytes().to_vec());
    ies.push(ie::CAPABILITY2, vec![0, 0, 0, 0, 0, 0, 0, 0, FORMAT_ULAW]);
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_IAX, IAX_ACCEPT, ies.encode())
}

/// Builds a RINGING control frame.
pub fn ringing(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_CONTROL, CONTROL_RINGING, Vec::new())
}

/// Builds an ANSWER control frame.
pub fn answer(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_CONTROL, CONTROL_ANSWER, Vec::new())
}

/// Builds a STOP SOUNDS control frame.
pub fn stop_sounds(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_CONTROL, CONTROL_STOP_SOUNDS, Vec::new())
}

/// Builds a LAGRP frame echoing a lag request.
pub fn lagrp(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_IAX, IAX_LAGRP, Vec::new())
}

/// Builds a PONG frame.
pub fn pong(source_call: u16, dest_call: u16, timestamp: u32, out_seq: u8, in_seq: u8) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_IAX, IAX_PONG, Vec::new())
}

/// Builds a full voice frame carrying a mu-law audio block.
pub fn voice_full(
    source_call: u16,
    dest_call: u16,
    timestamp: u32,
    out_seq: u8,
    in_seq: u8,
    audio: &[u8],
) -> Vec<u8> {
    full(source_call, dest_call, timestamp, out_seq, in_seq, TYPE_VOICE, FORMAT_ULAW, audio.to_vec())
}

/// Builds a mini voice frame carrying the low 16 bits of the timestamp.
pub fn voice_mini(source_call: u16, timestamp: u32, audio: &[u8]) -> Vec<u8> {
    MiniFrame {
        source_call,
        timestamp: (timestamp & 0xFFFF) as u16,
        payload: audio.to_vec(),
    }
    .encode()
}
