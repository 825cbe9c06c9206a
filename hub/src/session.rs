//! The per-call state machine.
//!
//! One session value holds everything about the single supported call. All
//! operations take the clock as an argument and return their outputs as
//! values; sending, playback, and timer polling belong to the scheduler.

use std::net::SocketAddr;

use linkhub_iax::frame;
use linkhub_iax::{ie, Frame, FullFrame, MiniFrame};
use tracing::{debug, info, warn};

use crate::auth::{self, ChallengeVerifier};
use crate::clock::EpochMillis;

/// Time allowed between RINGING and the automatic ANSWER.
pub const RING_TIMEOUT_MS: i64 = 2000;

/// Call lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// No call; waiting for initiation.
    Idle,
    /// Call token issued; waiting for it to be echoed.
    TokenWait,
    /// Challenge issued; waiting for the signed reply.
    AuthWait,
    /// Call accepted; ring timer armed.
    Ringing,
    /// Two-way audio active.
    InCall,
}

/// What the state machine wants done with a frame's aftermath: wire
/// replies to the peer and, for voice, a payload to play.
#[derive(Debug, Default)]
pub struct Disposition {
    /// Encoded frames to send back to the peer.
    pub replies: Vec<Vec<u8>>,
    /// Mu-law payload to run through the inbound audio path.
    pub voice: Option<Vec<u8>>,
}

impl Disposition {
    fn reply(data: Vec<u8>) -> Self {
        Self { replies: vec![data], voice: None }
    }
}

/// Mutable state of the one supported concurrent call.
#[derive(Debug)]
pub struct CallSession {
    state: CallState,
    /// Next local call number to allocate, monotonic from 1.
    next_call_id: u16,
    local_call: u16,
    peer_call: u16,
    peer_addr: Option<SocketAddr>,
    expected_in_seq: u8,
    out_seq: u8,
    /// Local wall clock when the call began.
    call_start: EpochMillis,
    /// Peer-reported timestamp at call start; origin for outgoing stamps.
    call_start_stamp: u32,
    token: Vec<u8>,
    challenge: String,
    voice_sent: u64,
    ring_deadline: Option<EpochMillis>,
}

impl CallSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self {
            state: CallState::Idle,
            next_call_id: 1,
            local_call: 0,
            peer_call: 0,
            peer_addr: None,
            expected_in_seq: 0,
            out_seq: 0,
            call_start: EpochMillis::default(),
            call_start_stamp: 0,
            token: Vec::new(),
            challenge: String::new(),
            voice_sent: 0,
            ring_deadline: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// True while audio should flow.
    pub fn in_call(&self) -> bool {
        self.state == CallState::InCall
    }

    /// Address of the current peer, once a call has started.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Outgoing timestamps share the peer's call-relative clock: the
    /// origin it reported plus elapsed local time, never the raw clock.
    fn timestamp(&self, now: EpochMillis) -> u32 {
        self.call_start_stamp
            .wrapping_add(now.diff(self.call_start).max(0) as u32)
    }

    fn advance_out_seq(&mut self) {
        self.out_seq = self.out_seq.wrapping_add(1);
    }

    fn reset_to_idle(&mut self) {
        self.state = CallState::Idle;
        self.ring_deadline = None;
    }

    /// Runs one received frame through sequence tracking and the state
    /// machine.
    pub fn handle_frame(
        &mut self,
        frame: &Frame,
        from: SocketAddr,
        verifier: &ChallengeVerifier,
        now: EpochMillis,
    ) -> Disposition {
        match frame {
            Frame::Full(f) => self.handle_full(f, from, verifier, now),
            Frame::Mini(m) => self.handle_mini(m),
        }
    }

    fn handle_full(
        &mut self,
        f: &FullFrame,
        from: SocketAddr,
        verifier: &ChallengeVerifier,
        now: EpochMillis,
    ) -> Disposition {
        self.track_sequence(f);

        // An ACK is terminal once bookkeeping is done.
        if f.is_ack() {
            return Disposition::default();
        }

        // Lag requests and pings are answered in every state, before any
        // state-specific dispatch.
        if f.is_lagrq() {
            let reply = frame::lagrp(
                self.local_call,
                self.peer_call,
                f.timestamp,
                self.out_seq,
                self.expected_in_seq,
            );
            self.advance_out_seq();
            return Disposition::reply(reply);
        }
        if f.is_ping() {
            let reply = frame::pong(
                self.local_call,
                self.peer_call,
                self.timestamp(now),
                self.out_seq,
                self.expected_in_seq,
            );
            self.advance_out_seq();
            return Disposition::reply(reply);
        }

        match self.state {
            CallState::Idle => self.handle_idle(f, from, now),
            CallState::TokenWait => self.handle_token_wait(f, now),
            CallState::AuthWait => self.handle_auth_wait(f, verifier, now),
            CallState::Ringing | CallState::InCall => self.handle_active(f, now),
        }
    }

    /// Inbound sequence bookkeeping, applied to every full frame before
    /// state dispatch. Retransmissions are exempt; mismatches are logged
    /// but never fatal.
    fn track_sequence(&mut self, f: &FullFrame) {
        if f.is_new() {
            self.expected_in_seq = 1;
            self.out_seq = 0;
        } else if f.is_ack() {
            if !f.retransmit && f.out_seq != self.expected_in_seq {
                warn!(
                    got = f.out_seq,
                    expected = self.expected_in_seq,
                    "inbound sequence mismatch on ACK"
                );
            }
        } else if !f.retransmit {
            if f.out_seq != self.expected_in_seq {
                warn!(
                    got = f.out_seq,
                    expected = self.expected_in_seq,
                    "inbound sequence mismatch"
                );
            }
            self.expected_in_seq = f.out_seq.wrapping_add(1);
        }
    }

    fn handle_idle(&mut self, f: &FullFrame, from: SocketAddr, now: EpochMillis) -> Disposition {
        if !f.is_new() {
            debug!(frame_type = f.frame_type, subclass = f.subclass, "ignoring frame while idle");
            return Disposition::default();
        }

        self.peer_call = f.source_call;
        self.peer_addr = Some(from);
        self.call_start = now;
        self.call_start_stamp = f.timestamp;
        self.voice_sent = 0;
        self.token = auth::issue_call_token();

        let reply = frame::calltoken(
            self.next_call_id,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
            &self.token,
        );
        self.advance_out_seq();
        self.state = CallState::TokenWait;
        Disposition::reply(reply)
    }

    fn handle_token_wait(&mut self, f: &FullFrame, now: EpochMillis) -> Disposition {
        if !f.is_new() {
            debug!("ignoring non-NEW frame while waiting for call token");
            return Disposition::default();
        }

        let token_ok = f.source_call == self.peer_call
            && f.elements()
                .ok()
                .and_then(|ies| ies.get(ie::CALL_TOKEN).map(|t| t == self.token.as_slice()))
                .unwrap_or(false);
        if !token_ok {
            warn!(source_call = f.source_call, "call token mismatch, resetting");
            self.reset_to_idle();
            return Disposition::default();
        }

        self.local_call = self.next_call_id;
        self.next_call_id = self.next_call_id.wrapping_add(1).max(1);
        self.challenge = auth::issue_challenge();
        info!(call = self.local_call, peer = self.peer_call, "call token accepted");

        // The ACK does not consume an outbound sequence slot; the AUTHREQ
        // does.
        let ack = frame::ack(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
        );
        let authreq = frame::authreq(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
            &self.challenge,
        );
        self.advance_out_seq();
        self.state = CallState::AuthWait;
        Disposition { replies: vec![ack, authreq], voice: None }
    }

    fn handle_auth_wait(
        &mut self,
        f: &FullFrame,
        verifier: &ChallengeVerifier,
        now: EpochMillis,
    ) -> Disposition {
        if !f.is_authrep() {
            debug!("ignoring non-AUTHREP frame while waiting for authentication");
            return Disposition::default();
        }

        let response = if f.source_call == self.peer_call && f.dest_call == self.local_call {
            f.elements().ok().and_then(|ies| ies.get(ie::RSA_RESULT).map(|v| v.to_vec()))
        } else {
            None
        };
        let Some(response) = response else {
            warn!("authentication reply missing signed response, resetting");
            self.reset_to_idle();
            return Disposition::default();
        };

        if !verifier.verify(&self.challenge, &response) {
            warn!(call = self.local_call, "authentication failed, resetting");
            self.reset_to_idle();
            return Disposition::default();
        }
        info!(call = self.local_call, "peer authenticated");

        let ack = frame::ack(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
        );
        let accept = frame::accept(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
        );
        self.advance_out_seq();
        let ringing = frame::ringing(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
        );
        self.advance_out_seq();

        self.state = CallState::Ringing;
        self.ring_deadline = Some(now + RING_TIMEOUT_MS);
        Disposition { replies: vec![ack, accept, ringing], voice: None }
    }

    /// Ringing and in-call frame handling: voice is ACKed (no sequence
    /// advance) and played; a hangup during a call tears down to idle.
    fn handle_active(&mut self, f: &FullFrame, now: EpochMillis) -> Disposition {
        if f.is_hangup() && self.state == CallState::InCall {
            let ack = frame::ack(
                self.local_call,
                self.peer_call,
                self.timestamp(now),
                self.out_seq,
                self.expected_in_seq,
            );
            info!(call = self.local_call, "peer hung up");
            self.reset_to_idle();
            return Disposition::reply(ack);
        }

        if f.is_voice() {
            let ack = frame::ack(
                self.local_call,
                self.peer_call,
                self.timestamp(now),
                self.out_seq,
                self.expected_in_seq,
            );
            return Disposition { replies: vec![ack], voice: Some(f.payload.clone()) };
        }

        debug!(
            frame_type = f.frame_type,
            subclass = f.subclass,
            state = ?self.state,
            "ignoring unexpected frame"
        );
        Disposition::default()
    }

    fn handle_mini(&mut self, m: &MiniFrame) -> Disposition {
        match self.state {
            CallState::Ringing | CallState::InCall => {
                Disposition { replies: Vec::new(), voice: Some(m.payload.clone()) }
            }
            _ => {
                debug!("ignoring mini voice frame outside a call");
                Disposition::default()
            }
        }
    }

    /// Fires the ring-to-answer transition when the deadline passes.
    /// Returns the frames to send (ANSWER then STOP SOUNDS, both advancing
    /// the outbound sequence).
    pub fn poll_ring_timer(&mut self, now: EpochMillis) -> Vec<Vec<u8>> {
        let Some(deadline) = self.ring_deadline else {
            return Vec::new();
        };
        if self.state != CallState::Ringing || now < deadline {
            return Vec::new();
        }

        let answer = frame::answer(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
        );
        self.advance_out_seq();
        let stop = frame::stop_sounds(
            self.local_call,
            self.peer_call,
            self.timestamp(now),
            self.out_seq,
            self.expected_in_seq,
        );
        self.advance_out_seq();

        info!(call = self.local_call, "answering call");
        self.state = CallState::InCall;
        self.ring_deadline = None;
        vec![answer, stop]
    }

    /// Wraps one outbound mu-law block in a voice frame.
    ///
    /// The first block of a call goes out as a full frame to establish the
    /// receiver's sequence and timestamp context; every later block uses
    /// the compact mini shape carrying the low 16 timestamp bits.
    pub fn voice_frame(&mut self, mulaw: &[u8], now: EpochMillis) -> Vec<u8> {
        let ts = self.timestamp(now);
        let data = if self.voice_sent == 0 {
            let f = frame::voice_full(
                self.local_call,
                self.peer_call,
                ts,
                self.out_seq,
                self.expected_in_seq,
                mulaw,
            );
            self.advance_out_seq();
            f
        } else {
            frame::voice_mini(self.local_call, ts, mulaw)
        };
        self.voice_sent += 1;
        data
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use linkhub_iax::frame::{
        CONTROL_ANSWER, CONTROL_RINGING, CONTROL_STOP_SOUNDS, IAX_ACCEPT, IAX_ACK, IAX_AUTHREQ,
        IAX_CALLTOKEN, IAX_LAGRP, IAX_PONG, TYPE_CONTROL, TYPE_IAX,
    };
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::RsaPrivateKey;
    use sha1::Sha1;

    fn keypair() -> (SigningKey<Sha1>, ChallengeVerifier) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let pem = private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (SigningKey::new(private), ChallengeVerifier::from_pem(&pem).unwrap())
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:4569".parse().unwrap()
    }

    fn parse_full(data: &[u8]) -> FullFrame {
        match Frame::parse(data).unwrap() {
            Frame::Full(f) => f,
            Frame::Mini(_) => panic!("expected full frame"),
        }
    }

    fn new_frame(source_call: u16, timestamp: u32, payload: Vec<u8>) -> Frame {
        Frame::Full(FullFrame {
            source_call,
            dest_call: 0,
            retransmit: false,
            timestamp,
            out_seq: 0,
            in_seq: 0,
            frame_type: TYPE_IAX,
            subclass: linkhub_iax::frame::IAX_NEW,
            payload,
        })
    }

    /// Drives a session through the whole handshake up to Ringing.
    fn drive_to_ringing(
        session: &mut CallSession,
        signer: &SigningKey<Sha1>,
        verifier: &ChallengeVerifier,
        now: EpochMillis,
    ) {
        // NEW while idle: expect CALLTOKEN, state TokenWait.
        let d = session.handle_frame(&new_frame(9, 5000, Vec::new()), peer(), verifier, now);
        assert_eq!(d.replies.len(), 1);
        let challenge_frame = parse_full(&d.replies[0]);
        assert_eq!(challenge_frame.subclass, IAX_CALLTOKEN);
        let token = challenge_frame
            .elements()
            .unwrap()
            .get(ie::CALL_TOKEN)
            .unwrap()
            .to_vec();
        assert_eq!(session.state(), CallState::TokenWait);

        // NEW echoing the token: expect ACK + AUTHREQ, state AuthWait.
        let mut ies = linkhub_iax::InfoElements::new();
        ies.push(ie::CALL_TOKEN, token);
        let d = session.handle_frame(&new_frame(9, 5000, ies.encode()), peer(), verifier, now);
        assert_eq!(d.replies.len(), 2);
        let ack = parse_full(&d.replies[0]);
        assert_eq!(ack.subclass, IAX_ACK);
        let authreq = parse_full(&d.replies[1]);
        assert_eq!(authreq.subclass, IAX_AUTHREQ);
        // ACK and AUTHREQ share the sequence slot the ACK did not consume.
        assert_eq!(ack.out_seq, authreq.out_seq);
        assert_eq!(session.state(), CallState::AuthWait);

        // Signed reply: expect ACK + ACCEPT + RINGING, state Ringing.
        let challenge = String::from_utf8(
            authreq.elements().unwrap().get(ie::CHALLENGE).unwrap().to_vec(),
        )
        .unwrap();
        let signature = STANDARD.encode(signer.sign(challenge.as_bytes()).to_bytes());
        let mut ies = linkhub_iax::InfoElements::new();
        ies.push(ie::RSA_RESULT, signature.into_bytes());
        let reply = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: authreq.source_call,
            retransmit: false,
            timestamp: 5001,
            out_seq: 1,
            in_seq: 1,
            frame_type: TYPE_IAX,
            subclass: linkhub_iax::frame::IAX_AUTHREP,
            payload: ies.encode(),
        });
        let d = session.handle_frame(&reply, peer(), verifier, now);
        assert_eq!(d.replies.len(), 3);
        assert_eq!(parse_full(&d.replies[0]).subclass, IAX_ACK);
        assert_eq!(parse_full(&d.replies[1]).subclass, IAX_ACCEPT);
        let ringing = parse_full(&d.replies[2]);
        assert_eq!(ringing.frame_type, TYPE_CONTROL);
        assert_eq!(ringing.subclass, CONTROL_RINGING);
        assert_eq!(session.state(), CallState::Ringing);
    }

    #[test]
    fn test_handshake_path_to_in_call() {
        let (signer, verifier) = keypair();
        let mut session = CallSession::new();
        let t0 = EpochMillis::from_millis(1_000_000);

        drive_to_ringing(&mut session, &signer, &verifier, t0);

        // Before the deadline nothing fires.
        assert!(session.poll_ring_timer(t0 + RING_TIMEOUT_MS - 1).is_empty());
        assert_eq!(session.state(), CallState::Ringing);

        // At the deadline: ANSWER + STOP SOUNDS, both advancing.
        let frames = session.poll_ring_timer(t0 + RING_TIMEOUT_MS);
        assert_eq!(frames.len(), 2);
        let answer = parse_full(&frames[0]);
        assert_eq!(answer.subclass, CONTROL_ANSWER);
        let stop = parse_full(&frames[1]);
        assert_eq!(stop.subclass, CONTROL_STOP_SOUNDS);
        assert_eq!(stop.out_seq, answer.out_seq.wrapping_add(1));
        assert_eq!(session.state(), CallState::InCall);
    }

    #[test]
    fn test_token_mismatch_resets_to_idle() {
        let (_, verifier) = keypair();
        let mut session = CallSession::new();
        let now = EpochMillis::from_millis(1);

        session.handle_frame(&new_frame(9, 0, Vec::new()), peer(), &verifier, now);
        assert_eq!(session.state(), CallState::TokenWait);

        let mut ies = linkhub_iax::InfoElements::new();
        ies.push(ie::CALL_TOKEN, b"wrong-token".to_vec());
        let d = session.handle_frame(&new_frame(9, 0, ies.encode()), peer(), &verifier, now);
        assert!(d.replies.is_empty());
        assert_eq!(session.state(), CallState::Idle);
    }

    #[test]
    fn test_bad_signature_resets_to_idle() {
        let (_, verifier) = keypair();
        let (other_signer, _) = keypair();
        let mut session = CallSession::new();
        let now = EpochMillis::from_millis(1);

        let d = session.handle_frame(&new_frame(9, 0, Vec::new()), peer(), &verifier, now);
        let token = parse_full(&d.replies[0])
            .elements()
            .unwrap()
            .get(ie::CALL_TOKEN)
            .unwrap()
            .to_vec();
        let mut ies = linkhub_iax::InfoElements::new();
        ies.push(ie::CALL_TOKEN, token);
        let d = session.handle_frame(&new_frame(9, 0, ies.encode()), peer(), &verifier, now);
        let authreq = parse_full(&d.replies[1]);
        let challenge = authreq.elements().unwrap().get(ie::CHALLENGE).unwrap().to_vec();

        // Signed by the wrong key.
        let signature =
            STANDARD.encode(other_signer.sign(&challenge).to_bytes());
        let mut ies = linkhub_iax::InfoElements::new();
        ies.push(ie::RSA_RESULT, signature.into_bytes());
        let reply = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: authreq.source_call,
            retransmit: false,
            timestamp: 1,
            out_seq: 1,
            in_seq: 1,
            frame_type: TYPE_IAX,
            subclass: linkhub_iax::frame::IAX_AUTHREP,
            payload: ies.encode(),
        });
        let d = session.handle_frame(&reply, peer(), &verifier, now);
        assert!(d.replies.is_empty());
        assert_eq!(session.state(), CallState::Idle);
    }

    #[test]
    fn test_sequence_wraparound() {
        let (_, verifier) = keypair();
        let mut session = CallSession::new();
        let now = EpochMillis::from_millis(1);
        session.handle_frame(&new_frame(9, 0, Vec::new()), peer(), &verifier, now);

        // A frame with outbound sequence 255 advances expectation to 0.
        let ping = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: 1,
            retransmit: false,
            timestamp: 10,
            out_seq: 255,
            in_seq: 1,
            frame_type: TYPE_IAX,
            subclass: linkhub_iax::frame::IAX_PING,
            payload: Vec::new(),
        });
        let d = session.handle_frame(&ping, peer(), &verifier, now);
        let pong = parse_full(&d.replies[0]);
        assert_eq!(pong.subclass, IAX_PONG);
        assert_eq!(pong.in_seq, 0, "expectation must wrap 255 -> 0");
    }

    #[test]
    fn test_ack_never_advances_sequences() {
        let (_, verifier) = keypair();
        let mut session = CallSession::new();
        let now = EpochMillis::from_millis(1);
        session.handle_frame(&new_frame(9, 0, Vec::new()), peer(), &verifier, now);

        let before_out = session.out_seq;
        let before_in = session.expected_in_seq;
        let ack = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: 1,
            retransmit: false,
            timestamp: 10,
            out_seq: before_in,
            in_seq: 1,
            frame_type: TYPE_IAX,
            subclass: IAX_ACK,
            payload: Vec::new(),
        });
        let d = session.handle_frame(&ack, peer(), &verifier, now);
        assert!(d.replies.is_empty());
        assert_eq!(session.out_seq, before_out);
        assert_eq!(session.expected_in_seq, before_in);
    }

    #[test]
    fn test_lagrq_echoes_timestamp_and_ping_answered_everywhere() {
        let (_, verifier) = keypair();
        let mut session = CallSession::new();
        let now = EpochMillis::from_millis(1);

        // Even while idle, a lag request gets an immediate reply echoing
        // the request's own timestamp.
        let lagrq = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: 0,
            retransmit: false,
            timestamp: 77_777,
            out_seq: 0,
            in_seq: 0,
            frame_type: TYPE_IAX,
            subclass: linkhub_iax::frame::IAX_LAGRQ,
            payload: Vec::new(),
        });
        let d = session.handle_frame(&lagrq, peer(), &verifier, now);
        let lagrp = parse_full(&d.replies[0]);
        assert_eq!(lagrp.subclass, IAX_LAGRP);
        assert_eq!(lagrp.timestamp, 77_777);
        assert_eq!(session.state(), CallState::Idle);
    }

    #[test]
    fn test_voice_alternation_full_then_mini() {
        let (signer, verifier) = keypair();
        let mut session = CallSession::new();
        let t0 = EpochMillis::from_millis(1_000_000);
        drive_to_ringing(&mut session, &signer, &verifier, t0);
        session.poll_ring_timer(t0 + RING_TIMEOUT_MS);
        assert!(session.in_call());

        let block = vec![0xFFu8; 160];
        let first = session.voice_frame(&block, t0 + RING_TIMEOUT_MS + 20);
        let full = parse_full(&first);
        assert!(full.is_voice());

        let second = session.voice_frame(&block, t0 + RING_TIMEOUT_MS + 40);
        match Frame::parse(&second).unwrap() {
            Frame::Mini(m) => {
                assert_eq!(m.source_call, full.source_call);
                // Low 16 bits of origin 5000 + elapsed 2040ms.
                assert_eq!(m.timestamp, ((5000 + RING_TIMEOUT_MS as u32 + 40) & 0xFFFF) as u16);
            }
            Frame::Full(_) => panic!("second voice block must be a mini frame"),
        }
    }

    #[test]
    fn test_hangup_returns_to_idle_and_next_call_gets_new_id() {
        let (signer, verifier) = keypair();
        let mut session = CallSession::new();
        let t0 = EpochMillis::from_millis(1_000_000);
        drive_to_ringing(&mut session, &signer, &verifier, t0);
        session.poll_ring_timer(t0 + RING_TIMEOUT_MS);

        let before_out = session.out_seq;
        let hangup = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: 1,
            retransmit: false,
            timestamp: 9000,
            out_seq: session.expected_in_seq,
            in_seq: 3,
            frame_type: TYPE_IAX,
            subclass: linkhub_iax::frame::IAX_HANGUP,
            payload: Vec::new(),
        });
        let d = session.handle_frame(&hangup, peer(), &verifier, t0 + 3000);
        assert_eq!(parse_full(&d.replies[0]).subclass, IAX_ACK);
        // The hangup ACK does not consume a sequence slot.
        assert_eq!(session.out_seq, before_out);
        assert_eq!(session.state(), CallState::Idle);

        // A fresh call allocates the next call id.
        drive_to_ringing(&mut session, &signer, &verifier, t0 + 10_000);
        assert_eq!(session.local_call, 2);
    }

    #[test]
    fn test_voice_during_ringing_acked_without_advance() {
        let (signer, verifier) = keypair();
        let mut session = CallSession::new();
        let t0 = EpochMillis::from_millis(1_000_000);
        drive_to_ringing(&mut session, &signer, &verifier, t0);

        let before_out = session.out_seq;
        let voice = Frame::Full(FullFrame {
            source_call: 9,
            dest_call: 1,
            retransmit: false,
            timestamp: 5100,
            out_seq: session.expected_in_seq,
            in_seq: 2,
            frame_type: linkhub_iax::frame::TYPE_VOICE,
            subclass: linkhub_iax::frame::FORMAT_ULAW,
            payload: vec![0xFF; 160],
        });
        let d = session.handle_frame(&voice, peer(), &verifier, t0 + 100);
        assert_eq!(d.replies.len(), 1);
        assert_eq!(parse_full(&d.replies[0]).subclass, IAX_ACK);
        assert_eq!(d.voice.as_deref(), Some(&[0xFFu8; 160][..]));
        assert_eq!(session.out_seq, before_out);
        assert_eq!(session.state(), CallState::Ringing);
    }
}
