//! The real-time event loop.
//!
//! Single thread, cooperative, no blocking anywhere: hardware capture and
//! the network socket are polled, the 20ms cadence is derived from a tick
//! counter against loop start, and every iteration runs its phases in a
//! fixed order (capture drain, registration, ring timer, outbound audio,
//! inbound frame). `step` is public so tests can drive the loop with a
//! fabricated clock.

use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, UdpSocket};

use linkhub_audio::{InboundPath, OutboundPath, NARROW_BLOCK};
use linkhub_iax::Frame;
use tracing::{debug, warn};

use crate::auth::ChallengeVerifier;
use crate::clock::EpochMillis;
use crate::device::{AudioInput, AudioOutput};
use crate::error::Result;
use crate::registration::Registrar;
use crate::session::CallSession;

/// Tick period driving outbound audio.
pub const TICK_MS: i64 = 20;

/// Maximum queued capture blocks (~320ms of audio). Beyond this the oldest
/// block is dropped so call latency cannot grow without bound.
pub const MAX_CAPTURE_DEPTH: usize = 16;

/// The top-level driver owning the session, the transcoding paths, and
/// every collaborator boundary.
pub struct Scheduler<I, O, R> {
    socket: UdpSocket,
    session: CallSession,
    verifier: ChallengeVerifier,
    outbound: OutboundPath,
    inbound: InboundPath,
    capture: I,
    playback: O,
    registrar: R,
    registration_interval_ms: i64,
    last_registration: EpochMillis,
    capture_queue: VecDeque<Vec<i16>>,
    loop_start: Option<EpochMillis>,
    tick_counter: u64,
}

impl<I: AudioInput, O: AudioOutput, R: Registrar> Scheduler<I, O, R> {
    /// Wires up the loop around an already-bound socket. The socket is
    /// switched to non-blocking mode here; the transcoding paths get their
    /// once-per-process filter state.
    pub fn new(
        socket: UdpSocket,
        verifier: ChallengeVerifier,
        capture: I,
        playback: O,
        registrar: R,
        registration_interval_ms: u64,
    ) -> Result<Self> {
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            session: CallSession::new(),
            verifier,
            outbound: OutboundPath::new(),
            inbound: InboundPath::new(),
            capture,
            playback,
            registrar,
            registration_interval_ms: registration_interval_ms as i64,
            last_registration: EpochMillis::from_millis(0),
            capture_queue: VecDeque::new(),
            loop_start: None,
            tick_counter: 0,
        })
    }

    /// Read-only view of the session, for tests and diagnostics.
    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Runs the loop forever.
    pub fn run(&mut self) {
        loop {
            self.step(EpochMillis::now());
        }
    }

    /// One loop iteration at the given instant.
    pub fn step(&mut self, now: EpochMillis) {
        let start = *self.loop_start.get_or_insert(now);

        // (a) Has the next 20ms tick boundary passed?
        let is_tick = now.diff(start) >= self.tick_counter as i64 * TICK_MS;
        if is_tick {
            self.tick_counter += 1;
        }

        // (b) Drain hardware capture unconditionally so the device buffer
        // cannot overrun; keep the block only while a call is active.
        if let Some(block) = self.capture.read_block() {
            if self.session.in_call() {
                if self.capture_queue.len() >= MAX_CAPTURE_DEPTH {
                    self.capture_queue.pop_front();
                    warn!("capture queue full, dropping oldest block");
                }
                self.capture_queue.push_back(block);
            }
        }

        // (c) Periodic registration.
        if now.diff(self.last_registration) > self.registration_interval_ms {
            if let Err(e) = self.registrar.register() {
                warn!(error = %e, "registration failed");
            }
            self.last_registration = now;
        }

        // (d) Ring timer.
        let frames = self.session.poll_ring_timer(now);
        for f in &frames {
            self.send_to_peer(f);
        }

        // (e) Outbound audio: one queued block per tick while in a call.
        if self.session.in_call() && is_tick {
            if let Some(block) = self.capture_queue.pop_front() {
                match self.outbound.process(&block) {
                    Ok(mulaw) => {
                        let data = self.session.voice_frame(&mulaw, now);
                        self.send_to_peer(&data);
                    }
                    Err(e) => warn!(error = %e, "dropping capture block"),
                }
            }
        }

        // (f) One non-blocking receive attempt.
        let mut buf = [0u8; 4096];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => self.dispatch(&buf[..len], from, now),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => warn!(error = %e, "socket receive error"),
        }
    }

    fn dispatch(&mut self, datagram: &[u8], from: SocketAddr, now: EpochMillis) {
        let frame = match Frame::parse(datagram) {
            Ok(f) => f,
            Err(e) => {
                debug!(error = %e, %from, "dropping malformed datagram");
                return;
            }
        };

        let disposition = self.session.handle_frame(&frame, from, &self.verifier, now);
        for reply in &disposition.replies {
            self.send_to(reply, from);
        }

        if let Some(voice) = disposition.voice {
            self.play(&voice);
        }
    }

    /// Runs one inbound voice payload through decode + upsample and hands
    /// it to playback. Wrong-sized payloads are dropped before they reach
    /// the fixed-block pipeline.
    fn play(&mut self, mulaw: &[u8]) {
        if mulaw.len() != NARROW_BLOCK {
            warn!(len = mulaw.len(), "dropping voice payload with wrong block size");
            return;
        }
        match self.inbound.process(mulaw) {
            Ok(pcm) => {
                if let Err(e) = self.playback.write(&pcm) {
                    warn!(error = %e, "playback error");
                }
            }
            Err(e) => warn!(error = %e, "inbound transcode error"),
        }
    }

    fn send_to_peer(&self, data: &[u8]) {
        if let Some(addr) = self.session.peer_addr() {
            self.send_to(data, addr);
        }
    }

    fn send_to(&self, data: &[u8], addr: SocketAddr) {
        if let Err(e) = self.socket.send_to(data, addr) {
            warn!(error = %e, %addr, "send failed");
        }
    }
}
