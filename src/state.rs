//! Client state machine (§4.7): IDLE / WAIT_FOR_FOLLOW_UP / WAIT_FOR_DELAY_RESP,
//! wired to a shared-atomics diagnostics block for read-only external
//! inspection (§5). Handler bodies for Sync/Follow-Up and Delay-Req/Delay-Resp
//! live in `offset.rs` and `delay.rs` respectively as `impl PtpClient`
//! blocks; this module owns the struct, dispatch, and the atomics.

use std::sync::atomic::{AtomicI32, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::HardwareClock;
use crate::config::Config;
use crate::error::CodecError;
use crate::messages::{ClockIdentity, PtpMessage};
use crate::scheduler::{Scheduler, TimerId};
use crate::selector::{AnnounceOutcome, ServerSelector};
use crate::timestamp::Timestamp;
use crate::transport::{RxDatagram, Transport};

/// The three states a client occupies between exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WaitForFollowUp,
    WaitForDelayResp,
}

/// Read-only diagnostics updated from the event context and safe to read
/// concurrently from other contexts (§5: "word-aligned integers... atomic
/// stores"). The clock identity is packed into a single `u64` (its 8 bytes,
/// big-endian) so a reader never observes a torn value.
#[derive(Debug, Default)]
pub struct Diagnostics {
    rtt_ns: AtomicU32,
    utc_offset_s: AtomicU16,
    drift_q32: AtomicI32,
    server_clock_id: AtomicU64,
}

impl Diagnostics {
    pub fn store_rtt(&self, rtt_ns: u32) {
        self.rtt_ns.store(rtt_ns, Ordering::Relaxed);
    }

    pub fn store_utc_offset(&self, utc_offset_s: u16) {
        self.utc_offset_s.store(utc_offset_s, Ordering::Relaxed);
    }

    pub fn store_drift(&self, drift_q32: i32) {
        self.drift_q32.store(drift_q32, Ordering::Relaxed);
    }

    pub fn store_server_id(&self, id: ClockIdentity) {
        self.server_clock_id.store(id.to_u64(), Ordering::Relaxed);
    }

    /// §6 inspection interface.
    pub fn get_rtt(&self) -> u32 {
        self.rtt_ns.load(Ordering::Relaxed)
    }

    pub fn get_utc_offset(&self) -> u16 {
        self.utc_offset_s.load(Ordering::Relaxed)
    }

    pub fn get_clock_drift(&self) -> i32 {
        self.drift_q32.load(Ordering::Relaxed)
    }

    pub fn get_server_clock_id(&self) -> ClockIdentity {
        ClockIdentity::from_u64(self.server_clock_id.load(Ordering::Relaxed))
    }
}

/// All mutable state for one PTP client instance. Owned and mutated only from
/// the single event context (§5); no internal locking.
pub struct PtpClient {
    pub(crate) phase: Phase,
    pub(crate) local_clock_id: ClockIdentity,
    pub(crate) selector: ServerSelector,
    pub(crate) last_sync_sequence_id: u16,
    pub(crate) last_delay_req_sequence_id: u16,
    pub(crate) pending_tx_ts: Option<Timestamp>,
    pub(crate) last_server_time: Option<Timestamp>,
    pub(crate) rtt_ns: i64,
    pub(crate) drift_q32: i32,
    pub diagnostics: Diagnostics,
}

impl PtpClient {
    pub fn new(local_clock_id: ClockIdentity) -> Self {
        Self {
            phase: Phase::Idle,
            local_clock_id,
            selector: ServerSelector::new(),
            last_sync_sequence_id: 0,
            last_delay_req_sequence_id: 0,
            pending_tx_ts: None,
            last_server_time: None,
            rtt_ns: 0,
            drift_q32: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    /// §6 start entry point, narrowed to what's in scope for this crate:
    /// derive/record the local clock identity, initialize state, and arm the
    /// first periodic Delay-Req timer. Interface discovery, multicast join,
    /// and socket creation (the failure modes behind `StartError`) are the
    /// caller's responsibility, performed on the `Transport` handed to the
    /// handler methods afterward — this crate never opens a socket.
    pub fn start(
        local_clock_id: ClockIdentity,
        scheduler: &mut impl Scheduler,
        config: &Config,
        rng: &mut impl rand::Rng,
    ) -> Self {
        let client = Self::new(local_clock_id);
        scheduler.arm(
            TimerId::DelayReqInterval,
            crate::scheduler::delay_req_interval_with_jitter(
                config.delay_req_interval,
                config.delay_req_jitter_max,
                rng,
            ),
        );
        client
    }

    pub fn local_clock_id(&self) -> ClockIdentity {
        self.local_clock_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected_server(&self) -> Option<ClockIdentity> {
        self.selector.selected().map(|s| s.id)
    }

    /// Process an Announce (§4.4). A first selection or a switch to a
    /// strictly higher-priority server forces `phase := IDLE`, zeroes the
    /// RTT filter (§8: "selected server strictly changes and rtt_ns becomes
    /// 0"), and schedules an immediate fresh Delay-Req (§5 cancellation
    /// policy).
    pub fn on_announce(
        &mut self,
        // Keyed on the Announce's source port identity, the same field Sync
        // and Delay-Resp matching use, not the grandmasterIdentity body
        // field: they can differ, and selection must track whichever
        // clock identity the rest of the exchange is matched against.
        sender: ClockIdentity,
        priority1: u8,
        utc_offset_s: u16,
        scheduler: &mut impl Scheduler,
    ) {
        let outcome = self.selector.on_announce(sender, priority1, utc_offset_s);
        match outcome {
            AnnounceOutcome::FirstSelection | AnnounceOutcome::Switched => {
                self.rtt_ns = 0;
                self.drift_q32 = 0;
                self.phase = Phase::Idle;
                self.pending_tx_ts = None;
                self.last_server_time = None;
                self.diagnostics.store_rtt(0);
                self.diagnostics.store_server_id(sender);
                self.diagnostics.store_utc_offset(utc_offset_s);
                scheduler.cancel(TimerId::DelayRespTimeout);
                scheduler.arm(TimerId::DelayReqInterval, Duration::ZERO);
            }
            AnnounceOutcome::Refreshed => {
                self.diagnostics.store_utc_offset(utc_offset_s);
            }
            AnnounceOutcome::Ignored => {}
        }
    }

    /// The periodic Delay-Req scheduling tick: ages the selector (§4.7) and
    /// dispatches per the current phase.
    pub fn on_delay_req_timer(
        &mut self,
        transport: &mut impl Transport,
        scheduler: &mut impl Scheduler,
        config: &Config,
        rng: &mut impl rand::Rng,
    ) {
        self.selector.on_tick();

        match self.phase {
            Phase::Idle => self.send_delay_req(transport, scheduler, config, rng),
            Phase::WaitForFollowUp => {
                // Abandon the pending Follow-Up wait; a fresh Delay-Req takes
                // priority over a stalled two-step Sync.
                self.pending_tx_ts = None;
                self.phase = Phase::Idle;
                self.send_delay_req(transport, scheduler, config, rng);
            }
            Phase::WaitForDelayResp => {
                // The periodic Delay-Req timer and the Delay-Resp timeout are
                // mutually exclusive arms (§4.7's transition table only lets
                // WAIT_FOR_DELAY_RESP react to a Delay-Resp or its own
                // timeout); reaching this arm means the scheduler fired the
                // wrong timer, a fatal implementation bug per §7 kind 5 —
                // logged before panicking so release builds never mask it.
                let _ = (transport, rng);
                log::error!("delay-req timer fired while already awaiting a delay-resp");
                unreachable!("delay-req timer should not fire in WaitForDelayResp");
            }
        }
    }

    /// The bounded wait for a Delay-Resp expired: retry with a new Delay-Req
    /// (§4.7: "send new Delay-Req", staying in WAIT_FOR_DELAY_RESP).
    pub fn on_delay_resp_timeout(
        &mut self,
        transport: &mut impl Transport,
        scheduler: &mut impl Scheduler,
        config: &Config,
        rng: &mut impl rand::Rng,
    ) {
        self.send_delay_req(transport, scheduler, config, rng);
    }

    /// Decode and dispatch one received datagram. Decode failures and
    /// messages outside {Sync, Follow-Up, Announce, Delay-Resp} are silently
    /// discarded with a debug-level trace (§7, kind 3: protocol anomaly).
    pub fn on_datagram(
        &mut self,
        datagram: &RxDatagram<'_>,
        clock: &mut impl HardwareClock,
        scheduler: &mut impl Scheduler,
        config: &Config,
        rng: &mut impl rand::Rng,
    ) {
        let msg = match PtpMessage::decode(datagram.bytes) {
            Ok(msg) => msg,
            Err(err) => {
                log::debug!("discarding malformed PTP datagram: {err}");
                return;
            }
        };

        match msg {
            PtpMessage::Announce(announce) => {
                self.on_announce(
                    announce.header.source_port_identity.clock_identity,
                    announce.grandmaster_priority1,
                    announce.current_utc_offset as u16,
                    scheduler,
                );
            }
            PtpMessage::Sync(sync) => {
                let Some(rx_ts) = datagram.hw_rx_timestamp else {
                    log::warn!("no RX hardware timestamp for Sync; skipping");
                    return;
                };
                self.on_sync(&sync, rx_ts, clock, config);
            }
            PtpMessage::FollowUp(follow_up) => {
                self.on_follow_up(&follow_up, clock, config);
            }
            PtpMessage::DelayResp(delay_resp) => {
                let Some(rx_ts) = datagram.hw_rx_timestamp else {
                    log::warn!("no RX hardware timestamp for Delay-Resp; skipping");
                    return;
                };
                self.on_delay_resp(&delay_resp, rx_ts, scheduler, config, rng);
            }
            PtpMessage::Other(hdr) => {
                log::trace!("ignoring unsupported message type {:?}", hdr.message_type);
            }
        }
    }
}

/// Decoding error re-exported here for callers that wire `on_datagram`'s
/// return path through their own error handling; `on_datagram` itself never
/// propagates `CodecError`, per §7's "silently discarded" policy for
/// protocol anomalies.
pub type DecodeError = CodecError;
