//! Delay Estimator (§4.5): Delay-Req/Delay-Resp exchange and RTT smoothing.

use crate::config::Config;
use crate::messages::{DelayReqMessage, DelayRespMessage, PortIdentity};
use crate::scheduler::{Scheduler, TimerId};
use crate::state::{PtpClient, Phase};
use crate::timestamp::Timestamp;
use crate::transport::Transport;

fn jittered_interval(config: &Config, rng: &mut impl rand::Rng) -> std::time::Duration {
    crate::scheduler::delay_req_interval_with_jitter(
        config.delay_req_interval,
        config.delay_req_jitter_max,
        rng,
    )
}

impl PtpClient {
    /// Emit a Delay-Req and arm the Delay-Resp timeout, or — if no TX
    /// hardware timestamp is available — log, stay IDLE, and re-arm the
    /// periodic timer instead (the resolved Open Question from §9: only
    /// proceed when a TX timestamp is actually delivered).
    pub fn send_delay_req(
        &mut self,
        transport: &mut impl Transport,
        scheduler: &mut impl Scheduler,
        config: &Config,
        rng: &mut impl rand::Rng,
    ) {
        if self.selector.selected().is_none() {
            scheduler.arm(TimerId::DelayReqInterval, jittered_interval(config, rng));
            return;
        }

        self.last_delay_req_sequence_id = self.last_delay_req_sequence_id.wrapping_add(1);
        let source = PortIdentity {
            clock_identity: self.local_clock_id,
            port_number: 1,
        };
        let msg = DelayReqMessage::new(source, self.last_delay_req_sequence_id, 0);
        let bytes = msg.to_bytes();

        match transport.send_delay_req(source, &bytes) {
            Some(tx_ts) => {
                self.pending_tx_ts = Some(tx_ts);
                self.phase = Phase::WaitForDelayResp;
                scheduler.arm(TimerId::DelayRespTimeout, config.delay_req_timeout);
            }
            None => {
                log::warn!("no TX hardware timestamp for Delay-Req; skipping exchange");
                self.phase = Phase::Idle;
                scheduler.arm(TimerId::DelayReqInterval, jittered_interval(config, rng));
            }
        }
    }

    /// Handle an incoming Delay-Resp. `server_capture_ts` is the local
    /// hardware RX timestamp of this datagram (see `messages::DelayRespMessage`
    /// docs and `DESIGN.md` for why this substitutes for a wire-carried
    /// timestamp here).
    pub fn on_delay_resp(
        &mut self,
        msg: &DelayRespMessage,
        server_capture_ts: Timestamp,
        scheduler: &mut impl Scheduler,
        config: &Config,
        rng: &mut impl rand::Rng,
    ) {
        let Some(selected) = self.selector.selected() else {
            return;
        };
        if msg.header.source_port_identity.clock_identity != selected.id {
            return;
        }
        if self.phase != Phase::WaitForDelayResp {
            return;
        }
        if msg.requesting_port_identity.clock_identity != self.local_clock_id {
            return;
        }
        if msg.header.sequence_id != self.last_delay_req_sequence_id {
            return;
        }
        let Some(pending_tx_ts) = self.pending_tx_ts else {
            return;
        };

        let half_rtt = self.rtt_ns / 2;
        let raw_rtt = server_capture_ts - (pending_tx_ts - half_rtt);

        if raw_rtt > config.rtt_plausibility_limit_ns || raw_rtt < 0 {
            log::debug!("rejected implausible RTT sample {raw_rtt}ns");
            self.rtt_ns = 0;
        } else if self.rtt_ns > 0 {
            let (old_weight, new_weight) = config.rtt_ema_weight;
            self.rtt_ns = (old_weight as i64 * self.rtt_ns + new_weight as i64 * raw_rtt)
                / (old_weight + new_weight) as i64;
        } else {
            self.rtt_ns = raw_rtt;
        }

        // Always cleared: an RTT change must not feed a stale interval into
        // the next drift computation (§4.5, confirmed by S6).
        self.last_server_time = None;
        self.phase = Phase::Idle;
        self.diagnostics.store_rtt(self.rtt_ns as u32);

        scheduler.arm(TimerId::DelayReqInterval, jittered_interval(config, rng));
    }
}
