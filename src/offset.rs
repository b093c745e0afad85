//! Offset Estimator & Drift Filter (§4.6): consumes the Sync/Follow-Up pair,
//! steps the clock, and maintains a smoothed q32 drift estimate.

use crate::clock::HardwareClock;
use crate::config::Config;
use crate::messages::{FollowUpMessage, SyncMessage};
use crate::state::{PtpClient, Phase};
use crate::timestamp::Timestamp;

impl PtpClient {
    /// Handle an incoming Sync. One-step Syncs adjust immediately; two-step
    /// Syncs wait for the matching Follow-Up.
    pub fn on_sync(&mut self, msg: &SyncMessage, rx_ts: Timestamp, clock: &mut impl HardwareClock, config: &Config) {
        let Some(selected) = self.selector.selected() else {
            return;
        };
        if msg.header.source_port_identity.clock_identity != selected.id {
            return;
        }

        self.last_sync_sequence_id = msg.header.sequence_id;

        if !msg.header.is_two_step() {
            self.adjust_time(msg.origin_timestamp, rx_ts, clock, config);
            self.phase = Phase::Idle;
        } else {
            self.pending_tx_ts = Some(rx_ts);
            self.phase = Phase::WaitForFollowUp;
        }
    }

    /// Handle an incoming Follow-Up, completing a two-step Sync exchange.
    pub fn on_follow_up(&mut self, msg: &FollowUpMessage, clock: &mut impl HardwareClock, config: &Config) {
        let Some(selected) = self.selector.selected() else {
            return;
        };
        if self.phase != Phase::WaitForFollowUp {
            return;
        }
        if msg.header.source_port_identity.clock_identity != selected.id {
            return;
        }
        if msg.header.sequence_id != self.last_sync_sequence_id {
            return;
        }
        let Some(pending_tx_ts) = self.pending_tx_ts else {
            return;
        };

        self.adjust_time(msg.precise_origin_timestamp, pending_tx_ts, clock, config);
        self.phase = Phase::Idle;
    }

    /// Step the clock and refresh the drift filter. `server_ts` is the
    /// server-side origin timestamp; `local_ts` is the corresponding local
    /// capture instant (the Sync RX stamp for one-step, the Follow-Up's
    /// pending TX/RX stamp for two-step).
    pub(crate) fn adjust_time(
        &mut self,
        server_ts: Timestamp,
        local_ts: Timestamp,
        clock: &mut impl HardwareClock,
        config: &Config,
    ) {
        let offset_ns = server_ts - local_ts + self.rtt_ns / 2;
        clock.adjust(offset_ns);

        if let Some(last_server_time) = self.last_server_time {
            let interval = server_ts - last_server_time;
            if interval != 0 {
                let raw: i128 = ((offset_ns as i128) << 32) / interval as i128;
                let smoothed: i128 = if self.drift_q32 != 0 {
                    raw / config.drift_ema_divisor as i128 + self.drift_q32 as i128
                } else {
                    raw
                };

                if smoothed.unsigned_abs() > config.drift_plausibility_limit_q32 as u128 {
                    log::debug!("rejected implausible drift sample {smoothed} q32");
                    self.drift_q32 = 0;
                } else {
                    self.drift_q32 = smoothed as i32;
                    self.diagnostics.store_drift(self.drift_q32);
                    clock.adjust_rate(self.drift_q32);
                }
            }
        }

        self.last_server_time = Some(server_ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::MockClock;
    use crate::messages::{ClockIdentity, PortIdentity, PtpHeader, PtpMessageType};

    fn header(seq: u16, two_step: bool, sender: ClockIdentity) -> PtpHeader {
        PtpHeader {
            message_type: PtpMessageType::Sync,
            version_major: 2,
            version_minor: 0,
            message_length: 44,
            domain_number: 0,
            flags: if two_step { crate::messages::flags::TWO_STEP } else { 0 },
            correction_field: 0,
            source_port_identity: PortIdentity {
                clock_identity: sender,
                port_number: 1,
            },
            sequence_id: seq,
            control_field: 0,
            log_message_interval: 0,
        }
    }

    fn sync(seq: u16, two_step: bool, sender: ClockIdentity, origin_timestamp: Timestamp) -> SyncMessage {
        SyncMessage {
            header: header(seq, two_step, sender),
            origin_timestamp,
        }
    }

    fn follow_up(seq: u16, sender: ClockIdentity, precise_origin_timestamp: Timestamp) -> FollowUpMessage {
        FollowUpMessage {
            header: header(seq, true, sender),
            precise_origin_timestamp,
        }
    }

    #[test]
    fn one_step_sync_adjusts_negative_offset() {
        let server = ClockIdentity([1; 8]);
        let mut client = PtpClient::new(ClockIdentity([9; 8]));
        client.selector.on_announce(server, 5, 0);

        let origin = 1_700_000_000_500_000_000i64;
        let rx = 1_700_000_000_500_001_000i64;
        let msg = sync(1, false, server, origin);
        let mut clock = MockClock::new(rx);
        let config = Config::default();

        client.on_sync(&msg, rx, &mut clock, &config);

        assert_eq!(clock.adjust_calls[0], origin - rx); // -1000
        assert_eq!(clock.adjust_calls[0], -1000);
        assert_eq!(client.phase, Phase::Idle);
    }

    #[test]
    fn two_step_sync_then_follow_up() {
        let server = ClockIdentity([1; 8]);
        let mut client = PtpClient::new(ClockIdentity([9; 8]));
        client.selector.on_announce(server, 5, 0);
        client.rtt_ns = 1000;

        let rx = 1_700_000_000_000_000_000i64;
        let msg = sync(42, true, server, 0);
        let mut clock = MockClock::new(rx);
        let config = Config::default();

        client.on_sync(&msg, rx, &mut clock, &config);
        assert_eq!(client.phase, Phase::WaitForFollowUp);
        assert_eq!(client.pending_tx_ts, Some(rx));

        let origin = rx + 800;
        let fu = follow_up(42, server, origin);
        client.on_follow_up(&fu, &mut clock, &config);

        assert_eq!(client.phase, Phase::Idle);
        assert_eq!(clock.adjust_calls[0], 800 + client.rtt_ns / 2);
    }

    #[test]
    fn follow_up_with_wrong_sequence_is_ignored() {
        let server = ClockIdentity([1; 8]);
        let mut client = PtpClient::new(ClockIdentity([9; 8]));
        client.selector.on_announce(server, 5, 0);

        let rx = 1_000_000_000i64;
        let msg = sync(5, true, server, 0);
        let mut clock = MockClock::new(rx);
        let config = Config::default();
        client.on_sync(&msg, rx, &mut clock, &config);

        let fu = follow_up(6, server, rx + 100);
        client.on_follow_up(&fu, &mut clock, &config);

        assert!(clock.adjust_calls.is_empty());
        assert_eq!(client.phase, Phase::WaitForFollowUp);
    }

    #[test]
    fn adjust_time_with_no_history_skips_drift_update() {
        let mut client = PtpClient::new(ClockIdentity([9; 8]));
        let mut clock = MockClock::new(1000);
        let config = Config::default();
        client.adjust_time(1000, 1000, &mut clock, &config);
        assert_eq!(clock.adjust_calls[0], 0);
        assert!(clock.adjust_rate_calls.is_empty());
        assert_eq!(client.drift_q32, 0);
    }

    #[test]
    fn drift_exceeding_plausibility_limit_is_discarded() {
        let mut client = PtpClient::new(ClockIdentity([9; 8]));
        let mut clock = MockClock::new(0);
        let config = Config::default();

        client.adjust_time(0, 0, &mut clock, &config); // establishes last_server_time = 0
        // A huge offset over a tiny interval produces an implausible raw drift.
        client.adjust_time(1, 1_000_000_000, &mut clock, &config);
        assert_eq!(client.drift_q32, 0);
    }

    #[test]
    fn one_shot_drift_adoption_then_accumulating_smoothing() {
        let mut client = PtpClient::new(ClockIdentity([9; 8]));
        let mut clock = MockClock::new(0);
        let config = Config::default();

        client.adjust_time(0, 0, &mut clock, &config);
        client.adjust_time(1_000_000_000, 1_000_000_000, &mut clock, &config);
        // offset_ns at this call = 0, so drift stays 0; exercise a nonzero offset instead below.
        let mut client2 = PtpClient::new(ClockIdentity([9; 8]));
        client2.adjust_time(0, 0, &mut clock, &config);
        client2.adjust_time(1_000_100, 1_000_000_000, &mut clock, &config);
        assert_ne!(client2.drift_q32, 0);
        let first = client2.drift_q32;
        client2.adjust_time(2_000_100, 2_000_000_000, &mut clock, &config);
        // Accumulating smoothing means the second value isn't simply the new raw.
        assert_ne!(client2.drift_q32, first);
    }

    #[test]
    fn drift_ema_divisor_is_configurable() {
        let mut client_default = PtpClient::new(ClockIdentity([9; 8]));
        let mut client_custom = PtpClient::new(ClockIdentity([9; 8]));
        let mut clock = MockClock::new(0);
        let default_config = Config::default();
        let mut custom_config = Config::default();
        custom_config.drift_ema_divisor = 2; // coarser smoothing than the /8 default

        for client in [&mut client_default, &mut client_custom] {
            client.adjust_time(0, 0, &mut clock, &default_config);
            client.adjust_time(1_000_100, 1_000_000_000, &mut clock, &default_config);
        }

        client_default.adjust_time(2_000_100, 2_000_000_000, &mut clock, &default_config);
        client_custom.adjust_time(2_000_100, 2_000_000_000, &mut clock, &custom_config);

        assert_ne!(client_default.drift_q32, client_custom.drift_q32);
    }
}
