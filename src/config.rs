//! Configurables enumerated in §6, collected into a single struct passed
//! once at construction (§1.1: no external config-file crate — this is a
//! library, not the binary that owns on-disk configuration).

use std::time::Duration;

/// Tunables for delay estimation, drift filtering, and scheduling. All
/// fields have the defaults §6 specifies.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Nominal period between Delay-Req emissions. Default 10s.
    pub delay_req_interval: Duration,
    /// Upper bound of the uniform jitter added to `delay_req_interval`.
    /// Default ~1.048576s (2^20 microseconds).
    pub delay_req_jitter_max: Duration,
    /// How long to wait for a Delay-Resp before retrying. Default 0.5s.
    pub delay_req_timeout: Duration,
    /// Reject any RTT sample above this many nanoseconds. Default 200_000.
    pub rtt_plausibility_limit_ns: i64,
    /// Reject any drift sample whose magnitude (in q32 units) exceeds this.
    /// Default ~42_949_673, i.e. ~10_000 ppm.
    pub drift_plausibility_limit_q32: i32,
    /// RTT smoothing weights: `smoothed = (old*rtt + new*raw) / (old+new)`.
    /// Default `(3, 1)`, i.e. 3/4 old plus 1/4 new.
    pub rtt_ema_weight: (u32, u32),
    /// Divisor applied to a raw drift sample before it's accumulated into
    /// `drift_q32` (`raw / divisor + drift_q32`). Default 8, i.e. 1/8 new
    /// added to the running total.
    pub drift_ema_divisor: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delay_req_interval: Duration::from_secs(10),
            delay_req_jitter_max: Duration::from_micros(1 << 20),
            delay_req_timeout: Duration::from_millis(500),
            rtt_plausibility_limit_ns: 200_000,
            drift_plausibility_limit_q32: 42_949_673,
            rtt_ema_weight: (3, 1),
            drift_ema_divisor: 8,
        }
    }
}
