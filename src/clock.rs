//! Hardware Clock Interface (§4.3): the seam this crate consumes but does not
//! implement. The actual PTP peripheral driver (monotonic counter, step and
//! rate adjustment registers) lives outside this crate, per §1.

use crate::timestamp::Timestamp;

/// Monotonic nanosecond clock with step and optional rate adjustment.
pub trait HardwareClock {
    /// Current time, monotonic, nanosecond precision.
    fn read(&self) -> Timestamp;

    /// Step the clock by a signed nanosecond delta.
    fn adjust(&mut self, delta_ns: i64);

    /// Apply a parts-per-2^32 rate correction, if the hardware supports it.
    /// Returns whether the adjustment was actually applied; callers must not
    /// treat `false` as an error, only as "stepping only, no rate control".
    fn adjust_rate(&mut self, drift_q32: i32) -> bool;
}
