//! Scheduler seam (§4.7.1): "arm a one-shot timer that fires after a
//! duration", consumed by the state machine. The concrete timer (OS thread,
//! RTOS tick, or test mock) lives outside this crate, per §1.

use std::time::Duration;

/// The three timers the state machine arms. Arming a timer implicitly
/// cancels any previously pending expiry of the same id (§9: "each
/// `set_timer` operation first removes any pending timer").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Periodic Delay-Req scheduling tick (also drives selector aging).
    DelayReqInterval,
    /// Bounded wait for a Delay-Resp after sending a Delay-Req.
    DelayRespTimeout,
}

/// Abstract one-shot timer arming/cancellation.
pub trait Scheduler {
    /// Arm `which` to fire after `after`, replacing any previous arming of
    /// the same id.
    fn arm(&mut self, which: TimerId, after: Duration);

    /// Cancel a pending timer, if any. Idempotent.
    fn cancel(&mut self, which: TimerId);
}

/// Draw a Delay-Req interval with jitter: nominally `base`, plus a uniform
/// random offset in `[0, jitter_max)`, per §4.7's "many clients sharing a
/// server do not synchronize their requests".
pub fn delay_req_interval_with_jitter(
    base: Duration,
    jitter_max: Duration,
    rng: &mut impl rand::Rng,
) -> Duration {
    if jitter_max.is_zero() {
        return base;
    }
    let jitter_ns = rng.gen_range(0..jitter_max.as_nanos().max(1) as u64);
    base + Duration::from_nanos(jitter_ns)
}
