//! Error taxonomy for the PTP client.
//!
//! Only the two caller-facing kinds get typed `Result`s: codec rejection and
//! start-time transport failure. Everything else the protocol can reject
//! (capability absence, sequence mismatches, implausible measurements) is
//! recovered locally by the handler that observed it and never leaves this
//! crate as an `Err` — see the module docs on `state`.

use thiserror::Error;

/// Rejection reasons for a single incoming datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported PTP version {major}.{minor}")]
    BadVersion { major: u8, minor: u8 },

    #[error("truncated message: needed at least {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("header declares length {declared} but only {have} bytes were received")]
    LengthMismatch { declared: u16, have: usize },
}

/// Failure to bring the client up at all. Surfaced to the caller of `start`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("no suitable network interface available")]
    NoInterface,

    #[error("failed to join the PTP multicast group")]
    GroupJoinFailed,

    #[error("failed to create a PTP socket")]
    SocketCreateFailed,
}
