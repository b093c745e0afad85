//! ptp-client - an IEEE 1588v2 (PTP) client core for embedded network clock
//! synchronization.
//!
//! Covers the wire codec, server selection, delay estimation, and
//! offset/drift filtering, driven by a single-threaded, event-driven state
//! machine (`PtpClient`). The Ethernet/PHY driver, UDP/multicast socket
//! plumbing, and the hardware PTP peripheral are collaborators this crate
//! consumes through the [`transport::Transport`], [`clock::HardwareClock`],
//! and [`scheduler::Scheduler`] trait seams rather than implements.

pub mod clock;
pub mod config;
pub mod error;
pub mod messages;
pub mod scheduler;
pub mod selector;
pub mod state;
pub mod timestamp;
pub mod transport;

mod delay;
mod offset;

pub use clock::HardwareClock;
pub use config::Config;
pub use error::{CodecError, StartError};
pub use messages::{
    AnnounceMessage, ClockIdentity, ClockQuality, DelayReqMessage, DelayRespMessage,
    FollowUpMessage, PortIdentity, PtpHeader, PtpMessage, PtpMessageType, SyncMessage,
};
pub use scheduler::{Scheduler, TimerId};
pub use selector::{AnnounceOutcome, SelectedServer, ServerSelector};
pub use state::{Diagnostics, Phase, PtpClient};
pub use timestamp::Timestamp;
pub use transport::{PtpPort, RxDatagram, Transport};
