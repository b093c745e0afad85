//! Network Transport Interface (§4.2): the seam this crate consumes but does
//! not implement. Real sockets, multicast group membership, and the
//! Ethernet/PHY hardware-timestamping path all live outside this crate.

use crate::messages::PortIdentity;
use crate::timestamp::Timestamp;

/// Which PTP UDP port a datagram arrived on or should be sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtpPort {
    /// Port 319: Sync, Delay-Req.
    Event,
    /// Port 320: Announce, Follow-Up, Delay-Resp.
    General,
}

/// One received datagram plus its hardware RX timestamp, if the transport
/// was able to capture one. Per §4.2, a datagram with no RX timestamp must
/// never drive clock synchronization.
#[derive(Debug, Clone)]
pub struct RxDatagram<'a> {
    pub port: PtpPort,
    pub bytes: &'a [u8],
    pub hw_rx_timestamp: Option<Timestamp>,
}

/// Abstract send/receive of PTP datagrams with hardware timestamp support.
///
/// Implementations own the actual sockets and multicast group membership
/// (out of scope for this crate, per §1) and are expected to have already
/// joined the PTP multicast group by the time this trait is used.
pub trait Transport {
    /// Send a Delay-Req, optionally requesting a TX hardware timestamp.
    /// Returns `Some(timestamp)` only when a timestamp was actually captured;
    /// per the resolved Open Question in §9, the caller must not proceed with
    /// synchronization on `None`.
    fn send_delay_req(&mut self, source: PortIdentity, bytes: &[u8]) -> Option<Timestamp>;
}
