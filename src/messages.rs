//! PTPv2 (IEEE 1588-2008) wire codec: common header plus the five message
//! variants this client speaks. See `CodecError` for the rejection taxonomy.

use crate::error::CodecError;
use crate::timestamp::{decode_timestamp, Timestamp, WIRE_TIMESTAMP_SIZE};

/// PTP message types (low nibble of the first header byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PtpMessageType {
    Sync = 0x0,
    DelayReq = 0x1,
    PDelayReq = 0x2,
    PDelayResp = 0x3,
    FollowUp = 0x8,
    DelayResp = 0x9,
    PDelayRespFollowUp = 0xA,
    Announce = 0xB,
    Signaling = 0xC,
    Management = 0xD,
    Unknown = 0xFF,
}

impl From<u8> for PtpMessageType {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::Sync,
            0x1 => Self::DelayReq,
            0x2 => Self::PDelayReq,
            0x3 => Self::PDelayResp,
            0x8 => Self::FollowUp,
            0x9 => Self::DelayResp,
            0xA => Self::PDelayRespFollowUp,
            0xB => Self::Announce,
            0xC => Self::Signaling,
            0xD => Self::Management,
            _ => Self::Unknown,
        }
    }
}

/// Opaque 8-byte PTP clock identity (EUI-64 derived).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ClockIdentity(pub [u8; 8]);

impl ClockIdentity {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[..8]);
        Self(id)
    }

    pub fn to_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn to_hex_string(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Derive an EUI-64 clock identity from a 48-bit MAC address by
    /// inserting the `FF FE` mid-octets (IEEE 1588 clause 7.5.2.2.2).
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self([mac[0], mac[1], mac[2], 0xFF, 0xFE, mac[3], mac[4], mac[5]])
    }
}

/// Port identity: clock identity plus a 16-bit port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortIdentity {
    pub clock_identity: ClockIdentity,
    pub port_number: u16,
}

impl PortIdentity {
    const SIZE: usize = 10;

    fn parse(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= Self::SIZE);
        Self {
            clock_identity: ClockIdentity::from_bytes(&bytes[0..8]),
            port_number: u16::from_be_bytes([bytes[8], bytes[9]]),
        }
    }
}

/// Flag bits relevant to this client (IEEE-1588 `flagField`).
pub mod flags {
    pub const UNICAST: u16 = 0x0400;
    pub const TWO_STEP: u16 = 0x0200;
    pub const UTC_OFFSET_VALID: u16 = 0x0004;
}

/// Common 34-byte PTP header.
#[derive(Debug, Clone)]
pub struct PtpHeader {
    pub message_type: PtpMessageType,
    pub version_major: u8,
    pub version_minor: u8,
    pub message_length: u16,
    pub domain_number: u8,
    pub flags: u16,
    pub correction_field: i64,
    pub source_port_identity: PortIdentity,
    pub sequence_id: u16,
    pub control_field: u8,
    pub log_message_interval: i8,
}

impl PtpHeader {
    pub const SIZE: usize = 34;

    fn parse(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < Self::SIZE {
            return Err(CodecError::Truncated {
                needed: Self::SIZE,
                have: data.len(),
            });
        }

        let version_major = data[1] & 0x0F;
        let version_minor = (data[1] >> 4) & 0x0F;
        if version_major != 2 || version_minor > 1 {
            return Err(CodecError::BadVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let message_type = PtpMessageType::from(data[0]);
        let message_length = u16::from_be_bytes([data[2], data[3]]);
        let domain_number = data[4];
        // byte 5 reserved
        let flags = u16::from_be_bytes([data[6], data[7]]);
        let correction_field = i64::from_be_bytes([
            data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
        ]);
        // bytes 16-19 reserved
        let source_port_identity = PortIdentity::parse(&data[20..30]);
        let sequence_id = u16::from_be_bytes([data[30], data[31]]);
        let control_field = data[32];
        let log_message_interval = data[33] as i8;

        if (message_length as usize) > data.len() {
            return Err(CodecError::LengthMismatch {
                declared: message_length,
                have: data.len(),
            });
        }

        Ok(Self {
            message_type,
            version_major,
            version_minor,
            message_length,
            domain_number,
            flags,
            correction_field,
            source_port_identity,
            sequence_id,
            control_field,
            log_message_interval,
        })
    }

    /// Whether the accompanying timestamp is deferred to a Follow_Up message.
    pub fn is_two_step(&self) -> bool {
        (self.flags & flags::TWO_STEP) != 0
    }
}

/// Clock quality bytes from an Announce message. Opaque to this client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockQuality {
    pub clock_class: u8,
    pub clock_accuracy: u8,
    pub offset_scaled_log_variance: u16,
}

impl ClockQuality {
    fn parse(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= 4);
        Self {
            clock_class: bytes[0],
            clock_accuracy: bytes[1],
            offset_scaled_log_variance: u16::from_be_bytes([bytes[2], bytes[3]]),
        }
    }
}

/// Announce message: total wire size 64 bytes (34-byte header + 30-byte body).
#[derive(Debug, Clone)]
pub struct AnnounceMessage {
    pub header: PtpHeader,
    pub origin_timestamp: Timestamp,
    pub current_utc_offset: i16,
    pub grandmaster_priority1: u8,
    pub grandmaster_clock_quality: ClockQuality,
    pub grandmaster_priority2: u8,
    pub grandmaster_identity: ClockIdentity,
    pub steps_removed: u16,
    pub time_source: u8,
}

impl AnnounceMessage {
    pub const TOTAL_SIZE: usize = 64;
    const BODY_SIZE: usize = Self::TOTAL_SIZE - PtpHeader::SIZE;

    fn parse(header: PtpHeader, data: &[u8]) -> Result<Self, CodecError> {
        let body = &data[PtpHeader::SIZE..];
        if body.len() < Self::BODY_SIZE {
            return Err(CodecError::Truncated {
                needed: Self::TOTAL_SIZE,
                have: data.len(),
            });
        }

        let origin_timestamp = decode_timestamp(&body[0..WIRE_TIMESTAMP_SIZE]);
        let current_utc_offset = i16::from_be_bytes([body[10], body[11]]);
        // byte 12 reserved
        let grandmaster_priority1 = body[13];
        let grandmaster_clock_quality = ClockQuality::parse(&body[14..18]);
        let grandmaster_priority2 = body[18];
        let grandmaster_identity = ClockIdentity::from_bytes(&body[19..27]);
        let steps_removed = u16::from_be_bytes([body[27], body[28]]);
        let time_source = body[29];

        Ok(Self {
            header,
            origin_timestamp,
            current_utc_offset,
            grandmaster_priority1,
            grandmaster_clock_quality,
            grandmaster_priority2,
            grandmaster_identity,
            steps_removed,
            time_source,
        })
    }
}

/// Sync message: total wire size 44 bytes (34-byte header + 10-byte timestamp).
#[derive(Debug, Clone)]
pub struct SyncMessage {
    pub header: PtpHeader,
    pub origin_timestamp: Timestamp,
}

impl SyncMessage {
    pub const TOTAL_SIZE: usize = PtpHeader::SIZE + WIRE_TIMESTAMP_SIZE;

    fn parse(header: PtpHeader, data: &[u8]) -> Result<Self, CodecError> {
        let body = &data[PtpHeader::SIZE..];
        if body.len() < WIRE_TIMESTAMP_SIZE {
            return Err(CodecError::Truncated {
                needed: Self::TOTAL_SIZE,
                have: data.len(),
            });
        }
        Ok(Self {
            header,
            origin_timestamp: decode_timestamp(&body[0..WIRE_TIMESTAMP_SIZE]),
        })
    }
}

/// Follow_Up message: total wire size 44 bytes, mirrors `SyncMessage`.
#[derive(Debug, Clone)]
pub struct FollowUpMessage {
    pub header: PtpHeader,
    pub precise_origin_timestamp: Timestamp,
}

impl FollowUpMessage {
    pub const TOTAL_SIZE: usize = PtpHeader::SIZE + WIRE_TIMESTAMP_SIZE;

    fn parse(header: PtpHeader, data: &[u8]) -> Result<Self, CodecError> {
        let body = &data[PtpHeader::SIZE..];
        if body.len() < WIRE_TIMESTAMP_SIZE {
            return Err(CodecError::Truncated {
                needed: Self::TOTAL_SIZE,
                have: data.len(),
            });
        }
        Ok(Self {
            header,
            precise_origin_timestamp: decode_timestamp(&body[0..WIRE_TIMESTAMP_SIZE]),
        })
    }
}

/// Delay_Resp message: total wire size 44 bytes (34-byte header + 10-byte
/// requesting port identity). Unlike Sync/Follow_Up this body carries no
/// timestamp of its own — the round-trip measurement instead uses the local
/// hardware RX timestamp of this datagram, supplied by the caller alongside
/// the decoded message (see `DESIGN.md` for the rationale).
#[derive(Debug, Clone)]
pub struct DelayRespMessage {
    pub header: PtpHeader,
    pub requesting_port_identity: PortIdentity,
}

impl DelayRespMessage {
    pub const TOTAL_SIZE: usize = PtpHeader::SIZE + PortIdentity::SIZE;

    fn parse(header: PtpHeader, data: &[u8]) -> Result<Self, CodecError> {
        let body = &data[PtpHeader::SIZE..];
        if body.len() < PortIdentity::SIZE {
            return Err(CodecError::Truncated {
                needed: Self::TOTAL_SIZE,
                have: data.len(),
            });
        }
        Ok(Self {
            header,
            requesting_port_identity: PortIdentity::parse(&body[0..PortIdentity::SIZE]),
        })
    }
}

/// A Delay_Req this client emits. Per the encoding contract, the declared
/// payload length equals the header size: this client's Delay-Req carries no
/// wire-format origin timestamp, since the TX instant is captured by
/// hardware, not read back off the packet.
#[derive(Debug, Clone)]
pub struct DelayReqMessage {
    pub header: PtpHeader,
}

impl DelayReqMessage {
    pub const SIZE: usize = PtpHeader::SIZE;

    /// Build a new Delay-Req addressed from `source_port` with the given
    /// sequence id and domain, per §4.1's encoding contract.
    pub fn new(source_port: PortIdentity, sequence_id: u16, domain: u8) -> Self {
        Self {
            header: PtpHeader {
                message_type: PtpMessageType::DelayReq,
                version_major: 2,
                version_minor: 0,
                message_length: Self::SIZE as u16,
                domain_number: domain,
                flags: 0,
                correction_field: 0,
                source_port_identity: source_port,
                sequence_id,
                control_field: 1,
                log_message_interval: 0x7F,
            },
        }
    }

    /// Serialize to the exact 34-byte wire form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.header.message_type as u8;
        buf[1] = (self.header.version_major & 0x0F) | ((self.header.version_minor & 0x0F) << 4);
        buf[2..4].copy_from_slice(&self.header.message_length.to_be_bytes());
        buf[4] = self.header.domain_number;
        buf[6..8].copy_from_slice(&self.header.flags.to_be_bytes());
        buf[8..16].copy_from_slice(&self.header.correction_field.to_be_bytes());
        buf[20..28].copy_from_slice(&self.header.source_port_identity.clock_identity.0);
        buf[28..30].copy_from_slice(&self.header.source_port_identity.port_number.to_be_bytes());
        buf[30..32].copy_from_slice(&self.header.sequence_id.to_be_bytes());
        buf[32] = self.header.control_field;
        buf[33] = self.header.log_message_interval as u8;
        buf
    }
}

/// Any decoded PTP message this client understands. Types outside
/// {Sync, Follow_Up, Announce, Delay_Resp} decode as `Other` and are
/// silently ignored by the state machine, per §4.1.
#[derive(Debug, Clone)]
pub enum PtpMessage {
    Announce(AnnounceMessage),
    Sync(SyncMessage),
    FollowUp(FollowUpMessage),
    DelayResp(DelayRespMessage),
    Other(PtpHeader),
}

impl PtpMessage {
    /// Decode any supported PTP message from a raw datagram.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let header = PtpHeader::parse(data)?;
        match header.message_type {
            PtpMessageType::Announce => AnnounceMessage::parse(header, data).map(Self::Announce),
            PtpMessageType::Sync => SyncMessage::parse(header, data).map(Self::Sync),
            PtpMessageType::FollowUp => FollowUpMessage::parse(header, data).map(Self::FollowUp),
            PtpMessageType::DelayResp => {
                DelayRespMessage::parse(header, data).map(Self::DelayResp)
            }
            _ => Ok(Self::Other(header)),
        }
    }

    pub fn header(&self) -> &PtpHeader {
        match self {
            Self::Announce(m) => &m.header,
            Self::Sync(m) => &m.header,
            Self::FollowUp(m) => &m.header,
            Self::DelayResp(m) => &m.header,
            Self::Other(h) => h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(msg_type: u8, version_byte: u8, length: u16, seq: u16, flags: u16) -> Vec<u8> {
        let mut buf = vec![0u8; PtpHeader::SIZE];
        buf[0] = msg_type;
        buf[1] = version_byte;
        buf[2..4].copy_from_slice(&length.to_be_bytes());
        buf[4] = 0; // domain
        buf[6..8].copy_from_slice(&flags.to_be_bytes());
        buf[20..28].copy_from_slice(&[0xAA; 8]);
        buf[28..30].copy_from_slice(&1u16.to_be_bytes());
        buf[30..32].copy_from_slice(&seq.to_be_bytes());
        buf[32] = 0;
        buf[33] = 0x7F;
        buf
    }

    #[test]
    fn rejects_bad_major_version() {
        let buf = header_bytes(PtpMessageType::Sync as u8, 0x03, 44, 1, 0);
        let err = PtpMessage::decode(&buf).unwrap_err();
        assert_eq!(
            err,
            CodecError::BadVersion {
                major: 3,
                minor: 0
            }
        );
    }

    #[test]
    fn rejects_minor_version_above_1() {
        let buf = header_bytes(PtpMessageType::Sync as u8, 0x22, 44, 1, 0);
        let err = PtpMessage::decode(&buf).unwrap_err();
        assert_eq!(
            err,
            CodecError::BadVersion {
                major: 2,
                minor: 2
            }
        );
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = vec![0u8; 10];
        let err = PtpMessage::decode(&buf).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 34,
                have: 10
            }
        );
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut buf = header_bytes(PtpMessageType::Sync as u8, 0x02, 200, 1, 0);
        buf.extend_from_slice(&[0u8; WIRE_TIMESTAMP_SIZE]);
        let err = PtpMessage::decode(&buf).unwrap_err();
        assert_eq!(
            err,
            CodecError::LengthMismatch {
                declared: 200,
                have: buf.len()
            }
        );
    }

    #[test]
    fn rejects_truncated_sync_body() {
        let buf = header_bytes(PtpMessageType::Sync as u8, 0x02, 34, 1, 0);
        let err = PtpMessage::decode(&buf).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 44,
                have: 34
            }
        );
    }

    #[test]
    fn decodes_one_step_sync() {
        let mut buf = header_bytes(PtpMessageType::Sync as u8, 0x02, 44, 7, 0);
        buf.extend_from_slice(&crate::timestamp::encode_timestamp(123_456_789));
        match PtpMessage::decode(&buf).unwrap() {
            PtpMessage::Sync(s) => {
                assert_eq!(s.origin_timestamp, 123_456_789);
                assert!(!s.header.is_two_step());
                assert_eq!(s.header.sequence_id, 7);
            }
            other => panic!("expected Sync, got {:?}", other),
        }
    }

    #[test]
    fn decodes_two_step_sync_flag() {
        let mut buf = header_bytes(PtpMessageType::Sync as u8, 0x02, 44, 1, flags::TWO_STEP);
        buf.extend_from_slice(&[0u8; WIRE_TIMESTAMP_SIZE]);
        match PtpMessage::decode(&buf).unwrap() {
            PtpMessage::Sync(s) => assert!(s.header.is_two_step()),
            other => panic!("expected Sync, got {:?}", other),
        }
    }

    #[test]
    fn decodes_announce() {
        let mut buf = header_bytes(PtpMessageType::Announce as u8, 0x02, 64, 9, 0);
        buf.extend_from_slice(&crate::timestamp::encode_timestamp(0));
        buf.extend_from_slice(&37i16.to_be_bytes()); // utc offset
        buf.push(0); // reserved
        buf.push(5); // priority1
        buf.extend_from_slice(&[6, 0xA0, 0, 0]); // clock quality
        buf.push(200); // priority2
        buf.extend_from_slice(&[0xBB; 8]); // grandmaster identity
        buf.extend_from_slice(&3u16.to_be_bytes()); // steps removed
        buf.push(0); // time source
        assert_eq!(buf.len(), AnnounceMessage::TOTAL_SIZE);

        match PtpMessage::decode(&buf).unwrap() {
            PtpMessage::Announce(a) => {
                assert_eq!(a.current_utc_offset, 37);
                assert_eq!(a.grandmaster_priority1, 5);
                assert_eq!(a.grandmaster_priority2, 200);
                assert_eq!(a.grandmaster_identity, ClockIdentity([0xBB; 8]));
            }
            other => panic!("expected Announce, got {:?}", other),
        }
    }

    #[test]
    fn decodes_delay_resp() {
        let mut buf = header_bytes(PtpMessageType::DelayResp as u8, 0x02, 44, 1, 0);
        buf.extend_from_slice(&[0xCC; 8]);
        buf.extend_from_slice(&9u16.to_be_bytes());
        assert_eq!(buf.len(), DelayRespMessage::TOTAL_SIZE);

        match PtpMessage::decode(&buf).unwrap() {
            PtpMessage::DelayResp(d) => {
                assert_eq!(d.requesting_port_identity.clock_identity, ClockIdentity([0xCC; 8]));
                assert_eq!(d.requesting_port_identity.port_number, 9);
            }
            other => panic!("expected DelayResp, got {:?}", other),
        }
    }

    #[test]
    fn delay_req_round_trips() {
        let source = PortIdentity {
            clock_identity: ClockIdentity([1, 2, 3, 4, 5, 6, 7, 8]),
            port_number: 1,
        };
        let req = DelayReqMessage::new(source, 42, 0);
        let bytes = req.to_bytes();
        assert_eq!(bytes.len(), DelayReqMessage::SIZE);

        let decoded = PtpHeader::parse(&bytes).unwrap();
        assert_eq!(decoded.sequence_id, 42);
        assert_eq!(decoded.control_field, 1);
        assert_eq!(decoded.log_message_interval, 0x7Fu8 as i8);
        assert_eq!(decoded.source_port_identity, source);
        assert_eq!(decoded.message_length, PtpHeader::SIZE as u16);
    }

    #[test]
    fn unknown_message_type_decodes_as_other() {
        let buf = header_bytes(PtpMessageType::Management as u8, 0x02, 34, 1, 0);
        match PtpMessage::decode(&buf).unwrap() {
            PtpMessage::Other(h) => assert_eq!(h.message_type, PtpMessageType::Management),
            other => panic!("expected Other, got {:?}", other),
        }
    }

    #[test]
    fn clock_identity_from_mac_inserts_ff_fe() {
        let id = ClockIdentity::from_mac([0x00, 0x1b, 0x21, 0x11, 0x22, 0x33]);
        assert_eq!(id.0, [0x00, 0x1b, 0x21, 0xFF, 0xFE, 0x11, 0x22, 0x33]);
    }
}
