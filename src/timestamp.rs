//! Nanosecond timestamps and their 48+32-bit wire encoding.

/// Signed nanoseconds since the PTP epoch (1970-01-01 UTC). All arithmetic in
/// this crate happens in this representation; the 48-bit-seconds +
/// 32-bit-nanoseconds wire form exists only at the codec boundary.
pub type Timestamp = i64;

/// The wire encoding of a PTP timestamp: 48-bit unsigned seconds followed by
/// 32-bit unsigned nanoseconds, both big-endian.
pub const WIRE_TIMESTAMP_SIZE: usize = 10;

/// Decode a 10-byte wire timestamp into nanoseconds. `bytes` must be at least
/// 10 bytes; callers are expected to have already validated message length.
pub fn decode_timestamp(bytes: &[u8]) -> Timestamp {
    debug_assert!(bytes.len() >= WIRE_TIMESTAMP_SIZE);
    // 48-bit seconds: no native integer type this size, assembled by hand.
    let seconds = u64::from_be_bytes([
        0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
    ]);
    let nanoseconds = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    seconds as i64 * 1_000_000_000 + nanoseconds as i64
}

/// Encode nanoseconds into the 10-byte wire timestamp form.
pub fn encode_timestamp(ts: Timestamp) -> [u8; WIRE_TIMESTAMP_SIZE] {
    let seconds = (ts.div_euclid(1_000_000_000)) as u64;
    let nanoseconds = ts.rem_euclid(1_000_000_000) as u32;
    let sec_bytes = seconds.to_be_bytes(); // 8 bytes, top 2 are always zero for valid ranges
    let ns_bytes = nanoseconds.to_be_bytes();
    let mut out = [0u8; WIRE_TIMESTAMP_SIZE];
    out[0..6].copy_from_slice(&sec_bytes[2..8]);
    out[6..10].copy_from_slice(&ns_bytes);
    out
}
