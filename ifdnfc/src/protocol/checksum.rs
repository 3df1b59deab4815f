// ifdnfc/src/protocol/checksum.rs

//! Frame checksums.

/// Length checksum of a normal PN53x frame.
/// LCS = 0x100 - len (mod 256)
pub fn lcs(len: u8) -> u8 {
    0u8.wrapping_sub(len)
}

/// Length checksum of an extended frame, computed over both length bytes.
pub fn extended_lcs(len: u16) -> u8 {
    let [hi, lo] = len.to_be_bytes();
    0u8.wrapping_sub(hi.wrapping_add(lo))
}

/// Data checksum over TFI and packet data.
/// DCS = 0x100 - (sum(payload) & 0xff)
pub fn dcs(payload: &[u8]) -> u8 {
    let sum = payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

/// XOR of all bytes; used for the ATR check byte (TCK).
pub fn xor(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}
