// ifdnfc/src/protocol/frame.rs

//! Normal and extended PN53x frames.

use crate::constants::{
    PN53X_ACK_FRAME, PN53X_MAX_EXTENDED_PAYLOAD, PN53X_MAX_NORMAL_PAYLOAD,
    PN53X_MIN_EXTENDED_FRAME_LEN, PN53X_MIN_FRAME_LEN, PN53X_POSTAMBLE, PN53X_PREAMBLE,
};
use crate::protocol::checksum::{dcs, extended_lcs, lcs};
use crate::{Error, Result};

/// PN53x information frame helper.
///
/// Normal frame:
/// `[Preamble(3)] [Len(1)] [LCS(1)] [TFI + PD(n)] [DCS(1)] [Postamble(1)]`
///
/// Extended frame (payloads above 254 bytes):
/// `[Preamble(3)] [FF FF] [LenM LenL] [LCS(1)] [TFI + PD(n)] [DCS(1)] [Postamble(1)]`
pub struct Frame;

impl Frame {
    /// Encode a payload (TFI included) into a full frame, choosing the
    /// extended layout when the payload does not fit a normal frame.
    pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() > PN53X_MAX_EXTENDED_PAYLOAD {
            return Err(Error::InvalidLength {
                expected: PN53X_MAX_EXTENDED_PAYLOAD,
                actual: payload.len(),
            });
        }

        let mut out = Vec::with_capacity(PN53X_MIN_EXTENDED_FRAME_LEN + payload.len());
        out.extend_from_slice(&PN53X_PREAMBLE);
        if payload.len() <= PN53X_MAX_NORMAL_PAYLOAD {
            let len = payload.len() as u8;
            out.push(len);
            out.push(lcs(len));
        } else {
            let len = payload.len() as u16;
            out.extend_from_slice(&[0xFF, 0xFF]);
            out.extend_from_slice(&len.to_be_bytes());
            out.push(extended_lcs(len));
        }
        out.extend_from_slice(payload);
        out.push(dcs(payload));
        out.push(PN53X_POSTAMBLE);
        Ok(out)
    }

    /// Decode a full frame and return the payload (TFI included).
    pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
        if frame.len() < PN53X_MIN_FRAME_LEN {
            return Err(Error::InvalidLength {
                expected: PN53X_MIN_FRAME_LEN,
                actual: frame.len(),
            });
        }

        if frame[..3] != PN53X_PREAMBLE {
            return Err(Error::FrameFormat("invalid preamble".into()));
        }

        if Self::is_ack(frame) {
            return Err(Error::FrameFormat("ack frame carries no payload".into()));
        }

        let (payload_start, len) = if frame[3] == 0xFF && frame[4] == 0xFF {
            if frame.len() < PN53X_MIN_EXTENDED_FRAME_LEN {
                return Err(Error::InvalidLength {
                    expected: PN53X_MIN_EXTENDED_FRAME_LEN,
                    actual: frame.len(),
                });
            }
            let len = u16::from_be_bytes([frame[5], frame[6]]);
            let expected = extended_lcs(len);
            if frame[7] != expected {
                return Err(Error::ChecksumMismatch {
                    expected,
                    actual: frame[7],
                });
            }
            (8usize, len as usize)
        } else {
            let len = frame[3];
            let expected = lcs(len);
            if frame[4] != expected {
                return Err(Error::ChecksumMismatch {
                    expected,
                    actual: frame[4],
                });
            }
            (5usize, len as usize)
        };

        let required_len = payload_start + len + 2;
        if frame.len() != required_len {
            return Err(Error::InvalidLength {
                expected: required_len,
                actual: frame.len(),
            });
        }

        let payload_end = payload_start + len;
        let payload = &frame[payload_start..payload_end];

        let dcs_actual = frame[payload_end];
        let dcs_expected = dcs(payload);
        if dcs_actual != dcs_expected {
            return Err(Error::ChecksumMismatch {
                expected: dcs_expected,
                actual: dcs_actual,
            });
        }

        if frame[payload_end + 1] != PN53X_POSTAMBLE {
            return Err(Error::FrameFormat("invalid postamble".into()));
        }

        Ok(payload.to_vec())
    }

    /// True for the six-byte ACK frame.
    pub fn is_ack(frame: &[u8]) -> bool {
        frame.starts_with(&PN53X_ACK_FRAME)
    }

    /// ACK frame sent to abort a pending command.
    pub fn ack() -> [u8; 6] {
        PN53X_ACK_FRAME
    }
}
