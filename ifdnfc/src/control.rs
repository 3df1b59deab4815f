// ifdnfc/src/control.rs

//! Control channel: mode changes and status queries sent by the activation
//! utility through `SCardControl`.
//!
//! Both messages use the C layout of the driver ABI in host byte order:
//!
//! | message  | layout                                                        | size |
//! |----------|---------------------------------------------------------------|------|
//! | request  | `i32 command`, `[u8; 1024] connstring`                        | 1028 |
//! | response | `i32 mode`, `u8 connected`, `u8 se_available`, `[u8; 1024] connstring`, 2 padding | 1032 |

use std::convert::TryFrom;

use derive_more::Display;

use crate::constants::CONNSTRING_BUFSIZE;
use crate::slot::Slot;
use crate::types::Mode;
use crate::{Error, Result};

/// Command carried by a [`ControlRequest`].
#[repr(i32)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlCommand {
    /// Close the transceiver, mode `Inactive`
    #[display(fmt = "SET_INACTIVE")]
    SetInactive = 0,
    /// Open with the request's connection string, mode `Active`
    #[display(fmt = "SET_ACTIVE")]
    SetActive = 1,
    /// Like `SetActive`, reporting the secure element as the card
    #[display(fmt = "SET_ACTIVE_SE")]
    SetActiveSe = 2,
    /// Report the status only
    #[display(fmt = "GET_STATUS")]
    GetStatus = 3,
}

impl TryFrom<i32> for ControlCommand {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::SetInactive),
            1 => Ok(Self::SetActive),
            2 => Ok(Self::SetActiveSe),
            3 => Ok(Self::GetStatus),
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

/// Copy `s` into a NUL terminated fixed buffer, truncating to fit.
fn write_connstring(out: &mut [u8], s: &str) {
    let n = s.len().min(CONNSTRING_BUFSIZE - 1);
    out[..n].copy_from_slice(&s.as_bytes()[..n]);
    out[n] = 0;
}

fn read_connstring(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn check_len(data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(Error::InvalidLength {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Raw control request. `command` is kept as sent so unknown values can be
/// rejected by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Raw [`ControlCommand`] value
    pub command: i32,
    /// Connection string for the activating commands, may be empty
    pub connstring: String,
}

impl ControlRequest {
    /// Encoded size in bytes
    pub const LEN: usize = 4 + CONNSTRING_BUFSIZE;

    /// Request for a known command.
    pub fn new(command: ControlCommand, connstring: impl Into<String>) -> Self {
        Self {
            command: command as i32,
            connstring: connstring.into(),
        }
    }

    /// Host byte order C layout; the connection string is truncated to
    /// fit with its NUL.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..4].copy_from_slice(&self.command.to_ne_bytes());
        write_connstring(&mut out[4..], &self.connstring);
        out
    }

    /// Parse a request of exactly [`Self::LEN`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_len(data, Self::LEN)?;
        let command = i32::from_ne_bytes([data[0], data[1], data[2], data[3]]);
        Ok(Self {
            command,
            connstring: read_connstring(&data[4..]),
        })
    }
}

/// Control response describing the slot after the request was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlResponse {
    /// Raw [`Mode`] value
    pub mode: i32,
    /// A transceiver is open
    pub connected: bool,
    /// The secure element answered (secure-element mode only)
    pub se_available: bool,
    /// Remembered connection string
    pub connstring: String,
}

impl ControlResponse {
    /// Encoded size in bytes, trailing padding included
    pub const LEN: usize = 4 + 1 + 1 + CONNSTRING_BUFSIZE + 2;

    /// Host byte order C layout.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..4].copy_from_slice(&self.mode.to_ne_bytes());
        out[4] = u8::from(self.connected);
        out[5] = u8::from(self.se_available);
        write_connstring(&mut out[6..6 + CONNSTRING_BUFSIZE], &self.connstring);
        out
    }

    /// Parse a response of exactly [`Self::LEN`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_len(data, Self::LEN)?;
        Ok(Self {
            mode: i32::from_ne_bytes([data[0], data[1], data[2], data[3]]),
            connected: data[4] != 0,
            se_available: data[5] != 0,
            connstring: read_connstring(&data[6..6 + CONNSTRING_BUFSIZE]),
        })
    }

    /// Mode name for display; unknown values are shown as numbers.
    pub fn mode_name(&self) -> String {
        Mode::try_from(self.mode)
            .map(|m| m.to_string())
            .unwrap_or_else(|_| format!("Unknown ({})", self.mode))
    }
}

impl Slot {
    /// Apply a control request and report the resulting status.
    pub fn handle_control(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        let command = ControlCommand::try_from(request.command).inspect_err(|_| {
            log::error!(
                "lun {}: control command must be one of 0..=3, got {}",
                self.lun(),
                request.command
            );
        })?;

        match command {
            ControlCommand::SetActive | ControlCommand::SetActiveSe => {
                if let Err(e) = self.connect(Some(&request.connstring)) {
                    log::debug!("lun {}: activation without connection: {}", self.lun(), e);
                }
                self.set_secure_element_as_card(command == ControlCommand::SetActiveSe);
                self.set_mode(if command == ControlCommand::SetActiveSe {
                    Mode::ActiveWithSecureElement
                } else {
                    Mode::Active
                });
            }
            ControlCommand::SetInactive => {
                self.disconnect();
                self.set_mode(Mode::Inactive);
            }
            ControlCommand::GetStatus => {}
        }

        let se_available =
            self.is_connected() && self.secure_element_as_card() && self.se_is_available();
        let response = ControlResponse {
            mode: self.mode() as i32,
            connected: self.is_connected(),
            se_available,
            connstring: self.connstring().unwrap_or_default().to_string(),
        };
        log::info!(
            "lun {}: mode='{}', connected='{}', se='{}', connstring='{}'",
            self.lun(),
            self.mode(),
            if response.connected { "Yes" } else { "No" },
            if response.se_available { "Yes" } else { "No" },
            response.connstring
        );
        Ok(response)
    }
}
