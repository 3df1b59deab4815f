// ifdnfc/src/slot/connection.rs

//! Opening and closing the device behind a slot.

use std::time::Instant;

use crate::constants::CONNSTRING_SEPARATOR;
use crate::slot::{Connection, Slot};
use crate::utils::elapsed_since;
use crate::{Error, Result};

impl Slot {
    /// Replace the remembered connection string. Strings without a driver
    /// separator are ignored; returns whether the value was taken.
    pub fn remember_connstring(&mut self, connstring: &str) -> bool {
        if connstring.is_empty() || !connstring.contains(CONNSTRING_SEPARATOR) {
            return false;
        }
        self.connstring = Some(connstring.to_string());
        true
    }

    /// Drop the remembered connection string.
    pub fn forget_connstring(&mut self) {
        self.connstring = None;
    }

    /// Open the transceiver. No-op when already connected. A usable
    /// `connstring` replaces the remembered one first.
    pub fn connect(&mut self, connstring: Option<&str>) -> Result<()> {
        self.connect_at(connstring, Instant::now())
    }

    pub(crate) fn connect_at(&mut self, connstring: Option<&str>, now: Instant) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        if let Some(cs) = connstring {
            self.remember_connstring(cs);
        }
        let Some(cs) = self.connstring.as_deref().filter(|cs| !cs.is_empty()) else {
            return Err(Error::InvalidConnstring(String::new()));
        };

        self.open_attempted_at = Some(now);
        match self.context.open(cs) {
            Ok(transport) => {
                log::info!("lun {}: connected to '{}'", self.lun, cs);
                self.connection = Some(Connection::new(transport));
                Ok(())
            }
            Err(e) => {
                log::error!("lun {}: unable to open '{}': {}", self.lun, cs, e);
                Err(e)
            }
        }
    }

    /// Release the transceiver and fall back to inactive mode. A present
    /// target is deselected first; failures there are only logged.
    pub fn disconnect(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            if conn.is_present() {
                if let Err(e) = conn.transport.deselect_target() {
                    log::warn!("lun {}: could not deselect target: {}", self.lun, e);
                }
            }
            log::info!("lun {}: disconnected", self.lun);
        }
        self.mode = crate::types::Mode::Inactive;
    }

    /// Whether a presence check may retry opening the transceiver now.
    pub(crate) fn reopen_due(&self, now: Instant) -> bool {
        self.mode.is_active()
            && elapsed_since(self.open_attempted_at, now, self.config.open_retry_interval)
    }
}
