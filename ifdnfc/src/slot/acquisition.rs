// ifdnfc/src/slot/acquisition.rs

//! Target acquisition: discovery, reselection and secure-element lookup.

use std::time::Instant;

use crate::atr::{AtrBuilder, synthesize};
use crate::slot::{Connection, FieldState, Slot, Tracked};
use crate::transport::Transport;
use crate::types::{Atr, Modulation, Property, Target};
use crate::{Error, Result};

/// What a state transition did to the tracked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new target is tracked
    Found,
    /// The tracked target went away, or none answered
    Lost,
    /// Nothing changed
    Unchanged,
    /// The radio refused to change mode
    Error,
}

fn track(builder: &dyn AtrBuilder, target: Target) -> Tracked {
    let synthesis = synthesize(builder, &target);
    if !synthesis.succeeded {
        log::debug!("ATR synthesis incomplete for {}", target);
    }
    Tracked {
        target,
        atr: synthesis.atr,
    }
}

/// Select the tracked target again. Warm selection filters on the previous
/// UID; cold selection takes any card but insists on an identical ATS.
/// Only ISO14443A targets can be reselected.
fn reselect(transport: &mut dyn Transport, previous: &Target, warm: bool) -> bool {
    let Target::Iso14443a(info) = previous else {
        log::debug!("reselect of {} is not implemented", previous.technology());
        return false;
    };
    if let Err(e) = transport.set_property_bool(Property::InfiniteSelect, false) {
        log::error!("could not set infinite-select property: {}", e);
        return false;
    }
    let uid = warm.then_some(info.uid.as_slice());
    match transport.select_passive_target(previous.modulation(), uid) {
        Ok(Some(Target::Iso14443a(found))) => warm || found.ats == info.ats,
        Ok(Some(other)) => {
            log::debug!("reselect answered by {}", other);
            false
        }
        Ok(None) => {
            log::debug!("could not select target {}", previous.modulation());
            false
        }
        Err(e) => {
            log::debug!("could not select target {}: {}", previous.modulation(), e);
            false
        }
    }
}

impl Connection {
    /// One discovery step on the current field state.
    pub fn discover(&mut self, modulations: &[Modulation], builder: &dyn AtrBuilder) -> Outcome {
        match std::mem::take(&mut self.field) {
            FieldState::Active(tracked) => match self.transport.target_is_present(&tracked.target) {
                Ok(true) => {
                    self.field = FieldState::Active(tracked);
                    Outcome::Unchanged
                }
                Ok(false) => {
                    self.field = FieldState::FieldUp;
                    Outcome::Lost
                }
                Err(e) => {
                    log::debug!("presence check failed: {}", e);
                    self.field = FieldState::FieldUp;
                    Outcome::Lost
                }
            },
            FieldState::Discovered(tracked) => {
                if let Err(e) = self.transport.init_initiator() {
                    log::error!("could not init NFC device in initiator mode: {}", e);
                    self.field = FieldState::Idle;
                    return Outcome::Error;
                }
                if !reselect(&mut *self.transport, &tracked.target, false) {
                    self.field = FieldState::FieldUp;
                    return Outcome::Lost;
                }
                if let Err(e) = self.transport.deselect_target() {
                    log::error!("could not deselect target: {}", e);
                }
                self.field = FieldState::Active(tracked);
                Outcome::Unchanged
            }
            state => {
                if !state.is_initiated() {
                    if let Err(e) = self.transport.init_initiator() {
                        log::error!("could not init NFC device in initiator mode: {}", e);
                        self.field = state;
                        return Outcome::Error;
                    }
                }
                self.field = FieldState::FieldUp;
                for &modulation in modulations {
                    match self.transport.list_passive_targets(modulation, 1) {
                        Ok(mut targets) if targets.len() == 1 => {
                            let tracked = track(builder, targets.remove(0));
                            self.field = FieldState::Active(tracked);
                            return Outcome::Found;
                        }
                        Ok(_) => {}
                        Err(e) => log::debug!("polling {} failed: {}", modulation, e),
                    }
                }
                Outcome::Unchanged
            }
        }
    }

    /// Reselect the tracked target, dropping it on failure.
    pub fn reselect(&mut self, warm: bool) -> bool {
        let Some(tracked) = self.field.tracked().cloned() else {
            return false;
        };
        if reselect(&mut *self.transport, &tracked.target, warm) {
            true
        } else {
            self.lose_target();
            false
        }
    }

    /// Look for the wired secure element. Once tracked with the field up it is
    /// taken as present without talking to the radio.
    pub fn discover_secure_element(&mut self, builder: &dyn AtrBuilder) -> Outcome {
        if matches!(self.field, FieldState::Active(_)) {
            return Outcome::Unchanged;
        }
        if let Err(e) = self.transport.init_secure_element() {
            log::error!("could not initialize secure element mode: {}", e);
            self.lose_target();
            return Outcome::Error;
        }
        if let Err(e) = self
            .transport
            .set_property_bool(Property::InfiniteSelect, false)
        {
            log::error!("could not set infinite-select property: {}", e);
            self.lose_target();
            return Outcome::Error;
        }
        match self
            .transport
            .select_passive_target(Modulation::ISO14443A_106, None)
        {
            Ok(Some(target)) => {
                let tracked = track(builder, target);
                let initiated = self.field.is_initiated();
                self.field = FieldState::with_target(initiated, tracked);
                Outcome::Found
            }
            Ok(None) => {
                self.lose_target();
                Outcome::Lost
            }
            Err(e) => {
                log::debug!("secure element did not answer: {}", e);
                self.lose_target();
                Outcome::Error
            }
        }
    }

    /// Deselect and warm-reselect the tracked target in the chip's current
    /// mode, so a secure element stays routed. The ATR is unchanged on
    /// success.
    pub fn warm_reset(&mut self) -> Result<Atr> {
        let Some(tracked) = self.field.tracked().cloned() else {
            return Err(Error::PowerAction("no target to reset".into()));
        };
        self.lose_target();
        self.transport
            .deselect_target()
            .map_err(|e| Error::PowerAction(format!("could not deselect target: {}", e)))?;
        if !reselect(&mut *self.transport, &tracked.target, true) {
            return Err(Error::PowerAction("warm reselect failed".into()));
        }
        let atr = tracked.atr;
        let initiated = self.field.is_initiated();
        self.field = FieldState::with_target(initiated, tracked);
        Ok(atr)
    }
}

impl Slot {
    /// Discovery on the current connection; true when a target is tracked
    /// afterwards.
    pub fn target_is_available(&mut self) -> bool {
        let lun = self.lun;
        let Some(conn) = self.connection.as_mut() else {
            return false;
        };
        match conn.discover(&self.config.modulations, &*self.atr_builder) {
            Outcome::Found => {
                if let Some(t) = conn.tracked() {
                    log::info!("lun {}: found {} (ATR {})", lun, t.target, t.atr.to_hex());
                }
            }
            Outcome::Lost => log::info!("lun {}: target lost", lun),
            Outcome::Unchanged | Outcome::Error => {}
        }
        conn.is_present()
    }

    /// Look for the secure element and report whether a target is tracked.
    pub fn se_is_available(&mut self) -> bool {
        let lun = self.lun;
        let Some(conn) = self.connection.as_mut() else {
            return false;
        };
        if conn.discover_secure_element(&*self.atr_builder) == Outcome::Found {
            log::info!("lun {}: secure element detected", lun);
        }
        conn.is_present()
    }

    /// Reselect the tracked target; false when there is none or it is gone.
    pub fn reselect_target(&mut self, warm: bool) -> bool {
        self.connection
            .as_mut()
            .is_some_and(|conn| conn.reselect(warm))
    }

    /// IFD_POWER_UP: find a card (the secure element first in SE mode) and
    /// return its ATR.
    pub fn power_up(&mut self) -> Result<Atr> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let available = (self.secure_element_as_card && self.se_is_available())
            || self.target_is_available();
        if !available {
            return Err(Error::NoTarget);
        }
        Ok(self.atr())
    }

    /// IFD_POWER_DOWN: reports an empty ATR. The field and the tracked
    /// target are left alone.
    pub fn power_down(&mut self) -> Result<Atr> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(Atr::EMPTY)
    }

    /// IFD_RESET: warm reset of the present target.
    pub fn reset(&mut self) -> Result<Atr> {
        let lun = self.lun;
        let conn = self.connection.as_mut().ok_or(Error::NotConnected)?;
        conn.warm_reset().inspect_err(|e| {
            log::error!("lun {}: reset failed: {}", lun, e);
        })
    }

    /// ICC presence check. A disconnected slot in an active mode retries the
    /// open at most once per retry interval. In secure-element mode the last
    /// known presence is reported without asking the radio.
    pub fn icc_presence(&mut self) -> bool {
        self.icc_presence_at(Instant::now())
    }

    pub(crate) fn icc_presence_at(&mut self, now: Instant) -> bool {
        if !self.is_connected() {
            if !self.reopen_due(now) || self.connect_at(None, now).is_err() {
                return false;
            }
        }
        if self.secure_element_as_card {
            return self.is_present();
        }
        self.target_is_available()
    }
}
