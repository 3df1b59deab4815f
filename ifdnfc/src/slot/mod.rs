// ifdnfc/src/slot/mod.rs

//! One reader slot: the transceiver connection, the tracked target and the
//! operating mode set over the control channel.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::atr::AtrBuilder;
use crate::config::DriverConfig;
use crate::intercept;
use crate::transport::{Context, Transport};
use crate::types::{Atr, Lun, Mode, Target};
use crate::{Error, Result};

pub mod acquisition;
pub mod connection;

pub use acquisition::Outcome;

/// A detected target together with the ATR synthesized for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked {
    /// Target as reported by the radio
    pub target: Target,
    /// ATR presented to the middleware
    pub atr: Atr,
}

/// Radio state of an open connection.
///
/// `Discovered` means the target is known but the initiator has not been
/// started on this handle (secure element found with the field down).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Device open, initiator not started
    #[default]
    Idle,
    /// Initiator started, no target
    FieldUp,
    /// Target known, initiator not started
    Discovered(Tracked),
    /// Target selected through the initiator
    Active(Tracked),
}

impl FieldState {
    /// True when a target is tracked.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Discovered(_) | Self::Active(_))
    }

    /// True once the initiator has been started.
    pub fn is_initiated(&self) -> bool {
        matches!(self, Self::FieldUp | Self::Active(_))
    }

    /// Tracked target, if any.
    pub fn tracked(&self) -> Option<&Tracked> {
        match self {
            Self::Discovered(t) | Self::Active(t) => Some(t),
            Self::Idle | Self::FieldUp => None,
        }
    }

    /// Forget the target, keeping the initiator flag.
    pub fn lose_target(self) -> Self {
        match self {
            Self::Discovered(_) => Self::Idle,
            Self::Active(_) => Self::FieldUp,
            other => other,
        }
    }

    fn with_target(initiated: bool, tracked: Tracked) -> Self {
        if initiated {
            Self::Active(tracked)
        } else {
            Self::Discovered(tracked)
        }
    }
}

/// An open transceiver handle. Presence lives here, so a slot without a
/// connection can never report a target.
pub struct Connection {
    transport: Box<dyn Transport>,
    field: FieldState,
}

impl Connection {
    /// Idle connection over `transport`.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            field: FieldState::Idle,
        }
    }

    /// Current radio state.
    pub fn field(&self) -> &FieldState {
        &self.field
    }

    /// True when a target is tracked.
    pub fn is_present(&self) -> bool {
        self.field.is_present()
    }

    /// Tracked target, if any.
    pub fn tracked(&self) -> Option<&Tracked> {
        self.field.tracked()
    }

    fn lose_target(&mut self) {
        self.field = std::mem::take(&mut self.field).lose_target();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// Per-Lun device slot.
pub struct Slot {
    lun: Lun,
    context: Arc<dyn Context>,
    connection: Option<Connection>,
    connstring: Option<String>,
    secure_element_as_card: bool,
    mode: Mode,
    open_attempted_at: Option<Instant>,
    config: Arc<DriverConfig>,
    atr_builder: Arc<dyn AtrBuilder>,
}

impl Slot {
    /// Inactive slot without a connection.
    pub fn new(
        lun: Lun,
        context: Arc<dyn Context>,
        config: Arc<DriverConfig>,
        atr_builder: Arc<dyn AtrBuilder>,
    ) -> Self {
        Self {
            lun,
            context,
            connection: None,
            connstring: None,
            secure_element_as_card: false,
            mode: Mode::Inactive,
            open_attempted_at: None,
            config,
            atr_builder,
        }
    }

    /// Logical unit number.
    pub fn lun(&self) -> Lun {
        self.lun
    }

    /// Current driver mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Record the driver mode; the device is left untouched.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// True while a device is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// True when a card is tracked.
    pub fn is_present(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_present)
    }

    /// True once the initiator has been started.
    pub fn is_initiated(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.field.is_initiated())
    }

    /// Open connection, if any.
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Remembered connection string, if any.
    pub fn connstring(&self) -> Option<&str> {
        self.connstring.as_deref()
    }

    /// True when the secure element is presented as the card.
    pub fn secure_element_as_card(&self) -> bool {
        self.secure_element_as_card
    }

    /// Present the secure element as the card, or not.
    pub fn set_secure_element_as_card(&mut self, enabled: bool) {
        self.secure_element_as_card = enabled;
    }

    /// Driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// ATR of the tracked target; empty when nothing is tracked.
    pub fn atr(&self) -> Atr {
        self.tracked().map(|t| t.atr).unwrap_or_default()
    }

    /// Tracked target, if any.
    pub fn target(&self) -> Option<&Target> {
        self.tracked().map(|t| &t.target)
    }

    fn tracked(&self) -> Option<&Tracked> {
        self.connection.as_ref().and_then(Connection::tracked)
    }

    pub(crate) fn open_attempted_at(&self) -> Option<Instant> {
        self.open_attempted_at
    }

    /// Send an APDU to the tracked target, answering identity queries
    /// locally. `rx_capacity` is the size of the caller's receive buffer.
    pub fn transmit(&mut self, apdu: &[u8], rx_capacity: usize) -> Result<Vec<u8>> {
        let timeout = self.config.transceive_timeout;
        let conn = self.connection.as_mut().ok_or(Error::IccNotPresent)?;
        let target = match &conn.field {
            FieldState::Discovered(t) | FieldState::Active(t) => &t.target,
            FieldState::Idle | FieldState::FieldUp => return Err(Error::IccNotPresent),
        };
        intercept::exchange(&mut *conn.transport, target, apdu, rx_capacity, timeout)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("lun", &self.lun)
            .field("mode", &self.mode)
            .field("connstring", &self.connstring)
            .field("secure_element_as_card", &self.secure_element_as_card)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
