// ifdnfc/src/prelude.rs

//! Commonly used items.

pub use crate::atr::{AtrBuilder, AtrKind, PcscAtrBuilder};
pub use crate::config::DriverConfig;
pub use crate::control::{ControlCommand, ControlRequest, ControlResponse};
pub use crate::driver::Driver;
pub use crate::slot::{FieldState, Outcome, Slot};
pub use crate::transport::{Backend, Context, Transport};
pub use crate::{Atr, Error, Lun, Mode, Modulation, PowerAction, ResponseCode, Result, Target};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced, ms};
