// ifdnfc/src/transport/traits.rs

//! Context, transport and backend traits.

use std::sync::Arc;

use crate::types::{Modulation, Property, Target};
use crate::Result;

/// An open handle on one NFC transceiver. Dropping the handle closes it.
///
/// The driver only talks to the radio through this trait, so tests can swap
/// in [`crate::transport::MockTransport`] and hardware backends stay behind
/// cargo features.
pub trait Transport: Send {
    /// Start the RF field and put the chip in initiator (reader) mode.
    fn init_initiator(&mut self) -> Result<()>;

    /// Route the initiator to the wired secure element instead of the field.
    fn init_secure_element(&mut self) -> Result<()>;

    /// Write a boolean radio property.
    fn set_property_bool(&mut self, property: Property, value: bool) -> Result<()>;

    /// Select one target of the given modulation. `uid` restricts the
    /// selection to that identifier. `Ok(None)` means nothing answered.
    fn select_passive_target(
        &mut self,
        modulation: Modulation,
        uid: Option<&[u8]>,
    ) -> Result<Option<Target>>;

    /// List up to `max_targets` targets. Default implementation falls back
    /// to a single unfiltered selection.
    fn list_passive_targets(
        &mut self,
        modulation: Modulation,
        max_targets: usize,
    ) -> Result<Vec<Target>> {
        if max_targets == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .select_passive_target(modulation, None)?
            .into_iter()
            .collect())
    }

    /// Deselect the current target, keeping the field up.
    fn deselect_target(&mut self) -> Result<()>;

    /// Lightweight presence check of an already selected target.
    fn target_is_present(&mut self, target: &Target) -> Result<bool>;

    /// Exchange raw bytes with the selected target. A response longer than
    /// `rx_capacity` is an [`crate::Error::Overflow`], never truncated.
    fn transceive_bytes(&mut self, tx: &[u8], rx_capacity: usize, timeout_ms: u64)
    -> Result<Vec<u8>>;
}

/// Shared radio-stack context; opens transports by connection string.
pub trait Context: Send + Sync {
    /// Open the device named by `connstring`.
    fn open(&self, connstring: &str) -> Result<Box<dyn Transport>>;

    /// Connection strings of the devices this context can reach.
    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Factory for the shared context. The registry calls `init` when the first
/// slot is allocated and drops the context with the last slot.
pub trait Backend: Send + Sync {
    /// Create the shared context.
    fn init(&self) -> Result<Arc<dyn Context>>;
}
