// ifdnfc/src/lib.rs

//! ifdnfc
//!
//! PC/SC IFD handler that exposes an NFC transceiver as a contactless
//! smart-card slot. The library builds as a cdylib for pcscd
//! ([`ifdhandler`]) and as an rlib whose [`Driver`] can be driven directly.
#![warn(missing_docs)]

pub mod atr;
pub mod config;
pub mod constants;
pub mod control;
pub mod driver;
pub mod error;
pub mod ifdhandler;
pub mod intercept;
pub mod prelude;
pub mod protocol;
pub mod registry;
pub mod slot;
pub mod test_support;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`,
// and the newtypes in `types` are available for consumers and for
// convenient `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
