// ifdnfc/src/protocol/mod.rs

//! PN53x wire protocol used by the USB backend.

pub mod checksum;
pub mod frame;
pub mod parser;
pub mod pn53x;

pub use checksum::{dcs, lcs, xor};
pub use frame::Frame;
