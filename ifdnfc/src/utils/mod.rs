//! Small helpers shared by the driver: hex formatting for log records and
//! timeout conversions.

pub mod hex;
pub mod timeout;

pub use hex::*;
pub use timeout::*;
