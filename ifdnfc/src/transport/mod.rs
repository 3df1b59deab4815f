// ifdnfc/src/transport/mod.rs

//! Radio transports: the trait seam, a mock, a null context and USB.

pub mod mock;
pub mod null;
pub mod traits;
#[cfg(feature = "usb")]
pub mod usb;

pub use mock::{MockBackend, MockContext, MockRadio, MockTransport, TransceiveGate};
pub use null::NullBackend;
pub use traits::{Backend, Context, Transport};
#[cfg(feature = "usb")]
pub use usb::{Pn533Transport, UsbBackend, UsbRadioContext};
