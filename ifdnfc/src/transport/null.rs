// ifdnfc/src/transport/null.rs

//! Context used when no backend is compiled in.

use std::sync::Arc;

use crate::transport::traits::{Backend, Context, Transport};
use crate::{Error, Result};

/// Backend used when no radio backend is compiled in. The context can be
/// created, so slots can be allocated and controlled, but every open fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

/// Context of [`NullBackend`]; lists nothing and opens nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullContext;

impl Backend for NullBackend {
    fn init(&self) -> Result<Arc<dyn Context>> {
        Ok(Arc::new(NullContext))
    }
}

impl Context for NullContext {
    fn open(&self, connstring: &str) -> Result<Box<dyn Transport>> {
        log::debug!("no radio backend available for '{}'", connstring);
        Err(Error::DeviceNotFound(connstring.to_string()))
    }
}
