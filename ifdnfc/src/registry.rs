// ifdnfc/src/registry.rs

//! Bounded pool of device slots keyed by Lun, plus the shared radio context.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::transport::{Backend, Context};
use crate::types::Lun;
use crate::{Error, Result};
use crate::slot::Slot;

/// Shared, individually locked slot.
pub type SlotHandle = Arc<Mutex<Slot>>;

struct RegistryInner {
    slots: Vec<Option<SlotHandle>>,
    by_lun: HashMap<Lun, usize>,
    context: Option<Arc<dyn Context>>,
}

/// Slot arena. The shared context is created with the first allocation and
/// dropped with the last release.
pub struct Registry {
    backend: Arc<dyn Backend>,
    inner: Mutex<RegistryInner>,
}

impl Registry {
    /// Empty registry with room for `capacity` slots.
    pub fn new(backend: Arc<dyn Backend>, capacity: usize) -> Self {
        Self {
            backend,
            inner: Mutex::new(RegistryInner {
                slots: vec![None; capacity],
                by_lun: HashMap::with_capacity(capacity),
                context: None,
            }),
        }
    }

    /// Maximum number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Allocated slots.
    pub fn len(&self) -> usize {
        self.inner.lock().by_lun.len()
    }

    /// True when no slot is allocated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while the shared context is alive.
    pub fn has_context(&self) -> bool {
        self.inner.lock().context.is_some()
    }

    /// Allocate the first free entry for `lun`; `make` builds the slot
    /// around the shared context.
    pub fn allocate<F>(&self, lun: Lun, make: F) -> Result<SlotHandle>
    where
        F: FnOnce(Arc<dyn Context>) -> Slot,
    {
        let mut inner = self.inner.lock();
        if inner.by_lun.contains_key(&lun) {
            return Err(Error::LunInUse(lun));
        }
        let Some(index) = inner.slots.iter().position(Option::is_none) else {
            log::error!("all {} device slots are in use", inner.slots.len());
            return Err(Error::CapacityExceeded(inner.slots.len()));
        };

        let context = match &inner.context {
            Some(ctx) => Arc::clone(ctx),
            None => {
                log::debug!("initializing the radio context");
                let ctx = self.backend.init().map_err(|e| match e {
                    Error::ContextInit(msg) => Error::ContextInit(msg),
                    other => Error::ContextInit(other.to_string()),
                })?;
                inner.context = Some(Arc::clone(&ctx));
                ctx
            }
        };

        let handle = Arc::new(Mutex::new(make(context)));
        inner.slots[index] = Some(Arc::clone(&handle));
        inner.by_lun.insert(lun, index);
        Ok(handle)
    }

    /// Slot bound to `lun`. The registry lock is released on return.
    pub fn lookup(&self, lun: Lun) -> Result<SlotHandle> {
        let inner = self.inner.lock();
        inner
            .by_lun
            .get(&lun)
            .and_then(|&i| inner.slots[i].clone())
            .ok_or(Error::UnknownLun(lun))
    }

    /// Free the entry of `lun` and return its slot. Releasing the last slot
    /// drops the registry's reference on the shared context.
    pub fn release(&self, lun: Lun) -> Result<SlotHandle> {
        let mut inner = self.inner.lock();
        let index = inner.by_lun.remove(&lun).ok_or(Error::UnknownLun(lun))?;
        let handle = inner.slots[index].take().ok_or(Error::UnknownLun(lun))?;
        if inner.by_lun.is_empty() {
            log::debug!("last slot released, dropping the radio context");
            inner.context = None;
        }
        Ok(handle)
    }
}
