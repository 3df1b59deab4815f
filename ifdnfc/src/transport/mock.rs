// ifdnfc/src/transport/mock.rs

//! In-memory radio used by the tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::transport::traits::{Backend, Context, Transport};
use crate::types::{Modulation, Property, Target};
use crate::{Error, Result};

/// Calls recorded by [`MockTransport`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Device opened with this connection string
    Open(String),
    /// Initiator started
    InitInitiator,
    /// Chip routed to the secure element
    InitSecureElement,
    /// Boolean property written
    SetProperty(Property, bool),
    /// Passive selection
    Select {
        /// Modulation asked for
        modulation: Modulation,
        /// UID filter, if any
        uid: Option<Vec<u8>>,
    },
    /// Passive listing
    List(Modulation),
    /// Target deselected
    Deselect,
    /// Presence check of the selected target
    PresenceCheck,
    /// Bytes sent to the target
    Transceive(Vec<u8>),
}

/// Simulated RF field plus failure switches. Shared between the test and
/// every context and transport created from the same [`MockRadio`].
#[derive(Debug, Default)]
pub struct MockField {
    /// Targets currently in the field
    pub targets: Vec<Target>,
    /// Target answering once the chip is routed to the secure element
    pub secure_element: Option<Target>,
    /// Queued transceive replies
    pub responses: VecDeque<Vec<u8>>,
    /// Parks every transceive call until opened
    pub transceive_gate: Option<Arc<TransceiveGate>>,
    /// Every call made on a transport, in order
    pub calls: Vec<MockCall>,
    /// Backend init fails
    pub fail_context: bool,
    /// Opening a device fails
    pub fail_open: bool,
    /// Starting the initiator fails
    pub fail_init: bool,
    /// Routing to the secure element fails
    pub fail_secure_element: bool,
    /// Property writes fail
    pub fail_property: bool,
    /// Selection fails with a radio error
    pub fail_select: bool,
    /// Deselect fails
    pub fail_deselect: bool,
    /// Transceive fails with a radio error
    pub fail_transceive: bool,
    /// Contexts handed out
    pub contexts_created: usize,
    /// Contexts dropped
    pub contexts_dropped: usize,
    /// Transports opened
    pub opened: usize,
    /// Transports dropped
    pub closed: usize,
}

#[derive(Debug, Default)]
struct GateState {
    open: bool,
    waiting: usize,
}

/// Holds transceive calls inside the radio exchange until [`open`] is
/// called. Waiting happens outside the field lock, so other transports on
/// the same radio keep working.
///
/// [`open`]: TransceiveGate::open
#[derive(Debug, Default)]
pub struct TransceiveGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl TransceiveGate {
    /// Closed gate.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block until `n` transceive calls are parked at the gate.
    pub fn wait_for_waiters(&self, n: usize) {
        let mut state = self.state.lock();
        while state.waiting < n {
            self.changed.wait(&mut state);
        }
    }

    /// Release every parked call and let later calls through.
    pub fn open(&self) {
        self.state.lock().open = true;
        self.changed.notify_all();
    }

    fn pass(&self) {
        let mut state = self.state.lock();
        state.waiting += 1;
        self.changed.notify_all();
        while !state.open {
            self.changed.wait(&mut state);
        }
        state.waiting -= 1;
    }
}

/// Test handle on a simulated transceiver.
#[derive(Debug, Clone, Default)]
pub struct MockRadio {
    field: Arc<Mutex<MockField>>,
}

impl MockRadio {
    /// Empty field, nothing failing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose contexts share this radio.
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::new(MockBackend {
            radio: self.clone(),
        })
    }

    /// Context bound to this radio, bypassing `fail_context`.
    pub fn context(&self) -> Arc<dyn Context> {
        self.with(|s| s.contexts_created += 1);
        Arc::new(MockContext {
            radio: self.clone(),
        })
    }

    /// Run `f` with the field locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut MockField) -> R) -> R {
        f(&mut self.field.lock())
    }

    /// Put a target into the field.
    pub fn insert_target(&self, target: Target) {
        self.with(|s| s.targets.push(target));
    }

    /// Empty the field.
    pub fn clear_targets(&self) {
        self.with(|s| s.targets.clear());
    }

    /// Install or remove the wired secure element.
    pub fn set_secure_element(&self, target: Option<Target>) {
        self.with(|s| s.secure_element = target);
    }

    /// Park transceive calls at `gate`.
    pub fn set_transceive_gate(&self, gate: Option<Arc<TransceiveGate>>) {
        self.with(|s| s.transceive_gate = gate);
    }

    /// Queue a transceive reply.
    pub fn push_response(&self, resp: Vec<u8>) {
        self.with(|s| s.responses.push_back(resp));
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.with(|s| s.calls.clone())
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.with(|s| s.calls.clear());
    }

    /// Transceive payloads sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.with(|s| {
            s.calls
                .iter()
                .filter_map(|c| match c {
                    MockCall::Transceive(tx) => Some(tx.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    /// Contexts not yet dropped.
    pub fn live_contexts(&self) -> usize {
        self.with(|s| s.contexts_created - s.contexts_dropped)
    }

    /// Transports not yet dropped.
    pub fn open_transports(&self) -> usize {
        self.with(|s| s.opened - s.closed)
    }
}

/// Backend producing [`MockContext`]s bound to one radio.
#[derive(Debug)]
pub struct MockBackend {
    radio: MockRadio,
}

impl Backend for MockBackend {
    fn init(&self) -> Result<Arc<dyn Context>> {
        self.radio.with(|s| {
            if s.fail_context {
                return Err(Error::ContextInit("mock context disabled".into()));
            }
            s.contexts_created += 1;
            Ok(())
        })?;
        Ok(Arc::new(MockContext {
            radio: self.radio.clone(),
        }))
    }
}

/// Opens transports for connection strings starting with `mock`.
#[derive(Debug)]
pub struct MockContext {
    radio: MockRadio,
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.radio.with(|s| s.contexts_dropped += 1);
    }
}

impl Context for MockContext {
    fn open(&self, connstring: &str) -> Result<Box<dyn Transport>> {
        self.radio.with(|s| {
            s.calls.push(MockCall::Open(connstring.to_string()));
            if s.fail_open || !connstring.starts_with("mock") {
                return Err(Error::DeviceNotFound(connstring.to_string()));
            }
            s.opened += 1;
            Ok(())
        })?;
        Ok(Box::new(MockTransport {
            radio: self.radio.clone(),
            secure_element_mode: false,
        }))
    }

    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(vec!["mock:0".to_string()])
    }
}

/// Mock transport for unit tests. Selection and presence checks are answered from
/// the shared [`MockField`]; transceive pops queued responses.
#[derive(Debug)]
pub struct MockTransport {
    radio: MockRadio,
    secure_element_mode: bool,
}

impl MockTransport {
    /// True once routed to the secure element.
    pub fn is_secure_element_mode(&self) -> bool {
        self.secure_element_mode
    }

    fn candidates(&self, field: &MockField) -> Vec<Target> {
        if self.secure_element_mode {
            field.secure_element.iter().cloned().collect()
        } else {
            field.targets.clone()
        }
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.radio.with(|s| s.closed += 1);
    }
}

impl Transport for MockTransport {
    fn init_initiator(&mut self) -> Result<()> {
        let fail = self.radio.with(|s| {
            s.calls.push(MockCall::InitInitiator);
            s.fail_init
        });
        if fail {
            return Err(Error::Radio("initiator init failed".into()));
        }
        self.secure_element_mode = false;
        Ok(())
    }

    fn init_secure_element(&mut self) -> Result<()> {
        let fail = self.radio.with(|s| {
            s.calls.push(MockCall::InitSecureElement);
            s.fail_secure_element
        });
        if fail {
            return Err(Error::Radio("secure element init failed".into()));
        }
        self.secure_element_mode = true;
        Ok(())
    }

    fn set_property_bool(&mut self, property: Property, value: bool) -> Result<()> {
        self.radio.with(|s| {
            s.calls.push(MockCall::SetProperty(property, value));
            if s.fail_property {
                Err(Error::Radio("property rejected".into()))
            } else {
                Ok(())
            }
        })
    }

    fn select_passive_target(
        &mut self,
        modulation: Modulation,
        uid: Option<&[u8]>,
    ) -> Result<Option<Target>> {
        self.radio.with(|s| {
            s.calls.push(MockCall::Select {
                modulation,
                uid: uid.map(<[u8]>::to_vec),
            });
            if s.fail_select {
                return Err(Error::Radio("select failed".into()));
            }
            Ok(self
                .candidates(s)
                .into_iter()
                .find(|t| t.modulation() == modulation && uid.is_none_or(|u| t.uid() == u)))
        })
    }

    fn list_passive_targets(
        &mut self,
        modulation: Modulation,
        max_targets: usize,
    ) -> Result<Vec<Target>> {
        self.radio.with(|s| {
            s.calls.push(MockCall::List(modulation));
            if s.fail_select {
                return Err(Error::Radio("list failed".into()));
            }
            Ok(self
                .candidates(s)
                .into_iter()
                .filter(|t| t.modulation() == modulation)
                .take(max_targets)
                .collect())
        })
    }

    fn deselect_target(&mut self) -> Result<()> {
        self.radio.with(|s| {
            s.calls.push(MockCall::Deselect);
            if s.fail_deselect {
                Err(Error::Radio("deselect failed".into()))
            } else {
                Ok(())
            }
        })
    }

    fn target_is_present(&mut self, target: &Target) -> Result<bool> {
        self.radio.with(|s| {
            s.calls.push(MockCall::PresenceCheck);
            Ok(self
                .candidates(s)
                .iter()
                .any(|t| t.uid() == target.uid()))
        })
    }

    fn transceive_bytes(
        &mut self,
        tx: &[u8],
        rx_capacity: usize,
        _timeout_ms: u64,
    ) -> Result<Vec<u8>> {
        let gate = self.radio.with(|s| {
            s.calls.push(MockCall::Transceive(tx.to_vec()));
            s.transceive_gate.clone()
        });
        if let Some(gate) = gate {
            gate.pass();
        }
        self.radio.with(|s| {
            if s.fail_transceive {
                return Err(Error::Radio("transceive failed".into()));
            }
            match s.responses.pop_front() {
                Some(resp) if resp.len() > rx_capacity => Err(Error::Overflow {
                    received: resp.len(),
                    capacity: rx_capacity,
                }),
                Some(resp) => Ok(resp),
                None => Err(Error::Timeout),
            }
        })
    }
}
