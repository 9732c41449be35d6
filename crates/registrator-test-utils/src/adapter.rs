//! [`RecordingAdapter`]: an in-memory registry backend for tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use registrator_core::{AdapterError, RegistryAdapter, Service};

/// One call made against the adapter, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    Register(String),
    Deregister(String),
    Services,
    Refresh(String),
}

#[derive(Default)]
struct State {
    services: BTreeMap<String, Service>,
    calls: Vec<Call>,
    failing_pings: u64,
    fail_register: bool,
    deregister_error: Option<AdapterError>,
    fail_services: bool,
}

/// In-memory backend. Clones share state, so a test can keep one handle
/// and give another to the Bridge.
///
/// # Example
///
/// ```rust,no_run
/// use registrator_test_utils::RecordingAdapter;
///
/// let backend = RecordingAdapter::new();
/// let boxed: Box<dyn registrator_core::RegistryAdapter> = Box::new(backend.clone());
/// assert!(backend.registered_ids().is_empty());
/// # drop(boxed);
/// ```
#[derive(Clone, Default)]
pub struct RecordingAdapter {
    state: Arc<Mutex<State>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Forget recorded calls, keep registrations.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// IDs passed to `register`, in order.
    pub fn register_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Register(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// IDs passed to `deregister`, in order.
    pub fn deregister_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Deregister(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// IDs passed to `refresh`, in order.
    pub fn refresh_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Refresh(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn ping_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Ping).count()
    }

    /// IDs currently held (sorted).
    pub fn registered_ids(&self) -> Vec<String> {
        self.state().services.keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Service> {
        self.state().services.get(id).cloned()
    }

    /// Seed a registration without recording a call, e.g. one owned by
    /// another host or left behind by a crash.
    pub fn insert(&self, service: Service) {
        self.state().services.insert(service.id.clone(), service);
    }

    /// Drop every registration, as a restarted backend would.
    pub fn wipe(&self) {
        self.state().services.clear();
    }

    /// Fail the next `n` pings with `Unavailable`.
    pub fn fail_next_pings(&self, n: u64) {
        self.state().failing_pings = n;
    }

    /// Make every `register` fail with `Unavailable`.
    pub fn fail_registrations(&self, fail: bool) {
        self.state().fail_register = fail;
    }

    /// Make every `deregister` fail with `error` (or succeed again with
    /// `None`).
    pub fn fail_deregistrations(&self, error: Option<AdapterError>) {
        self.state().deregister_error = error;
    }

    /// Make `services` fail with `Unavailable`.
    pub fn fail_listing(&self, fail: bool) {
        self.state().fail_services = fail;
    }
}

#[async_trait]
impl RegistryAdapter for RecordingAdapter {
    async fn ping(&self) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.calls.push(Call::Ping);
        if state.failing_pings > 0 {
            state.failing_pings -= 1;
            return Err(AdapterError::unavailable("connection refused"));
        }
        Ok(())
    }

    async fn register(&self, service: &Service) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.calls.push(Call::Register(service.id.clone()));
        if state.fail_register {
            return Err(AdapterError::unavailable("connection refused"));
        }
        state.services.insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn deregister(&self, service: &Service) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.calls.push(Call::Deregister(service.id.clone()));
        if let Some(error) = state.deregister_error.clone() {
            return Err(error);
        }
        match state.services.remove(&service.id) {
            Some(_) => Ok(()),
            None => Err(AdapterError::NotFound {
                id: service.id.clone(),
            }),
        }
    }

    async fn services(&self) -> Result<Vec<Service>, AdapterError> {
        let mut state = self.state();
        state.calls.push(Call::Services);
        if state.fail_services {
            return Err(AdapterError::unavailable("connection refused"));
        }
        Ok(state.services.values().cloned().collect())
    }

    async fn refresh(&self, service: &Service) -> Result<(), AdapterError> {
        self.state().calls.push(Call::Refresh(service.id.clone()));
        Ok(())
    }
}
