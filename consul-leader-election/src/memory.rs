//! In-process coordination service.
//!
//! [`InMemoryCoordinator`] follows the same acquire/release rules as a Consul
//! agent and records every call, so election runs can be observed without a
//! cluster. Failures and competing nodes can be injected per operation.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::{
    CoordinationClient, KeyRecord, ServiceRegistration, SessionId, SessionInfo, SessionRequest,
};
use crate::config::{BASELINE_HEALTH_CHECK, DEFAULT_LOCK_DELAY};
use crate::error::{ClientError, ClientResult};

/// Session used to seat a holder outside the election under test
fn seat_request(key: &str) -> SessionRequest {
    SessionRequest {
        name: key.to_string(),
        checks: vec![BASELINE_HEALTH_CHECK.to_string()],
        lock_delay: DEFAULT_LOCK_DELAY,
    }
}

/// The coordination calls the in-memory collaborator can count or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetKey,
    CreateSession,
    DestroySession,
    SessionInfo,
    AcquireKey,
    LocalNodeName,
    Services,
    RegisterService,
}

#[derive(Debug, Clone)]
struct Session {
    node: String,
    request: SessionRequest,
}

#[derive(Debug, Default)]
struct State {
    keys: HashMap<String, KeyRecord>,
    sessions: HashMap<SessionId, Session>,
    services: HashMap<String, ServiceRegistration>,
    failures: HashSet<Operation>,
    calls: HashMap<Operation, usize>,
    next_session: u64,
    rival: Option<String>,
}

impl State {
    fn open_session(&mut self, node: &str, request: SessionRequest) -> SessionId {
        self.next_session += 1;
        let id = format!("session-{:04}", self.next_session);
        self.sessions.insert(
            id.clone(),
            Session {
                node: node.to_string(),
                request,
            },
        );
        id
    }

    fn hold(&mut self, key: &str, value: &[u8], session: SessionId) {
        self.keys.insert(
            key.to_string(),
            KeyRecord {
                key: key.to_string(),
                value: value.to_vec(),
                session: Some(session),
            },
        );
    }
}

/// A coordination service that lives in memory
#[derive(Debug)]
pub struct InMemoryCoordinator {
    node_name: String,
    state: Mutex<State>,
}

impl InMemoryCoordinator {
    /// Create an empty service whose local agent is `node_name`
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a service with the local agent
    pub fn with_service(self, registration: ServiceRegistration) -> Self {
        self.state()
            .services
            .insert(registration.id.clone(), registration);
        self
    }

    /// Seat `node` as the holder of `key` through a fresh session
    pub fn with_key_held_by(self, key: &str, node: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.open_session(node, seat_request(key));
            state.hold(key, node.as_bytes(), id);
        }
        self
    }

    /// Point `key` at a session that no longer exists
    pub fn with_stale_holder(self, key: &str, session: &str) -> Self {
        self.state().hold(key, b"gone", session.to_string());
        self
    }

    /// Make every call of `operation` fail as if the service were unreachable
    pub fn fail_on(self, operation: Operation) -> Self {
        self.state().failures.insert(operation);
        self
    }

    /// Let `node` win the key just before the next local acquire attempt
    pub fn with_rival(self, node: &str) -> Self {
        self.state().rival = Some(node.to_string());
        self
    }

    /// Number of times `operation` was invoked
    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Current record for `key`
    pub fn key(&self, key: &str) -> Option<KeyRecord> {
        self.state().keys.get(key).cloned()
    }

    /// Registered service by ID
    pub fn service(&self, id: &str) -> Option<ServiceRegistration> {
        self.state().services.get(id).cloned()
    }

    /// Live sessions created by `node`
    pub fn sessions_of(&self, node: &str) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .state()
            .sessions
            .iter()
            .filter(|(_, session)| session.node == node)
            .map(|(id, session)| SessionInfo {
                id: id.clone(),
                node: session.node.clone(),
            })
            .collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        sessions
    }

    /// Parameters a live session was created with
    pub fn session_request(&self, id: &str) -> Option<SessionRequest> {
        self.state()
            .sessions
            .get(id)
            .map(|session| session.request.clone())
    }

    fn enter(&self, operation: Operation) -> ClientResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        *state.calls.entry(operation).or_default() += 1;
        if state.failures.contains(&operation) {
            return Err(ClientError::Unavailable(format!(
                "{:?} failed: connection refused",
                operation
            )));
        }
        Ok(state)
    }
}

#[async_trait]
impl CoordinationClient for InMemoryCoordinator {
    async fn get_key(&self, key: &str) -> ClientResult<Option<KeyRecord>> {
        let state = self.enter(Operation::GetKey)?;
        Ok(state.keys.get(key).cloned())
    }

    async fn create_session(&self, request: &SessionRequest) -> ClientResult<SessionId> {
        let mut state = self.enter(Operation::CreateSession)?;
        Ok(state.open_session(&self.node_name, request.clone()))
    }

    async fn destroy_session(&self, id: &str) -> ClientResult<()> {
        let mut state = self.enter(Operation::DestroySession)?;
        state.sessions.remove(id);
        for record in state.keys.values_mut() {
            if record.session.as_deref() == Some(id) {
                record.session = None;
            }
        }
        Ok(())
    }

    async fn session_info(&self, id: &str) -> ClientResult<Option<SessionInfo>> {
        let state = self.enter(Operation::SessionInfo)?;
        Ok(state.sessions.get(id).map(|session| SessionInfo {
            id: id.to_string(),
            node: session.node.clone(),
        }))
    }

    async fn acquire_key(&self, key: &str, value: &[u8], session: &str) -> ClientResult<bool> {
        let mut state = self.enter(Operation::AcquireKey)?;

        if let Some(rival) = state.rival.take() {
            let id = state.open_session(&rival, seat_request(key));
            state.hold(key, rival.as_bytes(), id);
        }

        if !state.sessions.contains_key(session) {
            return Err(ClientError::Api {
                status: 500,
                body: format!("invalid session \"{}\"", session),
            });
        }

        let holder = state.keys.get(key).and_then(|record| record.holder().map(str::to_string));
        match holder {
            Some(holder) if holder != session && state.sessions.contains_key(&holder) => Ok(false),
            _ => {
                state.hold(key, value, session.to_string());
                Ok(true)
            }
        }
    }

    async fn local_node_name(&self) -> ClientResult<String> {
        drop(self.enter(Operation::LocalNodeName)?);
        Ok(self.node_name.clone())
    }

    async fn services(&self) -> ClientResult<HashMap<String, ServiceRegistration>> {
        let state = self.enter(Operation::Services)?;
        Ok(state.services.clone())
    }

    async fn register_service(&self, registration: &ServiceRegistration) -> ClientResult<()> {
        let mut state = self.enter(Operation::RegisterService)?;
        state
            .services
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }
}
