//! Shared test doubles for gate integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use cerbos_gate_core::{
    CallToolRequest, ClientError, DecisionClient, DecisionClientFactory, GateError, Principal,
    RequestContext, Resource, ServerInfo, ToolEntry, ToolHandler,
};

/// Programmable decision client with shared call counters.
///
/// Clones share state, so a test can keep one handle for assertions and
/// hand another to the gate.
#[derive(Clone)]
pub struct MockDecisionClient {
    state: Arc<MockState>,
}

struct MockState {
    default_verdict: bool,
    rules: Mutex<HashMap<(String, String), bool>>,
    failing_actions: Mutex<HashSet<String>>,
    checks: AtomicUsize,
    probes: AtomicUsize,
    closes: AtomicUsize,
}

impl MockDecisionClient {
    fn new(default_verdict: bool) -> Self {
        Self {
            state: Arc::new(MockState {
                default_verdict,
                rules: Mutex::new(HashMap::new()),
                failing_actions: Mutex::new(HashSet::new()),
                checks: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    /// Client that allows everything not explicitly forbidden.
    pub fn allow_all() -> Self {
        Self::new(true)
    }

    /// Client that denies everything not explicitly permitted.
    pub fn deny_all() -> Self {
        Self::new(false)
    }

    /// Allow `action` for the principal with the given id.
    pub fn permit(&self, principal_id: &str, action: &str) {
        self.state
            .rules
            .lock()
            .unwrap()
            .insert((principal_id.to_string(), action.to_string()), true);
    }

    /// Deny `action` for the principal with the given id.
    pub fn forbid(&self, principal_id: &str, action: &str) {
        self.state
            .rules
            .lock()
            .unwrap()
            .insert((principal_id.to_string(), action.to_string()), false);
    }

    /// Make checks for `action` fail with a connection error.
    pub fn fail_on(&self, action: &str) {
        self.state
            .failing_actions
            .lock()
            .unwrap()
            .insert(action.to_string());
    }

    pub fn checks(&self) -> usize {
        self.state.checks.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.state.probes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionClient for MockDecisionClient {
    async fn check(
        &self,
        action: &str,
        principal: &Principal,
        _resource: &Resource,
    ) -> Result<bool, ClientError> {
        self.state.checks.fetch_add(1, Ordering::SeqCst);

        if self.state.failing_actions.lock().unwrap().contains(action) {
            return Err(ClientError::Connection(
                "cerbos is unreachable".to_string(),
            ));
        }

        let verdict = self
            .state
            .rules
            .lock()
            .unwrap()
            .get(&(principal.id.clone(), action.to_string()))
            .copied()
            .unwrap_or(self.state.default_verdict);
        Ok(verdict)
    }

    async fn server_info(&self) -> Result<ServerInfo, ClientError> {
        self.state.probes.fetch_add(1, Ordering::SeqCst);
        Ok(ServerInfo {
            version: "0.0.0-test".to_string(),
            commit: None,
            build_date: None,
        })
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out a prepared mock client, counting constructions and
/// optionally failing a configured number of times first.
pub struct MockFactory {
    client: MockDecisionClient,
    connects: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl MockFactory {
    pub fn new(client: MockDecisionClient) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` connection attempts.
    pub fn fail_times(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionClientFactory for MockFactory {
    async fn connect(&self) -> Result<Arc<dyn DecisionClient>, ClientError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ClientError::Connection(
                "cannot connect to cerbos".to_string(),
            ));
        }

        Ok(Arc::new(self.client.clone()))
    }
}

/// Downstream handler that records invocations and answers predictably.
pub struct RecordingHandler {
    tools: Vec<ToolEntry>,
    calls: AtomicUsize,
    listings: AtomicUsize,
}

impl RecordingHandler {
    pub fn new(tool_names: &[&str]) -> Self {
        Self {
            tools: tool_names.iter().map(|name| ToolEntry::new(*name)).collect(),
            calls: AtomicUsize::new(0),
            listings: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolHandler for RecordingHandler {
    async fn call_tool(
        &self,
        _ctx: &RequestContext,
        request: &CallToolRequest,
    ) -> Result<Value, GateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "tool": request.name,
            "arguments": request.arguments,
        }))
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> Result<Vec<ToolEntry>, GateError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.tools.clone())
    }
}
