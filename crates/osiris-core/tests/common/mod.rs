#![allow(dead_code)]

use osiris_core::api::ApiFuture;
use osiris_core::{ApiError, Config, Entity, ListSurface, MonitoringApi, RowView, StatusLine};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Scripted answer for one kind of backend call.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Delayed(Duration, Value),
    Transport(String),
    Decode(String),
    Hang,
    Panic,
}

impl Reply {
    async fn resolve(self) -> Result<Value, ApiError> {
        match self {
            Reply::Json(value) => Ok(value),
            Reply::Delayed(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Reply::Transport(message) => Err(ApiError::Transport(message)),
            Reply::Decode(message) => Err(ApiError::Decode(message)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Value::Null)
            }
            Reply::Panic => panic!("scripted backend panic"),
        }
    }
}

pub struct FakeApi {
    search: Reply,
    probe: Reply,
    discovery: Reply,
    violations: Reply,
    search_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    discovery_calls: AtomicUsize,
    violation_calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            search: Reply::Json(search_payload(&[])),
            probe: Reply::Json(json!({"data": {"actor": {"entities": []}}})),
            discovery: Reply::Json(json!({"data": {}})),
            violations: Reply::Json(json!({"violations": []})),
            search_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            discovery_calls: AtomicUsize::new(0),
            violation_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with_search(mut self, reply: Reply) -> Self {
        self.search = reply;
        self
    }

    pub fn with_probe(mut self, reply: Reply) -> Self {
        self.probe = reply;
        self
    }

    pub fn with_discovery(mut self, reply: Reply) -> Self {
        self.discovery = reply;
        self
    }

    pub fn with_violations(mut self, reply: Reply) -> Self {
        self.violations = reply;
        self
    }

    /// Entity searches block until [`FakeApi::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    pub fn violation_calls(&self) -> usize {
        self.violation_calls.load(Ordering::SeqCst)
    }
}

impl MonitoringApi for FakeApi {
    fn graphql<'a>(&'a self, query: &'a str) -> ApiFuture<'a> {
        Box::pin(async move {
            if query.contains("entitySearch") {
                self.search_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(gate) = &self.gate {
                    gate.acquire().await.expect("gate open").forget();
                }
                self.search.clone().resolve().await
            } else if query.contains("incidents") {
                self.probe_calls.fetch_add(1, Ordering::SeqCst);
                self.probe.clone().resolve().await
            } else if query.contains("aiIssues") {
                self.discovery_calls.fetch_add(1, Ordering::SeqCst);
                self.discovery.clone().resolve().await
            } else {
                Err(ApiError::Backend(format!("unexpected query: {query}")))
            }
        })
    }

    fn open_violations(&self) -> ApiFuture<'_> {
        Box::pin(async move {
            self.violation_calls.fetch_add(1, Ordering::SeqCst);
            self.violations.clone().resolve().await
        })
    }
}

/// Entity search envelope for `(name, guid)` pairs.
pub fn search_payload(hosts: &[(&str, &str)]) -> Value {
    let entities: Vec<Value> = hosts
        .iter()
        .map(|(name, guid)| json!({"name": name, "guid": guid, "entityType": "HOST"}))
        .collect();
    json!({"data": {"actor": {"entitySearch": {"results": {"entities": entities}}}}})
}

pub fn probe_payload(guid: &str, title: &str, description: &str) -> Value {
    json!({"data": {"actor": {"entities": [
        {"guid": guid, "name": "ignored", "incidents": [
            {"title": title, "description": description}
        ]}
    ]}}})
}

pub fn hosts(count: usize) -> Vec<Entity> {
    (0..count)
        .map(|index| Entity::new(format!("host-{index:03}"), format!("g{index}"), "HOST"))
        .collect()
}

pub fn live_config() -> Config {
    Config {
        api_key: "NRAK-test".to_string(),
        account_id: "1234".to_string(),
        ..Config::default()
    }
}

/// In-memory list surface that remembers each completed paint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSurface {
    pub rows: Vec<RowView>,
    pub selection: Option<usize>,
    pub status: Option<StatusLine>,
    pub clears: usize,
    pub paints: Vec<Vec<RowView>>,
}

impl ListSurface for RecordingSurface {
    fn clear(&mut self) {
        self.rows.clear();
        self.clears += 1;
    }

    fn append_row(&mut self, row: RowView) {
        self.rows.push(row);
    }

    fn set_selection(&mut self, index: Option<usize>) {
        self.selection = index;
        self.paints.push(self.rows.clone());
    }

    fn set_status(&mut self, status: StatusLine) {
        self.status = Some(status);
    }
}
