//! In-memory backend for development and testing
//!
//! Behaves like a single Docker host: created containers are not listed until
//! started, and listing returns containers in creation order. Each operation
//! can be made to fail on demand, and a backend built with
//! [`InMemoryBackend::recording`] keeps a log of every call.

use super::traits::*;
use crate::error::BackendError;
use async_trait::async_trait;
use fleet_types::{ContainerId, ContainerRef, Selector};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A call received by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    List {
        selector: String,
    },
    Create {
        image: String,
        labels: BTreeMap<String, String>,
    },
    Start {
        id: ContainerId,
    },
    Remove {
        id: ContainerId,
        options: RemoveOptions,
    },
}

#[derive(Debug)]
struct FakeContainer {
    container: ContainerRef,
    running: bool,
}

#[derive(Debug, Default)]
struct Failures {
    list: HashSet<String>,
    create: bool,
    start: bool,
    remove: HashSet<ContainerId>,
}

#[derive(Debug, Default)]
struct BackendState {
    containers: Vec<FakeContainer>,
    /// `None` unless recording was requested
    calls: Option<Vec<BackendCall>>,
    failures: Failures,
    last_created: i64,
}

/// Process-local container backend
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
}

impl BackendState {
    fn record(&mut self, call: BackendCall) {
        if let Some(calls) = self.calls.as_mut() {
            calls.push(call);
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that logs every call, for inspection through [`Self::calls`]
    pub fn recording() -> Self {
        Self {
            state: Mutex::new(BackendState {
                calls: Some(Vec::new()),
                ..Default::default()
            }),
        }
    }

    /// Add an already-running container, e.g. one started by someone else
    pub async fn seed(&self, container: ContainerRef) {
        let mut state = self.state.lock().await;
        state.last_created = state.last_created.max(container.created);
        state.containers.push(FakeContainer {
            container,
            running: true,
        });
    }

    /// Every container known to the backend, running or not
    pub async fn containers(&self) -> Vec<ContainerRef> {
        let state = self.state.lock().await;
        state.containers.iter().map(|c| c.container.clone()).collect()
    }

    /// Running containers matching `selector`
    pub async fn running(&self, selector: &Selector) -> Vec<ContainerRef> {
        let state = self.state.lock().await;
        matching(&state, selector)
    }

    /// Calls received so far; always empty unless built with [`Self::recording`]
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.calls.clone().unwrap_or_default()
    }

    pub async fn clear_calls(&self) {
        if let Some(calls) = self.state.lock().await.calls.as_mut() {
            calls.clear();
        }
    }

    /// Fail listings for the given selector
    pub async fn fail_list(&self, selector: &Selector, fail: bool) {
        let mut state = self.state.lock().await;
        if fail {
            state.failures.list.insert(selector.label());
        } else {
            state.failures.list.remove(&selector.label());
        }
    }

    pub async fn fail_create(&self, fail: bool) {
        self.state.lock().await.failures.create = fail;
    }

    pub async fn fail_start(&self, fail: bool) {
        self.state.lock().await.failures.start = fail;
    }

    /// Fail removal of one specific container
    pub async fn fail_remove(&self, id: &ContainerId, fail: bool) {
        let mut state = self.state.lock().await;
        if fail {
            state.failures.remove.insert(id.clone());
        } else {
            state.failures.remove.remove(id);
        }
    }
}

fn matching(state: &BackendState, selector: &Selector) -> Vec<ContainerRef> {
    state
        .containers
        .iter()
        .filter(|c| c.running && selector.matches(&c.container.labels))
        .map(|c| c.container.clone())
        .collect()
}

fn injected(operation: &str) -> BackendError {
    BackendError::Api {
        status: 500,
        message: format!("injected {} failure", operation),
    }
}

fn no_such_container(id: &ContainerId) -> BackendError {
    BackendError::Api {
        status: 404,
        message: format!("No such container: {}", id),
    }
}

#[async_trait]
impl ContainerBackend for InMemoryBackend {
    async fn list_containers(&self, selector: &Selector) -> BackendResult<Vec<ContainerRef>> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::List {
            selector: selector.label(),
        });

        if state.failures.list.contains(&selector.label()) {
            return Err(injected("list"));
        }

        Ok(matching(&state, selector))
    }

    async fn create_container(
        &self,
        image: &str,
        labels: &BTreeMap<String, String>,
    ) -> BackendResult<ContainerId> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::Create {
            image: image.to_string(),
            labels: labels.clone(),
        });

        if state.failures.create {
            return Err(injected("create"));
        }

        // Strictly increasing so creation order is recoverable from timestamps
        let created = chrono::Utc::now().timestamp().max(state.last_created + 1);
        state.last_created = created;

        let id = Uuid::new_v4().simple().to_string();
        let mut container = ContainerRef::new(id, image, created).with_labels(labels.clone());
        container.state = "created".to_string();
        let id = container.id.clone();

        state.containers.push(FakeContainer {
            container,
            running: false,
        });

        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::Start { id: id.clone() });

        if state.failures.start {
            return Err(injected("start"));
        }

        let fake = state
            .containers
            .iter_mut()
            .find(|c| &c.container.id == id)
            .ok_or_else(|| no_such_container(id))?;
        fake.running = true;
        fake.container.state = "running".to_string();
        fake.container.status = "Up".to_string();

        Ok(())
    }

    async fn remove_container(
        &self,
        id: &ContainerId,
        options: RemoveOptions,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::Remove {
            id: id.clone(),
            options,
        });

        if state.failures.remove.contains(id) {
            return Err(injected("remove"));
        }

        let index = state
            .containers
            .iter()
            .position(|c| &c.container.id == id)
            .ok_or_else(|| no_such_container(id))?;

        if state.containers[index].running && !options.force {
            return Err(BackendError::Api {
                status: 409,
                message: format!("cannot remove running container {}", id),
            });
        }

        state.containers.remove(index);
        Ok(())
    }
}
