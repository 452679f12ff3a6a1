//! Shared request-handler state

use std::sync::Arc;

use crate::auth::{AccessGate, GateMode};
use crate::completion::CompletionClient;
use crate::store::DocumentStore;

/// Database settings echoed by `/db-check`
#[derive(Debug, Clone, Default)]
pub struct DbDiagnostics {
    pub host: Option<String>,
    pub user: Option<String>,
}

impl DbDiagnostics {
    /// Raw deployment values; `None` when a variable is unset.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup("MONGO_HOST"),
            user: lookup("MONGO_INITDB_ROOT_USERNAME"),
        }
    }
}

/// API server state
///
/// Built once before the listener starts and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Store handle lent by the connection owner; `None` when not connected
    pub store: Option<Arc<dyn DocumentStore>>,

    pub gate: Arc<AccessGate>,

    /// Present only when an inference provider is configured
    pub completions: Option<Arc<CompletionClient>>,

    pub diagnostics: Arc<DbDiagnostics>,
}

impl AppState {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, gate: AccessGate) -> Self {
        Self {
            store,
            gate: Arc::new(gate),
            completions: None,
            diagnostics: Arc::new(DbDiagnostics::default()),
        }
    }

    /// State with no store and the gate disabled
    pub fn detached() -> Self {
        Self::new(None, AccessGate::new(GateMode::Disabled))
    }

    pub fn with_completions(mut self, client: Option<CompletionClient>) -> Self {
        self.completions = client.map(Arc::new);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DbDiagnostics) -> Self {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    pub fn store(&self) -> Option<&dyn DocumentStore> {
        self.store.as_deref()
    }
}
