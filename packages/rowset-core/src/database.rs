//! Database handle: a store plus the configuration new sessions start with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::DbConfig;
use crate::connection::{Connection, Session};
use crate::store::{MemoryStore, Store};

/// Entry point handing out connections over one shared store.
///
/// Connections share committed data through the store but each owns its
/// own transaction context.
#[derive(Debug, Clone)]
pub struct Database {
    store: Arc<dyn Store>,
    config: DbConfig,
    next_session: Arc<AtomicU64>,
}

impl Database {
    /// Creates a database over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Creates a database over an existing store.
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: DbConfig::default(),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replaces the configuration used by connections opened afterwards.
    pub fn with_config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Opens a new connection.
    pub fn connect(&self) -> Connection {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        Connection::new(Session::new(id, self.store.clone(), self.config.clone()))
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
