//! Connection registry implementation
//!
//! The set of live connections for one channel. The lock is held only to
//! mutate the map or clone a snapshot of it, never across network I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::connection::{Connection, ConnectionId};
use super::error::RegistryError;

/// Thread-safe set of live connections
///
/// Safe for concurrent add/remove from the accept task and write completions
/// while a producer iterates.
pub struct ConnectionRegistry {
    /// Map of connection ID to connection
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,

    /// Counter for generating unique connection IDs
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh connection ID
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert a connection
    pub fn add(&self, connection: Arc<Connection>) -> Result<(), RegistryError> {
        let mut connections = self.connections.write()?;
        connections.insert(connection.id(), connection);
        Ok(())
    }

    /// Remove a connection by ID
    ///
    /// Removing an absent connection is a no-op and returns `Ok(None)`.
    pub fn remove(&self, id: ConnectionId) -> Result<Option<Arc<Connection>>, RegistryError> {
        let mut connections = self.connections.write()?;
        Ok(connections.remove(&id))
    }

    /// Clone the current membership
    ///
    /// Each element is an `Arc`, so a concurrent removal cannot free a
    /// connection the caller is still visiting.
    pub fn snapshot(&self) -> Result<Vec<Arc<Connection>>, RegistryError> {
        let connections = self.connections.read()?;
        Ok(connections.values().cloned().collect())
    }

    /// Visit every connection registered at the time of the call
    pub fn for_each<F>(&self, mut visitor: F) -> Result<(), RegistryError>
    where
        F: FnMut(&Arc<Connection>),
    {
        for connection in self.snapshot()? {
            visitor(&connection);
        }
        Ok(())
    }

    /// Remove and return every connection
    pub fn drain(&self) -> Result<Vec<Arc<Connection>>, RegistryError> {
        let mut connections = self.connections.write()?;
        Ok(connections.drain().map(|(_, conn)| conn).collect())
    }

    /// Check whether a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .map(|connections| connections.contains_key(&id))
            .unwrap_or(false)
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections
            .read()
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    /// Whether no connections are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
