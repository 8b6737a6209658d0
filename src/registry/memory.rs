//! In-process connection registry.
//!
//! Keeps rows in a map guarded by a read-write lock. Sharing one
//! [`MemoryRegistry`] between several adapters simulates several invocations
//! talking to the same external store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           MemoryRegistry                │
//! │  ┌─────────────────────────────────┐   │
//! │  │ ConnectionId → Connection       │   │
//! │  │ ConnectionId → Connection       │   │
//! │  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::ConnectionId;

use super::{Connection, ConnectionRegistry, ConnectionUpdate};

// ============================================================================
// MemoryRegistry
// ============================================================================

/// Connection registry held in process memory.
///
/// Thread-safe; never reports [`Error::RegistryUnavailable`](crate::Error).
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// Rows by connection ID.
    connections: RwLock<FxHashMap<ConnectionId, Connection>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns `true` if no connection is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns `true` if `connection_id` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.read().contains_key(connection_id)
    }
}

// ============================================================================
// MemoryRegistry - ConnectionRegistry
// ============================================================================

#[async_trait]
impl ConnectionRegistry for MemoryRegistry {
    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<Connection>> {
        Ok(self.connections.read().get(connection_id).cloned())
    }

    async fn upsert(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<()> {
        let mut connections = self.connections.write();

        match connections.get_mut(connection_id) {
            Some(connection) => {
                update.apply(connection);
                trace!(connection_id = %connection_id, "Connection updated");
            }
            None => {
                let connection = update.into_connection(connection_id.clone());
                connections.insert(connection_id.clone(), connection);
                debug!(connection_id = %connection_id, "Connection registered");
            }
        }

        Ok(())
    }

    async fn update(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<bool> {
        let mut connections = self.connections.write();

        let Some(connection) = connections.get_mut(connection_id) else {
            return Ok(false);
        };

        update.apply(connection);
        trace!(connection_id = %connection_id, "Connection updated");
        Ok(true)
    }

    async fn delete(&self, connection_id: &ConnectionId) -> Result<()> {
        let removed = self.connections.write().remove(connection_id);

        if removed.is_some() {
            debug!(connection_id = %connection_id, "Connection removed");
        }

        Ok(())
    }

    async fn scan_by_group(&self, group: &str) -> Result<Vec<Connection>> {
        let connections = self.connections.read();
        Ok(connections
            .values()
            .filter(|connection| connection.in_group(group))
            .cloned()
            .collect())
    }

    async fn add_group(&self, connection_id: &ConnectionId, group: &str) -> Result<()> {
        if let Some(connection) = self.connections.write().get_mut(connection_id) {
            connection.groups.insert(group.to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
