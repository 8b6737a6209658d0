//! Connection registry.
//!
//! Each invocation runs in a process with no memory of earlier ones, so the
//! set of open WebSocket connections and their group memberships lives in an
//! external store. The registry is the single source of truth: cycles read it
//! to decide whether a connection was accepted and to resolve group members,
//! and never cache its contents beyond one invocation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │             ConnectionRegistry                │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ "d1Bz..." → { groups: [lobby], ... }   │  │
//! │  │ "Zx3q..." → { groups: [lobby, ops] }   │  │
//! │  │ "Qm9p..." → { groups: [] }             │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//!          ▲ get / upsert / delete / scan_by_group
//!          │
//!   WebSocketCycle (one per invocation, many processes)
//! ```
//!
//! Staleness is corrected lazily: an entry is removed when a push to it
//! reports the connection gone, never by a background sweep.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `file` | One JSON document per connection in a directory |
//! | `memory` | In-process map for tests and single-process hosts |

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::transport::Endpoint;

// ============================================================================
// Submodules
// ============================================================================

/// Directory-backed registry.
pub mod file;

/// In-memory registry.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

// ============================================================================
// Connection
// ============================================================================

/// One registry row: a live WebSocket connection.
///
/// # Format
///
/// ```json
/// {
///   "connectionId": "d1BzTcMOSQ0CEsg=",
///   "groups": ["lobby"],
///   "endpoint": { "domainName": "abc.example.com", "stage": "Prod" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Primary key.
    pub connection_id: ConnectionId,

    /// Groups this connection belongs to.
    #[serde(default)]
    pub groups: BTreeSet<String>,

    /// Endpoint the connection was established on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
}

impl Connection {
    /// Creates a connection with no groups and no provenance.
    #[inline]
    #[must_use]
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            groups: BTreeSet::new(),
            endpoint: None,
        }
    }

    /// Sets the endpoint.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<Endpoint>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Returns `true` if the connection belongs to `group`.
    #[inline]
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

// ============================================================================
// ConnectionUpdate
// ============================================================================

/// Fields to write on upsert; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionUpdate {
    /// Replacement group set.
    pub groups: Option<BTreeSet<String>>,
    /// Replacement endpoint.
    pub endpoint: Option<Endpoint>,
}

impl ConnectionUpdate {
    /// Creates an update that changes nothing.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the group set.
    #[must_use]
    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Option<Endpoint>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Applies the update to an existing row.
    pub fn apply(self, connection: &mut Connection) {
        if let Some(groups) = self.groups {
            connection.groups = groups;
        }
        if let Some(endpoint) = self.endpoint {
            connection.endpoint = Some(endpoint);
        }
    }

    /// Builds a fresh row from the update.
    #[must_use]
    pub fn into_connection(self, connection_id: ConnectionId) -> Connection {
        let mut connection = Connection::new(connection_id);
        self.apply(&mut connection);
        connection
    }
}

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Store of live WebSocket connections.
///
/// Implementations must tolerate concurrent readers and writers from
/// unrelated invocations. A store failure is reported as
/// [`Error::RegistryUnavailable`](crate::Error::RegistryUnavailable), never
/// as an empty result.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Looks up one connection.
    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<Connection>>;

    /// Creates the row if absent, otherwise applies `update` to it.
    async fn upsert(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<()>;

    /// Applies `update` to an existing row only.
    ///
    /// Returns `false`, writing nothing, if the row is absent.
    async fn update(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<bool>;

    /// Removes the row. Removing an absent row succeeds.
    async fn delete(&self, connection_id: &ConnectionId) -> Result<()>;

    /// Returns every connection whose group set contains `group`.
    ///
    /// No ordering guarantee.
    async fn scan_by_group(&self, group: &str) -> Result<Vec<Connection>>;

    /// Adds `group` to an existing connection's group set.
    ///
    /// Writes through [`update`](Self::update), so a row deleted after the
    /// read is not recreated. How tight that guarantee is depends on how
    /// atomic the store's `update` is.
    async fn add_group(&self, connection_id: &ConnectionId, group: &str) -> Result<()> {
        let Some(connection) = self.get(connection_id).await? else {
            return Ok(());
        };

        if connection.in_group(group) {
            return Ok(());
        }

        let mut groups = connection.groups;
        groups.insert(group.to_string());
        self.update(connection_id, ConnectionUpdate::new().groups(groups))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Loses every row right after handing it out, like a disconnect racing
    /// the caller.
    struct VanishingRegistry(MemoryRegistry);

    #[async_trait]
    impl ConnectionRegistry for VanishingRegistry {
        async fn get(&self, connection_id: &ConnectionId) -> Result<Option<Connection>> {
            let row = self.0.get(connection_id).await?;
            self.0.delete(connection_id).await?;
            Ok(row)
        }

        async fn upsert(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<()> {
            self.0.upsert(connection_id, update).await
        }

        async fn update(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<bool> {
            self.0.update(connection_id, update).await
        }

        async fn delete(&self, connection_id: &ConnectionId) -> Result<()> {
            self.0.delete(connection_id).await
        }

        async fn scan_by_group(&self, group: &str) -> Result<Vec<Connection>> {
            self.0.scan_by_group(group).await
        }
    }

    #[tokio::test]
    async fn test_default_add_group_does_not_recreate_deleted_row() {
        let inner = MemoryRegistry::new();
        inner
            .upsert(&ConnectionId::new("a"), ConnectionUpdate::new().groups(["lobby"]))
            .await
            .expect("upsert");
        let registry = VanishingRegistry(inner);

        registry
            .add_group(&ConnectionId::new("a"), "ops")
            .await
            .expect("add_group");

        assert!(registry.0.is_empty());
    }

    #[test]
    fn test_update_leaves_unspecified_fields() {
        let mut connection = Connection::new(ConnectionId::new("a"))
            .with_endpoint(Some(Endpoint::new("abc.example.com", "dev")));
        connection.groups.insert("lobby".to_string());

        ConnectionUpdate::new().apply(&mut connection);
        assert!(connection.in_group("lobby"));
        assert!(connection.endpoint.is_some());

        ConnectionUpdate::new().groups(["ops"]).apply(&mut connection);
        assert!(!connection.in_group("lobby"));
        assert!(connection.in_group("ops"));
        assert!(connection.endpoint.is_some());
    }

    #[test]
    fn test_into_connection_defaults_to_no_groups() {
        let connection = ConnectionUpdate::new().into_connection(ConnectionId::new("a"));
        assert!(connection.groups.is_empty());
        assert!(connection.endpoint.is_none());
    }

    #[test]
    fn test_connection_serde_format() {
        let json = r#"{"connectionId": "test1234", "groups": ["test-group"]}"#;
        let connection: Connection = serde_json::from_str(json).expect("parse");

        assert_eq!(connection.connection_id.as_str(), "test1234");
        assert!(connection.in_group("test-group"));
        assert!(connection.endpoint.is_none());
    }
}
