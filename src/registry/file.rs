//! Directory-backed connection registry.
//!
//! Stores one JSON document per connection. The file name is the
//! url-encoded connection ID plus `.json`, so arbitrary gateway IDs map to
//! safe names. Writes go to a temporary file that is renamed over the
//! target, so readers in other processes never observe a partial row.
//!
//! # Example
//!
//! ```no_run
//! use lambda_bridge::registry::{ConnectionRegistry, ConnectionUpdate, FileRegistry};
//! use lambda_bridge::identifiers::ConnectionId;
//!
//! # async fn example() -> lambda_bridge::Result<()> {
//! let registry = FileRegistry::open("/mnt/shared/connections").await?;
//! registry
//!     .upsert(&ConnectionId::new("abc="), ConnectionUpdate::new().groups(["lobby"]))
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

use super::{Connection, ConnectionRegistry, ConnectionUpdate};

// ============================================================================
// Constants
// ============================================================================

/// Extension of row documents.
const ROW_EXTENSION: &str = "json";

// ============================================================================
// FileRegistry
// ============================================================================

/// Connection registry stored as JSON files in a directory.
///
/// Several processes may share the directory; scans tolerate rows being
/// created or removed while they run.
#[derive(Debug)]
pub struct FileRegistry {
    /// Keeps a temporary directory alive.
    _temp_dir: Option<TempDir>,

    /// Directory holding the rows.
    dir: PathBuf,
}

// ============================================================================
// FileRegistry - Constructors
// ============================================================================

impl FileRegistry {
    /// Opens a registry in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryUnavailable`] if the directory cannot be
    /// created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| unavailable("open", &dir, e))?;

        debug!(path = %dir.display(), "File registry opened");

        Ok(Self {
            _temp_dir: None,
            dir,
        })
    }

    /// Creates a registry in a fresh temporary directory.
    ///
    /// The directory is deleted when the registry is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryUnavailable`] if the directory cannot be
    /// created.
    pub fn temporary() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("lambda-bridge-registry-")
            .map_err(|e| Error::registry_unavailable(format!("Failed to create temp registry: {e}")))?;

        let dir = temp_dir.path().to_path_buf();
        debug!(path = %dir.display(), "Temporary file registry created");

        Ok(Self {
            _temp_dir: Some(temp_dir),
            dir,
        })
    }

    /// Returns the directory holding the rows.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }
}

// ============================================================================
// FileRegistry - Row IO
// ============================================================================

impl FileRegistry {
    /// Returns the document path of a connection.
    fn row_path(&self, connection_id: &ConnectionId) -> PathBuf {
        let name = urlencoding::encode(connection_id.as_str());
        self.dir.join(format!("{name}.{ROW_EXTENSION}"))
    }

    /// Reads and parses one row; `None` if the file does not exist.
    async fn read_row(&self, path: &Path) -> Result<Option<Connection>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable("read", path, e)),
        };

        let connection = serde_json::from_str(&content).map_err(|e| {
            Error::registry_unavailable(format!("Corrupt row {}: {e}", path.display()))
        })?;

        Ok(Some(connection))
    }

    /// Atomically replaces one row.
    async fn write_row(&self, connection: &Connection) -> Result<()> {
        let target = self.row_path(&connection.connection_id);
        let staging = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let content = serde_json::to_vec_pretty(connection)?;

        fs::write(&staging, content)
            .await
            .map_err(|e| unavailable("write", &staging, e))?;

        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(unavailable("rename", &target, e));
        }

        trace!(path = %target.display(), "Row written");
        Ok(())
    }
}

// ============================================================================
// FileRegistry - ConnectionRegistry
// ============================================================================

#[async_trait]
impl ConnectionRegistry for FileRegistry {
    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<Connection>> {
        self.read_row(&self.row_path(connection_id)).await
    }

    async fn upsert(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<()> {
        let connection = match self.get(connection_id).await? {
            Some(mut existing) => {
                update.apply(&mut existing);
                existing
            }
            None => update.into_connection(connection_id.clone()),
        };

        self.write_row(&connection).await
    }

    /// The presence check and the replace are two filesystem steps; a
    /// delete landing between them from another process is overwritten.
    async fn update(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<bool> {
        let Some(mut connection) = self.get(connection_id).await? else {
            trace!(connection_id = %connection_id, "Update skipped, row absent");
            return Ok(false);
        };

        update.apply(&mut connection);
        self.write_row(&connection).await?;
        Ok(true)
    }

    async fn delete(&self, connection_id: &ConnectionId) -> Result<()> {
        let path = self.row_path(connection_id);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(connection_id = %connection_id, "Row removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable("delete", &path, e)),
        }
    }

    async fn scan_by_group(&self, group: &str) -> Result<Vec<Connection>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| unavailable("scan", &self.dir, e))?;

        let mut members = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable("scan", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ROW_EXTENSION) {
                continue;
            }

            // Rows deleted since the directory listing read as `None`.
            match self.read_row(&path).await {
                Ok(Some(connection)) if connection.in_group(group) => members.push(connection),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable row");
                }
            }
        }

        trace!(group, count = members.len(), "Group scan complete");
        Ok(members)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Maps an IO failure to a registry error.
fn unavailable(operation: &str, path: &Path, err: IoError) -> Error {
    Error::registry_unavailable(format!("{operation} {} failed: {err}", path.display()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::Endpoint;

    fn id(value: &str) -> ConnectionId {
        ConnectionId::new(value)
    }

    #[tokio::test]
    async fn test_group_scan_after_upsert() {
        let registry = FileRegistry::temporary().expect("registry");
        registry
            .upsert(&id("test1234"), ConnectionUpdate::new().groups(["test-group"]))
            .await
            .expect("upsert");

        let items = registry.scan_by_group("test-group").await.expect("scan");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].connection_id, id("test1234"));
    }

    #[tokio::test]
    async fn test_row_survives_reopen() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let endpoint = Endpoint::new("abc.example.com", "Prod");

        {
            let registry = FileRegistry::open(temp.path()).await.expect("open");
            registry
                .upsert(
                    &id("d1Bz/cMO=="),
                    ConnectionUpdate::new()
                        .groups(["lobby"])
                        .endpoint(Some(endpoint.clone())),
                )
                .await
                .expect("upsert");
        }

        let registry = FileRegistry::open(temp.path()).await.expect("reopen");
        let connection = registry
            .get(&id("d1Bz/cMO=="))
            .await
            .expect("get")
            .expect("present");
        assert!(connection.in_group("lobby"));
        assert_eq!(connection.endpoint, Some(endpoint));
    }

    #[tokio::test]
    async fn test_upsert_keeps_unspecified_fields() {
        let registry = FileRegistry::temporary().expect("registry");
        let endpoint = Endpoint::new("abc.example.com", "dev");

        registry
            .upsert(&id("a"), ConnectionUpdate::new().endpoint(Some(endpoint.clone())))
            .await
            .expect("create");
        registry
            .upsert(&id("a"), ConnectionUpdate::new().groups(["ops"]))
            .await
            .expect("update");

        let connection = registry.get(&id("a")).await.expect("get").expect("present");
        assert!(connection.in_group("ops"));
        assert_eq!(connection.endpoint, Some(endpoint));
    }

    #[tokio::test]
    async fn test_add_group_after_delete_writes_nothing() {
        let registry = FileRegistry::temporary().expect("registry");
        registry
            .upsert(&id("gone="), ConnectionUpdate::new().groups(["lobby"]))
            .await
            .expect("upsert");
        registry.delete(&id("gone=")).await.expect("delete");

        let updated = registry
            .update(&id("gone="), ConnectionUpdate::new().groups(["ops"]))
            .await
            .expect("update");
        registry.add_group(&id("gone="), "ops").await.expect("add_group");

        assert!(!updated);
        assert!(registry.get(&id("gone=")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let registry = FileRegistry::temporary().expect("registry");
        registry
            .upsert(&id("a"), ConnectionUpdate::new())
            .await
            .expect("upsert");

        registry.delete(&id("a")).await.expect("first delete");
        registry.delete(&id("a")).await.expect("second delete");
        assert!(registry.get(&id("a")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_scan_skips_foreign_and_corrupt_files() {
        let registry = FileRegistry::temporary().expect("registry");
        registry
            .upsert(&id("a"), ConnectionUpdate::new().groups(["lobby"]))
            .await
            .expect("upsert");

        std::fs::write(registry.path().join("notes.txt"), "ignore me").expect("write");
        std::fs::write(registry.path().join("broken.json"), "{").expect("write");

        let items = registry.scan_by_group("lobby").await.expect("scan");
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_registry_error() {
        let registry = FileRegistry::temporary().expect("registry");
        std::fs::write(registry.path().join("a.json"), "not json").expect("write");

        let err = registry.get(&id("a")).await.unwrap_err();
        assert!(err.is_registry_error());
    }

    #[tokio::test]
    async fn test_missing_directory_is_registry_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let registry = FileRegistry::open(temp.path().join("rows")).await.expect("open");
        std::fs::remove_dir_all(registry.path()).expect("remove");

        let err = registry.scan_by_group("lobby").await.unwrap_err();
        assert!(err.is_registry_error());
    }
}
