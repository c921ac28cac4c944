//! ReDB storage implementation for the discovery service.
//!
//! Provides persistent storage for:
//! - Nodes (latest signed proposal per provider identity)
//! - Sessions (client-reported bandwidth counters)
//! - Node availability (append-only heartbeat log)
//! - Identities (write-once proof-of-control ledger)
//!
//! Keyed tables use string keys and JSON-serialized values. Conditional writes
//! take a closure that runs inside the write transaction, so the decision and
//! the write commit atomically.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DiscoveryError, DiscoveryResult};

// Table definitions
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");
const NODE_AVAILABILITY: TableDefinition<u64, &[u8]> = TableDefinition::new("node_availability");
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Storage wrapper for ReDB.
///
/// Thread-safe via internal Arc. Clone is cheap.
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

fn init_tables(db: &Database) -> DiscoveryResult<()> {
    let write_txn = db.begin_write()?;
    {
        // Just opening the tables creates them if they don't exist
        let _ = write_txn.open_table(NODES)?;
        let _ = write_txn.open_table(SESSIONS)?;
        let _ = write_txn.open_table(NODE_AVAILABILITY)?;
        let _ = write_txn.open_table(IDENTITIES)?;
    }
    write_txn.commit()?;
    Ok(())
}

impl Storage {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> DiscoveryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(|e| DiscoveryError::Storage(e.to_string()))?;
        init_tables(&db)?;

        tracing::info!(path = %path.display(), "Opened storage database");

        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database for testing.
    #[cfg(test)]
    pub fn open_memory() -> DiscoveryResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| DiscoveryError::Storage(e.to_string()))?;
        init_tables(&db)?;

        Ok(Self { db: Arc::new(db) })
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Insert or overwrite a node record.
    pub fn put_node<T: Serialize>(&self, node_key: &str, record: &T) -> DiscoveryResult<()> {
        let value = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(NODES)?;
            table.insert(node_key, value.as_slice())?;
        }
        write_txn.commit()?;
        tracing::debug!(node_key, "Stored node");
        Ok(())
    }

    /// Get a node record by key.
    pub fn get_node<T: DeserializeOwned>(&self, node_key: &str) -> DiscoveryResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NODES)?;

        match table.get(node_key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List every node record in key order.
    pub fn list_nodes<T: DeserializeOwned>(&self) -> DiscoveryResult<Vec<(String, T)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NODES)?;

        table
            .iter()?
            .map(|entry| {
                let (k, v) = entry?;
                let record: T = serde_json::from_slice(v.value())?;
                Ok((k.value().to_string(), record))
            })
            .collect()
    }

    /// Apply `touch` to an existing node and append the entry it returns, in
    /// one write transaction.
    ///
    /// `touch` runs after the write lock is taken, so entries stamped inside
    /// it are ordered the same way as their sequence numbers.
    ///
    /// Returns the heartbeat sequence number, or `None` (and writes nothing)
    /// when the node does not exist.
    pub fn record_heartbeat<T, E, F>(&self, node_key: &str, touch: F) -> DiscoveryResult<Option<u64>>
    where
        T: Serialize + DeserializeOwned,
        E: Serialize,
        F: FnOnce(&mut T) -> E,
    {
        let write_txn = self.db.begin_write()?;

        let seq = {
            let mut nodes = write_txn.open_table(NODES)?;
            let current: Option<T> = match nodes.get(node_key)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match current {
                Some(mut node) => {
                    let entry = touch(&mut node);
                    let node_value = serde_json::to_vec(&node)?;
                    let entry_value = serde_json::to_vec(&entry)?;
                    nodes.insert(node_key, node_value.as_slice())?;

                    let mut log = write_txn.open_table(NODE_AVAILABILITY)?;
                    let seq = log.last()?.map_or(0, |(k, _)| k.value() + 1);
                    log.insert(seq, entry_value.as_slice())?;
                    Some(seq)
                }
                None => None,
            }
        };

        match seq {
            Some(seq) => {
                write_txn.commit()?;
                tracing::trace!(node_key, seq, "Recorded node heartbeat");
            }
            None => write_txn.abort()?,
        }
        Ok(seq)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Get a session record by key.
    pub fn get_session<T: DeserializeOwned>(&self, session_key: &str) -> DiscoveryResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;

        match table.get(session_key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically read, transform and write a session record.
    ///
    /// `apply` receives the current record (if any) and returns the record to
    /// store. If it returns an error the transaction is aborted and nothing is
    /// written.
    pub fn upsert_session<T, F>(&self, session_key: &str, apply: F) -> DiscoveryResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> DiscoveryResult<T>,
    {
        let write_txn = self.db.begin_write()?;

        let outcome = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let current: Option<T> = match table.get(session_key)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match apply(current) {
                Ok(updated) => {
                    let value = serde_json::to_vec(&updated)?;
                    table.insert(session_key, value.as_slice())?;
                    Ok(updated)
                }
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(updated) => {
                write_txn.commit()?;
                tracing::debug!(session_key, "Stored session");
                Ok(updated)
            }
            Err(e) => {
                write_txn.abort()?;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Node Availability
    // =========================================================================

    /// Walk the heartbeat log from newest to oldest.
    ///
    /// `visit` returns `false` to stop the scan early.
    pub fn scan_heartbeats_rev<T, F>(&self, mut visit: F) -> DiscoveryResult<()>
    where
        T: DeserializeOwned,
        F: FnMut(u64, T) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NODE_AVAILABILITY)?;

        for entry in table.iter()?.rev() {
            let (k, v) = entry?;
            let parsed: T = serde_json::from_slice(v.value())?;
            if !visit(k.value(), parsed) {
                break;
            }
        }

        Ok(())
    }

    /// Number of heartbeat entries recorded.
    pub fn heartbeat_count(&self) -> DiscoveryResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NODE_AVAILABILITY)?;
        Ok(table.len()?)
    }

    // =========================================================================
    // Identities
    // =========================================================================

    /// Insert an identity record unless one already exists.
    ///
    /// Returns `false` without writing when the key is taken.
    pub fn insert_identity<T: Serialize>(&self, identity: &str, record: &T) -> DiscoveryResult<bool> {
        let value = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;

        let inserted = {
            let mut table = write_txn.open_table(IDENTITIES)?;
            if table.get(identity)?.is_some() {
                false
            } else {
                table.insert(identity, value.as_slice())?;
                true
            }
        };

        if inserted {
            write_txn.commit()?;
            tracing::debug!(identity, "Stored identity");
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    /// Get an identity record.
    pub fn get_identity<T: DeserializeOwned>(&self, identity: &str) -> DiscoveryResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IDENTITIES)?;

        match table.get(identity)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}
