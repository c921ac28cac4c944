//! Persistent record types and registry responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest signed service proposal published by a provider node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Provider identity (lower-case account address).
    pub node_key: String,
    /// Source IP of the last registration.
    pub ip: Option<String>,
    /// Proposal document exactly as serialized at registration time.
    pub proposal: String,
    /// Last registration or heartbeat.
    pub updated_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Whether the node has been heard from within `ttl` of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.updated_at) <= ttl
    }
}

/// Bandwidth accounting for one session, as reported by its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_key: String,
    /// Identity bound on first report; immutable afterwards.
    pub consumer_id: String,
    /// Source IP at creation time.
    pub client_ip: Option<String>,
    pub client_bytes_sent: u64,
    pub client_bytes_received: u64,
    pub client_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only liveness log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAvailabilityEntry {
    pub node_key: String,
    pub created_at: DateTime<Utc>,
}

/// Write-once proof that an identity controlled its key at `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

/// Heartbeat statistics for one node over a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub node_key: String,
    pub window_minutes: u32,
    pub heartbeats: u64,
    pub last_seen: Option<DateTime<Utc>>,
}
