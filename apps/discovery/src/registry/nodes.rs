//! Provider node registration, discovery and liveness.

use chrono::Utc;
use serde_json::Value;

use super::{AvailabilitySummary, NodeAvailabilityEntry, NodeRecord, Registry};
use crate::config::MAX_AVAILABILITY_WINDOW_MINUTES;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::identity::Identity;

impl Registry {
    /// Publish or replace the proposal for the caller's node.
    ///
    /// The declared `provider_id` must name the caller. The record is keyed by
    /// the recovered identity, never by the declared value.
    pub fn register_node(
        &self,
        identity: &Identity,
        declared_provider_id: &str,
        proposal: &Value,
        source_ip: Option<String>,
    ) -> DiscoveryResult<()> {
        if !identity.matches(declared_provider_id) {
            return Err(DiscoveryError::IdentityMismatch);
        }

        let record = NodeRecord {
            node_key: identity.to_string(),
            ip: source_ip,
            proposal: serde_json::to_string(proposal)?,
            updated_at: Utc::now(),
        };
        self.storage.put_node(identity.as_str(), &record)?;

        tracing::debug!(node_key = %identity, "Registered node proposal");
        Ok(())
    }

    /// Proposals for every known node, or only `node_key` when given.
    ///
    /// Nodes older than the configured TTL are left out.
    pub fn list_proposals(&self, node_key: Option<&str>) -> DiscoveryResult<Vec<Value>> {
        let nodes: Vec<NodeRecord> = match node_key {
            Some(key) => self
                .storage
                .get_node(&key.trim().to_ascii_lowercase())?
                .into_iter()
                .collect(),
            None => self
                .storage
                .list_nodes()?
                .into_iter()
                .map(|(_, node)| node)
                .collect(),
        };

        let now = Utc::now();
        let proposals = nodes
            .into_iter()
            .filter(|node| self.proposal_ttl.is_none_or(|ttl| node.is_fresh(now, ttl)))
            .filter_map(|node| match serde_json::from_str(&node.proposal) {
                Ok(proposal) => Some(proposal),
                Err(e) => {
                    tracing::warn!(node_key = %node.node_key, error = %e, "Skipping unreadable proposal");
                    None
                }
            })
            .collect();

        Ok(proposals)
    }

    /// Advance the caller's liveness timestamp and log one heartbeat.
    pub fn record_heartbeat(&self, identity: &Identity) -> DiscoveryResult<()> {
        let seq = self
            .storage
            .record_heartbeat(identity.as_str(), |node: &mut NodeRecord| {
                let now = Utc::now();
                node.updated_at = now;
                NodeAvailabilityEntry {
                    node_key: identity.to_string(),
                    created_at: now,
                }
            })?
            .ok_or(DiscoveryError::UnknownNode)?;

        tracing::debug!(node_key = %identity, seq, "Recorded heartbeat");
        Ok(())
    }

    /// Heartbeats logged for `node_key` during the last `window_minutes`.
    pub fn availability(
        &self,
        node_key: &str,
        window_minutes: u32,
    ) -> DiscoveryResult<AvailabilitySummary> {
        if window_minutes == 0 || window_minutes > MAX_AVAILABILITY_WINDOW_MINUTES {
            return Err(DiscoveryError::InvalidInput(format!(
                "window_minutes must be between 1 and {MAX_AVAILABILITY_WINDOW_MINUTES}"
            )));
        }

        let node_key = node_key.trim().to_ascii_lowercase();
        let cutoff = Utc::now() - chrono::Duration::minutes(i64::from(window_minutes));

        let mut heartbeats = 0u64;
        let mut last_seen: Option<chrono::DateTime<Utc>> = None;
        // Entries are stamped under the write lock, so the log is in time
        // order and the scan stops at the first entry older than the window.
        self.storage
            .scan_heartbeats_rev(|_, entry: NodeAvailabilityEntry| {
                if entry.created_at < cutoff {
                    return false;
                }
                if entry.node_key == node_key {
                    heartbeats += 1;
                    last_seen = last_seen.max(Some(entry.created_at));
                }
                true
            })?;

        Ok(AvailabilitySummary {
            node_key,
            window_minutes,
            heartbeats,
            last_seen,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Settings;
    use crate::storage::Storage;
    use crate::test_support::{identity_of, signing_key};

    fn registry() -> Registry {
        Registry::new(Storage::open_memory().unwrap(), &Settings::for_tests())
    }

    #[test]
    fn register_then_list() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));
        let proposal = json!({ "provider_id": alice.as_str(), "service_type": "wireguard" });

        registry
            .register_node(&alice, alice.as_str(), &proposal, Some("10.0.0.1".into()))
            .unwrap();

        assert_eq!(registry.list_proposals(None).unwrap(), vec![proposal.clone()]);
        assert_eq!(
            registry.list_proposals(Some(alice.as_str())).unwrap(),
            vec![proposal]
        );
        assert!(registry.list_proposals(Some("0xdead")).unwrap().is_empty());
    }

    #[test]
    fn register_accepts_mixed_case_provider_id() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));
        let declared = alice.as_str().to_ascii_uppercase().replace("0X", "0x");

        registry
            .register_node(&alice, &declared, &json!({ "provider_id": declared }), None)
            .unwrap();

        let stored: NodeRecord = registry.storage().get_node(alice.as_str()).unwrap().unwrap();
        assert_eq!(stored.node_key, alice.as_str());
    }

    #[test]
    fn register_is_idempotent() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));
        let proposal = json!({ "provider_id": alice.as_str() });

        registry.register_node(&alice, alice.as_str(), &proposal, None).unwrap();
        let first: NodeRecord = registry.storage().get_node(alice.as_str()).unwrap().unwrap();
        registry.register_node(&alice, alice.as_str(), &proposal, None).unwrap();
        let second: NodeRecord = registry.storage().get_node(alice.as_str()).unwrap().unwrap();

        assert_eq!(first.proposal, second.proposal);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(registry.list_proposals(None).unwrap().len(), 1);
    }

    #[test]
    fn register_rejects_foreign_provider_id() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));
        let bob = identity_of(&signing_key(2));

        let err = registry
            .register_node(&alice, bob.as_str(), &json!({ "provider_id": bob.as_str() }), None)
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::IdentityMismatch));
        assert!(registry.list_proposals(None).unwrap().is_empty());
    }

    #[test]
    fn stale_nodes_are_hidden_when_ttl_is_set() {
        let storage = Storage::open_memory().unwrap();
        let registry = Registry::new(storage.clone(), &Settings::for_tests().with_proposal_ttl_secs(60));

        let stale = NodeRecord {
            node_key: "0xstale".to_string(),
            ip: None,
            proposal: r#"{"provider_id":"0xstale"}"#.to_string(),
            updated_at: Utc::now() - chrono::Duration::minutes(5),
        };
        storage.put_node("0xstale", &stale).unwrap();

        let alice = identity_of(&signing_key(1));
        registry
            .register_node(&alice, alice.as_str(), &json!({ "provider_id": alice.as_str() }), None)
            .unwrap();

        let proposals = registry.list_proposals(None).unwrap();
        assert_eq!(proposals, vec![json!({ "provider_id": alice.as_str() })]);
    }

    #[test]
    fn heartbeat_requires_registration() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));

        let err = registry.record_heartbeat(&alice).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnknownNode));
        assert_eq!(registry.storage().heartbeat_count().unwrap(), 0);
    }

    #[test]
    fn heartbeat_touches_node_and_logs_availability() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));
        let bob = identity_of(&signing_key(2));
        for identity in [&alice, &bob] {
            registry
                .register_node(identity, identity.as_str(), &json!({ "provider_id": identity.as_str() }), None)
                .unwrap();
        }
        let before: NodeRecord = registry.storage().get_node(alice.as_str()).unwrap().unwrap();

        registry.record_heartbeat(&alice).unwrap();
        registry.record_heartbeat(&alice).unwrap();
        registry.record_heartbeat(&bob).unwrap();

        let after: NodeRecord = registry.storage().get_node(alice.as_str()).unwrap().unwrap();
        assert!(after.updated_at >= before.updated_at);

        let summary = registry.availability(alice.as_str(), 60).unwrap();
        assert_eq!(summary.heartbeats, 2);
        assert!(summary.last_seen.is_some());
        assert_eq!(registry.availability(bob.as_str(), 60).unwrap().heartbeats, 1);
    }

    #[test]
    fn availability_rejects_out_of_range_window() {
        let registry = registry();
        assert!(matches!(
            registry.availability("0xa", 0),
            Err(DiscoveryError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.availability("0xa", MAX_AVAILABILITY_WINDOW_MINUTES + 1),
            Err(DiscoveryError::InvalidInput(_))
        ));
    }
}
