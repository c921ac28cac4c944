//! Client-side session bandwidth accounting.

use chrono::Utc;

use super::{Registry, SessionRecord};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::identity::Identity;

fn non_negative(value: i64, field: &'static str) -> DiscoveryResult<u64> {
    u64::try_from(value).map_err(|_| DiscoveryError::InvalidCounter { field })
}

impl Registry {
    /// Record the consumer's cumulative counters for a session.
    ///
    /// The first report binds the session to the caller. Later reports from
    /// any other identity are rejected and leave the record untouched.
    /// Counters are absolute totals and overwrite the stored values.
    pub fn report_client_stats(
        &self,
        identity: &Identity,
        session_key: &str,
        bytes_sent: i64,
        bytes_received: i64,
        source_ip: Option<String>,
    ) -> DiscoveryResult<SessionRecord> {
        let bytes_sent = non_negative(bytes_sent, "bytes_sent")?;
        let bytes_received = non_negative(bytes_received, "bytes_received")?;
        let now = Utc::now();

        let session = self.storage.upsert_session(session_key, |current: Option<SessionRecord>| {
            let mut session = match current {
                Some(existing) if existing.consumer_id != identity.as_str() => {
                    return Err(DiscoveryError::OwnershipMismatch);
                }
                Some(existing) => existing,
                None => SessionRecord {
                    session_key: session_key.to_string(),
                    consumer_id: identity.to_string(),
                    client_ip: source_ip,
                    client_bytes_sent: 0,
                    client_bytes_received: 0,
                    client_updated_at: now,
                    created_at: now,
                },
            };

            session.client_bytes_sent = bytes_sent;
            session.client_bytes_received = bytes_received;
            session.client_updated_at = now;
            Ok(session)
        })?;

        tracing::debug!(session_key, consumer_id = %identity, "Recorded client session stats");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::storage::Storage;
    use crate::test_support::{identity_of, signing_key};

    fn registry() -> Registry {
        Registry::new(Storage::open_memory().unwrap(), &Settings::for_tests())
    }

    #[test]
    fn first_report_binds_owner() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));

        let session = registry
            .report_client_stats(&alice, "session-1", 100, 200, Some("192.0.2.7".into()))
            .unwrap();

        assert_eq!(session.consumer_id, alice.as_str());
        assert_eq!(session.client_ip.as_deref(), Some("192.0.2.7"));
        assert_eq!((session.client_bytes_sent, session.client_bytes_received), (100, 200));
    }

    #[test]
    fn owner_overwrites_counters() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));

        registry.report_client_stats(&alice, "session-1", 100, 200, Some("192.0.2.7".into())).unwrap();
        let updated = registry
            .report_client_stats(&alice, "session-1", 50, 60, Some("198.51.100.1".into()))
            .unwrap();

        assert_eq!((updated.client_bytes_sent, updated.client_bytes_received), (50, 60));
        // The creation-time IP is kept.
        assert_eq!(updated.client_ip.as_deref(), Some("192.0.2.7"));
    }

    #[test]
    fn other_identity_is_rejected() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));
        let bob = identity_of(&signing_key(2));

        registry.report_client_stats(&alice, "session-1", 100, 200, None).unwrap();
        let err = registry
            .report_client_stats(&bob, "session-1", 999, 999, None)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::OwnershipMismatch));

        let stored: SessionRecord = registry.storage().get_session("session-1").unwrap().unwrap();
        assert_eq!(stored.consumer_id, alice.as_str());
        assert_eq!((stored.client_bytes_sent, stored.client_bytes_received), (100, 200));
    }

    #[test]
    fn negative_counters_are_rejected_without_write() {
        let registry = registry();
        let alice = identity_of(&signing_key(1));

        let err = registry
            .report_client_stats(&alice, "session-1", -1, 0, None)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidCounter { field: "bytes_sent" }));

        let err = registry
            .report_client_stats(&alice, "session-1", 0, -5, None)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidCounter { field: "bytes_received" }));

        assert!(registry.storage().get_session::<SessionRecord>("session-1").unwrap().is_none());
    }
}
