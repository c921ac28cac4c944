//! Registry state survives reopening the database file.

use discovery_service::registry::{IdentityRecord, NodeRecord, SessionRecord};
use discovery_service::test_support::{identity_of, signing_key};
use discovery_service::{Registry, Settings, Storage};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn records_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("discovery.redb");
    let settings = Settings::for_tests();
    let alice = identity_of(&signing_key(1));

    {
        let registry = Registry::new(Storage::open(&db_path).unwrap(), &settings);
        registry
            .register_node(&alice, alice.as_str(), &json!({ "provider_id": alice.as_str() }), None)
            .unwrap();
        registry.record_heartbeat(&alice).unwrap();
        registry
            .report_client_stats(&alice, "session-1", 5, 6, Some("203.0.113.9".into()))
            .unwrap();
        registry.claim_identity(&alice).unwrap();
    }

    assert!(db_path.exists());

    let storage = Storage::open(&db_path).unwrap();
    let registry = Registry::new(storage.clone(), &settings);

    let node: NodeRecord = storage.get_node(alice.as_str()).unwrap().unwrap();
    assert_eq!(node.node_key, alice.as_str());
    assert_eq!(storage.heartbeat_count().unwrap(), 1);

    let session: SessionRecord = storage.get_session("session-1").unwrap().unwrap();
    assert_eq!(session.client_ip.as_deref(), Some("203.0.113.9"));

    let identity: Option<IdentityRecord> = storage.get_identity(alice.as_str()).unwrap();
    assert!(identity.is_some());

    // Heartbeat sequence numbers continue after the reopen.
    registry.record_heartbeat(&alice).unwrap();
    assert_eq!(storage.heartbeat_count().unwrap(), 2);
    assert_eq!(registry.availability(alice.as_str(), 60).unwrap().heartbeats, 2);
}
