//! Write-once identity ledger.

use chrono::Utc;

use super::{IdentityRecord, Registry};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::identity::Identity;

impl Registry {
    /// Record that `identity` proved control of its key.
    pub fn claim_identity(&self, identity: &Identity) -> DiscoveryResult<IdentityRecord> {
        let record = IdentityRecord {
            identity: identity.to_string(),
            created_at: Utc::now(),
        };

        if !self.storage.insert_identity(identity.as_str(), &record)? {
            return Err(DiscoveryError::AlreadyClaimed);
        }

        tracing::debug!(identity = %identity, "Identity claimed");
        Ok(record)
    }
}
