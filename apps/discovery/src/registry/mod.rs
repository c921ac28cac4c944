//! Node, session and identity registries.
//!
//! Every operation takes an already-recovered [`Identity`](crate::identity::Identity)
//! and applies the ownership rule for its resource before writing:
//! - `nodes`: a node can only be written by the identity it is keyed by
//! - `sessions`: a session belongs to the first identity that reported on it
//! - `identities`: each identity can be claimed exactly once
//!
//! Each mutation is one storage transaction. Operations block on ReDB, so
//! HTTP handlers run them on the blocking thread pool.

pub mod identities;
pub mod nodes;
pub mod sessions;
pub mod types;

use crate::config::Settings;
use crate::storage::Storage;

pub use types::*;

/// Registry service over the shared store.
#[derive(Clone)]
pub struct Registry {
    storage: Storage,
    proposal_ttl: Option<chrono::Duration>,
}

impl Registry {
    pub fn new(storage: Storage, settings: &Settings) -> Self {
        let proposal_ttl = settings
            .proposal_ttl()
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok());

        Self {
            storage,
            proposal_ttl,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}
