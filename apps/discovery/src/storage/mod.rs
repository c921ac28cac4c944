//! Storage layer for the discovery service.
//!
//! Uses ReDB for embedded key-value storage with ACID transactions. Every
//! registry mutation is a single write transaction, and ReDB serializes
//! writers, so per-key read-then-write sequences cannot interleave.

pub mod redb;

pub use self::redb::Storage;
