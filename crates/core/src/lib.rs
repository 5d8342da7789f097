//! strand-core: Core library for the strand object-storage file layer
//!
//! This crate provides a POSIX-like path API over an eventually
//! consistent object store:
//! - Location parsing and resolution (local paths and `s3://` keys)
//! - Bounded retry for transient provider errors
//! - Read-your-own-write consistency guard
//! - Copy orchestration with atomic local commits and integrity checks
//! - File-like staged access to objects
//! - Directory-tree reconciliation
//!
//! The crate is independent of any specific S3 SDK: backends implement
//! the [`ObjectStore`] trait, adapters live in their own crates, and an
//! in-memory backend backs the tests.

pub mod cached;
pub mod config;
pub mod consistency;
pub mod copy;
pub mod error;
pub mod location;
pub mod memory;
pub mod object;
pub mod retry;
pub mod store;
pub mod sync;

pub use cached::{CachedFile, OpenMode};
pub use config::{ConsistencyConfig, Profile, ProfileStore, RetryConfig};
pub use consistency::wait_until_visible;
pub use copy::{Copier, CopyOptions, CopyOutcome, CopyState};
pub use error::{Error, Result};
pub use location::{Location, Scheme};
pub use memory::MemoryStore;
pub use object::ObjectRef;
pub use retry::{RetryBuilder, retry_with_backoff};
pub use store::{
    Acl, ListEntry, ListOptions, ListResult, ObjectMeta, ObjectStore, PutOptions, list_all,
};
pub use sync::{SyncAction, SyncOptions, SyncOutcome, SyncPlanEntry, SyncReport, Syncer};
