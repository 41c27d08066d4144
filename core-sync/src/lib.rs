//! Offline-first synchronization between a remote catalog and the local
//! mirror.
//!
//! Reads are always answered by the local mirror; the network only ever
//! improves the mirror. [`SyncCoordinator`] owns that reconciliation:
//! refresh the first page fast, walk the remaining pages in the background,
//! and stop a stale walk the moment a newer query takes over.

pub mod coordinator;
pub mod error;
pub mod fingerprint;

pub use coordinator::{SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError};
pub use fingerprint::PageFingerprint;
