//! Host connectivity reporting.
//!
//! The core treats connectivity as advisory input, not ground truth. A
//! [`NetworkMonitor`] answers "does a remote call stand a chance right now"
//! so sync passes can be skipped while offline, and pushes transitions so
//! the host UI can raise and clear its offline banner without polling.

use crate::error::Result;

/// Physical transport the host reports for the active connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    /// Transport the host could not classify (VPN, tethering, bridged).
    Other,
}

/// Reachability as the host understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
    /// The host has not settled on an answer yet. Treated as offline for
    /// gating decisions so a sync pass is never started on a guess.
    Indeterminate,
}

/// Snapshot of the connection at one instant.
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    /// Transport when connected, `None` otherwise.
    pub network_type: Option<NetworkType>,
    /// Connection counts against a data cap.
    pub is_metered: bool,
    /// The OS marks this connection as costly to use.
    pub is_expensive: bool,
}

impl NetworkInfo {
    /// Only [`NetworkStatus::Connected`] counts as usable.
    pub fn is_online(&self) -> bool {
        self.status == NetworkStatus::Connected
    }
}

/// Host-side view of network reachability.
///
/// Drives three behaviors in the core:
/// - catalog reads fall back to the local mirror while offline
/// - remote refresh and background sync passes are skipped while offline
/// - connectivity transitions are forwarded to the host UI as events
///
/// Hosts back this with whatever the platform offers, `NWPathMonitor` on
/// iOS, `ConnectivityManager` on Android, a reachability probe elsewhere.
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Current connection snapshot.
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Whether a remote call is worth attempting.
    ///
    /// A monitor error counts as offline.
    async fn is_connected(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                ..
            })
        )
    }

    /// Open a stream of connectivity updates.
    ///
    /// Implementations emit a snapshot on every status change. Duplicate
    /// consecutive snapshots are allowed; consumers dedup.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Pull side of a [`NetworkMonitor::subscribe_changes`] subscription.
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Next snapshot, or `None` once the host tears the subscription down.
    async fn next(&mut self) -> Option<NetworkInfo>;
}
