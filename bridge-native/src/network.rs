//! Probe-based connectivity monitor for hosts without a reachability API.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connectivity monitor backed by a TCP reachability probe.
///
/// Answers "is the library server likely reachable at all" by opening a
/// connection to a well-known endpoint with a short timeout. Change
/// subscriptions poll and yield only on status transitions.
///
/// Platform watchers (netlink, SystemConfiguration, mobile reachability)
/// would be more precise; hosts that have one inject their own
/// [`NetworkMonitor`] and skip this type entirely.
pub struct NativeNetworkMonitor {
    probe_addr: String,
    poll_interval: Duration,
}

impl NativeNetworkMonitor {
    /// Monitor probing the default public endpoint.
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Monitor probing a specific `host:port` endpoint.
    ///
    /// Pointing this at the library server itself makes "online" mean
    /// "server reachable" rather than "internet reachable".
    pub fn with_probe_addr(probe_addr: impl Into<String>) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            ..Self::new()
        }
    }

    /// Override how often change subscriptions poll for transitions.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn probe(&self) -> NetworkStatus {
        let attempt =
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(self.probe_addr.as_str()))
                .await;

        // A timeout and a refused connection both read as offline here.
        if matches!(attempt, Ok(Ok(_))) {
            NetworkStatus::Connected
        } else {
            NetworkStatus::Disconnected
        }
    }
}

impl Default for NativeNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for NativeNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.probe().await;
        debug!(status = ?status, probe = %self.probe_addr, "Connectivity probe finished");

        Ok(NetworkInfo {
            status,
            // A TCP probe cannot tell WiFi from Ethernet from cellular
            network_type: (status == NetworkStatus::Connected).then_some(NetworkType::Other),
            is_metered: false,
            is_expensive: false,
        })
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        Ok(Box::new(PollingChangeStream {
            monitor: NativeNetworkMonitor {
                probe_addr: self.probe_addr.clone(),
                poll_interval: self.poll_interval,
            },
            last_status: None,
        }))
    }
}

/// Change stream that re-probes on an interval and reports transitions.
struct PollingChangeStream {
    monitor: NativeNetworkMonitor,
    last_status: Option<NetworkStatus>,
}

#[async_trait]
impl NetworkChangeStream for PollingChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            tokio::time::sleep(self.monitor.poll_interval).await;

            let Ok(info) = self.monitor.get_network_info().await else {
                continue;
            };
            if self.last_status.replace(info.status) != Some(info.status) {
                return Some(info);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_monitor_defaults() {
        let monitor = NativeNetworkMonitor::new();
        assert_eq!(monitor.probe_addr, DEFAULT_PROBE_ADDR);
        assert_eq!(monitor.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_probe_reads_as_offline() {
        // TEST-NET-1 address, guaranteed unroutable
        let monitor = NativeNetworkMonitor::with_probe_addr("192.0.2.1:9");
        let info = monitor.get_network_info().await.unwrap();

        assert!(matches!(
            info.status,
            NetworkStatus::Disconnected | NetworkStatus::Indeterminate
        ));
        assert_eq!(info.network_type, None);
    }

    #[tokio::test]
    async fn test_builder_overrides() {
        let monitor = NativeNetworkMonitor::with_probe_addr("localhost:1234")
            .poll_interval(Duration::from_millis(100));
        assert_eq!(monitor.probe_addr, "localhost:1234");
        assert_eq!(monitor.poll_interval, Duration::from_millis(100));
    }
}
