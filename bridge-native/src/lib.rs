//! # Native Bridge Implementations
//!
//! Concrete [`bridge_traits`] adapters for native (desktop and mobile-host)
//! targets:
//!
//! - [`ReqwestHttpClient`] - HTTP via reqwest with pooling, retry, and streaming
//! - [`NativeNetworkMonitor`] - TCP-probe connectivity with polling change streams
//!
//! Hosts embedding the core on iOS/Android typically replace the network
//! monitor with a platform reachability adapter and keep the HTTP client.

pub mod http;
pub mod network;

pub use http::{ReqwestHttpClient, RetryPolicy};
pub use network::NativeNetworkMonitor;
