//! Error type shared by every host-bridge implementation.

use thiserror::Error;

/// Failure crossing the host-bridge boundary.
///
/// Bridges translate platform failures into one of these before handing
/// control back to the core crates; the domain layers wrap them further
/// (for example into a catalog transport error) where more context exists.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host cannot provide the requested capability, such as a
    /// connectivity change stream on a platform without one.
    #[error("Host capability unavailable: {0}")]
    NotAvailable(String),

    /// Connection failure, timeout, exhausted retries, or a download
    /// refused by the server. Statuses delivered on the request path are
    /// not errors; they come back inside the response.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A request or response body could not be encoded or decoded at the
    /// bridge boundary.
    #[error("Payload codec failure: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
