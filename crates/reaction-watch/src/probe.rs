//! TCP reachability probe.
//!
//! A probe is a single bounded connect attempt. Retry cadence belongs to
//! the caller's polling interval, so nothing here retries.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use reaction_core::{Target, format_endpoint};

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// A TCP connection was established.
    Reachable,
    /// Connection refused, timed out, or the name did not resolve.
    Unreachable,
}

/// Probes one `address:port` with a fixed connect timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            port,
            timeout,
        }
    }

    pub fn from_target(target: &Target, timeout: Duration) -> Self {
        Self::new(target.address.clone(), target.port, timeout)
    }

    /// Printable `address:port` for logs.
    pub fn endpoint(&self) -> String {
        format_endpoint(&self.address, self.port)
    }

    pub async fn check(&self) -> Reachability {
        tcp_probe(&self.address, self.port, self.timeout).await
    }
}

/// Attempt a TCP connection and close it straight away.
///
/// Every failure mode maps to `Unreachable`; the cause is logged at debug.
pub async fn tcp_probe(address: &str, port: u16, timeout: Duration) -> Reachability {
    let endpoint = format_endpoint(address, port);
    bounded_connect(&endpoint, timeout, TcpStream::connect((address, port))).await
}

/// Await `connect` for at most `timeout`, dropping any connection it yields.
async fn bounded_connect<F, C>(endpoint: &str, timeout: Duration, connect: F) -> Reachability
where
    F: Future<Output = std::io::Result<C>>,
{
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(conn)) => {
            drop(conn);
            Reachability::Reachable
        }
        Ok(Err(e)) => {
            debug!(error = %e, %endpoint, "probe connection failed");
            Reachability::Unreachable
        }
        Err(_) => {
            debug!(%endpoint, timeout_ms = timeout.as_millis() as u64, "probe timed out");
            Reachability::Unreachable
        }
    }
}
