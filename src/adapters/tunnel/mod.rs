//! Proxy tunneling for the database connection
//!
//! When `useTunnel` is set, the database connection string is rewritten to
//! point at a local endpoint that forwards to the real host through a proxy.

pub mod proxy;

pub use proxy::ProxyTunnel;

use crate::domain::TunnelError;
use async_trait::async_trait;
use std::net::SocketAddr;
use url::Url;

/// A local endpoint forwarding to a remote destination
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Loopback address clients should connect to
    fn local_addr(&self) -> SocketAddr;

    /// Stop accepting connections and tear down the ones in flight
    ///
    /// # Errors
    ///
    /// Returns an error if the forwarding task could not be stopped cleanly.
    async fn close(self: Box<Self>) -> Result<(), TunnelError>;
}

/// Opens a [`ProxyTunnel`] to `destination` through `proxy_url`
///
/// # Errors
///
/// See [`ProxyTunnel::open`].
pub async fn open_tunnel(proxy_url: &Url, destination: &str) -> Result<Box<dyn Tunnel>, TunnelError> {
    let tunnel = ProxyTunnel::open(proxy_url, destination).await?;
    Ok(Box::new(tunnel))
}
