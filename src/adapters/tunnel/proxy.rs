//! HTTP CONNECT tunnel
//!
//! Listens on an ephemeral loopback port and forwards every accepted connection
//! to a fixed destination through an HTTP proxy, using one `CONNECT` request
//! per connection.

use super::Tunnel;
use crate::domain::TunnelError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound for establishing one proxied connection
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest proxy response head accepted before the handshake is abandoned
const MAX_RESPONSE_HEAD: usize = 16 * 1024;

/// Where to reach the proxy and how to authenticate
#[derive(Clone)]
struct ProxyEndpoint {
    address: String,
    authorization: Option<String>,
}

impl ProxyEndpoint {
    fn from_url(url: &Url) -> Result<Self, TunnelError> {
        if url.scheme() != "http" {
            return Err(TunnelError::InvalidProxyUrl(format!(
                "unsupported scheme '{}', expected http",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| TunnelError::InvalidProxyUrl("missing host".to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TunnelError::InvalidProxyUrl("missing port".to_string()))?;

        let authorization = if url.username().is_empty() {
            None
        } else {
            let credentials = format!(
                "{}:{}",
                decode_userinfo(url.username(), "proxy username")?,
                decode_userinfo(url.password().unwrap_or_default(), "proxy password")?
            );
            Some(STANDARD.encode(credentials))
        };

        Ok(Self {
            address: format!("{host}:{port}"),
            authorization,
        })
    }
}

impl std::fmt::Debug for ProxyEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyEndpoint")
            .field("address", &self.address)
            .field("authorization", &self.authorization.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Decodes the percent-encoded username or password of the proxy URL
fn decode_userinfo(part: &str, what: &str) -> Result<String, TunnelError> {
    urlencoding::decode(part)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| TunnelError::InvalidProxyUrl(format!("{what} is not valid UTF-8: {e}")))
}

/// A running local forwarding endpoint
pub struct ProxyTunnel {
    local_addr: SocketAddr,
    destination: String,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl ProxyTunnel {
    /// Open a tunnel to `destination` (`host:port`) through the proxy at `proxy_url`
    ///
    /// One `CONNECT` is made up front and discarded, so a proxy that is down or
    /// refuses the destination fails here instead of inside the database driver.
    ///
    /// # Errors
    ///
    /// Returns a [`TunnelError`] if the proxy URL is unusable, the proxy cannot
    /// be reached, the handshake is refused, or the local port cannot be bound.
    pub async fn open(proxy_url: &Url, destination: &str) -> Result<Self, TunnelError> {
        let proxy = ProxyEndpoint::from_url(proxy_url)?;

        let handshake = connect_through(&proxy, destination).await?;
        drop(handshake);

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|e| TunnelError::Bind(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TunnelError::Bind(e.to_string()))?;

        let cancel = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            proxy.clone(),
            destination.to_string(),
            cancel.clone(),
        ));

        tracing::info!(
            local = %local_addr,
            destination = %destination,
            proxy = %proxy.address,
            "Tunnel established"
        );

        Ok(Self {
            local_addr,
            destination: destination.to_string(),
            cancel,
            accept_task,
        })
    }

    /// Destination every connection is forwarded to
    pub fn destination(&self) -> &str {
        &self.destination
    }
}

#[async_trait]
impl Tunnel for ProxyTunnel {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn close(self: Box<Self>) -> Result<(), TunnelError> {
        let this = *self;
        this.cancel.cancel();
        this.accept_task
            .await
            .map_err(|e| TunnelError::Shutdown(e.to_string()))?;

        tracing::debug!(local = %this.local_addr, "Tunnel closed");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    proxy: ProxyEndpoint,
    destination: String,
    cancel: CancellationToken,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((inbound, peer)) => {
                    tracing::trace!(peer = %peer, "Accepted tunnel connection");
                    connections.spawn(forward(
                        inbound,
                        proxy.clone(),
                        destination.clone(),
                        cancel.clone(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept tunnel connection");
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.shutdown().await;
}

async fn forward(
    mut inbound: TcpStream,
    proxy: ProxyEndpoint,
    destination: String,
    cancel: CancellationToken,
) {
    let mut outbound = match connect_through(&proxy, &destination).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open proxied connection");
            return;
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        copied = tokio::io::copy_bidirectional(&mut inbound, &mut outbound) => {
            match copied {
                Ok((sent, received)) => {
                    tracing::trace!(sent, received, "Tunnel connection finished");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Tunnel connection ended with error");
                }
            }
        }
    }
}

/// Opens a TCP connection to the proxy and asks it to `CONNECT` to `destination`
async fn connect_through(proxy: &ProxyEndpoint, destination: &str) -> Result<TcpStream, TunnelError> {
    let mut stream = tokio::time::timeout(HANDSHAKE_TIMEOUT, TcpStream::connect(&proxy.address))
        .await
        .map_err(|_| TunnelError::ProxyUnreachable {
            address: proxy.address.clone(),
            message: "connect timed out".to_string(),
        })?
        .map_err(|e| TunnelError::ProxyUnreachable {
            address: proxy.address.clone(),
            message: e.to_string(),
        })?;

    let handshake_error = |message: String| TunnelError::Handshake {
        target: destination.to_string(),
        message,
    };

    let mut request = format!("CONNECT {destination} HTTP/1.1\r\nHost: {destination}\r\n");
    if let Some(authorization) = &proxy.authorization {
        request.push_str(&format!("Proxy-Authorization: Basic {authorization}\r\n"));
    }
    request.push_str("\r\n");

    let head = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
        stream.write_all(request.as_bytes()).await?;
        read_response_head(&mut stream).await
    })
    .await
    .map_err(|_| handshake_error("proxy did not answer in time".to_string()))?
    .map_err(|e| handshake_error(e.to_string()))?;

    let status_line = head.lines().next().unwrap_or_default();
    match status_line.split_whitespace().nth(1) {
        Some("200") => Ok(stream),
        _ => Err(handshake_error(format!(
            "proxy answered '{}'",
            status_line.trim()
        ))),
    }
}

/// Reads the proxy response up to and including the blank line
///
/// Reads one byte at a time so nothing after the head is consumed.
async fn read_response_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut head = Vec::with_capacity(128);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "proxy response head too large",
            ));
        }
        if stream.read(&mut byte).await? == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "proxy closed the connection during the handshake",
            ));
        }
        head.push(byte[0]);
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}
