//! Connection establishment for the forwarding transport.
//!
//! `RelayConnector` is the dial function produced from an
//! [`OutboundStrategy`]: a `tower::Service<Uri>` handed to the HTTP client,
//! invoked once per new pooled connection. hyper's client has no
//! transport-level proxy support, so the CONNECT tunnel and the SOCKS5
//! handshake live here, before the stream is handed back for the client (and
//! the TLS layer above us) to use.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper::rt::{Read as HyperRead, Write as HyperWrite};
use hyper::Uri;
use hyper_rustls::ConfigBuilderExt;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tokio_socks::tcp::Socks5Stream;

use crate::config::ConfigError;
use crate::outbound::strategy::{OutboundStrategy, ProxyScheme};
use crate::relay::transport::RelayTimeouts;

/// Per-dial failure. Contained to the request whose connection needed the
/// dial; never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("invalid dial target {0:?}")]
    Target(String),

    #[error("connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("connect to proxy {proxy}: {source}")]
    ProxyConnect {
        proxy: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS handshake with proxy {proxy}: {source}")]
    ProxyTls {
        proxy: String,
        #[source]
        source: io::Error,
    },

    #[error("proxy {proxy} refused CONNECT to {target}: {reason}")]
    ConnectRefused {
        proxy: String,
        target: String,
        reason: String,
    },

    #[error("SOCKS5 handshake with {proxy}: {source}")]
    Socks {
        proxy: String,
        #[source]
        source: tokio_socks::Error,
    },

    #[error("dial {target} timed out after {timeout:?}")]
    Timeout { target: String, timeout: Duration },
}

/// The dial function bound to one strategy for the process lifetime.
///
/// Through an HTTP forward proxy every target is tunneled with CONNECT,
/// plain-`http` upstreams included; absolute-form requests are never sent
/// to the proxy. A forward proxy that refuses CONNECT to port 80 will
/// refuse those dials.
#[derive(Clone)]
pub struct RelayConnector {
    strategy: OutboundStrategy,
    connect_timeout: Duration,
    keepalive_interval: Duration,
    tls_handshake_timeout: Duration,
    proxy_tls: Option<TlsConnector>,
}

impl RelayConnector {
    /// Build the dial function for a strategy.
    ///
    /// Fails only when the `https` proxy scheme is configured and the native
    /// root store cannot be loaded; everything else was validated when the
    /// strategy was constructed.
    pub fn new(strategy: OutboundStrategy, timeouts: &RelayTimeouts) -> Result<Self, ConfigError> {
        let proxy_tls = match &strategy {
            OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Https,
                ..
            } => {
                let tls_config = ClientConfig::builder()
                    .with_native_roots()
                    .map_err(|err| {
                        ConfigError::Invalid(format!("load native TLS roots: {err}"))
                    })?
                    .with_no_client_auth();
                Some(TlsConnector::from(Arc::new(tls_config)))
            }
            _ => None,
        };

        Ok(Self {
            strategy,
            connect_timeout: timeouts.connect,
            keepalive_interval: timeouts.keepalive_interval,
            tls_handshake_timeout: timeouts.tls_handshake,
            proxy_tls,
        })
    }

    async fn dial(self, dst: Uri) -> Result<RelayStream, DialError> {
        let (host, port) = target_parts(&dst)?;
        let target = format!("{host}:{port}");

        let stream = match &self.strategy {
            OutboundStrategy::Direct => {
                let stream = TcpStream::connect((host.as_str(), port))
                    .await
                    .map_err(|source| DialError::Connect {
                        target: target.clone(),
                        source,
                    })?;
                configure_stream(&stream, self.keepalive_interval);
                TransportStream::Tcp(stream)
            }
            OutboundStrategy::HttpProxy {
                host: proxy_host,
                port: proxy_port,
                ..
            } => {
                let proxy = format!("{proxy_host}:{proxy_port}");
                let stream = TcpStream::connect((proxy_host.as_str(), *proxy_port))
                    .await
                    .map_err(|source| DialError::ProxyConnect {
                        proxy: proxy.clone(),
                        source,
                    })?;
                configure_stream(&stream, self.keepalive_interval);

                match &self.proxy_tls {
                    Some(tls) => {
                        let name = ServerName::try_from(proxy_host.clone()).map_err(|_| {
                            DialError::Target(proxy.clone())
                        })?;
                        let handshake = tls.connect(name, stream);
                        let mut stream =
                            tokio::time::timeout(self.tls_handshake_timeout, handshake)
                                .await
                                .map_err(|_| DialError::ProxyTls {
                                    proxy: proxy.clone(),
                                    source: io::Error::new(
                                        io::ErrorKind::TimedOut,
                                        "handshake timed out",
                                    ),
                                })?
                                .map_err(|source| DialError::ProxyTls {
                                    proxy: proxy.clone(),
                                    source,
                                })?;
                        connect_tunnel(&mut stream, &target, &proxy).await?;
                        TransportStream::ProxyTls(Box::new(stream))
                    }
                    None => {
                        let mut stream = stream;
                        connect_tunnel(&mut stream, &target, &proxy).await?;
                        TransportStream::Tcp(stream)
                    }
                }
            }
            OutboundStrategy::Socks5 {
                host: proxy_host,
                port: proxy_port,
            } => {
                let proxy = format!("{proxy_host}:{proxy_port}");
                let stream =
                    Socks5Stream::connect((proxy_host.as_str(), *proxy_port), (host, port))
                        .await
                        .map_err(|source| DialError::Socks { proxy, source })?;
                TransportStream::Socks(stream)
            }
        };

        Ok(RelayStream {
            inner: TokioIo::new(stream),
        })
    }
}

impl tower::Service<Uri> for RelayConnector {
    type Response = RelayStream;
    type Error = DialError;
    type Future = Pin<Box<dyn Future<Output = Result<RelayStream, DialError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), DialError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let connector = self.clone();
        Box::pin(async move {
            let timeout = connector.connect_timeout;
            let target = dst.to_string();
            match tokio::time::timeout(timeout, connector.dial(dst)).await {
                Ok(result) => result,
                Err(_) => Err(DialError::Timeout { target, timeout }),
            }
        })
    }
}

/// Issue an HTTP CONNECT for `target` over an established proxy stream.
async fn connect_tunnel<S>(stream: &mut S, target: &str, proxy: &str) -> Result<(), DialError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|source| DialError::ProxyConnect {
            proxy: proxy.to_string(),
            source,
        })?;

    let mut head = Vec::with_capacity(256);
    let mut buf = [0u8; 256];
    loop {
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|source| DialError::ProxyConnect {
                proxy: proxy.to_string(),
                source,
            })?;
        if n == 0 {
            return Err(refused(proxy, target, "proxy closed the connection"));
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
        // An 8 KiB head without a blank line is not a CONNECT response.
        if head.len() > 8192 {
            return Err(refused(proxy, target, "oversized CONNECT response"));
        }
    }

    let head = String::from_utf8_lossy(&head);
    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line.split_whitespace().nth(1).unwrap_or_default();
    if !status.starts_with('2') {
        return Err(refused(proxy, target, status_line));
    }
    Ok(())
}

fn refused(proxy: &str, target: &str, reason: &str) -> DialError {
    DialError::ConnectRefused {
        proxy: proxy.to_string(),
        target: target.to_string(),
        reason: reason.to_string(),
    }
}

fn target_parts(dst: &Uri) -> Result<(String, u16), DialError> {
    let host = dst
        .host()
        .ok_or_else(|| DialError::Target(dst.to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = dst.port_u16().unwrap_or_else(|| {
        if dst.scheme_str() == Some("https") {
            443
        } else {
            80
        }
    });
    Ok((host, port))
}

fn configure_stream(stream: &TcpStream, keepalive_interval: Duration) {
    if let Err(err) = stream.set_nodelay(true) {
        tracing::debug!(error = %err, "failed to set TCP_NODELAY");
    }
    let keepalive = TcpKeepalive::new()
        .with_time(keepalive_interval)
        .with_interval(keepalive_interval);
    if let Err(err) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
        tracing::debug!(error = %err, "failed to enable TCP keepalive");
    }
}

enum TransportStream {
    Tcp(TcpStream),
    ProxyTls(Box<TlsStream<TcpStream>>),
    Socks(Socks5Stream<TcpStream>),
}

impl AsyncRead for TransportStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            TransportStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            TransportStream::ProxyTls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
            TransportStream::Socks(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            TransportStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            TransportStream::ProxyTls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
            TransportStream::Socks(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            TransportStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            TransportStream::ProxyTls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
            TransportStream::Socks(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            TransportStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            TransportStream::ProxyTls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
            TransportStream::Socks(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// An established outbound stream, whatever path it was dialed over.
///
/// Implements hyper's I/O traits so the TLS connector layered on top can
/// treat every variant uniformly.
pub struct RelayStream {
    inner: TokioIo<TransportStream>,
}

impl HyperRead for RelayStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl HyperWrite for RelayStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Connection for RelayStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}
