//! Reference transport: TCP/TLS byte streams framed by [`LineCodec`].
//!
//! The engine itself is sans-IO; this module is the duplex-stream
//! collaborator the core's contract describes, for hosts that run on
//! tokio. TLS certificate validation uses the platform root store.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::line::LineCodec;
use crate::message::Message;

/// A connected, line-framed stream to the server.
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP.
    Tcp(Framed<TcpStream, LineCodec>),
    /// TLS over TCP.
    Tls(Framed<TlsStream<TcpStream>, LineCodec>),
}

/// Open a transport. `encoding` is the fallback decode label from the
/// session configuration.
pub async fn connect(host: &str, port: u16, secure: bool, encoding: &str) -> Result<Transport> {
    let stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("connecting to {host}:{port}"))?;

    if let Err(e) = enable_keepalive(&stream) {
        warn!("failed to enable TCP keepalive: {}", e);
    }

    let codec = LineCodec::new(encoding);
    if !secure {
        return Ok(Transport::Tcp(Framed::new(stream, codec)));
    }

    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs()
        .context("loading platform root certificates")?
    {
        roots.add(cert).ok();
    }
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name =
        ServerName::try_from(host.to_owned()).context("invalid TLS server name")?;
    let stream = connector
        .connect(server_name, stream)
        .await
        .context("TLS handshake")?;
    Ok(Transport::Tls(Framed::new(stream, codec)))
}

fn enable_keepalive(stream: &TcpStream) -> Result<()> {
    use socket2::{SockRef, TcpKeepalive};
    use std::time::Duration;

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)?;
    Ok(())
}

impl Transport {
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Read the next line. `None` means the peer closed the stream.
    pub async fn read_line(&mut self) -> Option<Result<String>> {
        let next = match self {
            Transport::Tcp(framed) => framed.next().await,
            Transport::Tls(framed) => framed.next().await,
        };
        next.map(|r| r.map_err(Into::into))
    }

    /// Write one message, flushing through to the socket.
    pub async fn write_message(&mut self, msg: &Message) -> Result<()> {
        self.write_line(msg.to_string()).await
    }

    /// Write one raw line (`\r\n` is appended by the codec).
    pub async fn write_line(&mut self, line: String) -> Result<()> {
        match self {
            Transport::Tcp(framed) => framed.send(line).await?,
            Transport::Tls(framed) => framed.send(line).await?,
        }
        Ok(())
    }

    /// Close the stream.
    pub async fn close(&mut self) -> Result<()> {
        match self {
            Transport::Tcp(framed) => SinkExt::<String>::close(framed).await?,
            Transport::Tls(framed) => SinkExt::<String>::close(framed).await?,
        }
        Ok(())
    }
}
