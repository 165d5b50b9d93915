use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;

use crate::error::{ProbeError, Result};

/// The socket under an IMAP or POP3 session, encrypted or not.
pub(crate) enum MailStream {
    Tls(TlsStream<TcpStream>),
    Plain(TcpStream),
}

impl AsyncRead for MailStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MailStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
            MailStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MailStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MailStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
            MailStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MailStream::Tls(s) => Pin::new(s).poll_flush(cx),
            MailStream::Plain(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MailStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
            MailStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for MailStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailStream::Tls(_) => write!(f, "MailStream::Tls"),
            MailStream::Plain(_) => write!(f, "MailStream::Plain"),
        }
    }
}

/// Open a plain TCP connection.
pub(crate) async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| ProbeError::io(format!("TCP connect to {host}:{port} failed"), e))
}

/// Run the TLS handshake on an already connected socket.
pub(crate) async fn upgrade(
    tcp: TcpStream,
    host: &str,
    accept_invalid_certs: bool,
) -> Result<MailStream> {
    let native_connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_certs)
        .build()?;
    let tls_connector = tokio_native_tls::TlsConnector::from(native_connector);
    let tls = tls_connector.connect(host, tcp).await?;
    Ok(MailStream::Tls(tls))
}

/// Establish TCP + TLS (implicit TLS) or a plain stream.
pub(crate) async fn connect(
    host: &str,
    port: u16,
    tls: bool,
    accept_invalid_certs: bool,
) -> Result<MailStream> {
    let tcp = connect_tcp(host, port).await?;
    if tls {
        upgrade(tcp, host, accept_invalid_certs).await
    } else {
        Ok(MailStream::Plain(tcp))
    }
}
