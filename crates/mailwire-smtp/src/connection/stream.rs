//! Stream types for SMTP connections.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::error::Result;

#[cfg(feature = "tls")]
use {
    rustls::pki_types::ServerName, std::sync::Arc, tokio_rustls::TlsConnector,
    tokio_rustls::client::TlsStream,
};

/// Hook for wrapping an existing socket in a TLS layer after STARTTLS.
///
/// The upgrade happens in place: the same TCP connection keeps carrying the
/// session, now encrypted. Test doubles implement this as the identity.
#[allow(async_fn_in_trait)]
pub trait TlsUpgrade: Sized {
    /// Performs the TLS handshake on the existing connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails, or
    /// [`Error::TlsUnavailable`](crate::Error::TlsUnavailable) when no TLS
    /// provider is compiled in.
    async fn upgrade_to_tls(self, hostname: &str) -> Result<Self>;
}

/// A stream that can be either plaintext or TLS.
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    #[cfg(feature = "tls")]
    Tls(Box<TlsStream<TcpStream>>),
}

impl SmtpStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        #[cfg(feature = "tls")]
        {
            matches!(self, Self::Tls(_))
        }
        #[cfg(not(feature = "tls"))]
        {
            false
        }
    }
}

impl std::fmt::Debug for SmtpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("SmtpStream::Plain"),
            #[cfg(feature = "tls")]
            Self::Tls(_) => f.write_str("SmtpStream::Tls"),
        }
    }
}

impl TlsUpgrade for SmtpStream {
    #[cfg(feature = "tls")]
    async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let connector = create_tls_connector();
                let server_name = ServerName::try_from(hostname.to_string())?;
                let tls = connector.connect(server_name, tcp).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(crate::error::Error::Connection(
                "stream is already TLS".to_string(),
            )),
        }
    }

    #[cfg(not(feature = "tls"))]
    async fn upgrade_to_tls(self, _hostname: &str) -> Result<Self> {
        Err(crate::error::Error::TlsUnavailable)
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the TCP connection fails.
pub async fn connect(host: &str, port: u16) -> Result<SmtpStream> {
    let addr = format!("{host}:{port}");
    let tcp = TcpStream::connect(&addr).await?;
    Ok(SmtpStream::Plain(tcp))
}

/// Connects to an SMTP server with implicit TLS (e.g. port 465).
///
/// # Errors
///
/// Returns an error if the TCP connection or TLS handshake fails.
#[cfg(feature = "tls")]
pub async fn connect_tls(host: &str, port: u16) -> Result<SmtpStream> {
    let addr = format!("{host}:{port}");
    let tcp = TcpStream::connect(&addr).await?;

    let connector = create_tls_connector();
    let server_name = ServerName::try_from(host.to_string())?;
    let tls = connector.connect(server_name, tcp).await?;

    Ok(SmtpStream::Tls(Box::new(tls)))
}

/// Creates a TLS connector with the webpki root certificates.
#[cfg(feature = "tls")]
fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
