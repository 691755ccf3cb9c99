//! Error types for SMTP session operations.

use std::io;

use crate::types::ReplyCode;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP session error types.
///
/// Every variant is terminal for the in-flight operation; the session is
/// left in its last stable state and no retry is performed internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[cfg(feature = "tls")]
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// No transport has been established for this session.
    #[error("Transport is not connected")]
    NotConnected,

    /// The transport is closed (locally or by the peer).
    #[error("Stream is already closed")]
    StreamClosed,

    /// Another command is still in flight on this connection.
    ///
    /// The executor never queues; callers must not pipeline.
    #[error("Stream is occupied by an in-flight command")]
    StreamBusy,

    /// Malformed status line from the server.
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// Server returned a non-2xx status for a command.
    #[error("Command rejected with {code}: {message}")]
    CommandRejected {
        /// Reply code (e.g. 550).
        code: ReplyCode,
        /// Curated description for known codes, raw server text otherwise.
        message: String,
    },

    /// Failure during initial connect or during the mandatory greeting.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation requires a capability the server did not advertise.
    #[error("Server does not support {0}")]
    ExtensionNotSupported(String),

    /// STARTTLS was requested but no TLS provider is compiled in.
    #[error("No TLS provider available")]
    TlsUnavailable,

    /// None of the supported auth mechanisms is offered by the server.
    #[error("No supported authentication mechanism offered by server")]
    AuthMechanismUnavailable,

    /// Authentication terminally rejected by the server.
    #[error("Authentication failed with {code}: {message}")]
    AuthenticationFailed {
        /// Final reply code from the AUTH exchange.
        code: ReplyCode,
        /// Server message.
        message: String,
    },
}

impl Error {
    /// Creates a `CommandRejected` error, substituting the curated
    /// description for known reply codes.
    #[must_use]
    pub fn rejected(code: ReplyCode, server_message: &str) -> Self {
        let message = code
            .description()
            .map_or_else(|| server_message.to_string(), ToString::to_string);
        Self::CommandRejected { code, message }
    }

    /// Creates an `AuthenticationFailed` error from a terminal reply.
    #[must_use]
    pub fn auth_failed(code: ReplyCode, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent server rejection (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::CommandRejected { code, .. } if code.is_permanent())
    }

    /// Returns true if this is a transient server rejection (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::CommandRejected { code, .. } if code.is_transient())
    }
}
