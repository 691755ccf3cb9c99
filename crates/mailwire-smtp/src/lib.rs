//! # mailwire-smtp
//!
//! An async SMTP session client: greeting, capability discovery, STARTTLS,
//! and SASL authentication over non-blocking I/O.
//!
//! ## Features
//!
//! - **Type-state session management**: compile-time enforcement of valid
//!   SMTP state transitions (connected → greeted → authenticated)
//! - **Capability-gated extensions**: STARTTLS and AUTH proceed only when
//!   the server advertises them
//! - **Authentication**: CRAM-MD5, PLAIN, LOGIN, negotiated in that order
//!   of preference
//! - **TLS**: STARTTLS in-place upgrade and implicit TLS, via rustls
//! - **Strict serialization**: one in-flight command per connection,
//!   never pipelined
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_smtp::{Client, SmtpSession};
//!
//! #[tokio::main]
//! async fn main() -> mailwire_smtp::Result<()> {
//!     // Connect and consume the server greeting
//!     let client = Client::connect("smtp.example.com", 587).await?;
//!
//!     // Discover capabilities
//!     let client = client.ehlo().await?;
//!
//!     // Upgrade to TLS; the prior greeting state is discarded, so greet
//!     // again over the encrypted channel
//!     let client = client.starttls("smtp.example.com").await?;
//!
//!     // login() greets transparently before negotiating a mechanism
//!     let client = client.login("user@example.com", "password").await?;
//!     assert!(client.has_extn("auth"));
//!
//!     client.quit().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! connect() ──→ Connected ── ehlo()/helo()/greet() ──→ Greeted
//!                   ↑                                     │
//!                   └────────────── starttls() ───────────┤
//!                                                         │
//!                              login() ──→ Authenticated ─┴─ quit()
//! ```
//!
//! Message submission (MAIL FROM / RCPT TO / DATA) is out of scope for this
//! crate; it covers session establishment and authentication only.
//!
//! ## Modules
//!
//! - [`auth`]: SASL mechanism selection and payload builders
//! - [`command`]: SMTP command builders
//! - [`connection`]: transport, command executor, and type-state client
//! - [`parser`]: response parser
//! - [`types`]: core SMTP types (replies, extension features)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

#[cfg(feature = "tls")]
pub use connection::connect_tls;
pub use connection::{
    Authenticated, Client, Connected, Executor, Greeted, SmtpSession, SmtpStream, TlsUpgrade,
    connect,
};
pub use error::{Error, Result};
pub use types::{EsmtpFeatures, Reply, ReplyCode};

pub use auth::AuthMechanism;

/// SMTP protocol version supported.
pub const SMTP_VERSION: &str = "SMTP/ESMTP (RFC 5321, RFC 4954)";
