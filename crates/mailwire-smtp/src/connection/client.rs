//! Type-state SMTP session client.
//!
//! The session states are encoded in the type system so that illegal
//! transitions are compile-time errors:
//!
//! - `Connected`: greeting consumed, no capabilities known in the current
//!   TLS epoch. This is also the state right after a STARTTLS upgrade,
//!   which discards all prior greeting state.
//! - `Greeted`: EHLO/HELO succeeded; carries the discovered feature map.
//! - `Authenticated`: AUTH completed; the feature map is carried through.
//!
//! "Disconnected" is simply the absence of a client value, and "closed" is
//! the client having been consumed by [`Client::quit`].

use tokio::io::{AsyncRead, AsyncWrite};

use super::executor::Executor;
use super::stream::TlsUpgrade;
use crate::auth::{self, AuthMechanism};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::{EsmtpFeatures, Reply, ReplyCode};

use super::stream::SmtpStream;

/// State marker: connected, greeting consumed, capabilities unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connected;

/// State after a successful EHLO/HELO; carries the feature map.
#[derive(Debug, Clone, Default)]
pub struct Greeted {
    pub(crate) features: EsmtpFeatures,
}

/// State after successful authentication.
#[derive(Debug, Clone, Default)]
pub struct Authenticated {
    pub(crate) features: EsmtpFeatures,
}

/// SMTP session client with type-state.
///
/// The type parameter `State` tracks the session state at compile time;
/// `S` is the underlying transport.
pub struct Client<S, State> {
    executor: Executor<S>,
    local_name: String,
    greeting: Reply,
    tls_active: bool,
    state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("local_name", &self.local_name)
            .field("tls_active", &self.tls_active)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Session introspection for states that have completed a greeting.
pub trait SmtpSession {
    /// Returns the feature map discovered by the last successful EHLO.
    fn features(&self) -> &EsmtpFeatures;

    /// Pure lookup: true iff `name` (case-insensitive) was advertised.
    fn has_extn(&self, name: &str) -> bool {
        self.features().has(name)
    }
}

impl<S> SmtpSession for Client<S, Greeted> {
    fn features(&self) -> &EsmtpFeatures {
        &self.state.features
    }
}

impl<S> SmtpSession for Client<S, Authenticated> {
    fn features(&self) -> &EsmtpFeatures {
        &self.state.features
    }
}

// Shared accessors and best-effort teardown for all states.
impl<S, State> Client<S, State> {
    /// The client identifier used in EHLO/HELO.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// The server greeting that opened this session.
    #[must_use]
    pub const fn greeting(&self) -> &Reply {
        &self.greeting
    }

    /// True once the session runs over TLS.
    #[must_use]
    pub const fn is_tls_active(&self) -> bool {
        self.tls_active
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends QUIT and closes the transport, consuming the client.
    ///
    /// Best-effort: transport and protocol errors during teardown are
    /// swallowed (logged at debug level).
    pub async fn quit(mut self) {
        if let Err(e) = self.executor.exchange(&Command::Quit).await {
            tracing::debug!(error = %e, "QUIT exchange failed");
        }
        if let Err(e) = self.executor.shutdown().await {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
    }
}

impl Client<SmtpStream, Connected> {
    /// Opens a TCP connection and consumes the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the TCP connect fails or the
    /// greeting is not 2xx; reply decode failures propagate as their own
    /// kinds.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = super::stream::connect(host, port)
            .await
            .map_err(|e| Error::Connection(format!("connect to {host}:{port} failed: {e}")))?;
        Self::from_stream(stream).await
    }

    /// Connects with implicit TLS (e.g. submission over port 465).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the TCP connect or TLS handshake
    /// fails, or if the greeting is not 2xx.
    #[cfg(feature = "tls")]
    pub async fn connect_tls(host: &str, port: u16) -> Result<Self> {
        let stream = super::stream::connect_tls(host, port)
            .await
            .map_err(|e| Error::Connection(format!("TLS connect to {host}:{port} failed: {e}")))?;
        let mut client = Self::from_stream(stream).await?;
        client.tls_active = true;
        Ok(client)
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session from an already-connected stream and consumes the
    /// server greeting.
    ///
    /// The local client identifier is derived from the machine's FQDN, or
    /// falls back to a bracketed IP literal; override it with
    /// [`Self::with_local_name`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the greeting is not 2xx.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut executor = Executor::new(stream);
        let greeting = executor.read_reply().await?;
        if !greeting.is_success() {
            return Err(Error::Connection(format!(
                "server refused session: {} {}",
                greeting.code,
                greeting.message_text()
            )));
        }
        tracing::debug!(code = greeting.code.as_u16(), "session established");

        Ok(Self {
            executor,
            local_name: derive_local_name(),
            greeting,
            tls_active: false,
            state: Connected,
        })
    }

    /// Overrides the client identifier used in EHLO/HELO.
    #[must_use]
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = name.into();
        self
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] if the server rejects EHLO
    /// (callers wanting the HELO fallback should use [`Self::greet`]).
    pub async fn ehlo(mut self) -> Result<Client<S, Greeted>> {
        let features = self.send_ehlo().await?;
        Ok(self.into_greeted(features))
    }

    /// Sends HELO; no capabilities are discovered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] if the server rejects HELO.
    pub async fn helo(mut self) -> Result<Client<S, Greeted>> {
        self.send_helo().await?;
        Ok(self.into_greeted(EsmtpFeatures::default()))
    }

    /// Greets the server: EHLO, falling back to HELO on rejection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when both EHLO and HELO are rejected;
    /// transport and decode failures propagate as their own kinds.
    pub async fn greet(mut self) -> Result<Client<S, Greeted>> {
        match self.send_ehlo().await {
            Ok(features) => Ok(self.into_greeted(features)),
            Err(Error::CommandRejected { code, .. }) => {
                tracing::debug!(code = code.as_u16(), "EHLO rejected, falling back to HELO");
                match self.send_helo().await {
                    Ok(()) => Ok(self.into_greeted(EsmtpFeatures::default())),
                    Err(Error::CommandRejected { .. }) => {
                        Err(Error::Connection("EHLO and HELO both rejected".to_string()))
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Authenticates, transparently greeting the server first.
    ///
    /// Capability knowledge is required before AUTH, so this performs the
    /// EHLO/HELO exchange and then negotiates a mechanism.
    ///
    /// # Errors
    ///
    /// Everything [`Self::greet`] and [`Client::login`] can return.
    pub async fn login(self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let greeted = self.greet().await?;
        greeted.login(username, password).await
    }

    async fn send_ehlo(&mut self) -> Result<EsmtpFeatures> {
        let cmd = Command::Ehlo {
            hostname: self.local_name.clone(),
        };
        let reply = self.executor.execute(&cmd).await?;
        Ok(EsmtpFeatures::parse(&reply.message))
    }

    async fn send_helo(&mut self) -> Result<()> {
        let cmd = Command::Helo {
            hostname: self.local_name.clone(),
        };
        self.executor.execute(&cmd).await?;
        Ok(())
    }

    fn into_greeted(self, features: EsmtpFeatures) -> Client<S, Greeted> {
        Client {
            executor: self.executor,
            local_name: self.local_name,
            greeting: self.greeting,
            tls_active: self.tls_active,
            state: Greeted { features },
        }
    }
}

impl<S> Client<S, Greeted>
where
    S: AsyncRead + AsyncWrite + Unpin + TlsUpgrade,
{
    /// Upgrades the connection to TLS via STARTTLS.
    ///
    /// On success all greeting state is discarded: capabilities may differ
    /// over the encrypted channel, so the returned client must greet again
    /// before extension-gated operations (the `Connected` type enforces
    /// this).
    ///
    /// # Errors
    ///
    /// [`Error::ExtensionNotSupported`] if the server did not advertise
    /// `starttls`, [`Error::TlsUnavailable`] without a TLS provider,
    /// [`Error::CommandRejected`] if the server refuses the upgrade, TLS
    /// handshake failures otherwise.
    pub async fn starttls(mut self, hostname: &str) -> Result<Client<S, Connected>> {
        if !self.state.features.has("starttls") {
            return Err(Error::ExtensionNotSupported("STARTTLS".to_string()));
        }

        self.executor.execute(&Command::StartTls).await?;

        let stream = self.executor.take_stream()?;
        let tls = stream.upgrade_to_tls(hostname).await?;
        tracing::info!(hostname, "TLS established, prior greeting state discarded");

        Ok(Client {
            executor: Executor::new(tls),
            local_name: self.local_name,
            greeting: self.greeting,
            tls_active: true,
            state: Connected,
        })
    }
}

impl<S> Client<S, Greeted>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates with the negotiated SASL mechanism.
    ///
    /// The mechanism is chosen from the server-advertised `auth` parameter
    /// in fixed preference order: CRAM-MD5, then PLAIN, then LOGIN.
    /// A 503 reply during the exchange means the session is already
    /// authenticated and counts as success.
    ///
    /// # Errors
    ///
    /// [`Error::ExtensionNotSupported`] without an `auth` capability,
    /// [`Error::AuthMechanismUnavailable`] when no supported mechanism is
    /// offered, [`Error::AuthenticationFailed`] on terminal rejection.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let Some(advertised) = self.state.features.get("auth").map(ToString::to_string) else {
            return Err(Error::ExtensionNotSupported("AUTH".to_string()));
        };
        let mechanism =
            AuthMechanism::select(&advertised).ok_or(Error::AuthMechanismUnavailable)?;
        tracing::debug!(%mechanism, "authenticating");

        match mechanism {
            AuthMechanism::CramMd5 => self.auth_cram_md5(username, password).await?,
            AuthMechanism::Plain => self.auth_plain(username, password).await?,
            AuthMechanism::Login => self.auth_login(username, password).await?,
        }

        tracing::info!(%mechanism, "authenticated");
        Ok(Client {
            executor: self.executor,
            local_name: self.local_name,
            greeting: self.greeting,
            tls_active: self.tls_active,
            state: Authenticated {
                features: self.state.features,
            },
        })
    }

    async fn auth_cram_md5(&mut self, username: &str, password: &str) -> Result<()> {
        let probe = Command::Auth {
            mechanism: AuthMechanism::CramMd5,
            initial_response: None,
        };
        let reply = self.executor.exchange(&probe).await?;

        // 503 on the probe: already authenticated, nothing more to send.
        if reply.code == ReplyCode::BAD_SEQUENCE {
            return Ok(());
        }
        if reply.code != ReplyCode::AUTH_CONTINUE {
            return Err(Error::auth_failed(reply.code, reply.message_text()));
        }

        let payload = auth::cram_md5_response(reply.first_line(), username, password)?;
        let reply = self
            .executor
            .exchange(&Command::AuthResponse { payload })
            .await?;
        check_auth_final(&reply)
    }

    async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(auth::plain_payload(username, password)),
        };
        let reply = self.executor.exchange(&cmd).await?;
        check_auth_final(&reply)
    }

    async fn auth_login(&mut self, username: &str, password: &str) -> Result<()> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: Some(auth::login_payload(username)),
        };
        let reply = self.executor.exchange(&cmd).await?;
        if reply.code != ReplyCode::AUTH_CONTINUE {
            return Err(Error::auth_failed(reply.code, reply.message_text()));
        }

        let reply = self
            .executor
            .exchange(&Command::AuthResponse {
                payload: auth::login_payload(password),
            })
            .await?;
        check_auth_final(&reply)
    }
}

/// Terminal acceptance: 235 (authenticated) or 503 (already authenticated).
fn check_auth_final(reply: &Reply) -> Result<()> {
    if reply.code == ReplyCode::AUTH_SUCCEEDED || reply.code == ReplyCode::BAD_SEQUENCE {
        Ok(())
    } else {
        Err(Error::auth_failed(reply.code, reply.message_text()))
    }
}

/// Derives the EHLO client identifier: the machine FQDN when available,
/// otherwise a bracketed IP literal.
fn derive_local_name() -> String {
    let hostname = gethostname::gethostname().to_string_lossy().to_string();
    if hostname.contains('.') {
        hostname
    } else {
        "[127.0.0.1]".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn local_name_is_fqdn_or_ip_literal() {
        let name = derive_local_name();
        assert!(
            name.contains('.') || (name.starts_with('[') && name.ends_with(']')),
            "unexpected local name: {name}"
        );
    }

    #[test]
    fn auth_final_classification() {
        let ok = Reply::new(ReplyCode::AUTH_SUCCEEDED, vec!["done".to_string()]);
        assert!(check_auth_final(&ok).is_ok());

        let already = Reply::new(ReplyCode::BAD_SEQUENCE, vec![]);
        assert!(check_auth_final(&already).is_ok());

        let rejected = Reply::new(ReplyCode::AUTH_FAILED, vec!["nope".to_string()]);
        assert!(matches!(
            check_auth_final(&rejected),
            Err(Error::AuthenticationFailed { .. })
        ));
    }
}
