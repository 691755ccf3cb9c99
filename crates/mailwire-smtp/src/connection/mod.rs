//! SMTP connection management: transport, command execution, and the
//! type-state session client.

mod client;
mod executor;
mod stream;

pub use client::{Authenticated, Client, Connected, Greeted, SmtpSession};
pub use executor::Executor;
#[cfg(feature = "tls")]
pub use stream::connect_tls;
pub use stream::{SmtpStream, TlsUpgrade, connect};
