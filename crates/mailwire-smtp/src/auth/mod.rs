//! SASL authentication mechanisms and payload builders.
//!
//! Mechanism selection is a pure function of the server-advertised `auth`
//! extension parameter and a fixed preference order; the session drives the
//! actual exchange.

use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use md5::Md5;

use crate::error::{Error, Result};
use crate::types::ReplyCode;

type HmacMd5 = Hmac<Md5>;

/// SASL authentication mechanism supported by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// CRAM-MD5 - challenge-response
    CramMd5,
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy two-step plaintext
    Login,
}

/// Fixed preference order for mechanism selection.
const PREFERRED: [AuthMechanism; 3] = [
    AuthMechanism::CramMd5,
    AuthMechanism::Plain,
    AuthMechanism::Login,
];

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CRAM-MD5" => Some(Self::CramMd5),
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CramMd5 => "CRAM-MD5",
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }

    /// Selects the preferred mechanism among those advertised.
    ///
    /// `advertised` is the parameter string of the `auth` extension
    /// (space-separated mechanism tokens). Returns `None` when no supported
    /// mechanism is offered.
    #[must_use]
    pub fn select(advertised: &str) -> Option<Self> {
        let tokens: Vec<&str> = advertised.split_whitespace().collect();
        PREFERRED
            .into_iter()
            .find(|mech| tokens.iter().any(|t| t.eq_ignore_ascii_case(mech.as_str())))
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the AUTH PLAIN initial response: base64 of `\0user\0password`.
#[must_use]
pub fn plain_payload(username: &str, password: &str) -> String {
    BASE64.encode(format!("\0{username}\0{password}"))
}

/// Base64-encodes a single AUTH LOGIN step (username or password).
#[must_use]
pub fn login_payload(value: &str) -> String {
    BASE64.encode(value)
}

/// Builds the CRAM-MD5 challenge response.
///
/// Decodes the base64 challenge, computes HMAC-MD5 keyed by the password
/// over it, and returns base64 of `username SP hexdigest`.
///
/// # Errors
///
/// Returns [`Error::AuthenticationFailed`] if the challenge is not valid
/// base64.
pub fn cram_md5_response(challenge_b64: &str, username: &str, password: &str) -> Result<String> {
    let challenge = BASE64.decode(challenge_b64.trim()).map_err(|_| {
        Error::auth_failed(
            ReplyCode::AUTH_CONTINUE,
            "server sent a malformed base64 challenge",
        )
    })?;

    // HMAC accepts keys of any length, so this cannot fail in practice.
    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|_| Error::auth_failed(ReplyCode::AUTH_CONTINUE, "invalid HMAC key"))?;
    mac.update(&challenge);
    let digest = mac.finalize().into_bytes();

    let hexdigest = digest.iter().fold(String::new(), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    });

    Ok(BASE64.encode(format!("{username} {hexdigest}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod selection {
        use super::*;

        #[test]
        fn prefers_cram_md5_over_everything() {
            assert_eq!(
                AuthMechanism::select("LOGIN PLAIN CRAM-MD5"),
                Some(AuthMechanism::CramMd5)
            );
        }

        #[test]
        fn prefers_plain_over_login() {
            assert_eq!(
                AuthMechanism::select("PLAIN LOGIN"),
                Some(AuthMechanism::Plain)
            );
            assert_eq!(
                AuthMechanism::select("LOGIN PLAIN"),
                Some(AuthMechanism::Plain)
            );
        }

        #[test]
        fn falls_back_to_login() {
            assert_eq!(
                AuthMechanism::select("LOGIN XOAUTH2"),
                Some(AuthMechanism::Login)
            );
        }

        #[test]
        fn none_offered() {
            assert_eq!(AuthMechanism::select("XOAUTH2 OAUTHBEARER"), None);
            assert_eq!(AuthMechanism::select(""), None);
        }

        #[test]
        fn tokens_are_case_insensitive() {
            assert_eq!(
                AuthMechanism::select("plain login"),
                Some(AuthMechanism::Plain)
            );
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn parse_known() {
            assert_eq!(AuthMechanism::parse("PLAIN"), Some(AuthMechanism::Plain));
            assert_eq!(AuthMechanism::parse("login"), Some(AuthMechanism::Login));
            assert_eq!(
                AuthMechanism::parse("Cram-Md5"),
                Some(AuthMechanism::CramMd5)
            );
        }

        #[test]
        fn parse_unknown() {
            assert_eq!(AuthMechanism::parse("XOAUTH2"), None);
        }

        #[test]
        fn as_str_round_trips() {
            for mech in PREFERRED {
                assert_eq!(AuthMechanism::parse(mech.as_str()), Some(mech));
            }
        }
    }

    mod payloads {
        use super::*;

        #[test]
        fn plain_payload_encoding() {
            // base64("\0u\0p")
            assert_eq!(plain_payload("u", "p"), "AHUAcA==");
            assert_eq!(plain_payload("user", "pass"), "AHVzZXIAcGFzcw==");
        }

        #[test]
        fn login_payload_encoding() {
            assert_eq!(login_payload("user"), "dXNlcg==");
            assert_eq!(login_payload("pass"), "cGFzcw==");
        }

        #[test]
        fn cram_md5_rfc2195_vector() {
            // RFC 2195 §2: user "tim", password "tanstaaftanstaaf",
            // challenge "<1896.697170952@postoffice.reston.mci.net>".
            let challenge =
                BASE64.encode("<1896.697170952@postoffice.reston.mci.net>");
            let response = cram_md5_response(&challenge, "tim", "tanstaaftanstaaf").unwrap();
            let decoded = BASE64.decode(response).unwrap();
            assert_eq!(
                String::from_utf8(decoded).unwrap(),
                "tim b913a602c7eda7a495b4e6e7334d3890"
            );
        }

        #[test]
        fn cram_md5_rejects_bad_base64() {
            let result = cram_md5_response("not!base64@@", "u", "p");
            assert!(matches!(
                result,
                Err(Error::AuthenticationFailed { .. })
            ));
        }
    }
}
