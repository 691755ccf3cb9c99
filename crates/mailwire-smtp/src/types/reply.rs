//! SMTP reply types.

/// One logical SMTP reply from the server.
///
/// A logical reply may span several wire lines sharing one status code
/// (`250-...\r\n250 ...\r\n`); `message` holds the per-line texts in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g. 250).
    pub code: ReplyCode,
    /// Reply message lines.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code.is_intermediate()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Returns the text of the first message line, if any.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.message.first().map_or("", String::as_str)
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Returns a curated human-readable description for well-known codes.
    #[must_use]
    pub const fn description(self) -> Option<&'static str> {
        match self.0 {
            421 => Some("Service not available, closing transmission channel"),
            500 => Some("Syntax error, command unrecognized"),
            501 => Some("Syntax error in parameters or arguments"),
            502 => Some("Command not implemented"),
            503 => Some("Bad sequence of commands"),
            504 => Some("Command parameter not implemented"),
            530 => Some("Authentication required"),
            535 => Some("Authentication credentials invalid"),
            550 => Some("Mailbox unavailable"),
            554 => Some("Transaction failed"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Common reply codes
impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 500 Syntax error, command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 501 Syntax error in parameters or arguments
    pub const PARAMETER_ERROR: Self = Self(501);
    /// 502 Command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 503 Bad sequence of commands
    pub const BAD_SEQUENCE: Self = Self(503);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new)]
mod tests {
    use super::*;

    mod reply_code_tests {
        use super::*;

        #[test]
        fn success_codes() {
            assert!(ReplyCode::OK.is_success());
            assert!(ReplyCode::SERVICE_READY.is_success());
            assert!(ReplyCode::CLOSING.is_success());
            assert!(ReplyCode::AUTH_SUCCEEDED.is_success());
        }

        #[test]
        fn not_success_codes() {
            assert!(!ReplyCode::OK.is_transient());
            assert!(!ReplyCode::OK.is_permanent());
            assert!(!ReplyCode::OK.is_intermediate());
        }

        #[test]
        fn intermediate_codes() {
            assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
            assert!(!ReplyCode::AUTH_CONTINUE.is_success());
        }

        #[test]
        fn transient_errors() {
            assert!(ReplyCode::SERVICE_UNAVAILABLE.is_transient());
        }

        #[test]
        fn permanent_errors() {
            assert!(ReplyCode::SYNTAX_ERROR.is_permanent());
            assert!(ReplyCode::PARAMETER_ERROR.is_permanent());
            assert!(ReplyCode::NOT_IMPLEMENTED.is_permanent());
            assert!(ReplyCode::BAD_SEQUENCE.is_permanent());
            assert!(ReplyCode::AUTH_FAILED.is_permanent());
        }

        #[test]
        fn as_u16() {
            assert_eq!(ReplyCode::OK.as_u16(), 250);
            assert_eq!(ReplyCode::SERVICE_READY.as_u16(), 220);
            assert_eq!(ReplyCode::AUTH_FAILED.as_u16(), 535);
        }

        #[test]
        fn description_known() {
            assert_eq!(
                ReplyCode::PARAMETER_ERROR.description(),
                Some("Syntax error in parameters or arguments")
            );
            assert_eq!(
                ReplyCode::BAD_SEQUENCE.description(),
                Some("Bad sequence of commands")
            );
        }

        #[test]
        fn description_unknown() {
            assert_eq!(ReplyCode::new(299).description(), None);
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", ReplyCode::OK), "250");
            assert_eq!(format!("{}", ReplyCode::SYNTAX_ERROR), "500");
        }
    }

    mod reply_tests {
        use super::*;

        #[test]
        fn new() {
            let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
            assert_eq!(reply.code, ReplyCode::OK);
            assert_eq!(reply.message.len(), 1);
        }

        #[test]
        fn is_success() {
            let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
            assert!(reply.is_success());
            assert!(!reply.is_intermediate());
        }

        #[test]
        fn message_text_multiple_lines() {
            let reply = Reply::new(
                ReplyCode::OK,
                vec!["STARTTLS".to_string(), "HELP".to_string()],
            );
            assert_eq!(reply.message_text(), "STARTTLS\nHELP");
        }

        #[test]
        fn first_line() {
            let reply = Reply::new(
                ReplyCode::AUTH_CONTINUE,
                vec!["PDxjaGFsbGVuZ2U+Pg==".to_string()],
            );
            assert_eq!(reply.first_line(), "PDxjaGFsbGVuZ2U+Pg==");

            let empty = Reply::new(ReplyCode::OK, vec![]);
            assert_eq!(empty.first_line(), "");
        }
    }
}
