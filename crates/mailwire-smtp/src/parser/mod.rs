//! SMTP response parser.
//!
//! Works on CRLF-stripped wire lines. A logical reply is one or more lines
//! sharing a status code; continuation lines mark "more follows" with a `-`
//! immediately after the code, the final line uses a space (or nothing).

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses the three-digit status code at the start of a line.
///
/// # Errors
///
/// Returns [`Error::ProtocolDecode`] if the line is shorter than three bytes
/// or the first three bytes are not decimal digits.
pub fn parse_code(line: &str) -> Result<ReplyCode> {
    let code = line
        .get(0..3)
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| Error::ProtocolDecode(format!("malformed status line: {line:?}")))?;
    Ok(ReplyCode::new(code))
}

/// Returns true if this line terminates its logical reply.
///
/// The fourth byte decides: `-` (or any byte other than space) means more
/// lines follow; a space, or a bare three-byte line, is final.
#[must_use]
pub fn is_final_line(line: &str) -> bool {
    line.as_bytes().get(3).is_none_or(|b| *b == b' ')
}

/// Returns the message portion of a line (the bytes after code + separator).
#[must_use]
pub fn line_text(line: &str) -> &str {
    line.get(4..).unwrap_or("")
}

/// Assembles the lines of one logical reply into a [`Reply`].
///
/// The status code is taken from the first line; the message portions of all
/// lines are kept in order.
///
/// # Errors
///
/// Returns [`Error::ProtocolDecode`] if the reply is empty or any line's
/// status code is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::ProtocolDecode("empty reply".to_string()));
    };
    let code = parse_code(first)?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        parse_code(line)?;
        message.push(line_text(line).to_string());
    }

    Ok(Reply::new(code, message))
}
