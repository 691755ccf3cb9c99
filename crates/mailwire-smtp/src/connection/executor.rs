//! Command execution over a buffered stream.
//!
//! The executor owns the single-command invariant: at most one command may
//! be in flight per connection, and it never queues. A command future that
//! is dropped mid-exchange leaves the executor busy, since a partial reply
//! may still be buffered on the wire.

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser;
use crate::types::Reply;

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Sends commands and assembles logical replies on one connection.
pub struct Executor<S> {
    // Held as Option so the raw stream can be taken for a TLS upgrade.
    reader: Option<BufReader<S>>,
    write_buffer: BytesMut,
    in_flight: bool,
    closed: bool,
}

impl<S> std::fmt::Debug for Executor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("connected", &self.reader.is_some())
            .field("in_flight", &self.in_flight)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<S> Executor<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates an executor over a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: Some(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream)),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            in_flight: false,
            closed: false,
        }
    }

    /// Sends a command and returns the raw logical reply, whatever its code.
    ///
    /// # Errors
    ///
    /// Precondition failures before any I/O: [`Error::NotConnected`],
    /// [`Error::StreamClosed`], [`Error::StreamBusy`]. During the exchange:
    /// [`Error::Io`], [`Error::StreamClosed`] on EOF,
    /// [`Error::ProtocolDecode`] on a malformed status line.
    pub async fn exchange(&mut self, cmd: &Command) -> Result<Reply> {
        self.check_ready()?;
        self.in_flight = true;
        tracing::debug!(command = cmd.verb(), "sending command");
        let result = self.exchange_inner(cmd).await;
        self.in_flight = false;
        result
    }

    /// Sends a command and classifies the reply: [200,300) is success,
    /// anything else becomes [`Error::CommandRejected`].
    ///
    /// # Errors
    ///
    /// Everything [`Self::exchange`] returns, plus
    /// [`Error::CommandRejected`] for non-2xx replies.
    pub async fn execute(&mut self, cmd: &Command) -> Result<Reply> {
        let reply = self.exchange(cmd).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(Error::rejected(reply.code, &reply.message_text()))
        }
    }

    /// Reads one logical reply without sending a command (initial greeting).
    ///
    /// # Errors
    ///
    /// Same as [`Self::exchange`], minus the write path.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        self.check_ready()?;
        self.in_flight = true;
        let result = self.read_reply_inner().await;
        self.in_flight = false;
        result
    }

    /// True once the transport has been closed (locally or by the peer).
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// True while a command exchange is outstanding.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Takes the raw stream out of the executor for an in-place TLS upgrade.
    ///
    /// Buffered read data is discarded; after a STARTTLS 220 the server
    /// sends nothing until the handshake, so nothing is lost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the stream was already taken.
    pub fn take_stream(&mut self) -> Result<S> {
        self.reader
            .take()
            .map(BufReader::into_inner)
            .ok_or(Error::NotConnected)
    }

    /// Best-effort shutdown of the underlying transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails at the I/O level.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(reader) = self.reader.as_mut() {
            reader.get_mut().shutdown().await?;
        }
        Ok(())
    }

    fn check_ready(&self) -> Result<()> {
        if self.reader.is_none() {
            return Err(Error::NotConnected);
        }
        if self.closed {
            return Err(Error::StreamClosed);
        }
        if self.in_flight {
            return Err(Error::StreamBusy);
        }
        Ok(())
    }

    async fn exchange_inner(&mut self, cmd: &Command) -> Result<Reply> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(&cmd.serialize());

        let Some(reader) = self.reader.as_mut() else {
            return Err(Error::NotConnected);
        };
        let stream = reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        self.read_reply_inner().await
    }

    async fn read_reply_inner(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            // Fail fast on a malformed status line, before any further read.
            parser::parse_code(&line)?;
            let is_final = parser::is_final_line(&line);
            lines.push(line);
            if is_final {
                break;
            }
        }

        let reply = parser::parse_reply(&lines)?;
        tracing::trace!(code = reply.code.as_u16(), lines = lines.len(), "reply received");
        Ok(reply)
    }

    /// Reads one CRLF-terminated line, stripped of its terminator.
    async fn read_line(&mut self) -> Result<String> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(Error::NotConnected);
        };

        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || !line.ends_with('\n') {
            // EOF before a line terminator.
            self.closed = true;
            return Err(Error::StreamClosed);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;
    use tokio_test::task::spawn;
    use tokio_test::{assert_pending, block_on};

    /// Mock stream that returns scripted responses and captures writes.
    struct MockStream {
        responses: Cursor<Vec<u8>>,
        sent: Vec<u8>,
        /// When true, an exhausted script reads as pending instead of EOF.
        pending_on_empty: bool,
    }

    impl MockStream {
        fn new(responses: &[u8]) -> Self {
            Self {
                responses: Cursor::new(responses.to_vec()),
                sent: Vec::new(),
                pending_on_empty: false,
            }
        }

        fn pending_after(responses: &[u8]) -> Self {
            Self {
                pending_on_empty: true,
                ..Self::new(responses)
            }
        }
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let pos = usize::try_from(self.responses.position()).unwrap();
            let data = self.responses.get_ref();

            if pos >= data.len() {
                if self.pending_on_empty {
                    return Poll::Pending;
                }
                return Poll::Ready(Ok(()));
            }

            let remaining = &data[pos..];
            let to_read = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..to_read]);
            self.responses.set_position((pos + to_read) as u64);

            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.sent.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn exchange_round_trip() {
        let mut exec = Executor::new(MockStream::new(b"250 OK\r\n"));
        let reply = block_on(exec.exchange(&Command::Quit)).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["OK"]);

        let sent = exec.take_stream().unwrap().sent;
        assert_eq!(sent, b"QUIT\r\n");
    }

    #[test]
    fn exchange_assembles_multi_line_reply() {
        let mut exec = Executor::new(MockStream::new(
            b"250-mail.example.com\r\n250-STARTTLS\r\n250 HELP\r\n",
        ));
        let reply = block_on(exec.exchange(&Command::Ehlo {
            hostname: "client".to_string(),
        }))
        .unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["mail.example.com", "STARTTLS", "HELP"]);
    }

    #[test]
    fn execute_classifies_rejection() {
        let mut exec = Executor::new(MockStream::new(b"501 nope\r\n"));
        let err = block_on(exec.execute(&Command::Quit)).unwrap_err();
        match err {
            Error::CommandRejected { code, message } => {
                assert_eq!(code.as_u16(), 501);
                assert_eq!(message, "Syntax error in parameters or arguments");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_status_line_stops_reading() {
        // Had the executor kept reading after the malformed line it would
        // hit EOF and fail with StreamClosed instead.
        let mut exec = Executor::new(MockStream::new(b"xyz-garbage\r\n"));
        let err = block_on(exec.exchange(&Command::Quit)).unwrap_err();
        assert!(matches!(err, Error::ProtocolDecode(_)));
        assert!(!exec.is_closed());
    }

    #[test]
    fn eof_mid_reply_closes_the_stream() {
        let mut exec = Executor::new(MockStream::new(b"250-more follows\r\n"));
        let err = block_on(exec.exchange(&Command::Quit)).unwrap_err();
        assert!(matches!(err, Error::StreamClosed));
        assert!(exec.is_closed());

        // Preconditions now fail before any I/O.
        let err = block_on(exec.exchange(&Command::Quit)).unwrap_err();
        assert!(matches!(err, Error::StreamClosed));
    }

    #[test]
    fn cancelled_exchange_leaves_executor_busy() {
        let mut exec = Executor::new(MockStream::pending_after(b""));
        let cmd = Command::Quit;
        {
            let mut in_flight = spawn(exec.exchange(&cmd));
            assert_pending!(in_flight.poll());
        } // dropped mid-exchange

        assert!(exec.is_in_flight());
        let err = block_on(exec.exchange(&cmd)).unwrap_err();
        assert!(matches!(err, Error::StreamBusy));
    }

    #[test]
    fn taken_stream_means_not_connected() {
        let mut exec = Executor::new(MockStream::new(b""));
        let _stream = exec.take_stream().unwrap();
        let err = block_on(exec.exchange(&Command::Quit)).unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(exec.take_stream().is_err());
    }

    #[test]
    fn read_reply_consumes_greeting() {
        let mut exec = Executor::new(MockStream::new(b"220 mail.example.com ready\r\n"));
        let reply = block_on(exec.read_reply()).unwrap();
        assert_eq!(reply.code.as_u16(), 220);
        // Nothing was written for a bare reply read.
        assert!(exec.take_stream().unwrap().sent.is_empty());
    }
}
