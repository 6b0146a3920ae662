//! Response reader: line assembly and the command/response exchange.
//!
//! [`ResponseReader`] owns the [`Transport`] and a single fixed-size line
//! buffer. Each [`read_line`](ResponseReader::read_line) call overwrites the
//! buffer; the assembled line is only reachable through a borrow of the
//! reader, so it cannot outlive the next read.
//!
//! The transport hands over bytes in whatever chunks the link produces.
//! Bytes that arrive after a line terminator are kept in a backlog and
//! consumed by the next read, the same way they would sit in the module's
//! UART FIFO.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace};

use bluefruit_core::error::{Error, Result};
use bluefruit_core::transport::Transport;

use crate::protocol::{self, LINE_CAPACITY};

/// Default per-read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// Quiet period that ends [`ResponseReader::discard_input`].
const DRAIN_QUIET: Duration = Duration::from_millis(10);

/// Upper bound on reads while draining, so a chattering link cannot wedge
/// the caller.
const DRAIN_MAX_READS: usize = 256;

/// Size of one transport read.
const RX_CHUNK: usize = 64;

/// Fixed-capacity buffer holding the most recent response line.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl LineBuffer {
    pub const fn new() -> Self {
        LineBuffer {
            buf: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    /// Append one byte. Returns `true` once the line has reached its
    /// maximum length and must be closed.
    fn push(&mut self, byte: u8) -> bool {
        self.buf[self.len] = byte;
        self.len += 1;
        self.is_full()
    }

    fn clear(&mut self) {
        self.len = 0;
    }

    pub fn is_full(&self) -> bool {
        self.len >= LINE_CAPACITY - 1
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The line as text. Non-UTF-8 bytes are replaced.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads line-oriented AT responses from a [`Transport`].
pub struct ResponseReader {
    transport: Box<dyn Transport>,
    line: LineBuffer,
    backlog: VecDeque<u8>,
    timeout: Duration,
    verbose: bool,
}

impl ResponseReader {
    /// Wrap `transport` with the default 250 ms timeout and verbose echo off.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        ResponseReader {
            transport,
            line: LineBuffer::new(),
            backlog: VecDeque::with_capacity(RX_CHUNK),
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the timeout used by [`wait_for_ok`](Self::wait_for_ok) and
    /// [`read_int_reply`](Self::read_int_reply) for each line.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// When set, every sent command and received line is logged at `info`
    /// under the `bluefruit::wire` target.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// The line captured by the most recent [`read_line`](Self::read_line).
    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport
    }

    /// Assemble the next response line.
    ///
    /// `\r` bytes are dropped. A `\n` before any content is skipped, a `\n`
    /// after content closes the line. A line that reaches
    /// `LINE_CAPACITY - 1` bytes is closed as is, and the rest of it is
    /// left for the next call. If `timeout` passes first, whatever was
    /// gathered so far is the line.
    ///
    /// Returns the number of bytes captured; 0 means the module sent
    /// nothing within the timeout.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<usize> {
        self.line.clear();
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(byte) = self.backlog.pop_front() {
                match byte {
                    b'\r' => {}
                    b'\n' if self.line.is_empty() => {}
                    b'\n' => return Ok(self.finish_line()),
                    _ => {
                        if self.line.push(byte) {
                            trace!(len = self.line.len(), "line buffer full, truncating");
                            return Ok(self.finish_line());
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.fill_backlog(deadline - now).await {
                Ok(()) => {}
                Err(Error::Timeout) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(self.finish_line())
    }

    /// Read lines until `OK` (true), `ERROR` (false), or an idle stream
    /// (false). Lines in between are informational and skipped.
    pub async fn wait_for_ok(&mut self) -> Result<bool> {
        while self.read_line(self.timeout).await? > 0 {
            let line = self.line.as_bytes();
            if protocol::is_ok(line) {
                return Ok(true);
            }
            if protocol::is_error(line) {
                return Ok(false);
            }
            debug!(line = %self.line.to_string_lossy(), "skipping informational line");
        }
        Ok(false)
    }

    /// Read one line and interpret it as an integer (see
    /// [`parse_int_reply`](protocol::parse_int_reply)). No line yields 0.
    pub async fn read_int_reply(&mut self) -> Result<i32> {
        if self.read_line(self.timeout).await? == 0 {
            return Ok(0);
        }
        Ok(protocol::parse_int_reply(&self.line.to_string_lossy()))
    }

    /// Write `cmd` followed by `\r\n`.
    pub async fn send_line(&mut self, cmd: &str) -> Result<()> {
        if self.verbose {
            info!(target: "bluefruit::wire", "-> {cmd}");
        } else {
            trace!(target: "bluefruit::wire", "-> {cmd}");
        }
        self.transport.send(&protocol::encode_command(cmd)).await
    }

    /// Send `cmd` and wait for its sentinel.
    pub async fn send_command_check_ok(&mut self, cmd: &str) -> Result<bool> {
        self.send_line(cmd).await?;
        self.wait_for_ok().await
    }

    /// Send `cmd`, parse the first reply line as an integer, then wait for
    /// the trailing sentinel. Returns `(value, ok)`.
    pub async fn send_command_with_int_reply(&mut self, cmd: &str) -> Result<(i32, bool)> {
        self.send_line(cmd).await?;
        let value = self.read_int_reply().await?;
        let ok = self.wait_for_ok().await?;
        Ok((value, ok))
    }

    /// Read lines up to the sentinel and return the informational ones,
    /// together with whether the sentinel was `OK`. An idle stream ends the
    /// response with `false`.
    pub async fn read_response_lines(&mut self) -> Result<(Vec<String>, bool)> {
        let mut lines = Vec::new();
        while self.read_line(self.timeout).await? > 0 {
            let line = self.line.as_bytes();
            if protocol::is_sentinel(line) {
                return Ok((lines, protocol::is_ok(line)));
            }
            lines.push(self.line.to_string_lossy().into_owned());
        }
        Ok((lines, false))
    }

    /// Throw away everything buffered on the host side and drain the link
    /// until it stays quiet for a moment.
    pub async fn discard_input(&mut self) -> Result<()> {
        let mut dropped = self.backlog.len();
        self.backlog.clear();
        self.line.clear();
        self.transport.discard_input().await?;

        let mut scratch = [0u8; RX_CHUNK];
        for _ in 0..DRAIN_MAX_READS {
            match self.transport.receive(&mut scratch, DRAIN_QUIET).await {
                Ok(n) => dropped += n,
                Err(Error::Timeout) => break,
                Err(e) => return Err(e),
            }
        }

        if dropped > 0 {
            debug!(bytes = dropped, "discarded residual input");
        }
        Ok(())
    }

    async fn fill_backlog(&mut self, wait: Duration) -> Result<()> {
        let mut scratch = [0u8; RX_CHUNK];
        let n = self.transport.receive(&mut scratch, wait).await?;
        self.backlog.extend(&scratch[..n]);
        Ok(())
    }

    fn finish_line(&self) -> usize {
        if !self.line.is_empty() {
            if self.verbose {
                info!(target: "bluefruit::wire", "<- {}", self.line.to_string_lossy());
            } else {
                trace!(target: "bluefruit::wire", "<- {}", self.line.to_string_lossy());
            }
        }
        self.line.len()
    }
}
