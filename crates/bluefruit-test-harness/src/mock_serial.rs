//! Mock transport for deterministic testing of the AT driver.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test command framing, sentinel
//! handling, and reply parsing without real hardware.
//!
//! # Example
//!
//! ```
//! use bluefruit_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the driver writes `ATZ`, the module answers with a blank line and OK.
//! mock.expect(b"ATZ\r\n", b"\r\nOK\r\n");
//! // Bytes the module emits on its own, before any command.
//! mock.queue_rx(b"\r\nBLE ready\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use bluefruit_core::error::{Error, Result};
use bluefruit_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// Bytes appended to the receive queue when the request arrives.
    response: Vec<u8>,
}

/// A mock [`Transport`] standing in for a Bluefruit module.
///
/// Expectations are consumed in order. Each `send()` is recorded and
/// matched against the next expectation; on a match the expectation's
/// response is appended to the receive queue. `receive()` drains that
/// queue. With nothing queued it waits out the caller's timeout and
/// returns [`Error::Timeout`], exactly like an idle serial line, so tests
/// should run on tokio's paused clock.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    /// Bytes "on the wire" from the module, not yet read by the host.
    rx_queue: VecDeque<u8>,
    /// Largest chunk handed out per `receive()`; 0 means unlimited.
    max_chunk: usize,
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    discard_calls: usize,
    /// Chatter repeated whenever the receive queue runs dry.
    noise: Vec<u8>,
    noise_interval: Duration,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            rx_queue: VecDeque::new(),
            max_chunk: 0,
            connected: true,
            sent_log: Vec::new(),
            discard_calls: 0,
            noise: Vec::new(),
            noise_interval: Duration::ZERO,
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, `response` is
    /// queued for subsequent `receive()` calls. Pass an empty response to
    /// model a module that stays silent.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue bytes for `receive()` without waiting for a request.
    pub fn queue_rx(&mut self, data: &[u8]) {
        self.rx_queue.extend(data.iter().copied());
    }

    /// Limit how many bytes a single `receive()` returns.
    ///
    /// Useful for checking that line assembly survives bytes trickling in.
    pub fn set_max_chunk(&mut self, max_chunk: usize) {
        self.max_chunk = max_chunk;
    }

    /// Model a module that never stops talking: once the receive queue is
    /// empty, every `receive()` waits `interval` and hands out `data` again.
    ///
    /// The chatter survives `discard_input()`. If `interval` is longer than
    /// the caller's timeout the read times out instead. An empty `data`
    /// turns the chatter off.
    pub fn set_line_noise(&mut self, data: &[u8], interval: Duration) {
        self.noise = data.to_vec();
        self.noise_interval = interval;
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Return the number of bytes queued but not yet received.
    pub fn pending_rx(&self) -> usize {
        self.rx_queue.len()
    }

    /// How many times `discard_input()` has been called.
    pub fn discard_calls(&self) -> usize {
        self.discard_calls
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        let Some(expectation) = self.expectations.pop_front() else {
            return Err(Error::Protocol(format!(
                "no more expectations in mock transport (sent {:?})",
                String::from_utf8_lossy(data)
            )));
        };
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }
        self.rx_queue.extend(expectation.response);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if self.rx_queue.is_empty() {
            if self.noise.is_empty() || self.noise_interval > timeout {
                tokio::time::sleep(timeout).await;
                return Err(Error::Timeout);
            }
            tokio::time::sleep(self.noise_interval).await;
            self.rx_queue.extend(self.noise.iter().copied());
        }

        let mut n = self.rx_queue.len().min(buf.len());
        if self.max_chunk > 0 {
            n = n.min(self.max_chunk);
        }
        for (slot, byte) in buf[..n].iter_mut().zip(self.rx_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn discard_input(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.discard_calls += 1;
        self.rx_queue.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.rx_queue.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
