//! Transport trait for module communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a Bluefruit LE
//! module. The module speaks the same line protocol whether it sits behind a
//! UART (Bluefruit LE UART Friend) or an SPI bridge that exposes a byte
//! stream, so the driver only ever sees ordered bytes.
//!
//! The response reader in the `bluefruit` crate operates on a `Transport`
//! rather than directly on a serial port, enabling both real hardware
//! control and deterministic unit testing with `MockTransport` from the
//! `bluefruit-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a module.
///
/// The channel is treated as reliable and ordered. Framing into lines is
/// the job of the response reader that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Drop any bytes the link has buffered but not yet delivered.
    ///
    /// Serial ports clear the OS receive queue here. The default does
    /// nothing; callers that need a quiet line still drain `receive()`
    /// afterwards.
    async fn discard_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
