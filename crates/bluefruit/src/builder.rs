//! BluefruitBuilder -- fluent builder for constructing [`Bluefruit`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timeouts, and logging before the transport is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use bluefruit::builder::BluefruitBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> bluefruit_core::Result<()> {
//! let mut module = BluefruitBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(9600)
//!     .timeout(Duration::from_millis(500))
//!     .reset_on_connect(true)
//!     .build()
//!     .await?;
//!
//! let connected = module.is_connected().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bluefruit_core::error::{Error, Result};
use bluefruit_core::transport::Transport;
use bluefruit_core::types::Mode;
use bluefruit_transport::{FlowControl, SerialConfig, SerialTransport};

use crate::driver::{Bluefruit, DriverConfig};

/// Fluent builder for [`Bluefruit`].
///
/// Defaults match a factory-fresh UART Friend: 9600 baud, no flow control,
/// command mode, 250 ms line timeout, verbose logging off.
pub struct BluefruitBuilder {
    serial_port: Option<String>,
    serial: SerialConfig,
    config: DriverConfig,
    reset_on_connect: bool,
}

impl BluefruitBuilder {
    pub fn new() -> Self {
        BluefruitBuilder {
            serial_port: None,
            serial: SerialConfig::default(),
            config: DriverConfig::default(),
            reset_on_connect: false,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial.baud_rate = baud;
        self
    }

    /// Use CTS/RTS hardware flow control.
    pub fn flow_control(mut self, flow: FlowControl) -> Self {
        self.serial.flow_control = flow;
        self
    }

    /// Set the per-line read timeout (default: 250ms).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Log every command and reply line at `info`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// The mode the module is in when the driver takes over. Only matters
    /// for [`Bluefruit::set_mode`], which toggles with `+++`.
    pub fn initial_mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Run [`Bluefruit::reset`] as part of building.
    pub fn reset_on_connect(mut self, enabled: bool) -> Self {
        self.reset_on_connect = enabled;
        self
    }

    /// Build a [`Bluefruit`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `bluefruit-test-harness`) and for
    /// transports other than a local serial port.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Bluefruit> {
        if self.config.timeout.is_zero() {
            return Err(Error::InvalidParameter("timeout must be non-zero".into()));
        }

        let mut module = Bluefruit::new(transport, self.config);
        if self.reset_on_connect && !module.reset().await? {
            return Err(Error::Protocol("module did not acknowledge ATZ".into()));
        }
        Ok(module)
    }

    /// Build a [`Bluefruit`] using a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<Bluefruit> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open_with_config(port, self.serial.clone()).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for BluefruitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluefruit_test_harness::MockTransport;

    #[tokio::test(start_paused = true)]
    async fn builder_defaults() {
        let module = BluefruitBuilder::new()
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(module.config(), DriverConfig::default());
        assert_eq!(module.timeout(), Duration::from_millis(250));
        assert!(!module.verbose());
        assert_eq!(module.mode(), Mode::Command);
    }

    #[tokio::test(start_paused = true)]
    async fn builder_custom_settings() {
        let module = BluefruitBuilder::new()
            .serial_port("/dev/ttyUSB0")
            .baud_rate(115_200)
            .flow_control(FlowControl::Hardware)
            .timeout(Duration::from_millis(1000))
            .verbose(true)
            .initial_mode(Mode::Data)
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(module.timeout(), Duration::from_millis(1000));
        assert!(module.verbose());
        assert_eq!(module.mode(), Mode::Data);
    }

    #[tokio::test(start_paused = true)]
    async fn builder_rejects_zero_timeout() {
        let result = BluefruitBuilder::new()
            .timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = BluefruitBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn builder_reset_on_connect() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r\n", b"\r\nOK\r\n");

        let module = BluefruitBuilder::new()
            .reset_on_connect(true)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();
        assert_eq!(module.mode(), Mode::Command);
    }

    #[tokio::test(start_paused = true)]
    async fn builder_reset_on_connect_failure() {
        let mut mock = MockTransport::new();
        for _ in 0..5 {
            mock.expect(b"ATZ\r\n", b"ERROR\r\n");
        }
        mock.expect(b"+++\r\n", b"");
        for _ in 0..5 {
            mock.expect(b"ATZ\r\n", b"ERROR\r\n");
        }

        let result = BluefruitBuilder::new()
            .reset_on_connect(true)
            .build_with_transport(Box::new(mock))
            .await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }
}
