//! Transport implementations for bluefruit-rs.
//!
//! This crate provides [`SerialTransport`], the concrete implementation of the
//! [`Transport`](bluefruit_core::Transport) trait for a Bluefruit LE UART
//! Friend (or any module bridged to a USB virtual COM port).
//!
//! # Example
//!
//! ```no_run
//! use bluefruit_transport::SerialTransport;
//! use bluefruit_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> bluefruit_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//!
//! transport.send(b"ATI\r\n").await?;
//!
//! let mut buf = [0u8; 128];
//! let n = transport.receive(&mut buf, Duration::from_millis(250)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DEFAULT_BAUD_RATE, FlowControl, SerialConfig, SerialTransport};
