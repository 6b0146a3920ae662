//! # bluefruit -- AT command driver for Bluefruit LE modules
//!
//! Drives an Adafruit Bluefruit LE module (UART Friend, or an SPI Friend
//! behind a byte-stream bridge) through its textual AT command set.
//!
//! ```no_run
//! use bluefruit::BluefruitBuilder;
//!
//! #[tokio::main]
//! async fn main() -> bluefruit_core::Result<()> {
//!     let mut module = BluefruitBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     if module.reset().await? {
//!         module.print_info(&mut std::io::stdout()).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`] -- sentinels, command framing, integer reply parsing
//! - [`commands`] -- command strings and retry/settle timings
//! - [`reader`] -- line assembly over a [`Transport`](bluefruit_core::Transport)
//! - [`driver`] -- reset, factory reset, echo, connection status, info
//! - [`builder`] -- fluent construction over serial or a custom transport

pub mod builder;
pub mod commands;
pub mod driver;
pub mod protocol;
pub mod reader;

pub use bluefruit_core::{Error, Mode, Result, Transport};
pub use builder::BluefruitBuilder;
pub use driver::{Bluefruit, DriverConfig};
pub use reader::{LineBuffer, ResponseReader};
