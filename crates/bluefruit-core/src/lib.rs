//! bluefruit-core: Core traits, types, and error definitions for bluefruit-rs.
//!
//! This crate defines the hardware-agnostic abstractions shared by the
//! Bluefruit LE driver, its transports, and the test harness. Applications
//! that only need to name a transport or match on an error can depend on
//! this crate without pulling in `tokio-serial`.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to the module
//! - [`Mode`] -- command vs. data operating mode
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use transport::Transport;
pub use types::Mode;
