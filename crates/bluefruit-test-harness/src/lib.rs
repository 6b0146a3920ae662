//! bluefruit-test-harness: Test utilities and mock transports for
//! bluefruit-rs.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the
//! AT response reader and driver without a Bluefruit module attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
