//! Error types for bluefruit-rs.
//!
//! Only failures of the link itself are errors. A module answering `ERROR`,
//! or going quiet before it answers, is an ordinary protocol outcome and is
//! reported as `false` by the driver rather than through this type.

/// The error type for all bluefruit-rs operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port could not be opened, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (unexpected bytes, failed mandatory reset).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for bytes from the module.
    ///
    /// Transports return this from `receive()`; the response reader treats
    /// it as "stream idle" and never surfaces it from a line read.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid parameter was passed to a builder or driver method.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_protocol() {
        let e = Error::Protocol("reset failed".into());
        assert_eq!(e.to_string(), "protocol error: reset failed");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("timeout must be non-zero".into());
        assert_eq!(e.to_string(), "invalid parameter: timeout must be non-zero");
    }

    #[test]
    fn error_display_connection_states() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
