//! Shared value types.

use std::fmt;
use std::str::FromStr;

/// Operating mode of a Bluefruit LE module.
///
/// In command mode every line written to the module is interpreted as an AT
/// command. In data mode bytes are forwarded over the BLE UART service
/// untouched. The module toggles between the two on a `+++` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Command,
    Data,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Command => f.write_str("command"),
            Mode::Data => f.write_str("data"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "command" | "cmd" => Ok(Mode::Command),
            "data" => Ok(Mode::Data),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
