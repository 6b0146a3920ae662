//! Bluefruit AT command strings.
//!
//! Only the handful of commands the driver issues itself live here. Any
//! other command from the Bluefruit command set can be sent verbatim
//! through [`Bluefruit::send_command_lines`](crate::driver::Bluefruit::send_command_lines).

use std::time::Duration;

/// Software reset. Answered with `OK`, then the module reboots.
pub const RESET: &str = "ATZ";

/// Wipe user configuration and bonding data. The module reboots afterwards.
pub const FACTORY_RESET: &str = "AT+FACTORYRESET";

/// Query the connection state; the reply line is `1` or `0`.
pub const GAP_GET_CONN: &str = "AT+GAPGETCONN";

/// Module information dump (board, serial, firmware versions, ...).
pub const INFO: &str = "ATI";

/// Toggle between command and data mode. Also the escape sequence used
/// to pull a wedged module back into command mode before `ATZ`.
pub const MODE_SWITCH: &str = "+++";

/// `ATZ` attempts per round in [`Bluefruit::reset`](crate::driver::Bluefruit::reset).
/// A second round follows the `+++` escape.
pub const RESET_ATTEMPTS: usize = 5;

/// Settle time on either side of the `+++` escape.
pub const ESCAPE_SETTLE: Duration = Duration::from_millis(50);

/// Time the module needs to reboot after `ATZ` or `AT+FACTORYRESET`.
pub const REBOOT_SETTLE: Duration = Duration::from_millis(1000);

/// Build the command that enables (`ATE=1`) or disables (`ATE=0`) echo of
/// typed characters.
pub fn cmd_echo(enable: bool) -> String {
    format!("ATE={}", u8::from(enable))
}
