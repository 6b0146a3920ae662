//! Line protocol constants and pure decode helpers.
//!
//! The Bluefruit AT command set is line-delimited ASCII. Every command is a
//! single line; every reply is zero or more informational lines followed by
//! exactly one sentinel line, `OK` or `ERROR`.
//!
//! Nothing in this module performs I/O. The [`reader`](crate::reader) feeds
//! assembled lines through these helpers.

/// Capacity of the reusable line buffer, in bytes.
///
/// One slot is reserved, so a line carries at most `LINE_CAPACITY - 1`
/// content bytes before it is cut off.
pub const LINE_CAPACITY: usize = 128;

/// Bytes written after every command.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Sentinel line closing a successful reply.
pub const OK: &[u8] = b"OK";

/// Sentinel line closing a failed reply.
pub const ERROR: &[u8] = b"ERROR";

/// Frame a command line for the wire: the command text plus `\r\n`.
///
/// # Examples
///
/// ```
/// use bluefruit::protocol::encode_command;
///
/// assert_eq!(encode_command("ATZ"), b"ATZ\r\n");
/// ```
pub fn encode_command(cmd: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(cmd.len() + LINE_TERMINATOR.len());
    out.extend_from_slice(cmd.as_bytes());
    out.extend_from_slice(LINE_TERMINATOR);
    out
}

/// `true` if `line` is exactly the `OK` sentinel.
pub fn is_ok(line: &[u8]) -> bool {
    line == OK
}

/// `true` if `line` is exactly the `ERROR` sentinel.
pub fn is_error(line: &[u8]) -> bool {
    line == ERROR
}

/// `true` if `line` is either sentinel.
pub fn is_sentinel(line: &[u8]) -> bool {
    is_ok(line) || is_error(line)
}

/// Interpret a reply line as an integer, the way C's `strtol(s, NULL, 0)`
/// would.
///
/// Leading whitespace and a sign are accepted. A `0x`/`0X` prefix selects
/// hexadecimal, a bare leading `0` selects octal, anything else is decimal.
/// The longest run of valid digits is used and the rest of the line is
/// ignored. A line with no digits yields 0. Values outside `i32` saturate.
///
/// # Examples
///
/// ```
/// use bluefruit::protocol::parse_int_reply;
///
/// assert_eq!(parse_int_reply("42"), 42);
/// assert_eq!(parse_int_reply("0x1A"), 26);
/// assert_eq!(parse_int_reply("abc"), 0);
/// ```
pub fn parse_int_reply(line: &str) -> i32 {
    let bytes = line.as_bytes();
    let mut i = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let hex_prefix = bytes.get(i) == Some(&b'0')
        && matches!(bytes.get(i + 1), Some(b'x' | b'X'))
        && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);

    let (radix, digits) = if hex_prefix {
        (16, &bytes[i + 2..])
    } else if bytes.get(i) == Some(&b'0') {
        (8, &bytes[i..])
    } else {
        (10, &bytes[i..])
    };

    let magnitude = digits
        .iter()
        .map_while(|&b| char::from(b).to_digit(radix))
        .fold(0i64, |acc, d| {
            acc.saturating_mul(i64::from(radix))
                .saturating_add(i64::from(d))
        });

    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
