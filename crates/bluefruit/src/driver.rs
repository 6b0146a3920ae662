//! Bluefruit -- high-level operations on a Bluefruit LE module.
//!
//! This module ties the [`ResponseReader`] to the module's housekeeping
//! commands: reset with escape-sequence recovery, factory reset, echo
//! control, connection status, and the `ATI` information dump. Each
//! operation sends one fixed command string and hands the reply to the
//! reader; retries and settle delays are the only recovery strategy.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info, warn};

use bluefruit_core::error::Result;
use bluefruit_core::transport::Transport;
use bluefruit_core::types::Mode;

use crate::commands;
use crate::protocol;
use crate::reader::{DEFAULT_TIMEOUT, LineBuffer, ResponseReader};

/// Line printed before and after the `ATI` dump.
const INFO_RULE: &str = "----------------";

/// Runtime settings of a [`Bluefruit`] driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Log every sent command and received line at `info`.
    pub verbose: bool,
    /// Per-line read timeout.
    pub timeout: Duration,
    /// Mode the module is believed to be in.
    pub mode: Mode,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            verbose: false,
            timeout: DEFAULT_TIMEOUT,
            mode: Mode::Command,
        }
    }
}

/// A Bluefruit LE module controlled through AT commands.
///
/// Constructed via [`BluefruitBuilder`](crate::builder::BluefruitBuilder).
/// Every method takes `&mut self`, so only one command is ever in flight.
pub struct Bluefruit {
    reader: ResponseReader,
    mode: Mode,
}

impl Bluefruit {
    /// Create a driver on top of `transport`.
    ///
    /// This is called by [`BluefruitBuilder`](crate::builder::BluefruitBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(transport: Box<dyn Transport>, config: DriverConfig) -> Self {
        let mut reader = ResponseReader::new(transport);
        reader.set_timeout(config.timeout);
        reader.set_verbose(config.verbose);
        Bluefruit {
            reader,
            mode: config.mode,
        }
    }

    /// Snapshot of the current settings.
    pub fn config(&self) -> DriverConfig {
        DriverConfig {
            verbose: self.reader.verbose(),
            timeout: self.reader.timeout(),
            mode: self.mode,
        }
    }

    pub fn verbose(&self) -> bool {
        self.reader.verbose()
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.reader.set_verbose(verbose);
    }

    pub fn timeout(&self) -> Duration {
        self.reader.timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.reader.set_timeout(timeout);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    // -----------------------------------------------------------------
    // Response reader passthrough
    // -----------------------------------------------------------------

    /// See [`ResponseReader::read_line`]. The line is available from
    /// [`line()`](Self::line) until the next read.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<usize> {
        self.reader.read_line(timeout).await
    }

    pub fn line(&self) -> &LineBuffer {
        self.reader.line()
    }

    pub async fn wait_for_ok(&mut self) -> Result<bool> {
        self.reader.wait_for_ok().await
    }

    pub async fn read_int_reply(&mut self) -> Result<i32> {
        self.reader.read_int_reply().await
    }

    pub async fn send_command_check_ok(&mut self, cmd: &str) -> Result<bool> {
        self.reader.send_command_check_ok(cmd).await
    }

    pub async fn send_command_with_int_reply(&mut self, cmd: &str) -> Result<(i32, bool)> {
        self.reader.send_command_with_int_reply(cmd).await
    }

    /// Send an arbitrary command and collect its reply lines. Returns the
    /// informational lines and whether the reply ended in `OK`.
    pub async fn send_command_lines(&mut self, cmd: &str) -> Result<(Vec<String>, bool)> {
        self.reader.send_line(cmd).await?;
        self.reader.read_response_lines().await
    }

    /// Drop any bytes left over from earlier exchanges.
    pub async fn discard_input(&mut self) -> Result<()> {
        self.reader.discard_input().await
    }

    // -----------------------------------------------------------------
    // Module operations
    // -----------------------------------------------------------------

    /// Software reset.
    ///
    /// Tries `ATZ` up to five times. If the module never acknowledges, it
    /// is probably stuck in data mode: write the `+++` escape with a short
    /// settle on both sides and try `ATZ` five more times. After an
    /// acknowledged reset, wait for the reboot and discard whatever the
    /// module printed while booting.
    ///
    /// Returns `Ok(false)` only when all ten attempts failed.
    pub async fn reset(&mut self) -> Result<bool> {
        if self.try_reset_round().await? {
            return self.finish_reset().await;
        }

        warn!("module did not acknowledge ATZ, sending +++ escape");
        tokio::time::sleep(commands::ESCAPE_SETTLE).await;
        self.reader.send_line(commands::MODE_SWITCH).await?;
        tokio::time::sleep(commands::ESCAPE_SETTLE).await;

        if self.try_reset_round().await? {
            return self.finish_reset().await;
        }

        warn!(
            attempts = 2 * commands::RESET_ATTEMPTS,
            "reset failed, module not responding"
        );
        Ok(false)
    }

    async fn try_reset_round(&mut self) -> Result<bool> {
        for attempt in 1..=commands::RESET_ATTEMPTS {
            if self.reader.send_command_check_ok(commands::RESET).await? {
                return Ok(true);
            }
            debug!(attempt, "ATZ not acknowledged");
        }
        Ok(false)
    }

    async fn finish_reset(&mut self) -> Result<bool> {
        tokio::time::sleep(commands::REBOOT_SETTLE).await;
        self.reader.discard_input().await?;
        self.mode = Mode::Command;
        info!("module reset");
        Ok(true)
    }

    /// Factory reset.
    ///
    /// Repeats `AT+FACTORYRESET` until the module acknowledges it, waiting
    /// the reboot time after every attempt. There is no retry limit: on a
    /// module that keeps answering `ERROR` this never returns. Only a
    /// failing transport ends the loop early, with `Err`.
    pub async fn factory_reset(&mut self) -> Result<bool> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let ok = self
                .reader
                .send_command_check_ok(commands::FACTORY_RESET)
                .await?;
            tokio::time::sleep(commands::REBOOT_SETTLE).await;
            if ok {
                break;
            }
            debug!(attempt, "AT+FACTORYRESET not acknowledged, retrying");
        }

        self.reader.discard_input().await?;
        self.mode = Mode::Command;
        info!(attempts = attempt, "module factory reset");
        Ok(true)
    }

    /// Enable or disable echo of characters sent to the module.
    pub async fn echo(&mut self, enable: bool) -> Result<bool> {
        self.reader
            .send_command_check_ok(&commands::cmd_echo(enable))
            .await
    }

    /// `true` if a central is connected to the module.
    ///
    /// A module that does not answer reads as not connected.
    pub async fn is_connected(&mut self) -> Result<bool> {
        let (connected, _ok) = self
            .reader
            .send_command_with_int_reply(commands::GAP_GET_CONN)
            .await?;
        Ok(connected != 0)
    }

    /// Switch between command and data mode.
    ///
    /// The module toggles on `+++`, so nothing is sent if it is already in
    /// the requested mode.
    pub async fn set_mode(&mut self, mode: Mode) -> Result<bool> {
        if mode == self.mode {
            return Ok(true);
        }
        let ok = self
            .reader
            .send_command_check_ok(commands::MODE_SWITCH)
            .await?;
        if ok {
            debug!(from = %self.mode, to = %mode, "mode switched");
            self.mode = mode;
        }
        Ok(ok)
    }

    /// The lines of the `ATI` information dump, without the sentinel.
    ///
    /// Verbose logging is suspended for the exchange.
    pub async fn info_lines(&mut self) -> Result<Vec<String>> {
        let verbose = self.reader.verbose();
        self.reader.set_verbose(false);
        let result = self.read_info().await;
        self.reader.set_verbose(verbose);
        result
    }

    async fn read_info(&mut self) -> Result<Vec<String>> {
        self.reader.send_line(commands::INFO).await?;
        let (lines, _ok) = self.reader.read_response_lines().await?;
        Ok(lines)
    }

    /// Write the `ATI` dump to `out`, framed by ruler lines.
    ///
    /// The opening rule goes out before the command and each reply line is
    /// written as it arrives, so a dump cut short by a timeout or a link
    /// failure still shows what the module sent.
    pub async fn print_info<W: Write>(&mut self, out: &mut W) -> Result<()> {
        writeln!(out, "{INFO_RULE}")?;

        let verbose = self.reader.verbose();
        self.reader.set_verbose(false);
        let result = self.stream_info(out).await;
        self.reader.set_verbose(verbose);
        result?;

        writeln!(out, "{INFO_RULE}")?;
        Ok(())
    }

    async fn stream_info<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.reader.send_line(commands::INFO).await?;
        let timeout = self.reader.timeout();
        while self.reader.read_line(timeout).await? > 0 {
            let line = self.reader.line().as_bytes();
            if protocol::is_sentinel(line) {
                break;
            }
            out.write_all(line)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Close the underlying transport.
    pub async fn close(self) -> Result<Box<dyn Transport>> {
        let mut transport = self.reader.into_transport();
        transport.close().await?;
        Ok(transport)
    }

    /// Give back the transport without closing it.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.reader.into_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluefruit_core::error::Error;
    use bluefruit_test_harness::MockTransport;
    use tokio::time::Instant;

    fn make_test_module(mock: MockTransport) -> Bluefruit {
        Bluefruit::new(Box::new(mock), DriverConfig::default())
    }

    // -----------------------------------------------------------------------
    // reset
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn reset_first_try() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r\n", b"\r\nOK\r\n");
        let mut module = make_test_module(mock);

        let start = Instant::now();
        assert!(module.reset().await.unwrap());
        // Reboot settle, then a quiet drain.
        assert!(start.elapsed() >= commands::REBOOT_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_boot_banner() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r\n", b"OK\r\nAdafruit Bluefruit LE\r\n");
        let mut module = make_test_module(mock);

        assert!(module.reset().await.unwrap());
        assert_eq!(module.read_line(DEFAULT_TIMEOUT).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_retries_before_escape() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r\n", b"ERROR\r\n");
        mock.expect(b"ATZ\r\n", b"ERROR\r\n");
        mock.expect(b"ATZ\r\n", b"OK\r\n");
        let mut module = make_test_module(mock);

        assert!(module.reset().await.unwrap());
        let transport = module.into_transport();
        assert!(transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_uses_escape_after_five_failures() {
        let mut mock = MockTransport::new();
        for _ in 0..5 {
            mock.expect(b"ATZ\r\n", b"ERROR\r\n");
        }
        mock.expect(b"+++\r\n", b"");
        mock.expect(b"ATZ\r\n", b"OK\r\n");
        let config = DriverConfig {
            mode: Mode::Data,
            ..DriverConfig::default()
        };
        let mut module = Bluefruit::new(Box::new(mock), config);

        assert!(module.reset().await.unwrap());
        // A rebooted module always comes up in command mode.
        assert_eq!(module.mode(), Mode::Command);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_gives_up_after_ten_attempts() {
        let mut mock = MockTransport::new();
        for _ in 0..5 {
            mock.expect(b"ATZ\r\n", b"");
        }
        mock.expect(b"+++\r\n", b"");
        for _ in 0..5 {
            mock.expect(b"ATZ\r\n", b"ERROR\r\n");
        }
        let mut module = make_test_module(mock);

        let start = Instant::now();
        assert!(!module.reset().await.unwrap());
        // Five silent attempts time out, plus the escape settle.
        assert!(start.elapsed() >= 5 * DEFAULT_TIMEOUT + 2 * commands::ESCAPE_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_propagates_disconnect() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);
        let mut module = make_test_module(mock);

        assert!(matches!(module.reset().await, Err(Error::NotConnected)));
    }

    // -----------------------------------------------------------------------
    // factory_reset
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn factory_reset_retries_until_ok() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+FACTORYRESET\r\n", b"ERROR\r\n");
        mock.expect(b"AT+FACTORYRESET\r\n", b"");
        mock.expect(b"AT+FACTORYRESET\r\n", b"OK\r\n");
        let mut module = make_test_module(mock);

        let start = Instant::now();
        assert!(module.factory_reset().await.unwrap());
        // One reboot wait per attempt, successful or not.
        assert!(start.elapsed() >= 3 * commands::REBOOT_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn factory_reset_has_no_retry_cap() {
        let mut mock = MockTransport::new();
        for _ in 0..25 {
            mock.expect(b"AT+FACTORYRESET\r\n", b"ERROR\r\n");
        }
        mock.expect(b"AT+FACTORYRESET\r\n", b"OK\r\n");
        let mut module = make_test_module(mock);

        let start = Instant::now();
        assert!(module.factory_reset().await.unwrap());
        assert!(start.elapsed() >= 26 * commands::REBOOT_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn factory_reset_ends_on_transport_failure() {
        let mut module = make_test_module(MockTransport::new());
        assert!(matches!(
            module.factory_reset().await,
            Err(Error::Protocol(_))
        ));
    }

    // -----------------------------------------------------------------------
    // echo / connection / mode
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn echo_on_and_off() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATE=1\r\n", b"OK\r\n");
        mock.expect(b"ATE=0\r\n", b"ERROR\r\n");
        let mut module = make_test_module(mock);

        assert!(module.echo(true).await.unwrap());
        assert!(!module.echo(false).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn is_connected_parses_reply() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+GAPGETCONN\r\n", b"1\r\nOK\r\n");
        mock.expect(b"AT+GAPGETCONN\r\n", b"0\r\nOK\r\n");
        mock.expect(b"AT+GAPGETCONN\r\n", b"");
        let mut module = make_test_module(mock);

        assert!(module.is_connected().await.unwrap());
        assert!(!module.is_connected().await.unwrap());
        assert!(!module.is_connected().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn set_mode_toggles_only_on_change() {
        let mut mock = MockTransport::new();
        mock.expect(b"+++\r\n", b"OK\r\n");
        mock.expect(b"+++\r\n", b"ERROR\r\n");
        let mut module = make_test_module(mock);

        assert!(module.set_mode(Mode::Data).await.unwrap());
        assert_eq!(module.mode(), Mode::Data);

        // Already in data mode: nothing is sent.
        assert!(module.set_mode(Mode::Data).await.unwrap());

        assert!(!module.set_mode(Mode::Command).await.unwrap());
        assert_eq!(module.mode(), Mode::Data);
    }

    // -----------------------------------------------------------------------
    // info
    // -----------------------------------------------------------------------

    const ATI_REPLY: &[u8] = b"\r\nBLEFRIEND32\r\nnRF51822 QFACA10\r\n0.8.0\r\nOK\r\n";

    #[tokio::test(start_paused = true)]
    async fn info_lines_strip_sentinel() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATI\r\n", ATI_REPLY);
        let mut module = make_test_module(mock);

        let lines = module.info_lines().await.unwrap();
        assert_eq!(lines, vec!["BLEFRIEND32", "nRF51822 QFACA10", "0.8.0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn print_info_frames_output_and_restores_verbose() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATI\r\n", ATI_REPLY);
        let mut module = make_test_module(mock);
        module.set_verbose(true);

        let mut out = Vec::new();
        module.print_info(&mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "----------------\nBLEFRIEND32\nnRF51822 QFACA10\n0.8.0\n----------------\n"
        );
        assert!(module.verbose());
    }

    #[tokio::test(start_paused = true)]
    async fn print_info_writes_opening_rule_before_failure() {
        // No expectation queued: the ATI send is rejected.
        let mut module = make_test_module(MockTransport::new());
        module.set_verbose(true);

        let mut out = Vec::new();
        assert!(module.print_info(&mut out).await.is_err());
        assert_eq!(String::from_utf8(out).unwrap(), "----------------\n");
        assert!(module.verbose());
    }

    #[tokio::test(start_paused = true)]
    async fn print_info_streams_lines_before_idle_timeout() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATI\r\n", b"\r\nBLEFRIEND32\r\nnRF51822 QFACA10\r\n");
        let mut module = make_test_module(mock);

        let mut out = Vec::new();
        module.print_info(&mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "----------------\nBLEFRIEND32\nnRF51822 QFACA10\n----------------\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn info_restores_verbose_on_error() {
        let mut module = make_test_module(MockTransport::new());
        module.set_verbose(true);

        assert!(module.info_lines().await.is_err());
        assert!(module.verbose());
    }

    #[tokio::test(start_paused = true)]
    async fn send_command_lines_collects_reply() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+BLEGETADDR\r\n", b"E4:C6:C7:31:95:11\r\nOK\r\n");
        let mut module = make_test_module(mock);

        let (lines, ok) = module.send_command_lines("AT+BLEGETADDR").await.unwrap();
        assert!(ok);
        assert_eq!(lines, vec!["E4:C6:C7:31:95:11"]);
    }

    #[tokio::test(start_paused = true)]
    async fn config_snapshot_tracks_setters() {
        let mut module = make_test_module(MockTransport::new());
        module.set_verbose(true);
        module.set_timeout(Duration::from_millis(1000));

        let config = module.config();
        assert!(config.verbose);
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.mode, Mode::Command);
    }

    #[tokio::test(start_paused = true)]
    async fn close_disconnects_transport() {
        let module = make_test_module(MockTransport::new());
        let transport = module.close().await.unwrap();
        assert!(!transport.is_connected());
    }
}
