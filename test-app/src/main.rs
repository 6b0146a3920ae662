// bluefruit test application -- CLI tool for exercising a Bluefruit LE
// module over a serial port, or a scripted mock transport.
//
// Usage:
//   bluefruit-test-app --port /dev/ttyUSB0 info
//   bluefruit-test-app --port /dev/ttyUSB0 --verbose reset
//   bluefruit-test-app --port /dev/ttyUSB0 echo off
//   bluefruit-test-app --port /dev/ttyUSB0 raw AT+BLEGETADDR
//   bluefruit-test-app --mock connected

use std::io;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use bluefruit::commands;
use bluefruit::{Bluefruit, BluefruitBuilder, Mode};
use bluefruit_test_harness::MockTransport;
use bluefruit_transport::FlowControl;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// bluefruit test application -- drives a Bluefruit LE module from the
/// command line.
#[derive(Parser)]
#[command(name = "bluefruit-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate (the module ships at 9600).
    #[arg(long, default_value_t = bluefruit_transport::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Use CTS/RTS hardware flow control.
    #[arg(long)]
    hw_flow: bool,

    /// Per-line read timeout in milliseconds.
    #[arg(long, default_value_t = 250)]
    timeout_ms: u64,

    /// Log every command and reply line.
    #[arg(long, short)]
    verbose: bool,

    /// Use a scripted mock transport instead of a real serial port.
    /// Useful for verifying CLI parsing and builder wiring without hardware.
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the module's ATI information dump.
    Info,

    /// Software reset (ATZ, with +++ escape fallback).
    Reset,

    /// Factory reset. Retries until the module acknowledges.
    FactoryReset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Enable or disable command echo.
    Echo {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Report whether a central is connected.
    Connected,

    /// Switch between command and data mode.
    Mode {
        /// Target mode: command (alias cmd) or data.
        mode: Mode,
    },

    /// Send an arbitrary AT command and print the reply lines.
    Raw {
        /// The command line, e.g. AT+BLEGETADDR.
        command: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Toggle {
    On,
    Off,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Prompt the user for y/N confirmation. Returns true only if "y" or "Y" entered.
fn confirm(prompt: &str) -> bool {
    use std::io::Write;

    print!("{prompt}");
    io::stdout().flush().ok();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y")
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// A mock transport scripted with the replies a healthy module would give
/// for `command`.
fn scripted_mock(command: &Command) -> MockTransport {
    let mut mock = MockTransport::new();
    match command {
        Command::Info => mock.expect(
            b"ATI\r\n",
            b"\r\nBLEFRIEND32\r\nnRF51822 QFACA10\r\n0.8.1\r\nOK\r\n",
        ),
        Command::Reset => mock.expect(b"ATZ\r\n", b"\r\nOK\r\n"),
        Command::FactoryReset { .. } => mock.expect(b"AT+FACTORYRESET\r\n", b"\r\nOK\r\n"),
        Command::Echo { state } => {
            let cmd = commands::cmd_echo(matches!(state, Toggle::On));
            mock.expect(format!("{cmd}\r\n").as_bytes(), b"\r\nOK\r\n");
        }
        Command::Connected => mock.expect(b"AT+GAPGETCONN\r\n", b"\r\n0\r\nOK\r\n"),
        Command::Mode { .. } => mock.expect(b"+++\r\n", b"\r\nOK\r\n"),
        Command::Raw { command } => {
            mock.expect(format!("{command}\r\n").as_bytes(), b"\r\nOK\r\n");
        }
    }
    mock
}

async fn create_module(cli: &Cli) -> Result<Bluefruit> {
    if cli.timeout_ms == 0 {
        bail!("--timeout-ms must be greater than zero");
    }

    let flow = if cli.hw_flow {
        FlowControl::Hardware
    } else {
        FlowControl::None
    };
    let mut builder = BluefruitBuilder::new()
        .baud_rate(cli.baud)
        .flow_control(flow)
        .timeout(Duration::from_millis(cli.timeout_ms))
        .verbose(cli.verbose);

    // The module's mode cannot be queried. `mode <target>` assumes the
    // module is in the other mode and toggles once.
    if let Command::Mode { mode } = &cli.command {
        builder = builder.initial_mode(match mode {
            Mode::Command => Mode::Data,
            Mode::Data => Mode::Command,
        });
    }

    if cli.mock {
        let module = builder
            .build_with_transport(Box::new(scripted_mock(&cli.command)))
            .await
            .context("failed to build driver with mock transport")?;
        println!("Connected (mock transport)");
        return Ok(module);
    }

    let port = cli
        .port
        .as_deref()
        .context("--port is required when not using --mock")?;
    let module = builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("failed to open {port} at {} baud", cli.baud))?;
    println!("Connected -- {port} @ {} baud", cli.baud);
    Ok(module)
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_info(module: &mut Bluefruit) -> Result<()> {
    module
        .print_info(&mut io::stdout())
        .await
        .context("ATI failed")
}

async fn cmd_reset(module: &mut Bluefruit) -> Result<()> {
    if !module.reset().await.context("reset failed")? {
        bail!("module did not acknowledge ATZ after 10 attempts");
    }
    println!("Reset OK");
    Ok(())
}

async fn cmd_factory_reset(module: &mut Bluefruit, yes: bool) -> Result<()> {
    if !yes && !confirm("Erase all user settings and bonds? [y/N] ") {
        println!("Aborted.");
        return Ok(());
    }
    module.factory_reset().await.context("factory reset failed")?;
    println!("Factory reset OK");
    Ok(())
}

async fn cmd_echo(module: &mut Bluefruit, state: Toggle) -> Result<()> {
    let enable = matches!(state, Toggle::On);
    if !module.echo(enable).await.context("ATE failed")? {
        bail!("module rejected echo change");
    }
    println!("Echo {}", if enable { "on" } else { "off" });
    Ok(())
}

async fn cmd_connected(module: &mut Bluefruit) -> Result<()> {
    let connected = module.is_connected().await.context("AT+GAPGETCONN failed")?;
    println!("{}", if connected { "Connected" } else { "Not connected" });
    Ok(())
}

async fn cmd_mode(module: &mut Bluefruit, mode: Mode) -> Result<()> {
    if !module.set_mode(mode).await.context("+++ failed")? {
        bail!("module rejected mode switch");
    }
    println!("Mode: {}", module.mode());
    Ok(())
}

async fn cmd_raw(module: &mut Bluefruit, command: &str) -> Result<()> {
    let (lines, ok) = module
        .send_command_lines(command)
        .await
        .with_context(|| format!("{command} failed"))?;
    for line in &lines {
        println!("{line}");
    }
    println!("{}", if ok { "OK" } else { "ERROR" });
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut module = create_module(&cli).await?;

    let result = match &cli.command {
        Command::Info => cmd_info(&mut module).await,
        Command::Reset => cmd_reset(&mut module).await,
        Command::FactoryReset { yes } => cmd_factory_reset(&mut module, *yes).await,
        Command::Echo { state } => cmd_echo(&mut module, *state).await,
        Command::Connected => cmd_connected(&mut module).await,
        Command::Mode { mode } => cmd_mode(&mut module, *mode).await,
        Command::Raw { command } => cmd_raw(&mut module, command).await,
    };

    module.close().await.ok();
    result
}
