//! usb-devctl command line tool
//!
//! Sends resource-addressed control commands to a device over USB vendor
//! control transfers.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser, Subcommand};
use common::memory::build_memory_device;
use common::setup_logging;
use host::config::{BackendKind, HostConfig, parse_hex_id};
use host::{ControlPipe, ControlSession, LoopbackBackend, SessionConfig, UsbBackend};
use protocol::{CURRENT_VERSION, CommandCode, ResourceId};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "devctl")]
#[command(
    author,
    version,
    about = "Send resource-addressed control commands to a USB device"
)]
#[command(long_about = "
Issues control commands to the logical resources of a USB device. Each
command is a single vendor control transfer addressed by resource id.

EXAMPLES:
    # Query the device's control protocol version
    devctl --vid 0x20b1 --pid 0x0008 version

    # Read 4 bytes from resource 5 with command 0x02
    devctl read --resid 5 --cmd 0x02 --len 4

    # Write two bytes to resource 9 with command 0x01
    devctl write --resid 9 --cmd 0x01 \"de ad\"

    # Try commands against a simulated device
    devctl --loopback version

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usb-devctl/devctl.toml
    3. /etc/usb-devctl/devctl.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// USB vendor id (e.g. 0x20b1)
    #[arg(long, value_name = "HEX")]
    vid: Option<String>,

    /// USB product id (e.g. 0x0008)
    #[arg(long, value_name = "HEX")]
    pid: Option<String>,

    /// Interface number to claim
    #[arg(short, long, value_name = "N")]
    interface: Option<u8>,

    /// Per-transfer timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Use the in-process simulated device instead of libusb
    #[arg(long)]
    loopback: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected USB devices, or the simulated device with --loopback
    List,
    /// Query the control protocol version
    Version,
    /// Read a payload from a resource
    Read {
        /// Resource id
        #[arg(long, value_parser = parse_u8)]
        resid: u8,
        /// Command code (0x00-0x7f)
        #[arg(long, value_parser = parse_u8)]
        cmd: u8,
        /// Payload length in bytes
        #[arg(long)]
        len: usize,
    },
    /// Write a payload to a resource
    Write {
        /// Resource id
        #[arg(long, value_parser = parse_u8)]
        resid: u8,
        /// Command code (0x00-0x7f)
        #[arg(long, value_parser = parse_u8)]
        cmd: u8,
        /// Payload as hex bytes, e.g. "01 02 ff" or "0102ff"
        data: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = HostConfig::default();
        let path = HostConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let (mut config, source) = if let Some(ref path) = args.config {
        let (config, path) = HostConfig::load_with_source(Some(path.clone()))
            .context("Failed to load configuration")?;
        (config, Ok(path))
    } else {
        HostConfig::load_or_default()
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    setup_logging(&config.logging.level).context("Failed to setup logging")?;
    info!("usb-devctl v{}", env!("CARGO_PKG_VERSION"));
    match source {
        Ok(path) => info!("Loaded configuration from: {}", path.display()),
        Err(e) => debug!("Using default configuration: {:#}", e),
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    if let Command::List = command {
        return match config.transport.backend {
            BackendKind::Libusb => list_devices(),
            BackendKind::Loopback => {
                print!("{}", loopback_listing(&config)?);
                Ok(())
            }
        };
    }

    let session_config = config.session_config()?;
    match config.transport.backend {
        BackendKind::Libusb => run_libusb(&session_config, command),
        BackendKind::Loopback => {
            let (dispatcher, _memories) =
                build_memory_device(CURRENT_VERSION, &config.loopback.interfaces)
                    .context("Invalid loopback interface layout")?;
            let mut backend = LoopbackBackend::new(
                dispatcher,
                session_config.vendor_id,
                session_config.product_id,
            );
            run(&mut backend, &session_config, command)
        }
    }
}

fn apply_overrides(config: &mut HostConfig, args: &Args) {
    if let Some(ref vid) = args.vid {
        config.device.vendor_id = vid.clone();
    }
    if let Some(ref pid) = args.pid {
        config.device.product_id = pid.clone();
    }
    if let Some(interface) = args.interface {
        config.device.interface = interface;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.transport.timeout_ms = timeout_ms;
    }
    if args.loopback {
        config.transport.backend = BackendKind::Loopback;
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
}

#[cfg(feature = "libusb")]
fn run_libusb(session_config: &SessionConfig, command: Command) -> Result<()> {
    let mut backend = host::RusbBackend::new().context("Failed to initialise libusb")?;
    run(&mut backend, session_config, command)
}

#[cfg(not(feature = "libusb"))]
fn run_libusb(_session_config: &SessionConfig, _command: Command) -> Result<()> {
    bail!("devctl was built without the libusb backend; use --loopback")
}

#[cfg(feature = "libusb")]
fn list_devices() -> Result<()> {
    let backend = host::RusbBackend::new().context("Failed to initialise libusb")?;
    let devices = backend.list_devices()?;

    if devices.is_empty() {
        println!("No USB devices found");
        return Ok(());
    }

    println!("{:<11} {:>4} {:>8}", "VID:PID", "BUS", "ADDRESS");
    for device in devices {
        println!(
            "{:04x}:{:04x}   {:>4} {:>8}",
            device.vendor_id, device.product_id, device.bus_number, device.address
        );
    }
    Ok(())
}

#[cfg(not(feature = "libusb"))]
fn list_devices() -> Result<()> {
    bail!("devctl was built without the libusb backend; device listing is unavailable")
}

/// Describe the simulated device the loopback backend would open
fn loopback_listing(config: &HostConfig) -> Result<String> {
    let session_config = config.session_config()?;
    let (dispatcher, _memories) =
        build_memory_device(CURRENT_VERSION, &config.loopback.interfaces)
            .context("Invalid loopback interface layout")?;

    let mut out = format!(
        "{:04x}:{:04x}   loopback, control version {}\n",
        session_config.vendor_id,
        session_config.product_id,
        dispatcher.version()
    );
    for (ifnum, _) in (0u8..).zip(&config.loopback.interfaces) {
        let resources: Vec<String> = dispatcher
            .table()
            .resources_of(ifnum)
            .iter()
            .map(|r| r.to_string())
            .collect();
        out.push_str(&format!(
            "  interface {}: resources {}\n",
            ifnum,
            resources.join(", ")
        ));
    }
    Ok(out)
}

fn run<B: UsbBackend>(backend: &mut B, session_config: &SessionConfig, command: Command) -> Result<()> {
    let mut session = ControlSession::open(backend, session_config).with_context(|| {
        format!(
            "Failed to open device {:04x}:{:04x}",
            session_config.vendor_id, session_config.product_id
        )
    })?;

    let result = execute(&mut session, command);

    if let Err(e) = session.close() {
        warn!("Error closing session: {}", e);
    }
    result
}

fn execute<P: ControlPipe>(session: &mut ControlSession<P>, command: Command) -> Result<()> {
    match command {
        Command::List => bail!("device listing does not use a session"),
        Command::Version => {
            let version = session.query_version().context("Version query failed")?;
            println!("Control version: {} ({:#04x})", version, version.0);
            if !version.is_compatible_with(&CURRENT_VERSION) {
                warn!(
                    "Device control version {} is not compatible with {}",
                    version, CURRENT_VERSION
                );
            }
        }
        Command::Read { resid, cmd, len } => {
            let code = CommandCode::new(cmd)?;
            let payload = session
                .read_command_vec(ResourceId(resid), code, len)
                .context("Read command failed")?;
            println!("{}", format_hex(&payload));
        }
        Command::Write { resid, cmd, data } => {
            let code = CommandCode::new(cmd)?;
            let payload = parse_hex_bytes(&data)?;
            session
                .write_command(ResourceId(resid), code, &payload)
                .context("Write command failed")?;
            println!("Wrote {} bytes", payload.len());
        }
    }
    Ok(())
}

/// Accept decimal or 0x-prefixed hex
fn parse_u8(s: &str) -> Result<u8> {
    if s.starts_with("0x") || s.starts_with("0X") {
        let value = parse_hex_id(s, "value")?;
        u8::try_from(value).map_err(|_| anyhow!("'{}' does not fit in a byte", s))
    } else {
        s.parse::<u8>()
            .map_err(|e| anyhow!("Invalid number '{}': {}", s, e))
    }
}

fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);

    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        bail!("Invalid hex digit '{}' in payload", bad);
    }
    if digits.len() % 2 != 0 {
        bail!("Hex payload has an odd number of digits");
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair)?;
            u8::from_str_radix(pair, 16).map_err(|_| anyhow!("Invalid hex byte '{}'", pair))
        })
        .collect()
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
