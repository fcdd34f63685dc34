//! Pirit receipt design uploader
//!
//! Resolves the terminal port from ComProxy.ini (or `--port`), then runs the upload
//! session: liveness check, status flags, organization name check, design upload
//! and an optional logo upload.
//!
//! Exit codes: 0 success, 1 unexpected error, 2 no connection, 3 response timeout,
//! 4 terminal error code, 5 upload rejected, 6 upload failed, 7 malformed response,
//! 8 serial/I/O error, 9 configuration or input file error.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use pirit_core::config::{
    self, ConfigError, ProtocolConfig, DEFAULT_COMPROXY_PATH, DEFAULT_DESIGN_PATH,
};
use pirit_core::demo::SimulatedTerminal;
use pirit_core::protocol::{
    list_ports, LineSettings, ProtocolError, SerialTransport, Session, SessionReport, Transport,
};

/// Upload a receipt design to a Pirit fiscal terminal.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial port; skips the ComProxy lookup.
    #[arg(short, long)]
    port: Option<String>,

    /// ComProxy configuration file naming the physical port.
    #[arg(long, default_value = DEFAULT_COMPROXY_PATH)]
    comproxy: PathBuf,

    /// Receipt design file.
    #[arg(short, long, default_value = DEFAULT_DESIGN_PATH)]
    design: PathBuf,

    /// Logo bitmap to load after the design.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Protocol settings JSON (password, timeouts).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Verify start/end bytes and checksums of terminal responses.
    #[arg(long)]
    verify_frames: bool,

    /// Talk to a simulated terminal instead of a serial port.
    #[arg(long)]
    simulate: bool,

    /// List available serial ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<ProtocolError>() {
        e.exit_code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        9
    } else {
        1
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.list_ports {
        for port in list_ports() {
            match &port.product {
                Some(product) => println!("{} ({})", port.name, product),
                None => println!("{}", port.name),
            }
        }
        return Ok(());
    }

    let mut settings = match &cli.settings {
        Some(path) => ProtocolConfig::load(path)?,
        None => ProtocolConfig::default(),
    };
    if cli.verify_frames {
        settings.verify_frames = true;
    }

    let design = config::load_payload(&cli.design)?;
    let logo = cli.logo.as_deref().map(config::load_payload).transpose()?;
    info!("Design {} ({} bytes)", cli.design.display(), design.len());

    let report = if cli.simulate {
        info!("Using simulated terminal");
        upload(SimulatedTerminal::new(), settings, &design, logo.as_deref())?
    } else {
        for port in list_ports() {
            debug!("Available port: {}", port.name);
        }
        let port_name = match cli.port {
            Some(port) => port,
            None => config::resolve_port(&cli.comproxy)?,
        };
        info!("Opening port {}...", port_name);
        let transport = SerialTransport::open(&port_name, &LineSettings::default())
            .with_context(|| format!("Failed to open {}", port_name))?;
        info!("Port {} open", transport.name());
        upload(transport, settings, &design, logo.as_deref())?
    };

    print_report(&report);
    Ok(())
}

/// The transport is dropped (and the port closed) on every return path
fn upload<T: Transport>(
    transport: T,
    settings: ProtocolConfig,
    design: &[u8],
    logo: Option<&[u8]>,
) -> Result<SessionReport, ProtocolError> {
    let mut session = Session::new(transport, settings);
    let report = session.run(design, logo)?;
    drop(session.into_transport());
    info!("Port closed");
    Ok(report)
}

fn print_report(report: &SessionReport) {
    info!("Shift open: {}", report.shift_open);
    info!("Organization name: {:?}", report.organization_name);
    if !report.name_is_centered {
        info!("Organization name needs manual re-registration");
    }
    info!("Design loaded ({} bytes)", report.design_len);
    if let Some(len) = report.logo_len {
        info!("Logo loaded ({} bytes)", len);
    }
    info!("Receipt design upload completed successfully");
}
