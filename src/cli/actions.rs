use anyhow::Result;
use clap::ArgMatches;
use std::process::ExitCode;

use super::{config::GatewayConfig, console};
use crate::{
    core::{
        display::DisplaySink,
        link,
        session::Session,
    },
    protocol::tty::{available_ports_sorted, PortSummary},
};

/// Dispatch on parsed arguments.
pub fn run(matches: &ArgMatches) -> Result<ExitCode> {
    if matches.get_flag("list-ports") {
        list_ports(matches.get_flag("json"))?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = GatewayConfig::from_matches(matches)?;
    run_gateway(&config)
}

/// Print available ports, one per line or as a JSON array.
pub fn list_ports(json: bool) -> Result<()> {
    let ports: Vec<PortSummary> = available_ports_sorted().iter().map(PortSummary::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in &ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{} ({} {:04x}:{:04x}{})",
                port.port_name,
                port.port_type,
                vid,
                pid,
                port.product.as_deref().map(|p| format!(" {p}")).unwrap_or_default()
            ),
            _ => println!("{} ({})", port.port_name, port.port_type),
        }
    }
    Ok(())
}

/// Run one interactive session on the configured port.
///
/// Link problems are shown on the console by the session itself; they only
/// change the exit code here.
pub fn run_gateway(config: &GatewayConfig) -> Result<ExitCode> {
    let serial = config.serial_config();
    log::info!("Starting gateway on {}", serial.describe());

    let sink = DisplaySink::spawn(std::io::stdout(), config.display_style())?;
    let session = Session::new(sink.handle());
    let input = console::stdin_lines()?;

    let outcome = session.run(|| link::open(&serial), input);
    sink.shutdown()?;

    let code = match outcome {
        Ok(report) if report.is_clean() => {
            log::info!("Session ended: {:?}", report.exit);
            ExitCode::SUCCESS
        }
        Ok(report) => {
            if let Some(fault) = &report.fault {
                log::error!("Session ended on {:?}: {fault:#}", report.exit);
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("Session did not start: {err:#}");
            ExitCode::FAILURE
        }
    };
    Ok(code)
}
