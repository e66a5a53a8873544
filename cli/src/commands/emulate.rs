use std::net::IpAddr;
use std::time::Duration;

use sonos_gateway::util::net::local_ip;
use sonos_gateway::{Emulator, EmulatorConfig, GatewayError, VerifyMode};

use crate::commands::{CommandError, CommandResult};

const SUPERVISE_INTERVAL: Duration = Duration::from_millis(500);

/// Run virtual speakers until Ctrl-C or until the emulator stops on its own
pub fn run(speakers: &str, port: u16, verify: VerifyMode, advertise_ip: Option<IpAddr>) -> CommandResult {
    let advertise_ip = match advertise_ip {
        Some(ip) => ip,
        None => local_ip().map_err(|e| {
            GatewayError::EmulatorError(format!("Failed to detect local IP: {}", e))
        })?,
    };

    let config = EmulatorConfig {
        speakers: EmulatorConfig::parse_speakers(speakers),
        base_port: port,
        advertise_ip,
        verify,
        ..EmulatorConfig::default()
    };
    let mut emulator = Emulator::start(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CommandError::Runtime(e.to_string()))?;

    let interrupted = runtime.block_on(async {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => signal.map(|_| true),
            _ = supervise(&emulator) => Ok(false),
        }
    });

    match interrupted {
        Ok(true) => log::info!("Interrupted, shutting down"),
        Ok(false) => log::error!("Emulator stopped unexpectedly"),
        Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
    }

    emulator.shutdown()?;
    Ok("Emulator stopped".to_string())
}

async fn supervise(emulator: &Emulator) {
    while emulator.is_running() {
        tokio::time::sleep(SUPERVISE_INTERVAL).await;
    }
}
