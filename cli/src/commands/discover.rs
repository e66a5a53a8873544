use sonos_gateway::{DeviceRecord, DeviceRegistry, Discovery};

use crate::commands::{discovery_config, CommandResult};

/// Run one discovery pass and list what answered
pub fn run(window_secs: u64) -> CommandResult {
    let registry = DeviceRegistry::new();
    registry.refresh(&Discovery::new(discovery_config(window_secs))?)?;

    Ok(format_devices(&registry.list()))
}

pub fn format_devices(devices: &[DeviceRecord]) -> String {
    if devices.is_empty() {
        return "(none found)".to_string();
    }

    devices
        .iter()
        .map(|device| format!("- {} (id: {})", device.display_name, device.id))
        .collect::<Vec<_>>()
        .join("\n")
}
