use std::sync::Arc;

use sonos_gateway::{Announcer, ControlClient, ControlConfig, DeviceRegistry, Discovery};

use crate::commands::{discovery_config, CommandError, CommandResult};

/// Discover speakers, then play `url` on `target`
pub fn run(target: &str, url: &str, window_secs: u64) -> CommandResult {
    let registry = DeviceRegistry::new();
    let found = registry.refresh(&Discovery::new(discovery_config(window_secs))?)?;
    if found == 0 {
        return Err(CommandError::NoDevices);
    }

    let control = ControlClient::new(&ControlConfig::default())?;
    // The URL is already reachable, so no media base is needed
    let announcer = Announcer::new(registry, Arc::new(control), String::new());
    announcer.play_url(target, url)?;

    Ok(format!("Playing {} on {}", url, target))
}
