use std::time::Duration;

use sonos_gateway::DiscoveryConfig;

pub mod discover;
pub mod emulate;
pub mod error;
pub mod play;

pub use error::*;

/// Default discovery settings with the response window from the command line.
///
/// Needs no local address, so discovery works without a default route.
pub fn discovery_config(window_secs: u64) -> DiscoveryConfig {
    DiscoveryConfig {
        window: Duration::from_secs(window_secs),
        ..DiscoveryConfig::default()
    }
}
