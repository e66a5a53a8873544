use crate::error::{GatewayError, Result};
use crate::transport::ssdp::{SSDP_MULTICAST_ADDR, SSDP_PORT, ZONE_PLAYER_SEARCH_TARGET};
use crate::util::net::local_ip;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Settings for one discovery pass
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Where the M-SEARCH is sent; the multicast group unless testing
    pub search_addr: SocketAddr,
    pub search_target: String,
    /// Hard deadline for collecting responses, not an idle timeout
    pub window: Duration,
    pub fetch_timeout: Duration,
    pub mx: u8,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_addr: SocketAddr::from((SSDP_MULTICAST_ADDR, SSDP_PORT)),
            search_target: ZONE_PLAYER_SEARCH_TARGET.to_string(),
            window: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(3),
            mx: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub request_timeout: Duration,
    /// Pause between SetAVTransportURI and Play so the device can buffer
    pub settle_delay: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(300),
        }
    }
}

/// Controller-side settings, passed explicitly to the components that need them
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub local_ip: IpAddr,
    /// Port of the file server that exposes generated audio
    pub media_port: u16,
    pub discovery: DiscoveryConfig,
    pub control: ControlConfig,
}

impl GatewayConfig {
    pub fn new(local_ip: IpAddr) -> Self {
        Self {
            local_ip,
            media_port: 8080,
            discovery: DiscoveryConfig::default(),
            control: ControlConfig::default(),
        }
    }

    /// Defaults with the local address taken from `LOCAL_IP` or detected
    pub fn from_env() -> Result<Self> {
        let ip = local_ip()
            .map_err(|e| GatewayError::DiscoveryFailed(format!("Failed to detect local IP: {}", e)))?;
        Ok(Self::new(ip))
    }

    pub fn media_base_url(&self) -> String {
        format!("http://{}:{}", self.local_ip, self.media_port)
    }
}

/// What an emulated speaker does with the media URL when told to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    #[default]
    Off,
    /// HEAD request, logs status and content type
    Head,
    /// Full download, logs size and content type
    Fetch,
}

impl std::str::FromStr for VerifyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(VerifyMode::Off),
            "head" => Ok(VerifyMode::Head),
            "fetch" | "get" => Ok(VerifyMode::Fetch),
            other => Err(format!("unknown verify mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    pub speakers: Vec<String>,
    /// First speaker's HTTP port, the rest follow sequentially. 0 picks ephemeral ports.
    pub base_port: u16,
    /// Address written into advertised LOCATION headers
    pub advertise_ip: IpAddr,
    pub ssdp_listen: SocketAddr,
    pub join_multicast: bool,
    pub verify: VerifyMode,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            speakers: vec!["Living Room".to_string(), "Kitchen".to_string()],
            base_port: 1400,
            advertise_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ssdp_listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, SSDP_PORT)),
            join_multicast: true,
            verify: VerifyMode::Off,
        }
    }
}

impl EmulatorConfig {
    /// Split a comma-separated speaker list, trimming and dropping empty names
    pub fn parse_speakers(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Loopback-only layout: ephemeral ports, no multicast membership
    pub fn loopback(speakers: &[&str]) -> Self {
        Self {
            speakers: speakers.iter().map(|s| s.to_string()).collect(),
            base_port: 0,
            advertise_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ssdp_listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            join_multicast: false,
            verify: VerifyMode::Off,
        }
    }

    pub(crate) fn port_for(&self, index: usize) -> Result<u16> {
        if self.base_port == 0 {
            return Ok(0);
        }
        u16::try_from(index)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or_else(|| {
                GatewayError::EmulatorError(format!(
                    "Port range starting at {} cannot fit {} speakers",
                    self.base_port,
                    self.speakers.len()
                ))
            })
    }
}
