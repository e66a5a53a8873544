use super::device::parse_descriptor;
use super::ssdp::SsdpClient;
use crate::config::DiscoveryConfig;
use crate::error::{GatewayError, Result};
use crate::models::{DeviceRecord, SpeakerId};
use std::collections::HashMap;
use std::time::Duration;

/// Source of device description documents
pub trait DescriptorFetcher: Send + Sync {
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Fetches descriptors over HTTP with a per-request timeout
pub struct HttpDescriptorFetcher {
    client: reqwest::blocking::Client,
}

impl HttpDescriptorFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GatewayError::CommunicationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl DescriptorFetcher for HttpDescriptorFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(location)
            .send()
            .map_err(|e| GatewayError::CommunicationError(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::CommunicationError(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        let body = response.bytes().map_err(|e| {
            GatewayError::CommunicationError(format!("Failed to read response body: {}", e))
        })?;

        Ok(body.to_vec())
    }
}

/// One-shot discovery of ZonePlayer renderers on the local network
pub struct Discovery {
    config: DiscoveryConfig,
    fetcher: Box<dyn DescriptorFetcher>,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        let fetcher = HttpDescriptorFetcher::new(config.fetch_timeout)?;
        Ok(Self::with_fetcher(config, Box::new(fetcher)))
    }

    pub fn with_fetcher(config: DiscoveryConfig, fetcher: Box<dyn DescriptorFetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run a full discovery pass and return the replacement registry contents.
    ///
    /// Only socket setup and sending the search are fatal. Devices whose
    /// descriptor cannot be fetched or parsed are skipped.
    pub fn discover(&self) -> Result<HashMap<SpeakerId, DeviceRecord>> {
        let client = SsdpClient::new(self.config.window).map_err(|e| {
            GatewayError::DiscoveryFailed(format!("Failed to create SSDP client: {}", e))
        })?;

        let locations = client
            .search(self.config.search_addr, &self.config.search_target, self.config.mx)
            .map_err(|e| GatewayError::DiscoveryFailed(format!("SSDP search failed: {}", e)))?;

        log::debug!("SSDP search found {} unique locations", locations.len());

        let devices = self.resolve(&locations);
        log::info!("Discovery pass found {} speakers", devices.len());
        Ok(devices)
    }

    /// Fetch and parse each location once. Later records win on id collisions.
    pub fn resolve(&self, locations: &[String]) -> HashMap<SpeakerId, DeviceRecord> {
        let mut devices = HashMap::new();

        for location in locations {
            match self.fetch_device_info(location) {
                Ok(Some(record)) => {
                    if let Some(previous) = devices.insert(record.id.clone(), record) {
                        log::warn!(
                            "Speaker id {} collides with {:?}; keeping the later one",
                            previous.id,
                            previous.display_name
                        );
                    }
                }
                Ok(None) => log::debug!("Skipping {}: no usable name", location),
                Err(e) => log::warn!("Skipping {}: {}", location, e),
            }
        }

        devices
    }

    fn fetch_device_info(&self, location: &str) -> Result<Option<DeviceRecord>> {
        let body = self.fetcher.fetch(location)?;
        parse_descriptor(&body, location)
    }
}

/// Convenience function for a discovery pass with default settings
pub fn discover_speakers() -> Result<HashMap<SpeakerId, DeviceRecord>> {
    Discovery::new(DiscoveryConfig::default())?.discover()
}

/// Convenience function for a discovery pass with a custom response window
pub fn discover_speakers_with_timeout(window: Duration) -> Result<HashMap<SpeakerId, DeviceRecord>> {
    let config = DiscoveryConfig {
        window,
        ..DiscoveryConfig::default()
    };
    Discovery::new(config)?.discover()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Serves canned documents and records every fetch
    struct CannedFetcher {
        documents: HashMap<String, String>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    impl DescriptorFetcher for CannedFetcher {
        fn fetch(&self, location: &str) -> Result<Vec<u8>> {
            self.fetched.lock().unwrap().push(location.to_string());
            self.documents
                .get(location)
                .map(|doc| doc.clone().into_bytes())
                .ok_or_else(|| GatewayError::CommunicationError("connection refused".to_string()))
        }
    }

    fn room(name: &str) -> String {
        format!(
            "<root><device><roomName>{}</roomName></device></root>",
            name
        )
    }

    fn discovery_with(documents: &[(&str, String)]) -> (Discovery, Arc<Mutex<Vec<String>>>) {
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let fetcher = CannedFetcher {
            documents: documents
                .iter()
                .map(|(loc, doc)| (loc.to_string(), doc.clone()))
                .collect(),
            fetched: Arc::clone(&fetched),
        };
        let discovery = Discovery::with_fetcher(DiscoveryConfig::default(), Box::new(fetcher));
        (discovery, fetched)
    }

    #[test]
    fn test_resolve_builds_registry_map() {
        let (discovery, _) = discovery_with(&[
            ("http://192.168.1.10:1400/xml/device_description.xml", room("Living Room")),
            ("http://192.168.1.11:1400/xml/device_description.xml", room("Kitchen")),
        ]);

        let devices = discovery.resolve(&[
            "http://192.168.1.10:1400/xml/device_description.xml".to_string(),
            "http://192.168.1.11:1400/xml/device_description.xml".to_string(),
        ]);

        assert_eq!(devices.len(), 2);
        let living_room = &devices[&SpeakerId::from_display_name("Living Room")];
        assert_eq!(living_room.control_base_url, "http://192.168.1.10:1400");
        for (id, record) in &devices {
            assert_eq!(id, &record.id);
        }
    }

    #[test]
    fn test_resolve_skips_failures() {
        let (discovery, fetched) = discovery_with(&[
            ("http://10.0.0.1:1400/a.xml", room("Office")),
            ("http://10.0.0.2:1400/a.xml", "<<garbage".to_string()),
            ("http://10.0.0.3:1400/a.xml", room("")),
        ]);

        let devices = discovery.resolve(&[
            "http://10.0.0.1:1400/a.xml".to_string(),
            "http://10.0.0.2:1400/a.xml".to_string(),
            "http://10.0.0.3:1400/a.xml".to_string(),
            "http://10.0.0.4:1400/a.xml".to_string(),
        ]);

        assert_eq!(devices.len(), 1);
        assert!(devices.contains_key(&SpeakerId::from_display_name("Office")));
        assert_eq!(fetched.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_resolve_collision_last_wins() {
        let (discovery, _) = discovery_with(&[
            ("http://10.0.0.1:1400/a.xml", room("Living Room")),
            ("http://10.0.0.2:1400/a.xml", room("LivingRoom")),
        ]);

        let devices = discovery.resolve(&[
            "http://10.0.0.1:1400/a.xml".to_string(),
            "http://10.0.0.2:1400/a.xml".to_string(),
        ]);

        assert_eq!(devices.len(), 1);
        let record = &devices[&SpeakerId::from_display_name("livingroom")];
        assert_eq!(record.display_name, "LivingRoom");
        assert_eq!(record.control_base_url, "http://10.0.0.2:1400");
    }

    #[test]
    fn test_fetch_device_info_unreachable_host() {
        let discovery = Discovery::new(DiscoveryConfig {
            fetch_timeout: Duration::from_millis(100),
            ..DiscoveryConfig::default()
        })
        .unwrap();

        // TEST-NET-1 is never routed
        let result = discovery.fetch_device_info("http://192.0.2.1:1400/xml/device_description.xml");
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_device_info_invalid_url() {
        let discovery = Discovery::new(DiscoveryConfig::default()).unwrap();
        assert!(discovery.fetch_device_info("invalid-url").is_err());
    }
}
