use super::soap::{SoapClient, SoapRequest, AV_TRANSPORT_CONTROL_PATH};
use crate::config::ControlConfig;
use crate::error::Result;
use crate::models::DeviceRecord;
use std::time::Duration;

/// Something that can make a renderer play a media URL
pub trait PlaybackControl: Send + Sync {
    fn play_announcement(&self, device: &DeviceRecord, media_url: &str) -> Result<()>;
}

/// Drives the AVTransport service: SetAVTransportURI, a settle delay, then Play
pub struct ControlClient {
    soap: SoapClient,
    settle_delay: Duration,
}

impl ControlClient {
    pub fn new(config: &ControlConfig) -> Result<Self> {
        Ok(Self {
            soap: SoapClient::new(config.request_timeout)?,
            settle_delay: config.settle_delay,
        })
    }

    pub fn set_av_transport_uri(&self, device: &DeviceRecord, media_url: &str) -> Result<()> {
        let request = SoapRequest::av_transport(
            "SetAVTransportURI",
            &[
                ("InstanceID", "0"),
                ("CurrentURI", media_url),
                ("CurrentURIMetaData", ""),
            ],
        );
        self.soap
            .call(&device.control_base_url, AV_TRANSPORT_CONTROL_PATH, &request)?;
        Ok(())
    }

    pub fn play(&self, device: &DeviceRecord) -> Result<()> {
        let request = SoapRequest::av_transport("Play", &[("InstanceID", "0"), ("Speed", "1")]);
        self.soap
            .call(&device.control_base_url, AV_TRANSPORT_CONTROL_PATH, &request)?;
        Ok(())
    }
}

impl PlaybackControl for ControlClient {
    /// Play is only sent once SetAVTransportURI succeeded. Neither step is retried.
    fn play_announcement(&self, device: &DeviceRecord, media_url: &str) -> Result<()> {
        log::debug!("[{}] SetAVTransportURI {}", device.display_name, media_url);
        self.set_av_transport_uri(device, media_url)?;

        std::thread::sleep(self.settle_delay);

        log::debug!("[{}] Play", device.display_name);
        self.play(device)
    }
}
