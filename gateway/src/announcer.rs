use crate::error::{GatewayError, Result};
use crate::models::{DeviceSummary, SpeakerId};
use crate::registry::DeviceRegistry;
use crate::transport::control::PlaybackControl;
use crate::util::http::media_url;
use std::path::PathBuf;
use std::sync::Arc;

/// Target that addresses every registered speaker
pub const ALL_TARGET: &str = "all";

/// Turns announcement text into an audio file below the served media root
pub trait AudioProducer: Send + Sync {
    /// Path of the produced file, relative to the directory the media server exposes
    fn produce_audio(&self, text: &str) -> Result<PathBuf>;
}

/// Entry point for front ends: list speakers and announce text on them
pub struct Announcer {
    registry: DeviceRegistry,
    control: Arc<dyn PlaybackControl>,
    audio: Option<Arc<dyn AudioProducer>>,
    media_base_url: String,
}

impl Announcer {
    pub fn new(
        registry: DeviceRegistry,
        control: Arc<dyn PlaybackControl>,
        media_base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            control,
            audio: None,
            media_base_url: media_base_url.into(),
        }
    }

    /// Attach the producer `announce` renders text with
    pub fn with_audio(mut self, audio: Arc<dyn AudioProducer>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        self.registry.list().iter().map(|d| d.summary()).collect()
    }

    /// Produce audio for `text` and play it on `target` (`""`/`"all"` for every speaker)
    pub fn announce(&self, text: &str, target: &str) -> Result<()> {
        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| GatewayError::AudioFailed("No audio producer configured".to_string()))?;
        let path = audio.produce_audio(text)?;
        let url = media_url(&self.media_base_url, &path);
        log::info!("Announcement {:?} -> {} ({})", text, display_target(target), url);
        self.play_url(target, &url)
    }

    /// Play an already reachable media URL on `target`.
    ///
    /// A fan-out attempts every speaker even after failures and returns the
    /// last failure. A single target that is not registered is `DeviceNotFound`.
    pub fn play_url(&self, target: &str, media_url: &str) -> Result<()> {
        let target = target.trim();
        if target.is_empty() || target.eq_ignore_ascii_case(ALL_TARGET) {
            return self.fan_out(media_url);
        }

        let id = SpeakerId::from_display_name(target);
        let device = self
            .registry
            .lookup(&id)
            .ok_or_else(|| GatewayError::DeviceNotFound(target.to_string()))?;
        self.control.play_announcement(&device, media_url)
    }

    fn fan_out(&self, media_url: &str) -> Result<()> {
        let devices = self.registry.snapshot();
        if devices.is_empty() {
            log::warn!("No speakers registered, announcement not played");
            return Ok(());
        }

        let mut last_error = None;
        for device in devices.values() {
            if let Err(e) = self.control.play_announcement(device, media_url) {
                log::error!("Error playing on {}: {}", device.display_name, e);
                last_error = Some(e);
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn display_target(target: &str) -> &str {
    if target.trim().is_empty() {
        ALL_TARGET
    } else {
        target
    }
}
