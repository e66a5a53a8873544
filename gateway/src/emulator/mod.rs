//! Emulated ZonePlayers: an SSDP responder plus one HTTP endpoint per speaker.
//!
//! Lets the controller side be exercised end to end without hardware.

mod speaker_server;
mod ssdp_responder;
mod verify;

pub use speaker_server::{action_name, apply_action, device_description, ControlSession, SpeakerServer, DESCRIPTION_PATH};
pub use ssdp_responder::{Advertisement, SsdpResponder};

use std::net::{Ipv4Addr, SocketAddr};

use crate::config::EmulatorConfig;
use crate::error::{GatewayError, Result};

pub struct Emulator {
    speakers: Vec<SpeakerServer>,
    responder: SsdpResponder,
}

impl Emulator {
    /// Start every speaker server, then the responder advertising their bound ports.
    ///
    /// Any bind failure aborts startup; servers already started are shut down on drop.
    pub fn start(config: &EmulatorConfig) -> Result<Self> {
        if config.speakers.is_empty() {
            return Err(GatewayError::EmulatorError("No speakers configured".to_string()));
        }

        let mut speakers = Vec::with_capacity(config.speakers.len());
        for (index, name) in config.speakers.iter().enumerate() {
            let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port_for(index)?));
            speakers.push(SpeakerServer::start(name, bind_addr, config.verify)?);
        }

        let advertisements = speakers
            .iter()
            .map(|speaker| Advertisement::for_speaker(speaker.name(), config.advertise_ip, speaker.port()))
            .collect();
        let responder = SsdpResponder::start(config.ssdp_listen, config.join_multicast, advertisements)?;

        for speaker in &speakers {
            log::info!(
                "Emulating {:?} at http://{}:{}{}",
                speaker.name(),
                config.advertise_ip,
                speaker.port(),
                DESCRIPTION_PATH
            );
        }

        Ok(Self { speakers, responder })
    }

    pub fn speakers(&self) -> &[SpeakerServer] {
        &self.speakers
    }

    pub fn speaker(&self, name: &str) -> Option<&SpeakerServer> {
        self.speakers.iter().find(|speaker| speaker.name() == name)
    }

    /// Address M-SEARCH datagrams should be sent to
    pub fn ssdp_addr(&self) -> SocketAddr {
        self.responder.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.responder.is_running() && self.speakers.iter().all(SpeakerServer::is_running)
    }

    /// Stop the responder and every speaker server. Reports the first failure after stopping all.
    pub fn shutdown(&mut self) -> Result<()> {
        let mut result = self.responder.shutdown();
        for speaker in &mut self.speakers {
            if let Err(e) = speaker.shutdown() {
                log::warn!("{}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
