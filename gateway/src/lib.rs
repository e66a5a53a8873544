pub mod announcer;
pub mod config;
pub mod emulator;
pub mod error;
pub mod models;
pub mod registry;
pub mod transport;
pub mod util;
pub mod xml;

// Re-export key types for easier access
pub use announcer::{Announcer, AudioProducer, ALL_TARGET};
pub use config::{ControlConfig, DiscoveryConfig, EmulatorConfig, GatewayConfig, VerifyMode};
pub use emulator::Emulator;
pub use error::{GatewayError, Result};
pub use models::{DeviceRecord, DeviceSummary, SpeakerId};
pub use registry::DeviceRegistry;
pub use transport::control::{ControlClient, PlaybackControl};
pub use transport::discovery::{discover_speakers, discover_speakers_with_timeout, Discovery};
