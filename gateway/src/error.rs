/// Errors produced by discovery, control and the speaker emulator
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
  #[error("Discovery failed: {0}")]
  DiscoveryFailed(String),

  #[error("Failed to parse device description: {0}")]
  ParseError(String),

  #[error("Communication error: {0}")]
  CommunicationError(String),

  #[error("{action} returned {status}: {body}")]
  ControlFailed {
    action: String,
    status: u16,
    body: String,
  },

  #[error("{action} request failed: {reason}")]
  ControlRequestFailed { action: String, reason: String },

  #[error("Speaker {0:?} not found")]
  DeviceNotFound(String),

  #[error("Audio generation failed: {0}")]
  AudioFailed(String),

  #[error("Failed to bind {addr}: {source}")]
  BindFailed {
    addr: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Emulator error: {0}")]
  EmulatorError(String),

  #[error("Media decode failed: {0}")]
  DecodeFailed(String),
}

impl GatewayError {
  /// True for failures reported by a device while running a control action
  pub fn is_control_failure(&self) -> bool {
    matches!(
      self,
      GatewayError::ControlFailed { .. } | GatewayError::ControlRequestFailed { .. }
    )
  }
}

impl From<reqwest::Error> for GatewayError {
  fn from(err: reqwest::Error) -> Self {
    GatewayError::CommunicationError(err.to_string())
  }
}

impl From<quick_xml::DeError> for GatewayError {
  fn from(err: quick_xml::DeError) -> Self {
    GatewayError::ParseError(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
