use std::fmt;
use sonos_gateway::GatewayError;

/// Errors that can occur during command execution
#[derive(Debug)]
pub enum CommandError {
    /// Error from the underlying gateway library
    Gateway(GatewayError),
    /// Discovery finished without finding a speaker to act on
    NoDevices,
    /// Async runtime or signal handling failed
    Runtime(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::Gateway(err) => write!(f, "{}", err),
            CommandError::NoDevices => write!(f, "No speakers found"),
            CommandError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<GatewayError> for CommandError {
    fn from(err: GatewayError) -> Self {
        CommandError::Gateway(err)
    }
}

/// Result type for command execution; the string is printed on success
pub type CommandResult = Result<String, CommandError>;
