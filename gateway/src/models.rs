use serde::Serialize;
use std::fmt;

/// Stable key used to address a speaker regardless of display-name casing and spacing.
///
/// Derived from the display name by lower-casing it and removing every space
/// character, so `"Living Room"` becomes `"livingroom"`. Distinct names can
/// normalize to the same id; the registry keeps whichever was inserted last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeakerId(String);

impl SpeakerId {
    pub fn from_display_name(name: &str) -> Self {
        SpeakerId(name.to_lowercase().replace(' ', ""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered renderer. Immutable once built; updates go through registry replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub display_name: String,
    pub id: SpeakerId,
    /// `scheme://host:port` of the descriptor location, never with a path
    pub control_base_url: String,
}

impl DeviceRecord {
    pub fn new(display_name: impl Into<String>, control_base_url: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let id = SpeakerId::from_display_name(&display_name);
        Self {
            display_name,
            id,
            control_base_url: control_base_url.into(),
        }
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            name: self.display_name.clone(),
            id: self.id.to_string(),
        }
    }
}

/// `{name, id}` pair handed to front ends listing available speakers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub id: String,
}
