use crate::error::{GatewayError, Result};
use crate::models::DeviceRecord;
use crate::util::http::control_base_url;
use serde::Deserialize;

/// UPnP device description root element
#[derive(Debug, Deserialize)]
pub struct Root {
  pub device: Device,
}

/// The fields of a device description the gateway cares about
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
  #[serde(default)]
  pub room_name: Option<String>,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub model_name: Option<String>,
}

impl Device {
  /// Parse a device description document
  pub fn from_xml(xml: &str) -> Result<Self> {
    let root: Root = quick_xml::de::from_str(xml)
      .map_err(|e| GatewayError::ParseError(format!("Failed to parse device XML: {}", e)))?;

    Ok(root.device)
  }

  /// Room name, falling back to the display name. `None` if both are blank.
  pub fn name(&self) -> Option<&str> {
    [&self.room_name, &self.display_name]
      .into_iter()
      .filter_map(|field| field.as_deref().map(str::trim))
      .find(|name| !name.is_empty())
  }
}

/// Turn a fetched descriptor into a device record.
///
/// Malformed documents are an `Err`; a well-formed document without a usable
/// name, or a location without a scheme, is `Ok(None)`.
pub fn parse_descriptor(body: &[u8], location: &str) -> Result<Option<DeviceRecord>> {
  let xml = std::str::from_utf8(body)
    .map_err(|e| GatewayError::ParseError(format!("Device XML is not UTF-8: {}", e)))?;
  let device = Device::from_xml(xml)?;

  let Some(name) = device.name() else {
    return Ok(None);
  };
  let Some(base_url) = control_base_url(location) else {
    return Ok(None);
  };

  Ok(Some(DeviceRecord::new(name, base_url)))
}
