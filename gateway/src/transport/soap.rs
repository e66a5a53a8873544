use crate::error::{GatewayError, Result};
use crate::xml;

pub const AV_TRANSPORT_SERVICE: &str = "urn:schemas-upnp-org:service:AVTransport:1";
pub const AV_TRANSPORT_CONTROL_PATH: &str = "/MediaRenderer/AVTransport/Control";
pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

pub struct SoapRequest {
  pub service_type: String,
  pub action: String,
  /// Parameter values are plain text; they are escaped when the envelope is built
  pub params: Vec<(String, String)>,
}

impl SoapRequest {
  pub fn av_transport(action: &str, params: &[(&str, &str)]) -> Self {
    Self {
      service_type: AV_TRANSPORT_SERVICE.to_string(),
      action: action.to_string(),
      params: params
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect(),
    }
  }

  /// `SOAPACTION` header value, `<service>#<action>`
  pub fn soap_action(&self) -> String {
    format!("{}#{}", self.service_type, self.action)
  }
}

pub struct SoapResponse {
  pub body: String,
}

pub struct SoapClient {
  http_client: reqwest::blocking::Client,
}

impl SoapClient {
  pub fn new(timeout: std::time::Duration) -> Result<Self> {
    let http_client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| GatewayError::CommunicationError(e.to_string()))?;

    Ok(Self { http_client })
  }

  /// POST `request` to `device_url + service_path`. Anything but 200 is a failure carrying the body.
  pub fn call(&self, device_url: &str, service_path: &str, request: &SoapRequest) -> Result<SoapResponse> {
    let url = format!("{}{}", device_url, service_path);
    let body = Self::build_soap_envelope(request);

    let response = self
      .http_client
      .post(&url)
      .header("Content-Type", SOAP_CONTENT_TYPE)
      .header("SOAPACTION", request.soap_action())
      .body(body)
      .send()
      .map_err(|e| GatewayError::ControlRequestFailed {
        action: request.action.clone(),
        reason: e.to_string(),
      })?;

    let status = response.status();
    let response_body = response.text().map_err(|e| GatewayError::ControlRequestFailed {
      action: request.action.clone(),
      reason: format!("Failed to read response body: {}", e),
    })?;

    if status != reqwest::StatusCode::OK {
      return Err(GatewayError::ControlFailed {
        action: request.action.clone(),
        status: status.as_u16(),
        body: response_body,
      });
    }

    Ok(SoapResponse { body: response_body })
  }

  pub fn build_soap_envelope(request: &SoapRequest) -> String {
    let mut params_xml = String::new();
    for (key, value) in &request.params {
      params_xml.push_str(&format!("      <{}>{}</{}>\n", key, xml::escape(value), key));
    }

    format!(
      "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\"\n \
s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\n  \
<s:Body>\n    \
<u:{action} xmlns:u=\"{service}\">\n\
{params}    \
</u:{action}>\n  \
</s:Body>\n\
</s:Envelope>",
      action = request.action,
      service = request.service_type,
      params = params_xml,
    )
  }

  /// Envelope a device returns for a successful action
  pub fn build_response_envelope(action: &str, service_type: &str) -> String {
    format!(
      "<?xml version=\"1.0\"?>\n\
<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">\n  \
<s:Body>\n    \
<u:{}Response xmlns:u=\"{}\"/>\n  \
</s:Body>\n\
</s:Envelope>",
      action, service_type
    )
  }
}
