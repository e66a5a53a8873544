use std::io::{Error, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const SSDP_PORT: u16 = 1900;
pub const ZONE_PLAYER_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

const RECV_BUFFER_SIZE: usize = 4096;

/// Build an M-SEARCH request for `search_target`
pub fn search_request(search_target: &str, mx: u8) -> String {
  format!(
    "M-SEARCH * HTTP/1.1\r\n\
      HOST: {}:{}\r\n\
      MAN: \"ssdp:discover\"\r\n\
      MX: {}\r\n\
      ST: {}\r\n\
      \r\n",
    SSDP_MULTICAST_ADDR, SSDP_PORT, mx, search_target
  )
}

/// Build the unicast reply a device sends for a matching M-SEARCH
pub fn search_response(location: &str, search_target: &str, usn: &str) -> String {
  format!(
    "HTTP/1.1 200 OK\r\n\
      CACHE-CONTROL: max-age=1800\r\n\
      LOCATION: {}\r\n\
      ST: {}\r\n\
      USN: {}\r\n\
      \r\n",
    location, search_target, usn
  )
}

/// True when `message` is an M-SEARCH naming `search_target`
pub fn is_search_for(message: &str, search_target: &str) -> bool {
  message.contains("M-SEARCH") && message.contains(search_target)
}

/// LOCATION header of an SSDP response, header name matched case-insensitively.
///
/// A response names one device, so only the first LOCATION line counts.
pub fn parse_location(response: &str) -> Option<String> {
  response
    .lines()
    .find_map(|line| extract_header_value(line.trim(), "LOCATION:"))
    .filter(|location| !location.is_empty())
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value(line: &str, header: &str) -> Option<String> {
  if line.len() >= header.len()
    && line.is_char_boundary(header.len())
    && line[..header.len()].eq_ignore_ascii_case(header)
  {
    Some(line[header.len()..].trim().to_string())
  } else {
    None
  }
}

/// SSDP client for device discovery
pub struct SsdpClient {
  socket: UdpSocket,
  window: Duration,
}

impl SsdpClient {
  /// Create a client whose searches collect responses for `window`
  pub fn new(window: Duration) -> Result<Self, Error> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_multicast_loop_v4(true)?;

    Ok(Self { socket, window })
  }

  /// Send one M-SEARCH to `target` and return every LOCATION received before the deadline.
  ///
  /// Locations are deduplicated by exact string and kept in arrival order.
  pub fn search(&self, target: SocketAddr, search_target: &str, mx: u8) -> Result<Vec<String>, Error> {
    let deadline = Instant::now() + self.window;
    let request = search_request(search_target, mx);
    self.socket.send_to(request.as_bytes(), target)?;

    let mut locations: Vec<String> = Vec::new();
    let mut buffer = [0u8; RECV_BUFFER_SIZE];

    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        break;
      }
      self.socket.set_read_timeout(Some(remaining))?;

      match self.socket.recv_from(&mut buffer) {
        Ok((size, from)) => {
          let Ok(text) = std::str::from_utf8(&buffer[..size]) else {
            log::debug!("Ignoring non UTF-8 SSDP datagram from {}", from);
            continue;
          };
          match parse_location(text) {
            Some(location) if !locations.contains(&location) => {
              log::debug!("SSDP response from {} -> {}", from, location);
              locations.push(location);
            }
            Some(_) => {}
            None => log::debug!("SSDP response from {} without LOCATION", from),
          }
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => break,
        Err(e) => {
          // ICMP port-unreachable and similar surface here on some platforms
          log::debug!("SSDP receive error: {}", e);
        }
      }
    }

    Ok(locations)
  }
}
