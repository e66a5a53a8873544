use std::io;
use std::net::{IpAddr, UdpSocket};

/// Environment variable that pins the address advertised to speakers
pub const LOCAL_IP_ENV: &str = "LOCAL_IP";

/// Resolve the LAN address speakers should use to reach this host.
///
/// `LOCAL_IP` wins when set. Otherwise a UDP socket is connected to a public
/// address (nothing is sent) and the interface address the OS picked is used.
pub fn local_ip() -> io::Result<IpAddr> {
  if let Ok(value) = std::env::var(LOCAL_IP_ENV) {
    let value = value.trim();
    if !value.is_empty() {
      return value.parse().map_err(|e| {
        io::Error::new(
          io::ErrorKind::InvalidInput,
          format!("{} is not an IP address ({}): {}", LOCAL_IP_ENV, value, e),
        )
      });
    }
  }

  outbound_ip()
}

fn outbound_ip() -> io::Result<IpAddr> {
  let socket = UdpSocket::bind("0.0.0.0:0")?;
  socket.connect("8.8.8.8:80")?;
  Ok(socket.local_addr()?.ip())
}
