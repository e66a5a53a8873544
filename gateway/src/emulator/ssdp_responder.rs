use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use super::speaker_server::DESCRIPTION_PATH;
use crate::error::{GatewayError, Result};
use crate::transport::ssdp::{is_search_for, search_response, SSDP_MULTICAST_ADDR, ZONE_PLAYER_SEARCH_TARGET};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const RECV_BUFFER_SIZE: usize = 2048;

/// What one emulated speaker answers to a ZonePlayer search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub location: String,
    pub usn: String,
}

impl Advertisement {
    pub fn for_speaker(name: &str, ip: IpAddr, port: u16) -> Self {
        Self {
            location: format!("http://{}:{}{}", ip, port, DESCRIPTION_PATH),
            usn: format!("uuid:RINCON_EMULATED_{}", name.replace(' ', "")),
        }
    }

    pub fn response(&self) -> String {
        search_response(&self.location, ZONE_PLAYER_SEARCH_TARGET, &self.usn)
    }
}

/// Answers ZonePlayer M-SEARCH datagrams with one unicast reply per advertisement
pub struct SsdpResponder {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<io::Result<()>>>,
}

impl SsdpResponder {
    pub fn start(listen: SocketAddr, join_multicast: bool, advertisements: Vec<Advertisement>) -> Result<Self> {
        let socket = bind_socket(listen, join_multicast).map_err(|source| GatewayError::BindFailed {
            addr: listen.to_string(),
            source,
        })?;
        let local_addr = socket.local_addr().map_err(|source| GatewayError::BindFailed {
            addr: listen.to_string(),
            source,
        })?;
        log::info!(
            "SSDP responder listening on {} for {} speaker(s)",
            local_addr,
            advertisements.len()
        );

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || serve(socket, advertisements, thread_stop));

        Ok(Self {
            local_addr,
            stop,
            handle: Some(handle),
        })
    }

    /// Where searches should be sent to reach this responder
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop and return the error that ended it early, if any
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);

        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(GatewayError::EmulatorError(format!("SSDP responder failed: {}", e))),
                Err(_) => Err(GatewayError::EmulatorError("SSDP responder thread panicked".to_string())),
            },
            None => Ok(()),
        }
    }
}

impl Drop for SsdpResponder {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn bind_socket(listen: SocketAddr, join_multicast: bool) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(listen), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&listen.into())?;

    let socket: UdpSocket = socket.into();
    if join_multicast {
        let interface = match listen.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
        };
        socket.join_multicast_v4(&SSDP_MULTICAST_ADDR, &interface)?;
    }
    socket.set_read_timeout(Some(POLL_INTERVAL))?;

    Ok(socket)
}

fn serve(socket: UdpSocket, advertisements: Vec<Advertisement>, stop: Arc<AtomicBool>) -> io::Result<()> {
    let mut buffer = [0u8; RECV_BUFFER_SIZE];

    while !stop.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buffer) {
            Ok((size, from)) => {
                let message = String::from_utf8_lossy(&buffer[..size]);
                if !is_search_for(&message, ZONE_PLAYER_SEARCH_TARGET) {
                    continue;
                }
                log::info!("M-SEARCH from {}", from);
                answer(&socket, from, &advertisements);
            }
            Err(e) => match read_error_kind(&e) {
                ReadError::Idle => {}
                ReadError::Recoverable => log::debug!("SSDP receive error: {}", e),
                ReadError::Fatal => {
                    log::error!("SSDP responder stopped: {}", e);
                    return Err(e);
                }
            },
        }
    }

    log::info!("SSDP responder shut down");
    Ok(())
}

fn answer(socket: &UdpSocket, to: SocketAddr, advertisements: &[Advertisement]) {
    for advertisement in advertisements {
        match socket.send_to(advertisement.response().as_bytes(), to) {
            Ok(_) => log::debug!("Answered {} with {}", to, advertisement.location),
            Err(e) => log::warn!("Failed to answer {} for {}: {}", to, advertisement.usn, e),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ReadError {
    /// Read timeout used to poll the stop flag
    Idle,
    /// Logged, the loop keeps serving
    Recoverable,
    /// Ends the loop
    Fatal,
}

fn read_error_kind(e: &io::Error) -> ReadError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => ReadError::Idle,
        // ICMP errors from earlier replies surface on the next read on some platforms
        ErrorKind::Interrupted | ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused => {
            ReadError::Recoverable
        }
        _ => ReadError::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ssdp::{parse_location, search_request};
    use std::time::Instant;

    fn loopback_responder(ads: Vec<Advertisement>) -> SsdpResponder {
        SsdpResponder::start(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), false, ads).unwrap()
    }

    fn collect(socket: &UdpSocket, wait: Duration) -> Vec<String> {
        let deadline = Instant::now() + wait;
        let mut replies = Vec::new();
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            if remaining.is_zero() {
                break;
            }
            socket.set_read_timeout(Some(remaining)).unwrap();
            match socket.recv_from(&mut buffer) {
                Ok((size, _)) => replies.push(String::from_utf8_lossy(&buffer[..size]).to_string()),
                Err(_) => break,
            }
        }
        replies
    }

    #[test]
    fn test_advertisement_for_speaker() {
        let ad = Advertisement::for_speaker("Living Room", "192.168.1.20".parse().unwrap(), 1400);

        assert_eq!(ad.location, "http://192.168.1.20:1400/xml/device_description.xml");
        assert_eq!(ad.usn, "uuid:RINCON_EMULATED_LivingRoom");
        let response = ad.response();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("CACHE-CONTROL: max-age=1800\r\n"));
        assert!(response.contains("ST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_answers_zone_player_search() {
        let ads = vec![
            Advertisement::for_speaker("Living Room", IpAddr::V4(Ipv4Addr::LOCALHOST), 1400),
            Advertisement::for_speaker("Kitchen", IpAddr::V4(Ipv4Addr::LOCALHOST), 1401),
        ];
        let mut responder = loopback_responder(ads);
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();

        client
            .send_to(search_request(ZONE_PLAYER_SEARCH_TARGET, 3).as_bytes(), responder.local_addr())
            .unwrap();

        let mut locations: Vec<String> = collect(&client, Duration::from_millis(800))
            .iter()
            .filter_map(|reply| parse_location(reply))
            .collect();
        locations.sort();
        assert_eq!(
            locations,
            vec![
                "http://127.0.0.1:1400/xml/device_description.xml".to_string(),
                "http://127.0.0.1:1401/xml/device_description.xml".to_string(),
            ]
        );

        responder.shutdown().unwrap();
    }

    #[test]
    fn test_ignores_other_datagrams() {
        let ads = vec![Advertisement::for_speaker("Kitchen", IpAddr::V4(Ipv4Addr::LOCALHOST), 1401)];
        let responder = loopback_responder(ads);
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();

        client
            .send_to(search_request("ssdp:all", 3).as_bytes(), responder.local_addr())
            .unwrap();
        client.send_to(b"hello", responder.local_addr()).unwrap();

        assert!(collect(&client, Duration::from_millis(700)).is_empty());
        assert!(responder.is_running());
    }

    #[test]
    fn test_read_error_kinds() {
        let kind = |k: ErrorKind| read_error_kind(&io::Error::from(k));

        assert_eq!(kind(ErrorKind::WouldBlock), ReadError::Idle);
        assert_eq!(kind(ErrorKind::TimedOut), ReadError::Idle);
        assert_eq!(kind(ErrorKind::Interrupted), ReadError::Recoverable);
        assert_eq!(kind(ErrorKind::ConnectionReset), ReadError::Recoverable);
        assert_eq!(kind(ErrorKind::ConnectionRefused), ReadError::Recoverable);
        assert_eq!(kind(ErrorKind::PermissionDenied), ReadError::Fatal);
        assert_eq!(kind(ErrorKind::InvalidInput), ReadError::Fatal);
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let mut responder = loopback_responder(Vec::new());
        assert!(responder.is_running());

        responder.shutdown().unwrap();

        assert!(!responder.is_running());
    }
}
