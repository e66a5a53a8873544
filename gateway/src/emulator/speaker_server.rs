use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use warp::Filter;

use super::verify::verify_media;
use crate::config::VerifyMode;
use crate::error::{GatewayError, Result};
use crate::transport::soap::{SoapClient, AV_TRANSPORT_SERVICE};
use crate::xml;

pub const DESCRIPTION_PATH: &str = "/xml/device_description.xml";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);
const RECENT_PLAYS: usize = 32;

/// Mutable state of one emulated speaker
#[derive(Debug, Clone, Default)]
pub struct ControlSession {
    pub name: String,
    pub port: u16,
    /// Set by SetAVTransportURI, read by Play; empty until the first set
    pub last_media_uri: String,
    /// URI each recent Play started, oldest first
    pub played: VecDeque<String>,
}

/// State shared by the request handlers of one speaker
struct SpeakerContext {
    session: Arc<Mutex<ControlSession>>,
    verify: VerifyMode,
    http: reqwest::Client,
}

/// HTTP endpoint of one emulated speaker: device description plus AVTransport control
pub struct SpeakerServer {
    name: String,
    addr: SocketAddr,
    session: Arc<Mutex<ControlSession>>,
    server_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::UnboundedSender<()>>,
}

impl SpeakerServer {
    /// Bind `bind_addr` and serve until shutdown. Returns once the socket is bound.
    pub fn start(name: &str, bind_addr: SocketAddr, verify: VerifyMode) -> Result<Self> {
        let session = Arc::new(Mutex::new(ControlSession {
            name: name.to_string(),
            ..ControlSession::default()
        }));
        let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<std::result::Result<SocketAddr, String>>();

        let thread_session = Arc::clone(&session);
        let thread_name = name.to_string();
        let server_handle = std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("Failed to start runtime: {}", e)));
                    return;
                }
            };

            rt.block_on(async move {
                let http = match reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build() {
                    Ok(client) => client,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to create HTTP client: {}", e)));
                        return;
                    }
                };
                let context = Arc::new(SpeakerContext {
                    session: thread_session,
                    verify,
                    http,
                });

                let bound = warp::serve(routes(context)).try_bind_with_graceful_shutdown(
                    bind_addr,
                    async move {
                        shutdown_rx.recv().await;
                    },
                );

                match bound {
                    Ok((addr, server)) => {
                        log::info!("[{}] HTTP server listening on {}", thread_name, addr);
                        let _ = ready_tx.send(Ok(addr));
                        server.await;
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                    }
                }
            });
        });

        let bind_failed = |reason: String| GatewayError::BindFailed {
            addr: bind_addr.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, reason),
        };
        let addr = match ready_rx.recv() {
            Ok(Ok(addr)) => addr,
            Ok(Err(reason)) => {
                let _ = server_handle.join();
                return Err(bind_failed(reason));
            }
            Err(_) => {
                let _ = server_handle.join();
                return Err(bind_failed("server thread exited before binding".to_string()));
            }
        };

        lock(&session).port = addr.port();

        Ok(Self {
            name: name.to_string(),
            addr,
            session,
            server_handle: Some(server_handle),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn last_media_uri(&self) -> String {
        lock(&self.session).last_media_uri.clone()
    }

    /// URIs the most recent Play actions started
    pub fn played_uris(&self) -> Vec<String> {
        lock(&self.session).played.iter().cloned().collect()
    }

    pub fn session(&self) -> ControlSession {
        lock(&self.session).clone()
    }

    pub fn is_running(&self) -> bool {
        self.server_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the HTTP server and wait for its thread
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.server_handle.take() {
            handle.join().map_err(|_| {
                GatewayError::EmulatorError(format!("[{}] Failed to join server thread", self.name))
            })?;
        }

        Ok(())
    }
}

impl Drop for SpeakerServer {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn routes(
    context: Arc<SpeakerContext>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_context = warp::any().map(move || Arc::clone(&context));

    let description = warp::get()
        .and(warp::path!("xml" / "device_description.xml"))
        .and(warp::addr::remote())
        .and(with_context.clone())
        .map(handle_description);

    let control = warp::post()
        .and(warp::path!("MediaRenderer" / "AVTransport" / "Control"))
        .and(warp::header::optional::<String>("soapaction"))
        .and(warp::body::bytes())
        .and(with_context)
        .map(handle_control);

    description.or(control)
}

fn handle_description(remote: Option<SocketAddr>, context: Arc<SpeakerContext>) -> impl warp::Reply {
    let name = lock(&context.session).name.clone();
    match remote {
        Some(remote) => log::info!("[{}] Device description requested by {}", name, remote),
        None => log::info!("[{}] Device description requested", name),
    }

    warp::reply::with_header(
        device_description(&name),
        "content-type",
        "text/xml; charset=utf-8",
    )
}

fn handle_control(
    soap_action: Option<String>,
    body: bytes::Bytes,
    context: Arc<SpeakerContext>,
) -> impl warp::Reply {
    let body = String::from_utf8_lossy(&body);
    let action = action_name(soap_action.as_deref().unwrap_or(""));

    let to_verify = apply_action(&context.session, &action, &body);

    if let Some((speaker, uri)) = to_verify {
        if context.verify != VerifyMode::Off {
            tokio::spawn(verify_media(context.http.clone(), speaker, uri, context.verify));
        }
    }

    warp::reply::with_header(
        SoapClient::build_response_envelope(&action, AV_TRANSPORT_SERVICE),
        "content-type",
        "text/xml; charset=utf-8",
    )
}

/// Apply one control action under the speaker's lock.
///
/// Returns the speaker name and media URI when a Play should be verified.
pub fn apply_action(
    session: &Mutex<ControlSession>,
    action: &str,
    body: &str,
) -> Option<(String, String)> {
    let mut session = lock(session);

    match action {
        "SetAVTransportURI" => {
            let media_uri = xml::extract_tag_value(body, "CurrentURI");
            log::info!("[{}] SetAVTransportURI -> URI: {}", session.name, media_uri);
            session.last_media_uri = media_uri;
            None
        }
        "Play" => {
            log::info!("[{}] Play (URI: {})", session.name, session.last_media_uri);
            if session.played.len() == RECENT_PLAYS {
                session.played.pop_front();
            }
            let started = session.last_media_uri.clone();
            session.played.push_back(started);

            if session.last_media_uri.is_empty() {
                None
            } else {
                Some((session.name.clone(), session.last_media_uri.clone()))
            }
        }
        other => {
            log::info!("[{}] Unknown SOAP action: {}", session.name, other);
            None
        }
    }
}

/// Action name from a `SOAPACTION` header: text after the last `#`, quotes trimmed
pub fn action_name(soap_action: &str) -> String {
    let action = match soap_action.rfind('#') {
        Some(idx) => &soap_action[idx + 1..],
        None => soap_action,
    };
    action.trim().trim_matches('"').to_string()
}

pub fn device_description(name: &str) -> String {
    let name = xml::escape(name);
    format!(
        "<?xml version=\"1.0\"?>\n\
<root xmlns=\"urn:schemas-upnp-org:device-1-0\">\n  \
<device>\n    \
<roomName>{}</roomName>\n    \
<displayName>{}</displayName>\n    \
<modelName>Sonos One (Emulated)</modelName>\n  \
</device>\n\
</root>",
        name, name
    )
}

fn lock(session: &Mutex<ControlSession>) -> MutexGuard<'_, ControlSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
