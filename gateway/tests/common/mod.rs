#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;
use warp::http::StatusCode;
use warp::Filter;

/// One control request as the renderer saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub soap_action: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
    pub received_at: Instant,
}

impl RecordedRequest {
    pub fn action(&self) -> &str {
        self.soap_action
            .as_deref()
            .and_then(|header| header.rsplit('#').next())
            .unwrap_or("")
    }
}

/// AVTransport endpoint that records every request and can fail one action with a 500
pub struct RecordingRenderer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::UnboundedSender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RecordingRenderer {
    pub fn start() -> Self {
        Self::failing(None)
    }

    pub fn failing(fail_action: Option<&'static str>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let recorded = Arc::clone(&requests);
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let control = warp::post()
                    .and(warp::path!("MediaRenderer" / "AVTransport" / "Control"))
                    .and(warp::header::optional::<String>("soapaction"))
                    .and(warp::header::optional::<String>("content-type"))
                    .and(warp::body::bytes())
                    .map(move |soap_action: Option<String>, content_type: Option<String>, body: bytes::Bytes| {
                        let request = RecordedRequest {
                            soap_action,
                            content_type,
                            body: String::from_utf8_lossy(&body).to_string(),
                            received_at: Instant::now(),
                        };
                        let action = request.action().to_string();
                        recorded.lock().unwrap().push(request);

                        if Some(action.as_str()) == fail_action {
                            warp::reply::with_status(
                                format!("{} rejected by renderer", action),
                                StatusCode::INTERNAL_SERVER_ERROR,
                            )
                        } else {
                            warp::reply::with_status(format!("<u:{}Response/>", action), StatusCode::OK)
                        }
                    });

                let (addr, server) = warp::serve(control)
                    .bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                        shutdown_rx.recv().await;
                    });
                ready_tx.send(addr).unwrap();
                server.await;
            });
        });

        let addr = ready_rx.recv().unwrap();
        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for RecordingRenderer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Static media endpoint that records `METHOD /path` for every request
pub struct MediaServer {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::UnboundedSender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MediaServer {
    pub fn start() -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let recorded = Arc::clone(&seen);
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let media = warp::method()
                    .and(warp::path::full())
                    .map(move |method: warp::http::Method, path: warp::path::FullPath| {
                        recorded.lock().unwrap().push(format!("{} {}", method, path.as_str()));
                        warp::reply::with_header("ID3 not really audio", "content-type", "audio/mpeg")
                    });

                let (addr, server) = warp::serve(media)
                    .bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                        shutdown_rx.recv().await;
                    });
                ready_tx.send(addr).unwrap();
                server.await;
            });
        });

        let addr = ready_rx.recv().unwrap();
        Self {
            addr,
            seen,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Poll until at least `count` requests arrived or `timeout` passed
    pub fn wait_for(&self, count: usize, timeout: std::time::Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let requests = self.requests();
            if requests.len() >= count || Instant::now() >= deadline {
                return requests;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
    }
}

impl Drop for MediaServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
