//! Upload-and-analyze web front end.
//!
//! A blocking HTTP/1.1 server on one background thread. Connections are
//! served one at a time: read fully, route, answer, close.

mod http;
mod multipart;
mod pages;

pub use http::{read_request, write_response, HttpRequest, RequestError, Response};
pub use multipart::FormPart;
pub use pages::{html_escape, render_image_result, render_index, render_video_result};

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::config::AppConfig;
use crate::detect::MediaDetector;
use crate::media::{content_type_for, MediaKind};
use crate::storage::{MediaStore, ServedArea};
use crate::video::{SamplingPlan, VideoSampler};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct WebConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    pub confidence: f32,
    pub sampling: SamplingPlan,
}

impl From<&AppConfig> for WebConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            addr: cfg.addr.clone(),
            max_upload_bytes: cfg.max_upload_bytes,
            confidence: cfg.confidence,
            sampling: cfg.sampling,
        }
    }
}

#[derive(Debug)]
pub struct WebHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl WebHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("web server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct WebServer {
    cfg: WebConfig,
    store: MediaStore,
    detector: MediaDetector,
}

impl WebServer {
    pub fn new(cfg: WebConfig, store: MediaStore, detector: MediaDetector) -> Self {
        Self {
            cfg,
            store,
            detector,
        }
    }

    /// Bind and start serving on a background thread.
    pub fn spawn(self) -> Result<WebHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .addr
            .parse()
            .map_err(|e| anyhow!("invalid listen address '{}': {}", self.cfg.addr, e))?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        log::info!(
            "web server listening on http://{} (backend: {})",
            addr,
            self.detector.backend_name()
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let mut app = App {
            cfg: self.cfg,
            store: self.store,
            detector: self.detector,
        };
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, &mut app, shutdown_thread) {
                log::error!("web server stopped: {}", err);
            }
        });

        Ok(WebHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(listener: TcpListener, app: &mut App, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = handle_connection(stream, app) {
                    log::warn!("request from {} failed: {:#}", peer, err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    log::info!("web server shut down");
    Ok(())
}

fn handle_connection(mut stream: TcpStream, app: &mut App) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let request = match read_request(&mut stream, app.cfg.max_upload_bytes) {
        Ok(request) => request,
        Err(err) => {
            if let Some(status) = err.status() {
                let body = format!(r#"{{"error":"{}"}}"#, error_code(status));
                write_response(&mut stream, &Response::json(status, &body))?;
            }
            return Err(err.into());
        }
    };

    let response = app.route(&request);
    log::info!("{} {} -> {}", request.method, request.path, response.status);
    write_response(&mut stream, &response)
}

fn error_code(status: u16) -> &'static str {
    match status {
        413 => "payload_too_large",
        _ => "bad_request",
    }
}

struct App {
    cfg: WebConfig,
    store: MediaStore,
    detector: MediaDetector,
}

impl App {
    fn route(&mut self, request: &HttpRequest) -> Response {
        let segments = request.segments();
        let method = request.method.as_str();
        match (method, segments.as_slice()) {
            ("GET", []) => Response::html(200, render_index(None)),
            ("GET", ["health"]) => Response::json(200, r#"{"status":"ok"}"#),
            ("POST", ["upload"]) => self.upload(request),
            ("GET", ["uploads", rest @ ..]) => self.serve(ServedArea::Uploads, rest),
            ("GET", ["results", rest @ ..]) => self.serve(ServedArea::Results, rest),
            ("GET", ["frames", rest @ ..]) => self.serve(ServedArea::Frames, rest),
            (_, [] | ["health"] | ["upload"] | ["uploads", ..] | ["results", ..] | ["frames", ..]) => {
                Response::method_not_allowed()
            }
            _ => Response::not_found(),
        }
    }

    fn serve(&self, area: ServedArea, segments: &[&str]) -> Response {
        let Some(path) = self.store.resolve(area, segments) else {
            return Response::not_found();
        };
        match std::fs::read(&path) {
            Ok(bytes) => Response::file(content_type_for(&path), bytes),
            Err(err) => {
                log::warn!("failed to read {}: {}", path.display(), err);
                Response::not_found()
            }
        }
    }

    fn upload(&mut self, request: &HttpRequest) -> Response {
        let Some(boundary) = request
            .header("content-type")
            .and_then(multipart::boundary)
        else {
            return error_page(200, "No file uploaded");
        };
        let parts = match multipart::parse(&request.body, &boundary) {
            Ok(parts) => parts,
            Err(err) => {
                log::warn!("rejected upload: {:#}", err);
                return error_page(400, "Malformed upload");
            }
        };
        let Some(file) = parts.into_iter().find(|part| part.name == "file") else {
            return error_page(200, "No file uploaded");
        };
        let original_name = match file.filename.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return error_page(200, "No file selected"),
        };

        let upload = match self.store.save_upload(&original_name, &file.data) {
            Ok(upload) => upload,
            Err(err) => {
                log::error!("failed to store upload: {:#}", err);
                return error_page(500, "Could not store uploaded file");
            }
        };

        match upload.kind {
            MediaKind::Image => match self.detector.detect_image(&upload.path, self.cfg.confidence) {
                Ok(analysis) => {
                    Response::html(200, render_image_result(&upload.filename, &analysis))
                }
                Err(err) => {
                    log::warn!("image {} rejected: {}", upload.filename, err);
                    error_page(200, &err.to_string())
                }
            },
            MediaKind::Video => {
                let result = VideoSampler::new(&mut self.detector, &self.store, self.cfg.sampling)
                    .process_video(&upload.path, self.cfg.confidence);
                match result {
                    Ok(analysis) => {
                        Response::html(200, render_video_result(&upload.filename, &analysis))
                    }
                    Err(err) => {
                        log::warn!("video {} rejected: {}", upload.filename, err);
                        error_page(200, &err.to_string())
                    }
                }
            }
        }
    }
}

fn error_page(status: u16, message: &str) -> Response {
    Response::html(status, render_index(Some(message)))
}
