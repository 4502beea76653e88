use anyhow::{anyhow, Result};
use std::io::{Cursor, Read, Write};
use std::net::{SocketAddr, TcpStream};
use tempfile::{tempdir, TempDir};

use drowning_watch::{
    Annotator, BoxPrediction, MediaDetector, MediaStore, SamplingPlan, StubBackend, WebConfig,
    WebHandle, WebServer,
};

struct TestServer {
    _dir: TempDir,
    handle: Option<WebHandle>,
}

impl TestServer {
    fn start(backend: StubBackend, max_upload_bytes: usize) -> Result<Self> {
        let dir = tempdir()?;
        let store = MediaStore::open(dir.path())?;
        let detector = MediaDetector::new(Box::new(backend), Annotator::new(), store.results_dir());
        let cfg = WebConfig {
            addr: "127.0.0.1:0".to_string(),
            max_upload_bytes,
            confidence: 0.4,
            sampling: SamplingPlan::default(),
        };
        let handle = WebServer::new(cfg, store, detector).spawn()?;
        Ok(Self {
            _dir: dir,
            handle: Some(handle),
        })
    }

    fn addr(&self) -> SocketAddr {
        self.handle.as_ref().map(|h| h.addr).expect("server running")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop();
        }
    }
}

struct Reply {
    status: u16,
    headers: String,
    body: Vec<u8>,
}

impl Reply {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn send(addr: SocketAddr, raw: &[u8]) -> Result<Reply> {
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(raw)?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| anyhow!("response has no header terminator"))?;
    let headers = String::from_utf8_lossy(&response[..split]).into_owned();
    let status = headers
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("missing status"))?
        .parse()?;
    Ok(Reply {
        status,
        headers,
        body: response[split + 4..].to_vec(),
    })
}

fn get(addr: SocketAddr, path: &str) -> Result<Reply> {
    send(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes(),
    )
}

fn upload(addr: SocketAddr, field: &str, filename: Option<&str>, data: &[u8]) -> Result<Reply> {
    let boundary = "----drowningtest";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let mut raw = format!(
        "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Type: multipart/form-data; boundary={boundary}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(&body);
    send(addr, &raw)
}

fn encoded(format: image::ImageFormat) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_pixel(64, 48, image::Rgb([30, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image).write_to(&mut out, format)?;
    Ok(out.into_inner())
}

fn jpeg_bytes() -> Result<Vec<u8>> {
    encoded(image::ImageFormat::Jpeg)
}

fn link_after<'a>(html: &'a str, prefix: &str) -> Option<&'a str> {
    let start = html.find(prefix)?;
    let rest = &html[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[test]
fn serves_index_and_health() -> Result<()> {
    let server = TestServer::start(StubBackend::new(), 1 << 20)?;

    let index = get(server.addr(), "/")?;
    assert_eq!(index.status, 200);
    assert!(index.headers.contains("text/html"));
    assert!(index.headers.contains("Connection: close"));
    assert!(index.text().contains("name=\"file\""));

    let health = get(server.addr(), "/health")?;
    assert_eq!(health.status, 200);
    assert_eq!(health.text(), r#"{"status":"ok"}"#);
    Ok(())
}

#[test]
fn unknown_paths_and_methods_are_rejected() -> Result<()> {
    let server = TestServer::start(StubBackend::new(), 1 << 20)?;

    assert_eq!(get(server.addr(), "/admin")?.status, 404);
    assert_eq!(get(server.addr(), "/results/missing.jpg")?.status, 404);
    assert_eq!(get(server.addr(), "/results/../Cargo.toml")?.status, 404);
    assert_eq!(get(server.addr(), "/upload")?.status, 405);

    let put = send(server.addr(), b"PUT / HTTP/1.1\r\nContent-Length: 0\r\n\r\n")?;
    assert_eq!(put.status, 405);
    Ok(())
}

#[test]
fn image_upload_renders_result_and_serves_files() -> Result<()> {
    let drowning = BoxPrediction::new(8.0, 6.0, 40.0, 36.0, 0.88, 0);
    let server = TestServer::start(StubBackend::with_boxes(vec![drowning]), 1 << 20)?;

    let reply = upload(server.addr(), "file", Some("Pool.JPG"), &jpeg_bytes()?)?;
    assert_eq!(reply.status, 200);
    let html = reply.text();
    assert!(html.contains("Drowning detected"));
    assert!(html.contains("<td>Drowning</td><td>0.88</td>"));

    let result = link_after(&html, "/results/").ok_or_else(|| anyhow!("no result link"))?;
    let served = get(server.addr(), result)?;
    assert_eq!(served.status, 200);
    assert!(served.headers.contains("image/jpeg"));
    assert!(image::load_from_memory(&served.body).is_ok());

    let original = link_after(&html, "/uploads/").ok_or_else(|| anyhow!("no upload link"))?;
    assert!(original.ends_with(".jpg"));
    assert_eq!(get(server.addr(), original)?.status, 200);
    Ok(())
}

#[test]
fn images_are_decoded_by_content() -> Result<()> {
    let swimmer = BoxPrediction::new(8.0, 6.0, 40.0, 36.0, 0.66, 2);
    let server = TestServer::start(StubBackend::with_boxes(vec![swimmer]), 1 << 20)?;

    let cases = [
        ("snapshot.jpg", image::ImageFormat::Png),
        ("camera_dump", image::ImageFormat::Png),
        ("scan.tiff", image::ImageFormat::Tiff),
        ("clip_still.gif", image::ImageFormat::Gif),
    ];
    for (name, format) in cases {
        let reply = upload(server.addr(), "file", Some(name), &encoded(format)?)?;
        let html = reply.text();
        assert_eq!(reply.status, 200, "{name}");
        assert!(!html.contains("Could not load image"), "{name}");
        assert!(html.contains("<td>Not Drowning</td><td>0.66</td>"), "{name}");
    }
    Ok(())
}

#[test]
fn upload_form_errors_rerender_index() -> Result<()> {
    let server = TestServer::start(StubBackend::new(), 1 << 20)?;

    let missing = upload(server.addr(), "other", Some("a.jpg"), b"xx")?;
    assert_eq!(missing.status, 200);
    assert!(missing.text().contains("No file uploaded"));

    let blank = upload(server.addr(), "file", Some(""), b"")?;
    assert!(blank.text().contains("No file selected"));

    let not_multipart = send(
        server.addr(),
        b"POST /upload HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi",
    )?;
    assert!(not_multipart.text().contains("No file uploaded"));
    Ok(())
}

#[test]
fn detector_errors_are_shown_to_the_user() -> Result<()> {
    let server = TestServer::start(StubBackend::failing("tensor shape mismatch"), 1 << 20)?;

    let empty = upload(server.addr(), "file", Some("empty.png"), b"")?;
    assert!(empty.text().contains("Image file is empty"));

    let garbage = upload(server.addr(), "file", Some("photo.jpg"), b"not an image")?;
    assert!(garbage.text().contains("Could not load image"));

    let failed = upload(server.addr(), "file", Some("photo.jpg"), &jpeg_bytes()?)?;
    assert!(failed
        .text()
        .contains("Model prediction failed: tensor shape mismatch"));

    let video = upload(server.addr(), "file", Some("clip.MP4"), b"not a video")?;
    assert!(video.text().contains("Could not open video file"));
    Ok(())
}

#[test]
fn oversized_upload_is_refused() -> Result<()> {
    let server = TestServer::start(StubBackend::new(), 1024)?;

    let reply = send(
        server.addr(),
        b"POST /upload HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=x\r\nContent-Length: 999999\r\n\r\n",
    )?;
    assert_eq!(reply.status, 413);

    // The server keeps serving after a refused request.
    assert_eq!(get(server.addr(), "/health")?.status, 200);
    Ok(())
}
