use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::runtime::Runtime;

use super::HttpServer;
use crate::core::Shutdown;
use crate::hub::{RELOAD, Scope};
use crate::registry::Registry;
use crate::render::{MarkdownOptions, MarkdownRenderer};

struct Harness {
    dir: TempDir,
    registry: Arc<Registry>,
    port: u16,
    shutdown: Shutdown,
    server: Option<JoinHandle<()>>,
    _runtime: Runtime,
}

impl Harness {
    fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let registry = Arc::new(Registry::new(
            Arc::new(MarkdownRenderer::plain(MarkdownOptions::all())),
            runtime.handle().clone(),
        ));

        let http = HttpServer::bind(0).unwrap();
        let port = http.port();
        let shutdown = Shutdown::new();
        shutdown.register_server(http.handle());

        let server = {
            let registry = Arc::clone(&registry);
            let shutdown = shutdown.clone();
            std::thread::spawn(move || http.run(registry, shutdown).unwrap())
        };

        Self {
            dir: TempDir::new().unwrap(),
            registry,
            port,
            shutdown,
            server: Some(server),
            _runtime: runtime,
        }
    }

    fn track(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        self.registry.add(&path).unwrap();
        path
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(("127.0.0.1", self.port)).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    /// One request on a closing connection: (status, raw response).
    fn request(&self, method: &str, target: &str) -> (u16, String) {
        let mut stream = self.connect();
        write!(
            stream,
            "{method} {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        )
        .unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).unwrap();
        let status = raw[9..12].parse().unwrap();
        (status, raw)
    }

    fn get(&self, target: &str) -> (u16, String) {
        self.request("GET", target)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.request();
        if let Some(server) = self.server.take() {
            let _ = server.join();
        }
    }
}

/// Read from `stream` until `needle` shows up (bounded).
fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = String::new();
    let mut buf = [0u8; 1024];
    while !seen.contains(needle) {
        assert!(Instant::now() < deadline, "timed out waiting for {needle:?}: {seen:?}");
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "connection closed before {needle:?}: {seen:?}");
        seen.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
    seen
}

#[test]
fn test_file_page() {
    let harness = Harness::start();
    let path = harness.track("a.md", "# Hello\n\nThis is **bold**.");

    let (status, body) = harness.get(&format!("/?file={}", path.display()));
    assert_eq!(status, 200);
    assert!(body.contains("text/html"));
    assert!(body.contains("<h1"));
    assert!(body.contains("<strong>bold</strong>"));
    assert!(body.contains("<title>a.md</title>"));
    assert!(body.contains("EventSource"));
}

#[test]
fn test_untracked_page_is_404() {
    let harness = Harness::start();
    let (status, _) = harness.get("/?file=/nowhere/x.md");
    assert_eq!(status, 404);

    let (status, _) = harness.get("/nothing-here");
    assert_eq!(status, 404);
}

#[test]
fn test_index_page() {
    let harness = Harness::start();
    let (status, body) = harness.get("/");
    assert_eq!(status, 200);
    assert!(body.contains("No files tracked yet"));

    harness.track("b.md", "b");
    harness.track("a.md", "a");
    let (_, body) = harness.get("/");
    let a = body.find(">a.md</a>").unwrap();
    let b = body.find(">b.md</a>").unwrap();
    assert!(a < b);
}

#[test]
fn test_head_and_methods() {
    let harness = Harness::start();
    let (status, raw) = harness.request("HEAD", "/");
    assert_eq!(status, 200);
    assert!(!raw.contains("<html"));

    let (status, raw) = harness.request("POST", "/");
    assert_eq!(status, 405);
    assert!(raw.contains("Allow: GET, HEAD"));
}

#[test]
fn test_events_errors() {
    let harness = Harness::start();
    let (status, _) = harness.get("/events");
    assert_eq!(status, 400);

    let (status, _) = harness.get("/events?file=/nowhere/x.md");
    assert_eq!(status, 404);
}

#[test]
fn test_file_event_stream() {
    let harness = Harness::start();
    let path = harness.track("a.md", "# a");

    let mut stream = harness.connect();
    write!(
        stream,
        "GET /events?file={} HTTP/1.1\r\nHost: localhost\r\n\r\n",
        path.display()
    )
    .unwrap();

    let head = read_until(&mut stream, ": connected\n\n");
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains("Content-Type: text/event-stream"));

    // the stream thread subscribed before writing the first frame
    assert_eq!(harness.registry.publish(&Scope::File(path.clone()), RELOAD), 1);
    read_until(&mut stream, "data: reload\n\n");

    // client leaves: the subscriber is dropped on the next write
    drop(stream);
    let file = harness.registry.get(&path).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !file.subscribers().is_empty() {
        assert!(Instant::now() < deadline, "subscriber not released");
        harness.registry.publish(&Scope::File(path.clone()), RELOAD);
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_index_event_stream() {
    let harness = Harness::start();

    let mut stream = harness.connect();
    write!(stream, "GET /events/index HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
    read_until(&mut stream, ": connected\n\n");

    harness.track("new.md", "# new");
    read_until(&mut stream, "data: reload\n\n");
}

#[test]
fn test_static_asset() {
    let harness = Harness::start();
    let path = harness.track("doc.md", "![logo](img/logo.svg)");
    fs::create_dir(harness.dir.path().join("img")).unwrap();
    fs::write(harness.dir.path().join("img/logo.svg"), "<svg/>").unwrap();

    let (status, raw) = harness.get(&format!("/img/logo.svg?file={}", path.display()));
    assert_eq!(status, 200);
    assert!(raw.contains("image/svg+xml"));
    assert!(raw.ends_with("<svg/>"));

    let (status, _) = harness.get(&format!("/../../etc/passwd?file={}", path.display()));
    assert_eq!(status, 404);

    let (status, _) = harness.get("/img/logo.svg?file=/nowhere/x.md");
    assert_eq!(status, 404);
}

#[test]
fn test_image_from_rendered_page() {
    let harness = Harness::start();
    fs::create_dir(harness.dir.path().join("img")).unwrap();
    fs::write(harness.dir.path().join("img/logo.svg"), "<svg/>").unwrap();
    let path = harness.track("doc.md", "![logo](img/logo.svg)");

    let (_, page) = harness.get(&format!("/?file={}", path.display()));
    let start = page.find("src=\"").unwrap() + "src=\"".len();
    let len = page[start..].find('"').unwrap();
    let src = &page[start..start + len];
    assert!(src.starts_with("img/logo.svg?file="));

    // the page lives at `/`, so the browser resolves `src` against it
    let (status, raw) = harness.get(&format!("/{src}"));
    assert_eq!(status, 200);
    assert!(raw.ends_with("<svg/>"));
}

#[test]
fn test_urls() {
    assert_eq!(
        super::file_url(6333, std::path::Path::new("/tmp/a.md")),
        "http://localhost:6333/?file=/tmp/a.md"
    );
    assert_eq!(super::index_url(6333), "http://localhost:6333/");
}
