//! Shared helpers for CLI integration tests.
//!
//! Runs the binary against an isolated config and bucket directory and a
//! loopback HTTP responder standing in for the annotation provider.

#![allow(dead_code, clippy::unwrap_used, deprecated)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use assert_cmd::Command;
use portrait_qa_test_support::{AnnotationBuilder, FaceBuilder, PortraitBuilder};

/// Loopback HTTP server answering every POST with the same JSON body.
pub struct StubProvider {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl StubProvider {
    pub fn start(status: u16, body: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/images:annotate", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    let lower = line.to_ascii_lowercase();
                    if let Some(value) = lower.strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
                let mut request_body = vec![0u8; content_length];
                let _ = reader.read_exact(&mut request_body);
                counter.fetch_add(1, Ordering::SeqCst);

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { url, hits }
    }

    /// Serves a single annotation response.
    pub fn annotating(builder: AnnotationBuilder) -> Self {
        let payload = serde_json::to_value(builder.build()).unwrap();
        Self::start(200, serde_json::json!({ "responses": [payload] }).to_string())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A 600x600 portrait and a provider that sees one adult face on it.
pub fn portrait_with_one_face() -> (Vec<u8>, StubProvider) {
    let portrait = PortraitBuilder::new(600, 600);
    let provider = StubProvider::annotating(
        AnnotationBuilder::new()
            .face(FaceBuilder::new(portrait.face_box()).age(25, 35, 0.8))
            .person(0.2, 0.1, 0.8, 0.95),
    );
    (portrait.jpeg(), provider)
}

/// Workspace with an isolated config home and bucket.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bucket(&self) -> PathBuf {
        self.path().join("bucket")
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Command with cwd, config home and bucket pointed into the workspace.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("portrait-qa").unwrap();
        cmd.current_dir(self.path())
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env("HOME", self.path())
            .env_remove("PORTRAIT_QA_API_KEY")
            .arg("--quiet")
            .arg("--storage-dir")
            .arg(self.bucket());
        cmd
    }

    /// Files left below a bucket prefix.
    pub fn stored(&self, prefix: &str) -> Vec<PathBuf> {
        fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, out);
                } else {
                    out.push(path);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.bucket().join(prefix), &mut out);
        out
    }
}

/// Parses JSONL stdout into values.
pub fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
