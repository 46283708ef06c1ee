//! Integration tests for the HTTP providers and fetcher against a local responder.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use portrait_qa_adapters::{DeepAnalysisProvider, HttpImageFetcher, HttpSettings, VisionProvider};
use portrait_qa_core::domain::ExternalServiceError;
use portrait_qa_core::ports::{ProviderRequest, ProviderResponse};
use portrait_qa_core::{FeatureProvider, ImageFetcher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Reply {
    status: u16,
    content_type: &'static str,
    body: &'static str,
}

const fn json(status: u16, body: &'static str) -> Reply {
    Reply {
        status,
        content_type: "application/json",
        body,
    }
}

/// Serves one reply per connection, in order, and counts requests.
async fn serve(replies: Vec<Reply>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        for reply in replies {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let head = format!(
                "HTTP/1.1 {} Canned\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                reply.status,
                reply.content_type,
                reply.body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(reply.body.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{addr}/v1"), hits)
}

async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + len {
            return;
        }
    }
}

fn settings() -> HttpSettings {
    HttpSettings {
        timeout: Duration::from_secs(5),
        retries: 2,
        backoff: Duration::from_millis(1),
        api_key: Some("secret".into()),
    }
}

fn request() -> ProviderRequest {
    ProviderRequest {
        bytes: Arc::new(vec![0xFF, 0xD8, 0xFF]),
        mime: "image/jpeg".into(),
        url: None,
        width: 800,
        height: 800,
    }
}

const ANNOTATION: &str = r#"{"responses":[{
    "faceAnnotations":[{
        "boundingPoly":{"vertices":[{"x":300,"y":200},{"x":500,"y":460}]},
        "detectionConfidence":0.97,
        "landmarks":[{"type":"LEFT_EYE","position":{"x":360,"y":290,"z":0}}]
    }],
    "labelAnnotations":[{"description":"Smile","score":0.91}]
}]}"#;

#[tokio::test]
async fn test_vision_parses_annotation() {
    let (url, hits) = serve(vec![json(200, ANNOTATION)]).await;
    let provider = VisionProvider::new(url, settings()).unwrap();

    let response = provider.detect(&request()).await.expect("detect");
    let ProviderResponse::Annotation(payload) = response else {
        panic!("expected annotation payload");
    };
    assert_eq!(payload.face_annotations.len(), 1);
    assert_eq!(payload.face_annotations[0].landmarks[0].kind, "LEFT_EYE");
    assert_eq!(payload.label_annotations[0].description, "Smile");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_vision_retries_transient_status() {
    let (url, hits) = serve(vec![json(503, "{}"), json(200, ANNOTATION)]).await;
    let provider = VisionProvider::new(url, settings()).unwrap();

    provider.detect(&request()).await.expect("second attempt succeeds");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_vision_does_not_retry_client_errors() {
    let (url, hits) = serve(vec![json(400, "{}")]).await;
    let provider = VisionProvider::new(url, settings()).unwrap();

    let err = provider.detect(&request()).await.expect_err("bad request");
    assert!(matches!(err, ExternalServiceError::Status { status: 400, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_vision_surfaces_per_image_error() {
    let body = r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#;
    let (url, _) = serve(vec![json(200, body)]).await;
    let provider = VisionProvider::new(url, settings()).unwrap();

    let err = provider.detect(&request()).await.expect_err("remote error");
    assert!(matches!(
        err,
        ExternalServiceError::Malformed { ref reason, .. } if reason == "Bad image data."
    ));
}

#[tokio::test]
async fn test_deep_analysis_parses_payload() {
    let body = r#"{
        "faces":[{"bbox":[0.3,0.2,0.3,0.35],"confidence":0.88,"age":31.0,"ageConfidence":0.7}],
        "attributes":{"hair_color":{"value":"brown","confidence":0.82}}
    }"#;
    let (url, _) = serve(vec![json(200, body)]).await;
    let provider = DeepAnalysisProvider::new(url, settings()).unwrap();

    let ProviderResponse::Deep(payload) = provider.detect(&request()).await.expect("detect") else {
        panic!("expected deep payload");
    };
    assert_eq!(payload.faces.len(), 1);
    assert_eq!(payload.faces[0].age, Some(31.0));
    assert_eq!(payload.attributes["hair_color"].value, "brown");
}

#[tokio::test]
async fn test_fetcher_returns_bytes_and_content_type() {
    let reply = Reply {
        status: 200,
        content_type: "image/png; charset=binary",
        body: "PNGDATA",
    };
    let (url, _) = serve(vec![reply]).await;
    let fetcher = HttpImageFetcher::new(settings()).unwrap();

    let fetched = fetcher.fetch(&url).await.expect("fetch");
    assert_eq!(fetched.bytes, b"PNGDATA");
    assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_fetcher_rejects_oversized_body() {
    let (url, _) = serve(vec![json(200, "0123456789")]).await;
    let fetcher = HttpImageFetcher::new(settings()).unwrap().with_max_bytes(4);

    let err = fetcher.fetch(&url).await.expect_err("too large");
    assert!(matches!(err, ExternalServiceError::Malformed { .. }));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = VisionProvider::new(
        format!("http://{addr}/v1"),
        HttpSettings {
            retries: 0,
            ..settings()
        },
    )
    .unwrap();
    let err = provider.detect(&request()).await.expect_err("nothing listening");
    assert!(matches!(err, ExternalServiceError::Unreachable { .. }));
}
