//! Tests for upstream forwarding and the chunked `/httpbin` route

use rawhttp::config::RoutesConfig;
use rawhttp::http::request::RequestBuilder;
use rawhttp::http::writer::ResponseWriter;
use rawhttp::proxy::upstream::{READ_SIZE, Upstream, build_request};
use rawhttp::routes::{PAGE_INTERNAL_SERVER_ERROR, Routes};
use rawhttp::server::Handler;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Serves one canned response and hands back the request it received.
async fn stub_upstream(response: Vec<u8>) -> (Url, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.ends_with(b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8(request).unwrap()
    });

    (url, task)
}

fn response_with_body(body: &[u8], content_length: bool) -> Vec<u8> {
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n".to_vec();
    if content_length {
        response.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    response.extend_from_slice(b"\r\n");
    response.extend_from_slice(body);
    response
}

async fn collect(upstream: &Upstream, path: &str) -> (u16, Vec<Vec<u8>>) {
    let mut response = upstream.get(path).await.unwrap();
    let mut chunks = Vec::new();
    while let Some(chunk) = response.next_chunk().await.unwrap() {
        chunks.push(chunk.to_vec());
    }
    (response.status, chunks)
}

#[test]
fn test_build_request_default_port() {
    let url = Url::parse("http://httpbin.org/stream/10").unwrap();
    let request = String::from_utf8(build_request(&url)).unwrap();

    assert!(request.starts_with("GET /stream/10 HTTP/1.0\r\n"));
    assert!(request.contains("Host: httpbin.org\r\n"));
    assert!(request.contains("Connection: close\r\n"));
    assert!(request.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_get_with_content_length() {
    let body = vec![b'x'; 2500];
    let (url, stub) = stub_upstream(response_with_body(&body, true)).await;

    let (status, chunks) = collect(&Upstream::new(url), "/bytes/2500").await;

    assert_eq!(status, 200);
    assert!(chunks.iter().all(|c| c.len() <= READ_SIZE));
    assert_eq!(chunks.concat(), body);

    let request = stub.await.unwrap();
    assert!(request.starts_with("GET /bytes/2500 HTTP/1.0\r\n"));
}

#[tokio::test]
async fn test_get_until_close() {
    let body = b"{\"streamed\": true}".to_vec();
    let (url, stub) = stub_upstream(response_with_body(&body, false)).await;

    let (_, chunks) = collect(&Upstream::new(url), "/get").await;

    assert_eq!(chunks.concat(), body);
    stub.await.unwrap();
}

#[tokio::test]
async fn test_response_headers_are_parsed() {
    let (url, stub) = stub_upstream(response_with_body(b"{}", true)).await;

    let response = Upstream::new(url).get("/get").await.unwrap();

    assert_eq!(response.headers.get("content-type"), Some("application/json"));
    assert_eq!(response.headers.get("content-length"), Some("2"));
    drop(response);
    stub.await.unwrap();
}

#[tokio::test]
async fn test_truncated_body_is_an_error() {
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n".to_vec();
    response.extend_from_slice(b"short");
    let (url, stub) = stub_upstream(response).await;

    let mut upstream = Upstream::new(url).get("/").await.unwrap();
    assert_eq!(upstream.next_chunk().await.unwrap().unwrap().as_ref(), b"short");
    assert!(upstream.next_chunk().await.is_err());
    stub.await.unwrap();
}

#[tokio::test]
async fn test_scheme_relative_path_stays_on_configured_host() {
    let (url, stub) = stub_upstream(response_with_body(b"{}", true)).await;

    // a second listener the request must never reach
    let other = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let other_addr = other.local_addr().unwrap();

    let path = format!("//{}/secret", other_addr);
    let (status, chunks) = collect(&Upstream::new(url), &path).await;
    assert_eq!(status, 200);
    assert_eq!(chunks.concat(), b"{}");

    let request = stub.await.unwrap();
    assert!(request.starts_with(&format!("GET //{}/secret HTTP/1.0\r\n", other_addr)));

    let stray = tokio::time::timeout(std::time::Duration::from_millis(50), other.accept()).await;
    assert!(stray.is_err());
}

#[tokio::test]
async fn test_base_path_is_kept() {
    let (url, stub) = stub_upstream(response_with_body(b"{}", true)).await;
    let base = url.join("/api").unwrap();

    collect(&Upstream::new(base), "/stream/5?n=1").await;

    let request = stub.await.unwrap();
    assert!(request.starts_with("GET /api/stream/5?n=1 HTTP/1.0\r\n"));
}

#[tokio::test]
async fn test_unreachable_upstream() {
    // bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let upstream = Upstream::new(Url::parse(&format!("http://{}", addr)).unwrap());
    assert!(upstream.get("/get").await.is_err());
}

#[tokio::test]
async fn test_httpbin_route_streams_chunks_with_trailers() {
    let body = vec![b'z'; 1500];
    let (url, stub) = stub_upstream(response_with_body(&body, true)).await;
    let routes = Routes::new(&RoutesConfig {
        upstream: url,
        ..RoutesConfig::default()
    });

    let request = RequestBuilder::new()
        .method("GET")
        .target("/httpbin/bytes/1500")
        .build()
        .unwrap();
    let mut writer = ResponseWriter::new(Vec::new());
    routes.handle(&mut writer, &request).await.unwrap();
    let out = String::from_utf8(writer.into_inner()).unwrap();

    let (head, rest) = out.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("transfer-encoding: chunked"));
    assert!(head.contains("trailer: X-Content-SHA256, X-Content-Length"));
    assert!(!head.contains("content-length"));

    let mut chunks = Vec::new();
    let mut rest = rest;
    loop {
        let (size, after) = rest.split_once("\r\n").unwrap();
        let size = usize::from_str_radix(size, 16).unwrap();
        if size == 0 {
            rest = after;
            break;
        }
        chunks.push(&after[..size]);
        assert_eq!(&after[size..size + 2], "\r\n");
        rest = &after[size + 2..];
    }
    assert!(chunks.iter().all(|c| c.len() <= READ_SIZE));
    assert_eq!(chunks.concat(), "z".repeat(1500));

    let expected_hash = format!("{:x}", Sha256::digest(&body));
    assert_eq!(
        rest,
        format!(
            "X-Content-SHA256: {}\r\nX-Content-Length: 1500\r\n\r\n",
            expected_hash
        )
    );

    let forwarded = stub.await.unwrap();
    assert!(forwarded.starts_with("GET /bytes/1500 HTTP/1.0\r\n"));
}

#[tokio::test]
async fn test_httpbin_route_upstream_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let routes = Routes::new(&RoutesConfig {
        upstream: Url::parse(&format!("http://{}", addr)).unwrap(),
        ..RoutesConfig::default()
    });
    let request = RequestBuilder::new().method("GET").target("/httpbin/get").build().unwrap();
    let mut writer = ResponseWriter::new(Vec::new());
    routes.handle(&mut writer, &request).await.unwrap();
    let out = String::from_utf8(writer.into_inner()).unwrap();

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(out.ends_with(PAGE_INTERNAL_SERVER_ERROR));
}
