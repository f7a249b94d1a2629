//! HTTP protocol implementation.
//!
//! This module implements HTTP/1.1 on top of raw byte streams. Every
//! connection carries exactly one request and one response.
//!
//! # Architecture
//!
//! - **`buffer`**: `ByteStage`, holds bytes between reads until the parser can use them
//! - **`headers`**: case-insensitive `HeaderMap` and field-line parsing
//! - **`request`**: the parsed `Request` and its request line
//! - **`parser`**: incremental `RequestParser` state machine
//! - **`response`**: status codes, default headers and `HandlerError`
//! - **`writer`**: `ResponseWriter`, fixed-length or chunked bodies with trailers
//! - **`connection`**: drives one socket through parse, handle and write
//!
//! # Parser State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Init     │ ← Wait for the request line
//!        └──────┬──────┘
//!               │ "METHOD TARGET HTTP/1.1\r\n"
//!               ▼
//!        ┌──────────────────┐
//!        │  ParsingHeaders  │ ← One field line per step
//!        └──────┬───────────┘
//!               │ blank line
//!               ▼
//!        ┌──────────────────┐
//!        │   ParsingBody    │ ← Until Content-Length bytes
//!        └──────┬───────────┘
//!               │ body complete (or no Content-Length)
//!               ▼
//!        ┌──────────────────┐
//!        │      Done        │
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rawhttp::http::parser::read_request;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!     let (mut socket, _addr) = listener.accept().await?;
//!
//!     if let Some(request) = read_request(&mut socket).await? {
//!         println!("{} {}", request.method(), request.target());
//!     }
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
