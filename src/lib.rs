//! rawhttp - HTTP/1.1 straight off a TCP socket
//!
//! Request parsing, response serialization and the connection lifecycle
//! are implemented here directly on byte streams; there is no HTTP library
//! underneath.

pub mod config;
pub mod http;
pub mod proxy;
pub mod routes;
pub mod server;
