//! Listening socket, accept loop and connection task submission.

pub mod handler;
pub mod listener;
pub mod workers;

pub use handler::Handler;
pub use listener::Server;
