//! Upstream forwarding used by the demo `/httpbin` route.

pub mod upstream;

pub use upstream::{Upstream, UpstreamResponse};
