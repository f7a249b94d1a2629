use std::future::Future;

use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::response::HandlerError;
use crate::http::writer::ResponseWriter;

/// Application callback invoked once per parsed request.
///
/// The handler owns the whole response: status line, headers and body, in
/// the order [`ResponseWriter`] expects. Returning `Err` before anything has
/// been written makes the server write the error as the response instead.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        writer: &mut ResponseWriter<W>,
        request: &Request,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}
