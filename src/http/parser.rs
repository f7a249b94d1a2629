use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::buffer::ByteStage;
use crate::http::headers::{DuplicatePolicy, HeaderMap, find_crlf};
use crate::http::request::{Request, RequestLine, parse_content_length};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("unsupported HTTP version")]
    UnsupportedHttpVersion,
    #[error("malformed header")]
    MalformedHeader,
    #[error("invalid header field name")]
    InvalidFieldName,
    #[error("duplicate header field name")]
    DuplicateFieldName,
    #[error("malformed body")]
    MalformedBody,
    #[error("connection closed before the request was complete")]
    Incomplete,
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Init,
    ParsingHeaders,
    ParsingBody,
    Done,
}

/// Incremental request parser.
///
/// Feed it whatever bytes are buffered with [`parse`](Self::parse); it
/// reports how many it consumed and keeps its place between calls.
#[derive(Debug)]
pub struct RequestParser {
    state: ParserState,
    request_line: Option<RequestLine>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_duplicate_policy(DuplicatePolicy::default())
    }

    pub fn with_duplicate_policy(policy: DuplicatePolicy) -> Self {
        Self {
            state: ParserState::Init,
            request_line: None,
            headers: HeaderMap::with_policy(policy),
            body: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Consumes as much of `data` as currently possible.
    ///
    /// Stops when the request is complete or a pass makes no progress, and
    /// returns the number of bytes consumed.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut consumed = 0;

        while self.state != ParserState::Done {
            let before = self.state;
            let n = self.parse_single(&data[consumed..])?;
            consumed += n;

            if n == 0 && self.state == before {
                break;
            }
        }

        Ok(consumed)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParserState::Init => {
                let Some((line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = Some(line);
                self.state = ParserState::ParsingHeaders;
                Ok(n)
            }

            ParserState::ParsingHeaders => {
                let (n, done) = self.headers.parse_one(data)?;
                if done {
                    self.state = ParserState::ParsingBody;
                }
                Ok(n)
            }

            ParserState::ParsingBody => {
                let Some(declared) = self.headers.get("content-length") else {
                    self.state = ParserState::Done;
                    return Ok(0);
                };
                let declared = parse_content_length(declared).ok_or(ParseError::MalformedBody)?;

                self.body.extend_from_slice(data);
                if self.body.len() > declared {
                    return Err(ParseError::MalformedBody);
                }
                if self.body.len() == declared {
                    self.state = ParserState::Done;
                }
                Ok(data.len())
            }

            ParserState::Done => Ok(0),
        }
    }

    /// Takes the finished request, or `None` if parsing isn't done.
    pub fn finish(self) -> Option<Request> {
        if self.state != ParserState::Done {
            return None;
        }
        Some(Request {
            request_line: self.request_line?,
            headers: self.headers,
            body: self.body,
        })
    }

    /// Drives this parser over `reader` until one request is complete.
    ///
    /// Returns `Ok(None)` when the peer closes before sending anything.
    /// Bytes staged after the end of the request are left in `stage`.
    pub async fn read_request<R>(
        mut self,
        reader: &mut R,
        stage: &mut ByteStage,
    ) -> Result<Option<Request>, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let consumed = self.parse(stage.filled())?;
            stage.consume(consumed);

            if self.is_done() {
                return Ok(self.finish());
            }

            stage.ensure_capacity();
            let n = reader.read(stage.spare_mut()).await?;

            if n == 0 {
                if self.state == ParserState::Init && stage.is_empty() {
                    return Ok(None);
                }
                return Err(ParseError::Incomplete);
            }

            stage.commit(n);
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads one request from `reader` with default settings.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut stage = ByteStage::new();
    RequestParser::new().read_request(reader, &mut stage).await
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(end) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..end]).map_err(|_| ParseError::MalformedRequestLine)?;
    let parts: Vec<&str> = line.split(' ').collect();
    let &[method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    let version_parts: Vec<&str> = version.split('/').collect();
    let &[_, http_version] = version_parts.as_slice() else {
        return Err(ParseError::UnsupportedHttpVersion);
    };
    if http_version != "1.1" {
        return Err(ParseError::UnsupportedHttpVersion);
    }

    let request_line = RequestLine {
        method: method.to_string(),
        target: target.to_string(),
        http_version: http_version.to_string(),
    };
    Ok(Some((request_line, end + 2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let mut parser = RequestParser::new();
        let consumed = parser.parse(req).unwrap();
        let parsed = parser.finish().unwrap();

        assert_eq!(parsed.target(), "/");
        assert_eq!(parsed.header("Host").unwrap(), "example.com");
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn waits_for_request_line() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET / HT").unwrap(), 0);
        assert_eq!(parser.state(), ParserState::Init);
    }

    #[test]
    fn stops_in_headers_without_blank_line() {
        let mut parser = RequestParser::new();
        let req = b"GET / HTTP/1.1\r\nHost: a\r\nAcc";

        let consumed = parser.parse(req).unwrap();

        assert_eq!(consumed, b"GET / HTTP/1.1\r\nHost: a\r\n".len());
        assert_eq!(parser.state(), ParserState::ParsingHeaders);
    }

    #[test]
    fn body_accumulates_across_calls() {
        let mut parser = RequestParser::new();
        let head = b"POST /submit HTTP/1.1\r\nContent-Length: 6\r\n\r\nabc";

        assert_eq!(parser.parse(head).unwrap(), head.len());
        assert_eq!(parser.state(), ParserState::ParsingBody);

        assert_eq!(parser.parse(b"def").unwrap(), 3);
        assert!(parser.is_done());
        assert_eq!(parser.finish().unwrap().body, b"abcdef");
    }

    #[test]
    fn done_parser_ignores_input() {
        let mut parser = RequestParser::new();
        parser.parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(parser.is_done());
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n\r\n").unwrap(), 0);
    }

    #[test]
    fn finish_before_done_is_none() {
        let mut parser = RequestParser::new();
        parser.parse(b"GET / HTTP/1.1\r\n").unwrap();
        assert!(parser.finish().is_none());
    }
}
