use crate::http::headers::HeaderMap;

/// The first line of a request, e.g. `GET /coffee HTTP/1.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The method token as sent (`GET`, `POST`, ...). Not validated.
    pub method: String,
    /// The request target (e.g. "/index.html?q=1")
    pub target: String,
    /// The version after `HTTP/`. Always "1.1" for a parsed request.
    pub http_version: String,
}

/// A fully parsed HTTP request.
///
/// Built by [`RequestParser`](crate::http::parser::RequestParser) and handed
/// to the handler by shared reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: HeaderMap,
    /// Empty unless the request carried a `Content-Length`.
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<String>,
    target: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            request_line: RequestLine {
                method: self.method.ok_or("method missing")?,
                target: self.target.ok_or("target missing")?,
                http_version: "1.1".to_string(),
            },
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// The declared `Content-Length`, if present and a plain decimal number.
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").and_then(parse_content_length)
    }
}

/// Parses a `Content-Length` value. Only ASCII digits are accepted, so signs
/// and whitespace are rejected.
pub(crate) fn parse_content_length(value: &str) -> Option<usize> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_digits_only() {
        assert_eq!(parse_content_length("0"), Some(0));
        assert_eq!(parse_content_length("1500"), Some(1500));
        assert_eq!(parse_content_length("+5"), None);
        assert_eq!(parse_content_length("-1"), None);
        assert_eq!(parse_content_length(" 5"), None);
        assert_eq!(parse_content_length(""), None);
    }
}
