//! The raw request abstraction handed to the core by a transport, plus HTTP/1.1 head
//! parsing for the bundled transport adapter using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::Headers;

/// Errors that can occur while parsing an HTTP/1.1 request head off the wire.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete: more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length header: {value:?}")]
    InvalidContentLength { value: String },
}

/// A request exactly as the transport received it.
///
/// Nothing here is validated: the method may be empty and the path may contain
/// malformed escapes. [`crate::normalize::normalize`] is the only place that turns a
/// `RawRequest` into something the router trusts.
///
/// # Examples
///
/// ```
/// use restcore::http::RawRequest;
///
/// let req = RawRequest::new("GET", "/users/42?fields=name")
///     .header("Accept", "application/json");
/// assert_eq!(req.raw_path, "/users/42?fields=name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: String,
    pub raw_path: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl RawRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: impl Into<String>, raw_path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            raw_path: raw_path.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// The parsed head of an HTTP/1.1 request, before its body has been read.
#[derive(Debug)]
pub struct RequestHead {
    method: String,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    body_offset: usize,
}

impl RequestHead {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parse the request line and headers from `buf`.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: more data is needed to complete the headers.
    /// - [`RequestError::Parse`]: the data is malformed and cannot be parsed.
    /// - [`RequestError::MissingField`]: a required field (method, path, version) is absent.
    pub fn parse(buf: &[u8]) -> Result<Self, RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = raw_req
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .to_owned();
        let path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?
            .to_owned();
        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        Ok(Self {
            method,
            path,
            version,
            headers: header_map,
            body_offset,
        })
    }

    /// Byte offset in the parsed buffer at which the body begins.
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// Returns the declared body length; an absent header means an empty body.
    pub fn content_length(&self) -> Result<usize, RequestError> {
        match self.headers.get("content-length") {
            None => Ok(0),
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| RequestError::InvalidContentLength {
                    value: v.to_owned(),
                }),
        }
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Combine the head with its body into the transport-neutral request.
    pub fn into_request(self, body: Bytes) -> RawRequest {
        RawRequest {
            method: self.method,
            raw_path: self.path,
            headers: self.headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET /users/42?x=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let head = RequestHead::parse(raw).unwrap();
        assert_eq!(head.body_offset(), raw.len());
        assert_eq!(head.content_length().unwrap(), 0);
        let req = head.into_request(Bytes::new());
        assert_eq!(req.method, "GET");
        assert_eq!(req.raw_path, "/users/42?x=1");
        assert_eq!(req.headers.get("host"), Some("localhost"));
    }

    #[test]
    fn incomplete_request() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(
            RequestHead::parse(raw),
            Err(RequestError::Incomplete)
        ));
    }

    #[test]
    fn keep_alive_defaults() {
        let h11 = RequestHead::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(h11.is_keep_alive());
        let h10 = RequestHead::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!h10.is_keep_alive());
        let close = RequestHead::parse(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!close.is_keep_alive());
    }

    #[test]
    fn content_length_parsed_and_validated() {
        let raw = b"POST /u HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let head = RequestHead::parse(raw).unwrap();
        assert_eq!(head.content_length().unwrap(), 5);
        assert_eq!(&raw[head.body_offset()..], b"hello");

        let bad = RequestHead::parse(b"POST /u HTTP/1.1\r\nContent-Length: five\r\n\r\n").unwrap();
        assert!(matches!(
            bad.content_length(),
            Err(RequestError::InvalidContentLength { .. })
        ));
    }
}
