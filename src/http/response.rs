//! The raw response abstraction returned to the transport, and its HTTP/1.1
//! serialization for the bundled transport adapter.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Headers, StatusCode};

/// A response ready to be written by the transport.
///
/// # Examples
///
/// ```
/// use restcore::http::{RawResponse, StatusCode};
///
/// let mut response = RawResponse::new(StatusCode::Ok);
/// response.headers.insert("Content-Type", "application/json");
/// response.body = r#"{"status":"ok"}"#.into();
///
/// let bytes = response.into_bytes(true);
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a response with the given status, no headers, and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Returns the body as UTF-8 text, or `None` if it is not valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// Adds `Connection` and `Content-Length`; every other header is written as the
    /// composer produced it.
    pub fn into_bytes(mut self, keep_alive: bool) -> BytesMut {
        let content_length = self.body.len();

        let connection = if keep_alive { "keep-alive" } else { "close" };
        self.headers.set("Connection", connection);
        self.headers.remove("content-length");

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);

        if !self.body.is_empty() {
            buf.put(self.body);
        }

        buf
    }
}
