//! Request normalization: the only path from untrusted transport input to the
//! canonical form the router matches on.
//!
//! | Raw path                 | Segments               |
//! |--------------------------|------------------------|
//! | `""` or `/`              | *(empty, the root)*    |
//! | `/users/42/`             | `users`, `42`          |
//! | `/files/a%20b`           | `files`, `a b`         |
//! | `/files/a%2Fb`           | `files`, `a/b`         |
//! | `/users//42`             | `users`, `""`, `42`    |

use std::collections::HashMap;

use bytes::Bytes;
use percent_encoding::percent_decode_str;

use crate::error::DispatchError;
use crate::http::{Headers, Method, RawRequest};

/// A canonical, self-descriptive request.
///
/// Owns all of its data; it keeps no handle on the transport that produced it.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) segments: Vec<String>,
    pub(crate) headers: Headers,
    pub(crate) body: Bytes,
    pub(crate) query: HashMap<String, String>,
}

impl NormalizedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path as received, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded path segments; empty for the root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Headers with lower-cased names.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The body, or `None` when the request carried no bytes.
    pub fn body(&self) -> Option<&Bytes> {
        (!self.body.is_empty()).then_some(&self.body)
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// Convert a raw request into a [`NormalizedRequest`].
///
/// # Errors
///
/// [`DispatchError::MalformedRequest`] when the method is missing or not a valid
/// token, the path does not start with `/`, or a path segment holds a bad
/// percent-escape or decodes to invalid UTF-8.
///
/// # Examples
///
/// ```
/// use restcore::http::RawRequest;
/// use restcore::normalize::normalize;
///
/// let req = normalize(RawRequest::new("GET", "/users/j%C3%B6rg?verbose=1")).unwrap();
/// assert_eq!(req.segments(), ["users", "jörg"]);
/// assert_eq!(req.query_param("verbose"), Some("1"));
/// ```
pub fn normalize(raw: RawRequest) -> Result<NormalizedRequest, DispatchError> {
    let RawRequest {
        method,
        raw_path,
        headers,
        body,
    } = raw;

    let method = parse_method(&method)?;

    let (path, query) = match raw_path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw_path.as_str(), None),
    };

    let segments = split_segments(path)?;
    let query = query.map(parse_query_string).unwrap_or_default();

    Ok(NormalizedRequest {
        method,
        path: path.to_owned(),
        segments,
        headers: headers.to_lowercase_names(),
        body,
        query,
    })
}

fn parse_method(method: &str) -> Result<Method, DispatchError> {
    if method.is_empty() {
        return Err(DispatchError::malformed("request method is missing"));
    }
    if !method.chars().all(is_token_char) {
        return Err(DispatchError::malformed(format!(
            "request method {method:?} is not a valid token"
        )));
    }
    // Unknown tokens become `Method::Custom`.
    let Ok(method) = method.parse::<Method>();
    Ok(method)
}

// RFC 9110 §5.6.2 `tchar`.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn split_segments(path: &str) -> Result<Vec<String>, DispatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| DispatchError::malformed(format!("path {path:?} must start with '/'")))?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    if rest.is_empty() {
        return Ok(Vec::new());
    }

    rest.split('/').map(decode_segment).collect()
}

fn decode_segment(segment: &str) -> Result<String, DispatchError> {
    let bytes = segment.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(DispatchError::malformed(format!(
                    "path segment {segment:?} has an invalid percent-escape"
                )));
            }
        }
    }

    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| {
            DispatchError::malformed(format!("path segment {segment:?} is not valid UTF-8"))
        })
}

/// Parses `key=value&key2=value2`; `+` decodes to a space and escapes are decoded
/// leniently, so a bad query never fails the request.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_query_part(key), decode_query_part(value))
        })
        .collect()
}

fn decode_query_part(part: &str) -> String {
    let spaced = part.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
