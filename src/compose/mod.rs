//! Response composition: turn a dispatch result into a self-descriptive response.
//!
//! On success the composer derives the status from the handler's declared intent,
//! picks a representation, renders the body, and attaches:
//!
//! - a `self` link (always first), then any links the handler declared, as RFC 8288
//!   `Link` headers and, for object bodies, as a `links` array inside the body;
//! - `Location` when the handler named the resource it created;
//! - `Cache-Control` and a strong `ETag` when the handler marked the result cacheable.
//!
//! On error it renders `{"kind": ..., "message": ...}` with the status from the error
//! taxonomy and no links. `405` responses carry `Allow`; `401` carries
//! `WWW-Authenticate`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Value, json};
use tracing::error;

use crate::dispatch::Dispatched;
use crate::error::DispatchError;
use crate::handler::Link;
use crate::http::{Headers, RawResponse, StatusCode};

pub mod representation;

pub use representation::{EncodeError, Json, Representation, accepts};

/// A composed response. Immutable: it can only be read or handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    links: Vec<Link>,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON; `None` for an empty or non-JSON body.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Hypermedia links in order; `self` first on success, empty on error.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Drop the link list (already rendered into headers) and hand over to the transport.
    pub fn into_raw(self) -> RawResponse {
        RawResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Builds [`Response`]s from dispatch results.
#[derive(Clone)]
pub struct ResponseComposer {
    representations: Vec<Arc<dyn Representation>>,
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self {
            representations: vec![Arc::new(Json)],
        }
    }
}

impl std::fmt::Debug for ResponseComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<&str> = self.representations.iter().map(|r| r.media_type()).collect();
        f.debug_struct("ResponseComposer")
            .field("representations", &types)
            .finish()
    }
}

impl ResponseComposer {
    /// A composer that only speaks JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer another representation. JSON stays the fallback.
    #[must_use]
    pub fn with_representation(mut self, representation: impl Representation) -> Self {
        self.representations.push(Arc::new(representation));
        self
    }

    /// Compose the response for one request.
    ///
    /// `accept` is the request's `Accept` header, if any.
    pub fn compose(&self, accept: Option<&str>, result: Result<Dispatched, DispatchError>) -> Response {
        let representation = self.negotiate(accept);
        match result {
            Ok(dispatched) => compose_success(representation, dispatched),
            Err(err) => compose_error(representation, &err),
        }
    }

    fn negotiate(&self, accept: Option<&str>) -> &dyn Representation {
        let fallback = || self.representations[0].as_ref();
        let Some(accept) = accept else {
            return fallback();
        };
        self.representations
            .iter()
            .find(|r| accepts(accept, r.media_type()))
            .map_or_else(fallback, |r| r.as_ref())
    }
}

fn compose_success(representation: &dyn Representation, dispatched: Dispatched) -> Response {
    let status = dispatched.outcome.status();
    let (body, declared, cache, location) = dispatched.outcome.into_parts();

    let mut links = vec![Link::new("self", dispatched.self_href)];
    links.extend(declared.into_iter().filter(|l| l.rel != "self"));

    let mut headers = Headers::new();
    let encoded = match body {
        Some(mut value) => {
            if let Value::Object(map) = &mut value {
                map.entry("links").or_insert_with(|| json!(links));
            }
            match representation.encode(&value) {
                Ok(bytes) => {
                    headers.insert("Content-Type", representation.content_type());
                    Bytes::from(bytes)
                }
                Err(e) => {
                    error!(error = %e, "failed to encode response body");
                    return compose_error(
                        representation,
                        &DispatchError::Server {
                            detail: e.to_string(),
                        },
                    );
                }
            }
        }
        None => Bytes::new(),
    };

    for link in &links {
        headers.insert("Link", link.to_header_value());
    }
    if let Some(location) = location {
        headers.insert("Location", location);
    }
    if let Some(policy) = cache {
        headers.insert("Cache-Control", policy.to_header_value());
        if policy.is_storable() && !encoded.is_empty() {
            headers.insert("ETag", generate_etag(&encoded));
        }
    }

    Response {
        status,
        headers,
        body: encoded,
        links,
    }
}

fn compose_error(representation: &dyn Representation, err: &DispatchError) -> Response {
    let value = json!({
        "kind": err.kind(),
        "message": err.public_message(),
    });

    let mut headers = Headers::new();
    let body = match representation.encode(&value) {
        Ok(bytes) => {
            headers.insert("Content-Type", representation.content_type());
            bytes
        }
        Err(_) => {
            // JSON of two strings cannot fail.
            headers.insert("Content-Type", Json.content_type());
            serde_json::to_vec(&value).unwrap_or_default()
        }
    };

    if let DispatchError::MethodNotAllowed { allowed, .. } = err {
        let allow = allowed
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        headers.insert("Allow", allow);
    }
    if err.status() == StatusCode::Unauthorized {
        headers.insert("WWW-Authenticate", "Bearer");
    }

    Response {
        status: err.status(),
        headers,
        body: Bytes::from(body),
        links: Vec::new(),
    }
}

/// Strong `ETag` over the encoded body, e.g. `"9f86d081884c7d65"`.
fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}
