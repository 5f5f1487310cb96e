//! Per-request context handed to a handler.
//!
//! A [`Context`] owns copies of exactly one request's data: its path parameters,
//! query parameters, headers, body, and (when an authenticator vouched for it) the
//! caller's identity. It holds no reference to the transport, to the registry, or to
//! any other request, so two handlers running at the same time can never observe
//! each other's data.

use std::collections::HashMap;

use bytes::Bytes;

use crate::auth::Identity;
use crate::handler::HandlerError;
use crate::http::{Headers, Method, StatusCode};
use crate::normalize::NormalizedRequest;

/// Path parameters captured from the matched URI template.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    /// Create a new empty parameters map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a captured value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    /// Get a captured value by parameter name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Everything a handler may know about the request it is serving.
#[derive(Debug)]
pub struct Context {
    method: Method,
    path: String,
    params: PathParams,
    query: HashMap<String, String>,
    headers: Headers,
    body: Bytes,
    identity: Option<Identity>,
}

impl Context {
    /// Build a context from a normalized request and the parameters the router captured.
    ///
    /// Consumes both, so nothing from the request outlives the handler call.
    pub fn new(request: NormalizedRequest, params: PathParams, identity: Option<Identity>) -> Self {
        let NormalizedRequest {
            method,
            path,
            headers,
            body,
            query,
            ..
        } = request;

        Self {
            method,
            path,
            params,
            query,
            headers,
            body,
            identity,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path as received, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Shorthand for a captured path parameter that the template guarantees exists.
    ///
    /// # Errors
    ///
    /// A [`HandlerError`] with status 400 when the parameter is absent, which only
    /// happens if the handler asks for a name its template does not declare.
    pub fn param(&self, name: &str) -> Result<&str, HandlerError> {
        self.params
            .get(name)
            .ok_or_else(|| HandlerError::bad_request(format!("missing path parameter {name:?}")))
    }

    /// Typed path parameter, e.g. `ctx.param_as::<u64>("id")`.
    ///
    /// # Errors
    ///
    /// A 400 [`HandlerError`] when the value is absent or does not parse.
    pub fn param_as<T: std::str::FromStr>(&self, name: &str) -> Result<T, HandlerError> {
        let raw = self.param(name)?;
        raw.parse().map_err(|_| {
            HandlerError::bad_request(format!("path parameter {name:?} has invalid value {raw:?}"))
        })
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Request headers; names are lower-case.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// A 400 [`HandlerError`] for an empty body, a 422 for a body that is JSON but does
    /// not fit `T`, and a 400 for anything that is not JSON at all.
    pub fn json<T>(&self) -> Result<T, HandlerError>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.body.is_empty() {
            return Err(HandlerError::bad_request("request body is empty"));
        }
        serde_json::from_slice(&self.body).map_err(|e| {
            let status = if e.is_data() {
                StatusCode::UnprocessableEntity
            } else {
                StatusCode::BadRequest
            };
            HandlerError::client(status, format!("invalid JSON body: {e}"))
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The caller's identity, or a 401 when the request was not authenticated.
    pub fn require_identity(&self) -> Result<&Identity, HandlerError> {
        self.identity
            .as_ref()
            .ok_or_else(|| HandlerError::client(StatusCode::Unauthorized, "authentication required"))
    }
}
