//! What a handler hands back: [`HandlerOutcome`] on success, [`HandlerError`] on failure.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::DispatchError;
use crate::http::StatusCode;

/// A hypermedia link: a relation plus the URI it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }

    /// RFC 8288 `Link` header form, e.g. `</users/42>; rel="self"`.
    pub fn to_header_value(&self) -> String {
        format!("<{}>; rel=\"{}\"", self.href, self.rel)
    }
}

/// Cache directive a handler attaches to a cacheable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Shared caches may store the response for `max_age` seconds.
    Public(u32),
    /// Only the client's own cache may store it.
    Private(u32),
    /// Caches must revalidate before reuse.
    NoCache,
    /// Nothing may store it.
    NoStore,
}

impl CachePolicy {
    /// Convert to a `Cache-Control` header value.
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::Private(max_age) => format!("private, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
            Self::NoStore => "no-store".to_string(),
        }
    }

    /// Whether any cache may keep a copy.
    pub fn is_storable(self) -> bool {
        !matches!(self, Self::NoStore)
    }
}

/// The kind of result the handler declares, which decides the success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// A representation was produced: 200, or 204 when there is no body.
    Produced,
    /// A new resource was created: 201.
    Created,
    /// Work was accepted for later processing: 202.
    Accepted,
    /// Nothing to return: 204.
    NoContent,
}

/// A successful handler result.
///
/// # Examples
///
/// ```
/// use restcore::handler::{CachePolicy, HandlerOutcome};
/// use restcore::http::StatusCode;
/// use serde_json::json;
///
/// let outcome = HandlerOutcome::ok(json!({ "id": 42 }))
///     .link("collection", "/users")
///     .cacheable(CachePolicy::Public(60));
/// assert_eq!(outcome.status(), StatusCode::Ok);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    intent: Intent,
    body: Option<Value>,
    links: Vec<Link>,
    cache: Option<CachePolicy>,
    location: Option<String>,
}

impl HandlerOutcome {
    fn with_intent(intent: Intent, body: Option<Value>) -> Self {
        Self {
            intent,
            body,
            links: Vec::new(),
            cache: None,
            location: None,
        }
    }

    /// A produced representation (200).
    pub fn ok(body: Value) -> Self {
        Self::with_intent(Intent::Produced, Some(body))
    }

    /// A newly created resource (201).
    pub fn created(body: Value) -> Self {
        Self::with_intent(Intent::Created, Some(body))
    }

    /// Accepted for asynchronous processing (202).
    pub fn accepted(body: Option<Value>) -> Self {
        Self::with_intent(Intent::Accepted, body)
    }

    /// No representation (204).
    pub fn no_content() -> Self {
        Self::with_intent(Intent::NoContent, None)
    }

    /// Serialize any `T: Serialize` into a body value.
    ///
    /// # Errors
    ///
    /// An internal [`HandlerError`] if `T`'s `Serialize` impl fails.
    pub fn to_body<T: Serialize>(value: &T) -> Result<Value, HandlerError> {
        serde_json::to_value(value)
            .map_err(|e| HandlerError::internal(format!("response serialization failed: {e}")))
    }

    /// Declare an extra hypermedia link.
    #[must_use]
    pub fn link(mut self, rel: impl Into<String>, href: impl Into<String>) -> Self {
        self.links.push(Link::new(rel, href));
        self
    }

    /// Mark the result cacheable under `policy`.
    #[must_use]
    pub fn cacheable(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    /// URI of the resource a `created` result made; rendered as `Location`.
    #[must_use]
    pub fn location(mut self, href: impl Into<String>) -> Self {
        self.location = Some(href.into());
        self
    }

    /// Success status implied by the declared intent.
    pub fn status(&self) -> StatusCode {
        match self.intent {
            Intent::Produced if self.body.is_some() => StatusCode::Ok,
            Intent::Produced | Intent::NoContent => StatusCode::NoContent,
            Intent::Created => StatusCode::Created,
            Intent::Accepted => StatusCode::Accepted,
        }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// The body; always `None` for [`Intent::NoContent`].
    pub fn body(&self) -> Option<&Value> {
        match self.intent {
            Intent::NoContent => None,
            _ => self.body.as_ref(),
        }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn cache_policy(&self) -> Option<CachePolicy> {
        self.cache
    }

    pub fn location_href(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Option<Value>, Vec<Link>, Option<CachePolicy>, Option<String>) {
        let body = match self.intent {
            Intent::NoContent => None,
            _ => self.body,
        };
        (body, self.links, self.cache, self.location)
    }
}

/// A failed handler result.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The request was understood but is not acceptable; rendered as 400–422.
    #[error("{message}")]
    Client { status: StatusCode, message: String },

    /// Something went wrong on our side; rendered as 500 without the detail.
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// A client error with an explicit status.
    ///
    /// Statuses outside 400–422 are coerced to 400: a handler may only declare
    /// validation-type problems.
    pub fn client(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Client {
            status: clamp_client_status(status),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::client(StatusCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::client(StatusCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::client(StatusCode::Conflict, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::client(StatusCode::UnprocessableEntity, message)
    }

    /// An unexpected failure; `detail` is logged, never sent to the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Client { status, .. } => clamp_client_status(*status),
            Self::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

/// Client errors stay within 400–422, also when the variant is built by hand.
fn clamp_client_status(status: StatusCode) -> StatusCode {
    if (400..=422).contains(&status.as_u16()) {
        status
    } else {
        StatusCode::BadRequest
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Client { status, message } => DispatchError::Client {
                status: clamp_client_status(status),
                message,
            },
            HandlerError::Internal(detail) => DispatchError::Server { detail },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_follows_intent() {
        assert_eq!(HandlerOutcome::ok(json!({})).status(), StatusCode::Ok);
        assert_eq!(HandlerOutcome::created(json!({})).status(), StatusCode::Created);
        assert_eq!(HandlerOutcome::accepted(None).status(), StatusCode::Accepted);
        assert_eq!(HandlerOutcome::no_content().status(), StatusCode::NoContent);
        assert_eq!(HandlerOutcome::ok(Value::Null).status(), StatusCode::Ok);
    }

    #[test]
    fn no_content_never_has_a_body() {
        let outcome = HandlerOutcome::no_content().link("up", "/users");
        assert!(outcome.body().is_none());
        assert_eq!(outcome.links().len(), 1);
    }

    #[test]
    fn hand_built_client_variant_is_clamped_on_conversion() {
        let err = HandlerError::Client {
            status: StatusCode::InternalServerError,
            message: "m".into(),
        };
        assert_eq!(err.status(), StatusCode::BadRequest);

        let dispatched: DispatchError = err.into();
        assert_eq!(dispatched.kind(), "ClientError");
        assert_eq!(dispatched.status(), StatusCode::BadRequest);
    }

    #[test]
    fn client_status_is_clamped_to_validation_range() {
        assert_eq!(
            HandlerError::client(StatusCode::Conflict, "taken").status(),
            StatusCode::Conflict
        );
        assert_eq!(
            HandlerError::client(StatusCode::GatewayTimeout, "nope").status(),
            StatusCode::BadRequest
        );
        assert_eq!(
            HandlerError::client(StatusCode::Ok, "nope").status(),
            StatusCode::BadRequest
        );
    }

    #[test]
    fn handler_errors_map_onto_dispatch_errors() {
        let client: DispatchError = HandlerError::unprocessable("name required").into();
        assert_eq!(client.kind(), "ClientError");
        assert_eq!(client.status(), StatusCode::UnprocessableEntity);

        let internal: DispatchError = HandlerError::internal("disk full").into();
        assert_eq!(internal.kind(), "ServerError");
        assert_eq!(internal.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn header_forms() {
        assert_eq!(
            Link::new("self", "/users/42").to_header_value(),
            "</users/42>; rel=\"self\""
        );
        assert_eq!(CachePolicy::Public(60).to_header_value(), "public, max-age=60");
        assert_eq!(CachePolicy::NoStore.to_header_value(), "no-store");
    }
}
