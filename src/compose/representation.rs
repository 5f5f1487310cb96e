//! Representation formats and `Accept`-based selection among them.

use serde_json::Value;
use thiserror::Error;

/// A representation could not be produced.
#[derive(Debug, Error)]
#[error("cannot encode as {media_type}: {reason}")]
pub struct EncodeError {
    pub media_type: String,
    pub reason: String,
}

/// A serialized encoding of resource state.
///
/// The composer holds an ordered list of these; JSON is always present and is the
/// fallback when a client's `Accept` header admits nothing registered.
pub trait Representation: Send + Sync + 'static {
    /// Media type without parameters, e.g. `application/json`.
    fn media_type(&self) -> &str;

    /// Full `Content-Type` header value.
    fn content_type(&self) -> String {
        self.media_type().to_owned()
    }

    /// Encode a body.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError>;
}

/// `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Representation for Json {
    fn media_type(&self) -> &str {
        "application/json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(value).map_err(|e| EncodeError {
            media_type: self.media_type().to_owned(),
            reason: e.to_string(),
        })
    }
}

/// Does `accept` (an `Accept` header value) admit `media_type`?
///
/// Understands `type/subtype`, `type/*`, `*/*`, and treats `q=0` as a refusal.
/// Parameters other than `q` are ignored.
pub fn accepts(accept: &str, media_type: &str) -> bool {
    let (want_type, want_sub) = media_type.split_once('/').unwrap_or((media_type, ""));

    accept.split(',').any(|range| {
        let mut parts = range.split(';');
        let Some(mime) = parts.next().map(str::trim) else {
            return false;
        };

        let refused = parts.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        if refused {
            return false;
        }

        let (ty, sub) = mime.split_once('/').unwrap_or((mime, ""));
        match (ty, sub) {
            ("*", "*") => true,
            (ty, "*") => ty.eq_ignore_ascii_case(want_type),
            (ty, sub) => ty.eq_ignore_ascii_case(want_type) && sub.eq_ignore_ascii_case(want_sub),
        }
    })
}
