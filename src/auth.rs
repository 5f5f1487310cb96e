//! Authentication collaborator interface.
//!
//! The dispatcher hands the `Authorization` header value to an [`Authenticator`] and
//! gets back an [`Identity`] or an [`AuthError`]. Validation logic itself (JWT
//! signatures, API key stores, ...) lives outside the core; the only implementation
//! shipped here is [`BearerTokens`], a fixed token table for tests and demos.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Who the caller is, as vouched for by the authenticator.
///
/// Carries no session state: it is produced per request and dropped with the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// The authenticator refused the credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("credentials rejected")]
    Rejected,

    #[error("authenticator unavailable: {0}")]
    Unavailable(String),
}

/// External authentication collaborator.
///
/// Any `Fn(String) -> impl Future<Output = Result<Identity, AuthError>>` closure that is
/// `Send + Sync + 'static` implements this trait via the blanket impl below.
pub trait Authenticator: Send + Sync + 'static {
    /// Validate the raw `Authorization` header value.
    fn authenticate(
        &self,
        authorization: String,
    ) -> Pin<Box<dyn Future<Output = Result<Identity, AuthError>> + Send>>;
}

impl<T, F> Authenticator for T
where
    T: Fn(String) -> F + Send + Sync + 'static,
    F: Future<Output = Result<Identity, AuthError>> + Send + 'static,
{
    fn authenticate(
        &self,
        authorization: String,
    ) -> Pin<Box<dyn Future<Output = Result<Identity, AuthError>> + Send>> {
        Box::pin((self)(authorization))
    }
}

/// Accepts `Bearer <token>` for a fixed set of tokens.
///
/// # Examples
///
/// ```
/// use restcore::auth::BearerTokens;
///
/// let tokens = BearerTokens::new().token("s3cret", "jdoe");
/// assert_eq!(tokens.subject_for("Bearer s3cret"), Ok("jdoe"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BearerTokens {
    tokens: HashMap<String, String>,
}

impl BearerTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as the credentials of `subject`.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }

    /// Resolve a header value to the subject it authenticates.
    pub fn subject_for(&self, authorization: &str) -> Result<&str, AuthError> {
        let (scheme, token) = authorization
            .trim()
            .split_once(' ')
            .ok_or(AuthError::UnsupportedScheme)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::UnsupportedScheme);
        }
        self.tokens
            .get(token.trim())
            .map(String::as_str)
            .ok_or(AuthError::Rejected)
    }
}

impl Authenticator for BearerTokens {
    fn authenticate(
        &self,
        authorization: String,
    ) -> Pin<Box<dyn Future<Output = Result<Identity, AuthError>> + Send>> {
        let result = self.subject_for(&authorization).map(Identity::new);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bearer_tokens() {
        let auth = BearerTokens::new().token("abc", "alice");
        assert_eq!(
            auth.authenticate("Bearer abc".into()).await.unwrap(),
            Identity::new("alice")
        );
        assert!(matches!(
            auth.authenticate("bearer   abc ".into()).await,
            Ok(id) if id.subject() == "alice"
        ));
        assert!(matches!(
            auth.authenticate("Bearer nope".into()).await,
            Err(AuthError::Rejected)
        ));
        assert!(matches!(
            auth.authenticate("Basic YWJjOmRlZg==".into()).await,
            Err(AuthError::UnsupportedScheme)
        ));
    }

    #[tokio::test]
    async fn closures_are_authenticators() {
        let auth = |header: String| async move {
            if header == "let-me-in" {
                Ok(Identity::new("guest"))
            } else {
                Err(AuthError::Rejected)
            }
        };
        assert_eq!(
            auth.authenticate("let-me-in".into()).await.unwrap().subject(),
            "guest"
        );
    }
}
