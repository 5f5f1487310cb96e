//! Handler invocation with per-request isolation and a deadline.
//!
//! Each dispatch builds a brand-new [`Context`] from the request it was given, asks the
//! optional [`Authenticator`] who the caller is, and runs the handler on its own tokio
//! task. The task is raced against the request deadline; when the deadline wins the
//! task is aborted, which drops the handler future at its next await point.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{error, warn};

use crate::auth::{AuthError, Authenticator, Identity};
use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::{HandlerError, HandlerOutcome};
use crate::normalize::NormalizedRequest;
use crate::registry::RouteMatch;

/// What a successful dispatch hands to the composer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub outcome: HandlerOutcome,
    /// The matched template filled with this request's parameter values.
    pub self_href: String,
}

/// Invokes bound handlers.
#[derive(Clone)]
pub struct Dispatcher {
    timeout: Duration,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("timeout", &self.timeout)
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// A dispatcher that gives every request `timeout` to complete.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            authenticator: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Consult `authenticator` for requests that carry an `Authorization` header.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: impl Authenticator) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the handler of `route` for `request`.
    ///
    /// Authentication and the handler share one deadline of [`Self::timeout`].
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Unauthorized`]: the authenticator rejected the credentials.
    /// - [`DispatchError::Client`]: the handler reported a validation problem.
    /// - [`DispatchError::Server`]: the handler (or the authenticator's backend) failed
    ///   unexpectedly, or the handler panicked.
    /// - [`DispatchError::Timeout`]: the deadline passed first.
    pub async fn dispatch(
        &self,
        route: RouteMatch<'_>,
        request: NormalizedRequest,
    ) -> Result<Dispatched, DispatchError> {
        let deadline = Instant::now() + self.timeout;
        let RouteMatch { binding, params } = route;
        let template = binding.template().as_str();
        let self_href = binding.template().fill(&params);

        let identity = self.authenticate(&request, deadline).await?;
        let ctx = Context::new(request, params, identity);

        let handler = Arc::clone(binding.handler());
        let mut task = tokio::spawn(handler.handle(ctx));

        match timeout_at(deadline, &mut task).await {
            Ok(Ok(Ok(outcome))) => Ok(Dispatched { outcome, self_href }),
            Ok(Ok(Err(err))) => {
                match &err {
                    HandlerError::Client { message, .. } => {
                        warn!(template, status = err.status().as_u16(), %message, "handler rejected request");
                    }
                    HandlerError::Internal(detail) => {
                        error!(template, %detail, "handler failed");
                    }
                }
                Err(err.into())
            }
            Ok(Err(join_err)) => {
                let detail = if join_err.is_panic() {
                    "handler panicked".to_owned()
                } else {
                    format!("handler task ended abnormally: {join_err}")
                };
                error!(template, %detail, "handler failed");
                Err(DispatchError::Server { detail })
            }
            Err(_elapsed) => {
                task.abort();
                warn!(
                    template,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "handler timed out; abandoning"
                );
                Err(DispatchError::Timeout {
                    limit: self.timeout,
                })
            }
        }
    }

    async fn authenticate(
        &self,
        request: &NormalizedRequest,
        deadline: Instant,
    ) -> Result<Option<Identity>, DispatchError> {
        let (Some(authenticator), Some(header)) =
            (&self.authenticator, request.headers().get("authorization"))
        else {
            return Ok(None);
        };

        match timeout_at(deadline, authenticator.authenticate(header.to_owned())).await {
            Ok(Ok(identity)) => Ok(Some(identity)),
            Ok(Err(AuthError::Unavailable(detail))) => {
                error!(%detail, "authenticator unavailable");
                Err(DispatchError::Server {
                    detail: format!("authenticator unavailable: {detail}"),
                })
            }
            Ok(Err(err)) => {
                warn!(error = %err, "authentication failed");
                Err(DispatchError::Unauthorized {
                    reason: err.to_string(),
                })
            }
            Err(_elapsed) => {
                warn!("authenticator timed out");
                Err(DispatchError::Timeout {
                    limit: self.timeout,
                })
            }
        }
    }
}
