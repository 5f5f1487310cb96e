//! Request routing: match a normalized request against the frozen registry.
//!
//! [`Router`] is a thin, cloneable view over an `Arc<Registry>`. It adds nothing to
//! the matching rules; it exists so the pipeline talks in terms of requests rather than
//! raw segment slices, and so routing decisions are logged in one place.

use std::sync::Arc;

use tracing::debug;

use crate::error::DispatchError;
use crate::normalize::NormalizedRequest;
use crate::registry::{Registry, RouteMatch};

/// Routes normalized requests to bindings.
///
/// # Examples
///
/// ```rust
/// use restcore::{Context, Router};
/// use restcore::handler::{HandlerError, HandlerOutcome};
/// use restcore::http::RawRequest;
/// use restcore::normalize::normalize;
/// use restcore::registry::Registry;
///
/// let mut registry = Registry::new();
/// registry
///     .get("/users/{id}", |_ctx: Context| async {
///         Ok::<_, HandlerError>(HandlerOutcome::no_content())
///     })
///     .unwrap();
///
/// let router = Router::new(registry);
/// let request = normalize(RawRequest::new("GET", "/users/42")).unwrap();
/// let hit = router.route(&request).unwrap();
/// assert_eq!(hit.params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    /// Freeze `registry` and route against it.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Find the binding for `request`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoMatch`] and [`DispatchError::MethodNotAllowed`] exactly as
    /// [`Registry::lookup`] reports them.
    pub fn route<'a>(&'a self, request: &NormalizedRequest) -> Result<RouteMatch<'a>, DispatchError> {
        let found = self.registry.lookup(request.segments(), request.method());

        match &found {
            Ok(m) => debug!(
                method = %request.method(),
                path = request.path(),
                template = m.binding.template().as_str(),
                "route matched"
            ),
            Err(e) => debug!(
                method = %request.method(),
                path = request.path(),
                kind = e.kind(),
                "no route"
            ),
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::{HandlerError, HandlerOutcome};
    use crate::http::{Method, RawRequest};
    use crate::normalize::normalize;

    fn request(method: &str, path: &str) -> NormalizedRequest {
        normalize(RawRequest::new(method, path)).unwrap()
    }

    fn router() -> Router {
        let mut registry = Registry::new();
        registry
            .get("/users/{id}", |_ctx: Context| async {
                Ok::<_, HandlerError>(HandlerOutcome::no_content())
            })
            .unwrap();
        registry
            .post("/users", |_ctx: Context| async {
                Ok::<_, HandlerError>(HandlerOutcome::no_content())
            })
            .unwrap();
        Router::new(registry)
    }

    #[test]
    fn empty_router_is_404_for_root() {
        let router = Router::new(Registry::new());
        let err = router.route(&request("GET", "/")).unwrap_err();
        assert_eq!(err.kind(), "NoMatchError");
    }

    #[test]
    fn routes_decoded_segments() {
        let router = router();
        let hit = router.route(&request("GET", "/users/j%C3%B6rg")).unwrap();
        assert_eq!(hit.params.get("id"), Some("jörg"));
    }

    #[test]
    fn propagates_lookup_errors_unchanged() {
        let router = router();
        let err = router.route(&request("DELETE", "/users/42")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MethodNotAllowed { ref allowed, .. } if allowed == &vec![Method::Get]
        ));

        let err = router.route(&request("GET", "/posts")).unwrap_err();
        assert!(matches!(err, DispatchError::NoMatch { .. }));
    }

    #[test]
    fn clones_share_the_registry() {
        let router = router();
        let clone = router.clone();
        assert!(std::ptr::eq(router.registry(), clone.registry()));
        assert_eq!(clone.registry().len(), 2);
    }
}
