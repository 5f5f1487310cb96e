//! Resource registry: URI templates bound to handlers, per method.
//!
//! | Template              | Example path        | Captured params          |
//! |-----------------------|---------------------|--------------------------|
//! | `/users`              | `/users`            | *(none)*                 |
//! | `/users/{id}`         | `/users/42`         | `id → "42"`              |
//! | `/users/{id}/posts`   | `/users/42/posts`   | `id → "42"`              |
//!
//! Registration happens once, before traffic: the service freezes the registry behind
//! an `Arc` and every lookup after that is lock-free. When several templates match a
//! path, the one with the most literal segments wins (`/users/me` beats
//! `/users/{id}`); remaining ties go to the template whose literals come first.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::context::PathParams;
use crate::error::DispatchError;
use crate::handler::{BoxedHandler, Handler};
use crate::http::Method;

pub mod template;

pub use template::UriTemplate;

/// Startup-time registration failures.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("{method} {template} is already bound")]
    DuplicateBinding { template: String, method: Method },

    #[error("invalid URI template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("cannot bind a handler to method {method}")]
    UnsupportedMethod { method: Method },
}

impl RegistryError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateBinding { .. } => "DuplicateBindingError",
            Self::InvalidTemplate { .. } => "InvalidTemplateError",
            Self::UnsupportedMethod { .. } => "UnsupportedMethodError",
        }
    }
}

/// A URI template and method bound to a handler. Immutable once registered.
pub struct Binding {
    template: UriTemplate,
    method: Method,
    handler: BoxedHandler,
}

impl Binding {
    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("template", &self.template.as_str())
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// The result of a successful lookup: which binding, and what it captured.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub binding: &'a Binding,
    pub params: PathParams,
}

/// Maps (URI template, method) pairs to handlers.
///
/// # Examples
///
/// ```rust
/// use restcore::registry::Registry;
/// use restcore::handler::{HandlerError, HandlerOutcome};
/// use restcore::http::Method;
/// use restcore::Context;
///
/// let mut registry = Registry::new();
/// registry
///     .register("/ping", Method::Get, |_ctx: Context| async {
///         Ok::<_, HandlerError>(HandlerOutcome::no_content())
///     })
///     .unwrap();
///
/// let hit = registry.lookup(&["ping".to_string()], &Method::Get).unwrap();
/// assert_eq!(hit.binding.template().as_str(), "/ping");
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    bindings: Vec<Binding>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `template` under `method`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnsupportedMethod`]: `method` is not GET/POST/PUT/PATCH/DELETE.
    /// - [`RegistryError::InvalidTemplate`]: `template` does not compile.
    /// - [`RegistryError::DuplicateBinding`]: a template of the same shape is already
    ///   bound under `method` (parameter names do not distinguish templates).
    pub fn register(
        &mut self,
        template: &str,
        method: Method,
        handler: impl Handler,
    ) -> Result<(), RegistryError> {
        if !method.is_bindable() {
            return Err(RegistryError::UnsupportedMethod { method });
        }

        let template = UriTemplate::parse(template)?;

        if self
            .bindings
            .iter()
            .any(|b| b.method == method && b.template.same_shape(&template))
        {
            return Err(RegistryError::DuplicateBinding {
                template: template.as_str().to_owned(),
                method,
            });
        }

        debug!(template = template.as_str(), %method, "binding registered");
        self.bindings.push(Binding {
            template,
            method,
            handler: std::sync::Arc::new(handler),
        });
        Ok(())
    }

    /// Register a `GET` binding.
    pub fn get(&mut self, template: &str, handler: impl Handler) -> Result<(), RegistryError> {
        self.register(template, Method::Get, handler)
    }

    /// Register a `POST` binding.
    pub fn post(&mut self, template: &str, handler: impl Handler) -> Result<(), RegistryError> {
        self.register(template, Method::Post, handler)
    }

    /// Register a `PUT` binding.
    pub fn put(&mut self, template: &str, handler: impl Handler) -> Result<(), RegistryError> {
        self.register(template, Method::Put, handler)
    }

    /// Register a `PATCH` binding.
    pub fn patch(&mut self, template: &str, handler: impl Handler) -> Result<(), RegistryError> {
        self.register(template, Method::Patch, handler)
    }

    /// Register a `DELETE` binding.
    pub fn delete(&mut self, template: &str, handler: impl Handler) -> Result<(), RegistryError> {
        self.register(template, Method::Delete, handler)
    }

    /// Find the most specific binding for `segments` under `method`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NoMatch`]: no template matches the path at all.
    /// - [`DispatchError::MethodNotAllowed`]: some template matches the path, but none
    ///   under `method`; `allowed` lists the methods that are bound for it.
    pub fn lookup(&self, segments: &[String], method: &Method) -> Result<RouteMatch<'_>, DispatchError> {
        let mut best: Option<RouteMatch<'_>> = None;
        let mut allowed: Vec<Method> = Vec::new();

        for binding in &self.bindings {
            let Some(params) = binding.template.matches(segments) else {
                continue;
            };

            if &binding.method != method {
                allowed.push(binding.method.clone());
                continue;
            }

            let more_specific = best.as_ref().is_none_or(|current| {
                binding
                    .template
                    .cmp_specificity(&current.binding.template)
                    .is_gt()
            });
            if more_specific {
                best = Some(RouteMatch { binding, params });
            }
        }

        if let Some(found) = best {
            return Ok(found);
        }

        let path = format!("/{}", segments.join("/"));
        if allowed.is_empty() {
            Err(DispatchError::NoMatch { path })
        } else {
            allowed.sort();
            allowed.dedup();
            Err(DispatchError::MethodNotAllowed {
                method: method.clone(),
                path,
                allowed,
            })
        }
    }

    /// Return the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Return `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over bindings in registration order.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::{HandlerError, HandlerOutcome};
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn ok_handler(tag: &'static str) -> impl Handler {
        move |_ctx: Context| async move { Ok::<_, HandlerError>(HandlerOutcome::ok(json!(tag))) }
    }

    #[test]
    fn registry_starts_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn register_then_lookup_round_trip() {
        let mut registry = Registry::new();
        let methods = Method::BINDABLE;
        let templates = ["/", "/users", "/users/{id}", "/users/{id}/posts/{post_id}"];
        for (i, t) in templates.iter().enumerate() {
            let method = methods[i % methods.len()].clone();
            registry.register(t, method, ok_handler("x")).unwrap();
        }

        for (i, t) in templates.iter().enumerate() {
            let method = &methods[i % methods.len()];
            let path = t.replace("{id}", "42").replace("{post_id}", "abc");
            let hit = registry.lookup(&segs(&path), method).unwrap();
            assert_eq!(hit.binding.template().as_str(), *t);
            assert_eq!(hit.binding.method(), method);
        }
    }

    #[test]
    fn duplicate_binding_rejected() {
        let mut registry = Registry::new();
        registry.get("/users/{id}", ok_handler("a")).unwrap();
        let err = registry.get("/users/{id}", ok_handler("b")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateBinding { .. }));
        assert_eq!(err.kind(), "DuplicateBindingError");

        // Same shape, different parameter name.
        assert!(registry.get("/users/{user_id}", ok_handler("c")).is_err());
        // Same template, different method is fine.
        registry.delete("/users/{id}", ok_handler("d")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unsupported_method_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register("/x", Method::Options, ok_handler("x"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedMethod { .. }));
    }

    #[test]
    fn no_match_vs_method_not_allowed() {
        let mut registry = Registry::new();
        registry.get("/users/{id}", ok_handler("get")).unwrap();
        registry.put("/users/{id}", ok_handler("put")).unwrap();

        let err = registry.lookup(&segs("/orders/1"), &Method::Get).unwrap_err();
        assert!(matches!(err, DispatchError::NoMatch { ref path } if path == "/orders/1"));

        let err = registry.lookup(&segs("/users/42"), &Method::Delete).unwrap_err();
        match err {
            DispatchError::MethodNotAllowed { allowed, .. } => {
                assert_eq!(allowed, vec![Method::Get, Method::Put]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn literal_template_beats_parameter_regardless_of_order() {
        let mut registry = Registry::new();
        registry.get("/users/{id}", ok_handler("by-id")).unwrap();
        registry.get("/users/me", ok_handler("me")).unwrap();

        let hit = registry.lookup(&segs("/users/me"), &Method::Get).unwrap();
        assert_eq!(hit.binding.template().as_str(), "/users/me");
        assert!(hit.params.is_empty());

        let hit = registry.lookup(&segs("/users/7"), &Method::Get).unwrap();
        assert_eq!(hit.binding.template().as_str(), "/users/{id}");
        assert_eq!(hit.params.get("id"), Some("7"));
    }

    #[test]
    fn earlier_literal_breaks_equal_literal_counts() {
        let mut registry = Registry::new();
        registry.get("/{kind}/latest", ok_handler("late")).unwrap();
        registry.get("/reports/{id}", ok_handler("early")).unwrap();

        let hit = registry.lookup(&segs("/reports/latest"), &Method::Get).unwrap();
        assert_eq!(hit.binding.template().as_str(), "/reports/{id}");
    }

    #[test]
    fn method_not_allowed_lists_every_matching_template() {
        let mut registry = Registry::new();
        registry.get("/users/{id}", ok_handler("a")).unwrap();
        registry.patch("/users/me", ok_handler("b")).unwrap();

        let err = registry.lookup(&segs("/users/me"), &Method::Post).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MethodNotAllowed { ref allowed, .. }
                if allowed == &vec![Method::Get, Method::Patch]
        ));
    }
}
