//! The request pipeline: normalize → route → dispatch → compose.
//!
//! [`Service`] is what a transport calls. It is cheap to clone and holds no per-request
//! state, so one instance can serve any number of concurrent requests.

use std::time::{Duration, Instant};

use tracing::info;

use crate::auth::Authenticator;
use crate::compose::{Representation, Response, ResponseComposer};
use crate::config::CoreConfig;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::handler::Handler;
use crate::http::{Method, RawRequest, RawResponse};
use crate::normalize::normalize;
use crate::registry::{Registry, RegistryError};
use crate::router::Router;

/// A frozen, ready-to-serve pipeline.
///
/// # Examples
///
/// ```rust
/// use restcore::{Context, Service};
/// use restcore::handler::{HandlerError, HandlerOutcome};
/// use restcore::http::{RawRequest, StatusCode};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Service::builder()
///     .get("/users/{id}", |ctx: Context| async move {
///         let id: u64 = ctx.param_as("id")?;
///         Ok::<_, HandlerError>(HandlerOutcome::ok(json!({ "id": id, "username": "jdoe" })))
///     })?
///     .build();
///
/// let response = service.handle(RawRequest::new("GET", "/users/42")).await;
/// assert_eq!(response.status, StatusCode::Ok);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Service {
    router: Router,
    dispatcher: Dispatcher,
    composer: ResponseComposer,
}

impl Service {
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serve one request and return what the transport should write.
    pub async fn handle(&self, raw: RawRequest) -> RawResponse {
        self.respond(raw).await.into_raw()
    }

    /// Serve one request and return the composed response record.
    pub async fn respond(&self, raw: RawRequest) -> Response {
        let start = Instant::now();
        let method = raw.method.clone();
        let path = path_without_query(&raw.raw_path).to_owned();
        let accept = raw.headers.get("accept").map(str::to_owned);

        let result = self.run(raw).await;
        let response = self.composer.compose(accept.as_deref(), result);

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request served"
        );
        response
    }

    /// Compose an error the transport detected before a request could be framed.
    pub fn reject(&self, err: DispatchError) -> RawResponse {
        self.composer.compose(None, Err(err)).into_raw()
    }

    async fn run(&self, raw: RawRequest) -> Result<crate::dispatch::Dispatched, DispatchError> {
        let request = normalize(raw)?;
        let route = self.router.route(&request)?;
        self.dispatcher.dispatch(route, request).await
    }
}

/// The path part of a request target; query strings may carry credentials.
fn path_without_query(raw_path: &str) -> &str {
    raw_path.split_once('?').map_or(raw_path, |(path, _)| path)
}

/// Collects bindings and collaborators, then freezes them into a [`Service`].
///
/// Registration errors surface here, at startup, and never at request time.
#[derive(Debug)]
pub struct ServiceBuilder {
    registry: Registry,
    dispatcher: Dispatcher,
    composer: ResponseComposer,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    /// A builder using [`CoreConfig::default`] settings.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            dispatcher: Dispatcher::new(CoreConfig::default().handler_timeout()),
            composer: ResponseComposer::new(),
        }
    }

    /// Apply the dispatch-related settings of `config`.
    #[must_use]
    pub fn config(self, config: &CoreConfig) -> Self {
        self.timeout(config.handler_timeout())
    }

    /// Per-request deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.dispatcher = self.dispatcher.with_timeout(timeout);
        self
    }

    #[must_use]
    pub fn authenticator(mut self, authenticator: impl Authenticator) -> Self {
        self.dispatcher = self.dispatcher.with_authenticator(authenticator);
        self
    }

    #[must_use]
    pub fn representation(mut self, representation: impl Representation) -> Self {
        self.composer = self.composer.with_representation(representation);
        self
    }

    /// Bind `handler` to `template` under `method`.
    ///
    /// # Errors
    ///
    /// Any [`RegistryError`]; these are meant to abort startup.
    pub fn route(
        mut self,
        template: &str,
        method: Method,
        handler: impl Handler,
    ) -> Result<Self, RegistryError> {
        self.registry.register(template, method, handler)?;
        Ok(self)
    }

    pub fn get(self, template: &str, handler: impl Handler) -> Result<Self, RegistryError> {
        self.route(template, Method::Get, handler)
    }

    pub fn post(self, template: &str, handler: impl Handler) -> Result<Self, RegistryError> {
        self.route(template, Method::Post, handler)
    }

    pub fn put(self, template: &str, handler: impl Handler) -> Result<Self, RegistryError> {
        self.route(template, Method::Put, handler)
    }

    pub fn patch(self, template: &str, handler: impl Handler) -> Result<Self, RegistryError> {
        self.route(template, Method::Patch, handler)
    }

    pub fn delete(self, template: &str, handler: impl Handler) -> Result<Self, RegistryError> {
        self.route(template, Method::Delete, handler)
    }

    /// Freeze the registry and produce the service.
    pub fn build(self) -> Service {
        info!(
            bindings = self.registry.len(),
            timeout_ms = self.dispatcher.timeout().as_millis() as u64,
            "service built"
        );
        Service {
            router: Router::new(self.registry),
            dispatcher: self.dispatcher,
            composer: self.composer,
        }
    }
}
