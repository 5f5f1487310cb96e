//! # restcore
//!
//! A stateless REST request-dispatch core: resources are bound to URI templates and
//! methods, requests are normalized and routed to the most specific binding, handlers
//! run isolated under a deadline, and results become uniform responses with status,
//! `Content-Type`, hypermedia links, and cache directives.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restcore::{Context, CoreConfig, HandlerError, HandlerOutcome, Server, Service};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CoreConfig::default();
//!     let service = Service::builder()
//!         .config(&config)
//!         .get("/users/{id}", |ctx: Context| async move {
//!             let id: u64 = ctx.param_as("id")?;
//!             Ok::<_, HandlerError>(HandlerOutcome::ok(json!({ "id": id })))
//!         })?
//!         .build();
//!
//!     Server::bind_config(&config).await?.serve(Arc::new(service)).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod compose;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod normalize;
pub mod registry;
pub mod router;
pub mod server;
pub mod service;

pub use auth::{AuthError, Authenticator, BearerTokens, Identity};
pub use compose::{Response, ResponseComposer};
pub use config::{ConfigError, CoreConfig};
pub use context::{Context, PathParams};
pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use handler::{CachePolicy, Handler, HandlerError, HandlerOutcome, Link};
pub use http::{Headers, Method, RawRequest, RawResponse, StatusCode};
pub use registry::{Registry, RegistryError};
pub use router::Router;
pub use server::{Server, ServerError};
pub use service::{Service, ServiceBuilder};
