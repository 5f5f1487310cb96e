//! The handler contract.
//!
//! A handler receives an isolated [`Context`] and resolves to either a
//! [`HandlerOutcome`] (what it produced, plus links and cache hints) or a
//! [`HandlerError`]. Every async closure of the right shape is a handler:
//!
//! ```rust
//! use restcore::handler::{HandlerError, HandlerOutcome};
//! use restcore::context::Context;
//! use serde_json::json;
//!
//! let show_user = |ctx: Context| async move {
//!     let id: u64 = ctx.param_as("id")?;
//!     Ok::<_, HandlerError>(HandlerOutcome::ok(json!({ "id": id })))
//! };
//! # let _ = show_user;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

pub mod outcome;

pub use outcome::{CachePolicy, HandlerError, HandlerOutcome, Intent, Link};

/// Future returned by [`Handler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<HandlerOutcome, HandlerError>> + Send>>;

/// Type-erased, shareable handler as stored in a binding.
pub type BoxedHandler = Arc<dyn Handler>;

/// A resource handler.
///
/// Any `Fn(Context) -> impl Future<Output = Result<HandlerOutcome, HandlerError>> + Send`
/// that is also `Send + Sync + 'static` implements this trait via the blanket impl
/// below, so registration call sites never spell out the boxed future type.
pub trait Handler: Send + Sync + 'static {
    /// Serve one request. The returned future may be dropped at any await point when
    /// the dispatcher's timeout fires, so it must not leave external state half-written.
    fn handle(&self, ctx: Context) -> HandlerFuture;
}

impl<T, F> Handler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Result<HandlerOutcome, HandlerError>> + Send + 'static,
{
    fn handle(&self, ctx: Context) -> HandlerFuture {
        Box::pin((self)(ctx))
    }
}
