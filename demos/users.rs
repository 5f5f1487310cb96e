//! A small users resource served over HTTP.
//!
//! ```text
//! cargo run --example users [config.toml]
//! curl -i localhost:8080/users/42
//! curl -i -X POST localhost:8080/users -d '{"username":"ada"}'
//! curl -i -H 'Authorization: Bearer demo-token' localhost:8080/users/me
//! ```

use std::sync::Arc;

use restcore::{
    BearerTokens, CachePolicy, Context, CoreConfig, HandlerError, HandlerOutcome, Server, Service,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    #[serde(default)]
    id: u64,
    username: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,restcore=debug")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    let service = Service::builder()
        .config(&config)
        .authenticator(BearerTokens::new().token("demo-token", "jdoe"))
        .get("/users", |_ctx: Context| async {
            let users = vec![User { id: 42, username: "jdoe".into() }];
            Ok::<_, HandlerError>(
                HandlerOutcome::ok(HandlerOutcome::to_body(&users)?).cacheable(CachePolicy::Public(30)),
            )
        })?
        .get("/users/{id}", |ctx: Context| async move {
            let id: u64 = ctx.param_as("id")?;
            if id != 42 {
                return Err(HandlerError::not_found(format!("user {id} does not exist")));
            }
            let user = User { id, username: "jdoe".into() };
            Ok::<_, HandlerError>(
                HandlerOutcome::ok(HandlerOutcome::to_body(&user)?)
                    .link("collection", "/users")
                    .cacheable(CachePolicy::Private(60)),
            )
        })?
        .get("/users/me", |ctx: Context| async move {
            let subject = ctx.require_identity()?.subject().to_owned();
            let user = User { id: 42, username: subject };
            Ok::<_, HandlerError>(HandlerOutcome::ok(HandlerOutcome::to_body(&user)?))
        })?
        .post("/users", |ctx: Context| async move {
            let mut user: User = ctx.json()?;
            if user.username.is_empty() {
                return Err(HandlerError::unprocessable("username must not be empty"));
            }
            user.id = 43;
            let href = format!("/users/{}", user.id);
            Ok::<_, HandlerError>(HandlerOutcome::created(HandlerOutcome::to_body(&user)?).location(href))
        })?
        .delete("/users/{id}", |_ctx: Context| async {
            Ok::<_, HandlerError>(HandlerOutcome::no_content())
        })?
        .build();

    let server = Server::bind_config(&config).await?;
    println!("Listening on http://{}", server.local_addr());
    server.serve(Arc::new(service)).await?;
    Ok(())
}
