//! End-to-end behavior through `Service`, from raw request to raw response.

use std::time::Duration;

use restcore::{
    BearerTokens, CachePolicy, Context, HandlerError, HandlerOutcome, RawRequest, Service,
    StatusCode,
};
use serde_json::{Value, json};

fn users_service(timeout: Duration) -> Service {
    Service::builder()
        .timeout(timeout)
        .get("/users/{id}", |ctx: Context| async move {
            let id: u64 = ctx.param_as("id")?;
            if id == 0 {
                return Err(HandlerError::not_found("no such user"));
            }
            Ok::<_, HandlerError>(HandlerOutcome::ok(json!({ "id": id, "username": "jdoe" }))
                .link("collection", "/users")
                .cacheable(CachePolicy::Public(60)))
        })
        .unwrap()
        .post("/users", |ctx: Context| async move {
            let mut user: Value = ctx.json()?;
            user["id"] = json!(7);
            Ok::<_, HandlerError>(HandlerOutcome::created(user).location("/users/7"))
        })
        .unwrap()
        .get("/users/me", |ctx: Context| async move {
            let subject = ctx.require_identity()?.subject().to_owned();
            Ok::<_, HandlerError>(HandlerOutcome::ok(json!({ "username": subject })))
        })
        .unwrap()
        .get("/reports/slow", |_ctx: Context| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, HandlerError>(HandlerOutcome::no_content())
        })
        .unwrap()
        .authenticator(BearerTokens::new().token("secret", "jdoe"))
        .build()
}

fn body_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn get_user_returns_body_and_self_link() {
    let service = users_service(Duration::from_secs(1));
    let res = service.handle(RawRequest::new("GET", "/users/42")).await;

    assert_eq!(res.status, StatusCode::Ok);
    assert_eq!(res.headers.get("content-type"), Some("application/json"));
    assert!(res.body_str().unwrap().contains("\"id\":42"));

    let body = body_json(&res.body);
    let links = body["links"].as_array().unwrap();
    assert_eq!(links[0], json!({ "rel": "self", "href": "/users/42" }));
    assert!(links.contains(&json!({ "rel": "collection", "href": "/users" })));

    let link_header = res.headers.get_all("link").collect::<Vec<_>>().join(", ");
    assert!(link_header.contains(r#"</users/42>; rel="self""#));
    assert_eq!(res.headers.get("cache-control"), Some("public, max-age=60"));
    assert!(res.headers.contains("etag"));
}

#[tokio::test]
async fn delete_on_get_only_resource_is_405_with_allow() {
    let service = users_service(Duration::from_secs(1));
    let res = service.handle(RawRequest::new("DELETE", "/users/42")).await;

    assert_eq!(res.status, StatusCode::MethodNotAllowed);
    assert_eq!(res.headers.get("allow"), Some("GET"));
    let body = body_json(&res.body);
    assert_eq!(body["kind"], "MethodNotAllowedError");
    assert!(body.get("links").is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_handler_is_504_timeout() {
    let service = users_service(Duration::from_millis(1000));
    let res = service.handle(RawRequest::new("GET", "/reports/slow")).await;

    assert_eq!(res.status, StatusCode::GatewayTimeout);
    assert_eq!(body_json(&res.body)["kind"], "TimeoutError");
}

#[tokio::test]
async fn unregistered_path_is_404() {
    let service = users_service(Duration::from_secs(1));
    let res = service.handle(RawRequest::new("GET", "/orders/1")).await;

    assert_eq!(res.status, StatusCode::NotFound);
    assert_eq!(body_json(&res.body)["kind"], "NoMatchError");
}

#[tokio::test]
async fn literal_template_beats_parameter() {
    let service = users_service(Duration::from_secs(1));
    let res = service
        .handle(RawRequest::new("GET", "/users/me").header("Authorization", "Bearer secret"))
        .await;

    assert_eq!(res.status, StatusCode::Ok);
    assert_eq!(body_json(&res.body)["username"], "jdoe");
}

#[tokio::test]
async fn bad_credentials_are_401() {
    let service = users_service(Duration::from_secs(1));
    let res = service
        .handle(RawRequest::new("GET", "/users/me").header("Authorization", "Bearer nope"))
        .await;

    assert_eq!(res.status, StatusCode::Unauthorized);
    assert_eq!(res.headers.get("www-authenticate"), Some("Bearer"));
    assert_eq!(body_json(&res.body)["kind"], "UnauthorizedError");
}

#[tokio::test]
async fn create_is_201_with_location() {
    let service = users_service(Duration::from_secs(1));
    let res = service
        .handle(
            RawRequest::new("POST", "/users")
                .header("Content-Type", "application/json")
                .body(r#"{"username":"ada"}"#),
        )
        .await;

    assert_eq!(res.status, StatusCode::Created);
    assert_eq!(res.headers.get("location"), Some("/users/7"));
    assert_eq!(body_json(&res.body)["username"], "ada");
}

#[tokio::test]
async fn invalid_json_body_is_client_error() {
    let service = users_service(Duration::from_secs(1));
    let res = service
        .handle(RawRequest::new("POST", "/users").body("{not json"))
        .await;

    assert_eq!(res.status, StatusCode::BadRequest);
    assert_eq!(body_json(&res.body)["kind"], "ClientError");
}

#[tokio::test]
async fn handler_not_found_maps_to_404_client_error() {
    let service = users_service(Duration::from_secs(1));
    let res = service.handle(RawRequest::new("GET", "/users/0")).await;

    assert_eq!(res.status, StatusCode::NotFound);
    assert_eq!(body_json(&res.body)["kind"], "ClientError");
}

#[tokio::test]
async fn client_error_never_carries_a_server_status() {
    let service = Service::builder()
        .get("/broken", |_ctx: Context| async {
            Err::<HandlerOutcome, _>(HandlerError::Client {
                status: StatusCode::InternalServerError,
                message: "m".into(),
            })
        })
        .unwrap()
        .build();
    let res = service.handle(RawRequest::new("GET", "/broken")).await;

    assert_eq!(res.status, StatusCode::BadRequest);
    assert_eq!(body_json(&res.body)["kind"], "ClientError");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_see_only_their_own_context() {
    let service = Service::builder()
        .post("/echo/{id}", |ctx: Context| async move {
            let id = ctx.param("id")?.to_owned();
            tokio::task::yield_now().await;
            let tag = ctx.headers().get("x-tag").unwrap_or_default().to_owned();
            let body = String::from_utf8_lossy(ctx.body()).into_owned();
            Ok::<_, HandlerError>(HandlerOutcome::ok(json!({ "id": id, "tag": tag, "body": body })))
        })
        .unwrap()
        .build();

    let requests = (0..32).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            let raw = RawRequest::new("POST", format!("/echo/{i}"))
                .header("X-Tag", format!("tag-{i}"))
                .body(format!("payload-{i}"));
            (i, service.handle(raw).await)
        })
    });

    for task in requests.collect::<Vec<_>>() {
        let (i, res) = task.await.unwrap();
        let body = body_json(&res.body);
        assert_eq!(body["id"], i.to_string());
        assert_eq!(body["tag"], format!("tag-{i}"));
        assert_eq!(body["body"], format!("payload-{i}"));
    }
}

#[test]
fn registering_the_same_binding_twice_fails() {
    let handler = |_ctx: Context| async { Ok::<_, HandlerError>(HandlerOutcome::no_content()) };
    let err = Service::builder()
        .get("/users/{id}", handler)
        .unwrap()
        .get("/users/{user_id}", handler)
        .unwrap_err();
    assert_eq!(err.kind(), "DuplicateBindingError");
}
