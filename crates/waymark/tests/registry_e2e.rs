//! End-to-end tests: `http::Request` in, `http::Response` out.

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use waymark::prelude::*;
use waymark_test::RecordingDiagnostics;

async fn body_json(response: waymark::HttpResponse) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::get(uri).body(Bytes::new()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> http::Request<Bytes> {
    http::Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

fn users() -> Registry {
    let show = endpoint(
        RouteDescriptor::get("/users/:id")
            .params(Schema::object([("id", Schema::coerce(Schema::integer()))])),
        EndpointInput::new(
            ResponseSet::new().status(StatusCode::OK, Schema::object([("id", Schema::integer())])),
        ),
    );
    let me = endpoint(
        RouteDescriptor::get("/users/me"),
        EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::string())),
    );
    let create = endpoint(
        RouteDescriptor::post("/users"),
        EndpointInput::new(
            ResponseSet::new().status(StatusCode::CREATED, Schema::object([("name", Schema::string())])),
        )
        .body(Schema::object([("name", Schema::string().min_length(1))])),
    );

    Registry::new()
        .base_path("/api")
        .route(
            Dispatcher::builder(show, |bag| async move {
                let id = bag.params().map(|p| p["id"].clone()).unwrap_or_default();
                Ok::<_, WaymarkError>(TerminalResponse::ok(json!({ "id": id })))
            })
            .build(),
        )
        .route(
            Dispatcher::builder(me, |_bag| async {
                Ok::<_, WaymarkError>(TerminalResponse::ok(json!("me")))
            })
            .build(),
        )
        .route(
            Dispatcher::builder(create, |bag| async move {
                let body = bag.body().cloned().unwrap_or_default();
                Ok::<_, WaymarkError>(TerminalResponse::new(StatusCode::CREATED).data(body))
            })
            .build(),
        )
}

#[tokio::test]
async fn test_literal_routes_win_over_parameters() {
    let registry = users();
    let patterns: Vec<&str> = registry.routes().into_iter().map(|(_, p)| p).collect();
    assert_eq!(patterns, vec!["/users", "/users/me", "/users/:id"]);

    let response = registry.handle(get("/api/users/me")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes, Bytes::from("me"));
}

#[tokio::test]
async fn test_path_params_are_coerced() {
    let response = users().handle(get("/api/users/42")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(body_json(response).await, json!({ "id": 42 }));
}

#[tokio::test]
async fn test_unknown_paths_and_methods() {
    let registry = users();

    let missing = registry.handle(get("/api/orders")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let outside = registry.handle(get("/users/42")).await;
    assert_eq!(outside.status(), StatusCode::NOT_FOUND);

    let wrong_method = registry
        .handle(http::Request::delete("/api/users/42").body(Bytes::new()).unwrap())
        .await;
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong_method.headers()[ALLOW], "GET");
    assert_eq!(body_json(wrong_method).await["error"]["code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_json_body_round_trip() {
    let response = users()
        .handle(post_json("/api/users", &json!({ "name": "Ada", "admin": true })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await, json!({ "name": "Ada" }));
}

#[tokio::test]
async fn test_undecodable_and_invalid_bodies() {
    let registry = users();

    let undecodable = registry
        .handle(
            http::Request::post("/api/users")
                .header(CONTENT_TYPE, "application/json")
                .body(Bytes::from_static(b"{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(undecodable.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(undecodable).await["error"]["code"], "INVALID_BODY");

    // Schema failures are step errors: the dispatcher answers 500 itself.
    let invalid = registry.handle(post_json("/api/users", &json!({ "name": "" }))).await;
    assert_eq!(invalid.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = invalid.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_query_is_parsed_before_dispatch() {
    let search = endpoint(
        RouteDescriptor::get("/search"),
        EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::any())).query(
            Schema::object([
                ("page", Schema::coerce(Schema::integer())),
                ("tag", Schema::optional(Schema::any())),
            ]),
        ),
    );
    let registry = Registry::new().route(
        Dispatcher::builder(search, |bag| async move {
            let query = bag.query().cloned().unwrap_or_default();
            Ok::<_, WaymarkError>(TerminalResponse::ok(query))
        })
        .build(),
    );

    let response = registry.handle(get("/search?page=3&tag=a&tag=b")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "page": 3, "tag": ["a", "b"] }));
}

#[tokio::test]
async fn test_unanswered_dispatch_answers_500() {
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let teapot = endpoint(
        RouteDescriptor::get("/brew"),
        EndpointInput::new(ResponseSet::new().no_body(StatusCode::NO_CONTENT)),
    );
    let registry = Registry::new().route(
        Dispatcher::builder(teapot, |_bag| async {
            Ok::<_, WaymarkError>(TerminalResponse::new(StatusCode::IM_A_TEAPOT))
        })
        .diagnostics(diagnostics.clone())
        .build(),
    );

    let response = registry.handle(get("/brew")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["code"], "UNANSWERED");
    assert_eq!(diagnostics.warnings().len(), 1);
}

#[tokio::test]
async fn test_redirect_and_cookies_reach_headers() {
    let login = endpoint(
        RouteDescriptor::post("/login"),
        EndpointInput::new(ResponseSet::new().status(
            StatusCode::SEE_OTHER,
            Schema::object([("redirect_url", Schema::string())]),
        )),
    );
    let registry = Registry::new().route(
        Dispatcher::builder(login, |_bag| async {
            Ok::<_, WaymarkError>(
                TerminalResponse::redirect(StatusCode::SEE_OTHER, "/home")
                    .redirect_query("welcome", "1")
                    .cookie("session", "abc"),
            )
        })
        .build(),
    );

    let response = registry
        .handle(http::Request::post("/login").body(Bytes::new()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/home?welcome=1");
    let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session=abc"));
}

#[tokio::test]
async fn test_failing_handler_answers_500() {
    let broken = endpoint(
        RouteDescriptor::get("/broken"),
        EndpointInput::new(ResponseSet::new().no_body(StatusCode::NO_CONTENT)),
    );
    let registry = Registry::new().route(
        Dispatcher::builder(broken, |_bag| async {
            Err::<TerminalResponse, _>(WaymarkError::msg("database unavailable"))
        })
        .build(),
    );

    let response = registry.handle(get("/broken")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_openapi_uses_registry_base_path() {
    let registry = users();
    let spec = registry
        .openapi(OpenApiGenerator::new().title("Users"))
        .unwrap();

    assert!(spec.paths.contains_key("/api/users/{id}"));
    assert!(spec.paths.contains_key("/api/users/me"));
    assert!(spec.operation(&http::Method::POST, "/api/users").is_some());
}
