//! End-to-end dispatch tests.
//!
//! Each test builds a full endpoint (input parsing, middleware, handler),
//! dispatches a request into a recording response and checks both what
//! was written and what diagnostics were emitted.

use http::StatusCode;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use waymark_core::{
    CookieOptions, ExtraParams, MiddlewareOutcome, ParamKey, Resource, ResponseSet,
    ResponseWriter, RouteDescriptor, SameSite, Schema, TerminalResponse, WaymarkError,
};
use waymark_middleware::{
    endpoint, DispatchOutcome, Dispatcher, EndpointConfig, EndpointFactory, EndpointInput,
    LegacyMiddleware, MiddlewareUnit, HANDLER_STEP, INPUT_STEP,
};
use waymark_telemetry::DiagnosticKind;
use waymark_test::{RecordingDiagnostics, RecordingResponse, ResponseEvent, TestRequest};

type Log = Arc<Mutex<Vec<&'static str>>>;

const USER_ID: ParamKey<u64> = ParamKey::new("user_id");

fn ok_endpoint(route: RouteDescriptor) -> EndpointConfig {
    endpoint(
        route,
        EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::any())),
    )
}

fn recording_unit(log: &Log, name: &'static str) -> MiddlewareUnit {
    let log = Arc::clone(log);
    MiddlewareUnit::from_fn(name, move |_bag| {
        let log = Arc::clone(&log);
        async move {
            log.lock().push(name);
            Ok(ExtraParams::new())
        }
    })
}

fn build(config: EndpointConfig, log: &Log) -> (Dispatcher, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let log = Arc::clone(log);
    let dispatcher = Dispatcher::builder(config, move |_bag| {
        let log = Arc::clone(&log);
        async move {
            log.lock().push("H");
            Ok::<_, WaymarkError>(TerminalResponse::ok(json!({ "done": true })))
        }
    })
    .diagnostics(diagnostics.clone())
    .build();
    (dispatcher, diagnostics)
}

// ============================================================================
// Chain order and early exit
// ============================================================================

#[tokio::test]
async fn test_steps_run_in_declaration_order() {
    let log: Log = Arc::default();
    let config = ok_endpoint(RouteDescriptor::get("/items"))
        .middleware(recording_unit(&log, "M1"))
        .middleware(recording_unit(&log, "M2"));
    let (dispatcher, diagnostics) = build(config, &log);

    assert_eq!(dispatcher.step_names(), vec![INPUT_STEP, "M1", "M2", HANDLER_STEP]);

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/items").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Sent);
    assert_eq!(*log.lock(), vec!["M1", "M2", "H"]);
    response
        .assert_status(StatusCode::OK)
        .assert_sent_once()
        .assert_json_eq(&json!({ "done": true }));
    assert!(diagnostics.entries().is_empty());
}

#[tokio::test]
async fn test_terminal_response_stops_the_chain() {
    let log: Log = Arc::default();
    let first = {
        let log = Arc::clone(&log);
        MiddlewareUnit::new("M1", ResponseSet::new(), move |_bag| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push("M1");
                Ok::<_, WaymarkError>(TerminalResponse::ok(json!({})))
            }
        })
    };
    let config = ok_endpoint(RouteDescriptor::get("/items"))
        .middleware(first)
        .middleware(recording_unit(&log, "M2"));
    let (dispatcher, _) = build(config, &log);

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/items").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Sent);
    assert_eq!(*log.lock(), vec!["M1"]);
    response
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({}));
}

#[tokio::test]
async fn test_extra_params_reach_later_steps() {
    let config = ok_endpoint(RouteDescriptor::get("/me")).middleware(MiddlewareUnit::from_fn(
        "auth",
        |_bag| async { Ok(ExtraParams::new().with(USER_ID, 42)) },
    ));
    let dispatcher = Dispatcher::builder(config, |bag| async move {
        let id = bag.get_key(USER_ID).copied().unwrap_or_default();
        Ok::<_, WaymarkError>(TerminalResponse::ok(json!({ "id": id })))
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    dispatcher
        .dispatch(TestRequest::get("/me").build().unwrap(), response.clone())
        .await
        .unwrap();

    response.assert_json_eq(&json!({ "id": 42 }));
}

#[tokio::test]
async fn test_chain_without_terminal_is_unanswered() {
    let config = ok_endpoint(RouteDescriptor::get("/quiet"));
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Ok::<_, WaymarkError>(MiddlewareOutcome::Passthrough)
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/quiet").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Unanswered);
    response.assert_untouched();
}

// ============================================================================
// Undeclared statuses and redirects
// ============================================================================

#[tokio::test]
async fn test_undeclared_status_is_not_sent() {
    let config = ok_endpoint(RouteDescriptor::get("/odd"));
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        let status = StatusCode::from_u16(299).unwrap();
        Ok::<_, WaymarkError>(TerminalResponse::new(status).data(json!({})))
    })
    .diagnostics(diagnostics.clone())
    .build();

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/odd").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Unanswered);
    assert!(!response.headers_sent());
    response.assert_untouched();

    let warnings = diagnostics.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].to_string(), "'/odd': unknown status code 299");
}

#[tokio::test]
async fn test_redirect_keeps_query_order() {
    let redirect_schema = Schema::object([
        ("redirect_url", Schema::string()),
        (
            "redirect_url_query",
            Schema::object([("a", Schema::string()), ("b", Schema::string())]),
        ),
    ]);
    let config = endpoint(
        RouteDescriptor::get("/go"),
        EndpointInput::new(ResponseSet::new().status(StatusCode::FOUND, redirect_schema)),
    );
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Ok::<_, WaymarkError>(
            TerminalResponse::redirect(StatusCode::FOUND, "/x")
                .redirect_query("a", "1")
                .redirect_query("b", "2"),
        )
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/go").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Sent);
    response
        .assert_redirect(StatusCode::FOUND, "/x?a=1&b=2")
        .assert_sent_once();
}

#[tokio::test]
async fn test_redirect_without_url_answers_500() {
    let config = endpoint(
        RouteDescriptor::get("/go"),
        EndpointInput::new(ResponseSet::new().status(StatusCode::SEE_OTHER, Schema::any())),
    );
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Ok::<_, WaymarkError>(TerminalResponse::new(StatusCode::SEE_OTHER).data(json!({})))
    })
    .diagnostics(diagnostics.clone())
    .build();

    let response = Arc::new(RecordingResponse::new());
    dispatcher
        .dispatch(TestRequest::get("/go").build().unwrap(), response.clone())
        .await
        .unwrap();

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body();
    assert_eq!(
        diagnostics.kinds(),
        vec![DiagnosticKind::MalformedRedirect {
            status: StatusCode::SEE_OTHER
        }]
    );
}

// ============================================================================
// Cookies and resource mapping
// ============================================================================

#[tokio::test]
async fn test_cookie_clear_and_set() {
    let config = ok_endpoint(RouteDescriptor::post("/logout"));
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Ok::<_, WaymarkError>(
            TerminalResponse::ok(json!({}))
                .clear_cookie("session")
                .cookie("theme", "dark"),
        )
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    dispatcher
        .dispatch(TestRequest::post("/logout").build().unwrap(), response.clone())
        .await
        .unwrap();

    let events = response.events();
    let clears: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ResponseEvent::ClearCookie(_)))
        .collect();
    let sets: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ResponseEvent::SetCookie { .. }))
        .collect();

    assert_eq!(clears, vec![&ResponseEvent::ClearCookie("session".to_string())]);
    assert_eq!(
        sets,
        vec![&ResponseEvent::SetCookie {
            name: "theme".to_string(),
            value: "dark".to_string(),
            options: None,
        }]
    );
}

#[tokio::test]
async fn test_cookie_with_options_reaches_writer() {
    let config = ok_endpoint(RouteDescriptor::post("/login"));
    let options = CookieOptions::new()
        .path("/")
        .domain("example.com")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::from_secs(3600));
    let dispatcher = Dispatcher::builder(config, {
        let options = options.clone();
        move |_bag| {
            let options = options.clone();
            async move {
                Ok::<_, WaymarkError>(
                    TerminalResponse::ok(json!({})).cookie_with("sid", "x", options),
                )
            }
        }
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    dispatcher
        .dispatch(TestRequest::post("/login").build().unwrap(), response.clone())
        .await
        .unwrap();

    let sets: Vec<_> = response
        .events()
        .into_iter()
        .filter(|e| matches!(e, ResponseEvent::SetCookie { .. }))
        .collect();
    assert_eq!(
        sets,
        vec![ResponseEvent::SetCookie {
            name: "sid".to_string(),
            value: "x".to_string(),
            options: Some(options),
        }]
    );
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_response_data_is_mapped_through_resources() {
    let user = Resource::new(
        "User",
        Schema::object([("id", Schema::integer()), ("display_name", Schema::string())]),
        |value: Value| {
            Ok(json!({
                "id": value["id"],
                "display_name": value["name"],
            }))
        },
    );
    let config = endpoint(
        RouteDescriptor::get("/users"),
        EndpointInput::new(ResponseSet::new().status(
            StatusCode::OK,
            Schema::object([("users", Schema::array(Schema::resource(user)))]),
        )),
    );
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Ok::<_, WaymarkError>(TerminalResponse::ok(json!({
            "users": [{ "id": 1, "name": "Ada", "password": "x" }]
        })))
    })
    .build();

    assert!(dispatcher.has_mapper(StatusCode::OK));

    let response = Arc::new(RecordingResponse::new());
    dispatcher
        .dispatch(TestRequest::get("/users").build().unwrap(), response.clone())
        .await
        .unwrap();

    response.assert_json_eq(&json!({ "users": [{ "id": 1, "display_name": "Ada" }] }));
}

// ============================================================================
// Input parsing
// ============================================================================

#[tokio::test]
async fn test_query_and_body_failures_are_both_reported() {
    let config = endpoint(
        RouteDescriptor::post("/items"),
        EndpointInput::new(ResponseSet::new().status(StatusCode::CREATED, Schema::any()))
            .query(Schema::object([("page", Schema::coerce(Schema::integer()))]))
            .body(Schema::object([("name", Schema::string())])),
    );
    let log: Log = Arc::default();
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::builder(config, {
        let log = Arc::clone(&log);
        move |_bag| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push("H");
                Ok::<_, WaymarkError>(TerminalResponse::new(StatusCode::CREATED))
            }
        }
    })
    .diagnostics(diagnostics.clone())
    .on_error({
        let errors = Arc::clone(&errors);
        move |err| {
            errors.lock().push(err);
            Ok(())
        }
    })
    .build();

    let request = TestRequest::post("/items")
        .query("page", "first")
        .body(json!({ "name": 5 }))
        .build()
        .unwrap();
    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher.dispatch(request, response.clone()).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Failed);
    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body();

    let sources: Vec<String> = diagnostics
        .kinds()
        .into_iter()
        .filter_map(|kind| match kind {
            DiagnosticKind::InputRejected { source, .. } => Some(source.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(sources, vec!["query", "body"]);

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].input_failures().len(), 2);
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_parsed_input_is_visible_to_handler() {
    let config = endpoint(
        RouteDescriptor::get("/users/:id")
            .params(Schema::object([("id", Schema::coerce(Schema::integer()))])),
        EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::any()))
            .query(Schema::object([(
                "expand",
                Schema::optional(Schema::nullable(Schema::boolean())),
            )])),
    );
    let dispatcher = Dispatcher::builder(config, |bag| async move {
        Ok::<_, WaymarkError>(TerminalResponse::ok(json!({
            "params": bag.params().cloned(),
            "query": bag.query().cloned(),
            "body": bag.body().cloned(),
        })))
    })
    .build();

    let request = TestRequest::get("/users/7").param("id", "7").build().unwrap();
    let response = Arc::new(RecordingResponse::new());
    dispatcher.dispatch(request, response.clone()).await.unwrap();

    response.assert_json_eq(&json!({
        "params": { "id": 7 },
        "query": {},
        "body": {},
    }));
}

// ============================================================================
// Configuration immutability
// ============================================================================

#[tokio::test]
async fn test_middleware_does_not_touch_original_config() {
    let factory = EndpointFactory::new().pre(MiddlewareUnit::new(
        "session",
        ResponseSet::new().no_body(StatusCode::UNAUTHORIZED),
        |_bag| async { Ok(ExtraParams::new()) },
    ));
    let base = factory.configure(
        RouteDescriptor::get("/items"),
        EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::any())),
    );
    let before_statuses = base.responses().statuses();
    let before_steps: Vec<String> = base.step_names().into_iter().map(String::from).collect();

    let extended = base.middleware(MiddlewareUnit::new(
        "rate_limit",
        ResponseSet::new().no_body(StatusCode::TOO_MANY_REQUESTS),
        |_bag| async { Ok(ExtraParams::new()) },
    ));

    assert_eq!(base.responses().statuses(), before_statuses);
    assert_eq!(base.step_names(), before_steps);
    assert_eq!(before_steps, vec!["session", INPUT_STEP]);
    assert_eq!(extended.step_names(), vec!["session", INPUT_STEP, "rate_limit"]);
    assert!(extended.responses().contains(StatusCode::TOO_MANY_REQUESTS));
    assert!(extended.responses().contains(StatusCode::UNAUTHORIZED));

    // Both configurations stay dispatchable.
    for config in [base, extended] {
        let dispatcher = Dispatcher::builder(config, |_bag| async {
            Ok::<_, WaymarkError>(TerminalResponse::ok(json!("ok")))
        })
        .build();
        let response = Arc::new(RecordingResponse::new());
        dispatcher
            .dispatch(TestRequest::get("/items").build().unwrap(), response.clone())
            .await
            .unwrap();
        response.assert_status(StatusCode::OK);
    }
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_already_sent_response_halts() {
    let log: Log = Arc::default();
    let config = ok_endpoint(RouteDescriptor::get("/items")).middleware(recording_unit(&log, "M1"));
    let (dispatcher, _) = build(config, &log);

    let response = Arc::new(RecordingResponse::already_sent());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/items").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::SentElsewhere);
    assert!(log.lock().is_empty());
    response.assert_untouched();
}

#[tokio::test]
#[allow(unreachable_code)]
async fn test_panicking_handler_answers_500() {
    let config = ok_endpoint(RouteDescriptor::get("/boom"));
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let seen = Arc::new(Mutex::new(None));
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        panic!("handler exploded");
        Ok::<_, WaymarkError>(TerminalResponse::ok(json!({})))
    })
    .diagnostics(diagnostics.clone())
    .on_error({
        let seen = Arc::clone(&seen);
        move |err| {
            *seen.lock() = Some(err.to_string());
            Ok(())
        }
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/boom").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Failed);
    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body()
        .assert_sent_once();
    assert!(seen.lock().as_deref().unwrap_or_default().contains("handler exploded"));
    assert_eq!(diagnostics.errors().len(), 1);
}

#[tokio::test]
#[allow(unreachable_code)]
async fn test_handler_panicking_before_its_future_answers_500() {
    let config = ok_endpoint(RouteDescriptor::get("/boom"));
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let seen = Arc::new(Mutex::new(None));
    let dispatcher = Dispatcher::builder(config, |_bag| {
        panic!("failed while building the future");
        async { Ok::<_, WaymarkError>(TerminalResponse::ok(json!({}))) }
    })
    .diagnostics(diagnostics.clone())
    .on_error({
        let seen = Arc::clone(&seen);
        move |err| {
            *seen.lock() = Some(err.to_string());
            Ok(())
        }
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/boom").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Failed);
    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_empty_body()
        .assert_sent_once();
    assert!(seen
        .lock()
        .as_deref()
        .unwrap_or_default()
        .contains("failed while building the future"));
    assert_eq!(diagnostics.errors().len(), 1);
}

#[tokio::test]
#[allow(unreachable_code)]
async fn test_middleware_panicking_before_its_future_stops_the_chain() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let config = ok_endpoint(RouteDescriptor::get("/boom")).middleware(MiddlewareUnit::from_fn(
        "explodes",
        |_bag| {
            panic!("middleware exploded");
            async { Ok::<_, WaymarkError>(ExtraParams::new()) }
        },
    ));
    let dispatcher = Dispatcher::builder(config, {
        let log = Arc::clone(&log);
        move |_bag| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push("handler");
                Ok::<_, WaymarkError>(TerminalResponse::ok(json!({})))
            }
        }
    })
    .on_error(|_| Ok(()))
    .build();

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/boom").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Failed);
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_error_without_callback_propagates() {
    let config = ok_endpoint(RouteDescriptor::get("/fail"));
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Err::<TerminalResponse, _>(WaymarkError::msg("database unavailable"))
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    let result = dispatcher
        .dispatch(TestRequest::get("/fail").build().unwrap(), response.clone())
        .await;

    assert!(result.is_err());
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Legacy middleware
// ============================================================================

#[tokio::test]
async fn test_legacy_middleware_aborts_on_close() {
    let legacy = LegacyMiddleware::new("slow", |_request, _response| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<_, WaymarkError>(())
    })
    .into_unit();
    let config = ok_endpoint(RouteDescriptor::get("/slow")).middleware(legacy);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::builder(config, |_bag| async {
        Ok::<_, WaymarkError>(TerminalResponse::ok(json!({})))
    })
    .on_error({
        let errors = Arc::clone(&errors);
        move |err| {
            errors.lock().push(err);
            Ok(())
        }
    })
    .build();

    let response = Arc::new(RecordingResponse::new());
    let closer = Arc::clone(&response);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        closer.close();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.dispatch(TestRequest::get("/slow").build().unwrap(), response.clone()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(outcome, DispatchOutcome::Failed);
    assert!(matches!(
        errors.lock().as_slice(),
        [WaymarkError::ResponseClosed { middleware }] if middleware == "slow"
    ));
}

#[tokio::test]
async fn test_legacy_middleware_that_answers_halts_chain() {
    let legacy = LegacyMiddleware::new("gate", |_request, response| async move {
        response.set_status(StatusCode::FORBIDDEN);
        response.send(None);
        Ok::<_, WaymarkError>(())
    })
    .responses(ResponseSet::new().no_body(StatusCode::FORBIDDEN))
    .into_unit();
    let log: Log = Arc::default();
    let config = ok_endpoint(RouteDescriptor::get("/gated")).middleware(legacy);
    let (dispatcher, _) = build(config, &log);

    let response = Arc::new(RecordingResponse::new());
    let outcome = dispatcher
        .dispatch(TestRequest::get("/gated").build().unwrap(), response.clone())
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::SentElsewhere);
    assert!(log.lock().is_empty());
    response
        .assert_status(StatusCode::FORBIDDEN)
        .assert_sent_once();
}
