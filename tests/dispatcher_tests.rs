//! Tests for the dispatcher and the coroutine handler protocol
//!
//! # Test Coverage
//!
//! Drives the pet store gateway end to end (router, hook, pipeline,
//! handler coroutine, response validation) and checks the status mapping:
//! - 200/201 success, handler chosen status, undeclared status
//! - 400 input invalid, 500 output invalid with the payload kept
//! - 501 for a missing controller or method, 404 for unknown routes
//! - Dropped and panicking completions, completions from other coroutines
//! - Typed handlers and `Completion::fail`
//! - Schemas compiled once at registration, never per request

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use specgate::dispatcher::{Dispatcher, HandlerRequest};
use specgate::gateway::Gateway;
use specgate::server::RequestData;
use specgate::typed::{TypedHandler, TypedOutcome};
use specgate::validator::{JsonSchemaValidator, Schema, ValidationError};
use std::sync::Arc;

mod common;
use common::{default_gateway, pet_dispatcher, petstore_gateway, ApiKeyHook};

fn get(gateway: &Gateway, target: &str) -> specgate::Rendered {
    gateway.handle(RequestData::new(Method::GET, target))
}

/// A dispatcher with the `auth` hook and one custom `list_pets` handler.
fn gateway_with_list_pets<F>(handler: F) -> Gateway
where
    F: Fn(HandlerRequest) + Send + 'static,
{
    common::test_server::setup_may_runtime();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register_hook("auth", Arc::new(ApiKeyHook));
    unsafe {
        dispatcher.register_handler("Pet", "list_pets", handler);
    }
    petstore_gateway(dispatcher)
}

#[test]
fn test_success_with_default_parameter() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 200);
    assert!(rendered.errors.is_empty());
    assert_eq!(rendered.body(), json!({ "limit": 10, "input": { "limit": 10 } }));
    assert_eq!(rendered.content_type(), "application/json");
}

#[test]
fn test_input_invalid_renders_400() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/pets?limit=many");
    assert_eq!(rendered.status, 400);
    let body = rendered.body();
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["errors"][0]["path"], json!("/limit"));
    assert!(body["errors"][0]["message"].is_string());
}

#[test]
fn test_output_invalid_renders_500_and_keeps_payload() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/pets/13");
    assert_eq!(rendered.status, 500);
    assert_eq!(rendered.payload, Some(json!({ "id": "thirteen" })));
    let mut paths: Vec<&str> = rendered.errors.iter().map(|e| e.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["/id", "/name"]);
    assert_eq!(rendered.body()["valid"], json!(false));
}

#[test]
fn test_valid_output_for_path_parameter() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/pets/7");
    assert_eq!(rendered.status, 200);
    assert_eq!(rendered.body(), json!({ "id": 7, "name": "pet-7" }));
}

#[test]
fn test_default_response_schema_applies_to_other_statuses() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/pets/404");
    assert_eq!(rendered.status, 404);
    assert!(rendered.errors.is_empty());
    assert_eq!(rendered.body()["message"], json!("no such pet"));
}

#[test]
fn test_controller_not_implemented() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/ghost");
    assert_eq!(rendered.status, 501);
    assert_eq!(
        rendered.body(),
        json!({ "valid": false, "errors": [{ "message": "Controller not implemented.", "path": "/" }] })
    );
}

#[test]
fn test_method_not_implemented_precedes_input_validation() {
    let gateway = default_gateway();
    // `ip` is required but missing; the missing method wins
    let rendered = get(&gateway, "/api/ip");
    assert_eq!(rendered.status, 501);
    assert_eq!(rendered.errors[0].message, "Method \"lookupIp\" not implemented.");
    assert_eq!(rendered.errors[0].path, "/");
}

#[test]
fn test_unknown_route_and_method() {
    let gateway = default_gateway();
    let rendered = get(&gateway, "/api/unicorns");
    assert_eq!(rendered.status, 404);
    assert_eq!(rendered.errors[0].message, "Not Found.");

    let rendered = gateway.handle(RequestData::new(Method::DELETE, "/api/pets"));
    assert_eq!(rendered.status, 404);
}

#[test]
fn test_body_round_trip_with_status() {
    let gateway = default_gateway();
    let pet = json!({ "id": 3, "name": "Rex", "tag": "dog" });
    let rendered = gateway.handle(RequestData::new(Method::POST, "/api/pets").with_json_body(pet.clone()));
    assert_eq!(rendered.status, 201);
    assert_eq!(rendered.body(), pet);
}

#[test]
fn test_body_validation_error_paths() {
    let gateway = default_gateway();
    let rendered = gateway.handle(
        RequestData::new(Method::POST, "/api/pets").with_json_body(json!({ "id": 3 })),
    );
    assert_eq!(rendered.status, 400);
    assert_eq!(rendered.errors.len(), 1);
    assert_eq!(rendered.errors[0].path, "/pet/name");

    let rendered = gateway.handle(RequestData::new(Method::POST, "/api/pets"));
    assert_eq!(rendered.status, 400);
    assert_eq!(rendered.errors[0].path, "/pet");
}

#[test]
fn test_undeclared_status_is_unconstrained() {
    let gateway = gateway_with_list_pets(|req: HandlerRequest| {
        req.complete(json!("accepted"), 202);
    });
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 202);
    assert_eq!(rendered.body(), json!("accepted"));
    assert_eq!(rendered.content_type(), "text/plain");
}

#[test]
fn test_dropped_completion_renders_500() {
    let gateway = gateway_with_list_pets(|req: HandlerRequest| {
        drop(req);
    });
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 500);
    assert_eq!(rendered.errors[0].message, "Handler did not complete.");
}

#[test]
fn test_panicking_handler_renders_500_and_survives() {
    let gateway = gateway_with_list_pets(|req: HandlerRequest| {
        if req.input_value("verbose") == Some(&json!(true)) {
            panic!("boom");
        }
        req.ok(json!({ "limit": 1 }));
    });
    let rendered = get(&gateway, "/api/pets?verbose=true");
    assert_eq!(rendered.status, 500);
    assert_eq!(rendered.errors[0].message, "Handler did not complete.");

    // The coroutine keeps serving after a panic
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 200);
}

#[test]
fn test_completion_from_another_coroutine() {
    let gateway = gateway_with_list_pets(|req: HandlerRequest| {
        let HandlerRequest { input, completion, .. } = req;
        may::go!(move || {
            may::coroutine::sleep(std::time::Duration::from_millis(5));
            completion.ok(json!({ "limit": input["limit"].clone(), "deferred": true }));
        });
    });
    let rendered = get(&gateway, "/api/pets?limit=3");
    assert_eq!(rendered.status, 200);
    assert_eq!(rendered.body(), json!({ "limit": 3, "deferred": true }));
}

#[test]
fn test_fail_renders_handler_errors() {
    let gateway = gateway_with_list_pets(|req: HandlerRequest| {
        req.fail(409, vec![ValidationError::new("Already listed.", "/limit")]);
    });
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 409);
    assert_eq!(rendered.payload, None);
    assert_eq!(
        rendered.body(),
        json!({ "valid": false, "errors": [{ "message": "Already listed.", "path": "/limit" }] })
    );
}

#[derive(Deserialize)]
struct ListPets {
    limit: i64,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Serialize)]
struct Listing {
    limit: i64,
    tags: Vec<String>,
}

struct ListPetsTyped;

impl TypedHandler for ListPetsTyped {
    type Input = ListPets;
    type Output = Listing;

    fn handle(&self, input: ListPets) -> TypedOutcome<Listing> {
        TypedOutcome::ok(Listing {
            limit: input.limit * 2,
            tags: input.tags,
        })
    }
}

#[derive(Deserialize)]
struct NeedsName {
    #[allow(dead_code)]
    name: String,
}

struct Mismatched;

impl TypedHandler for Mismatched {
    type Input = NeedsName;
    type Output = Value;

    fn handle(&self, _input: NeedsName) -> TypedOutcome<Value> {
        TypedOutcome::ok(json!({ "limit": 0 }))
    }
}

#[test]
fn test_typed_handler() {
    common::test_server::setup_may_runtime();
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(ApiKeyHook));
    unsafe {
        dispatcher.register_typed("Pet", "list_pets", ListPetsTyped);
    }
    let gateway = petstore_gateway(dispatcher);
    let rendered = get(&gateway, "/api/pets?limit=4&tags=a|b");
    assert_eq!(rendered.status, 200);
    assert_eq!(rendered.body(), json!({ "limit": 8, "tags": ["a", "b"] }));
}

#[test]
fn test_typed_input_mismatch_renders_500() {
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(ApiKeyHook));
    unsafe {
        dispatcher.register_typed("Pet", "list_pets", Mismatched);
    }
    let gateway = petstore_gateway(dispatcher);
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 500);
    assert_eq!(rendered.errors[0].path, "/");
    assert!(rendered.errors[0].message.contains("name"));
}

#[test]
fn test_registry_queries() {
    let dispatcher = pet_dispatcher();
    assert!(dispatcher.has_controller("Pet"));
    assert!(dispatcher.has_controller("Network"));
    assert!(!dispatcher.has_controller("Ghost"));
    assert!(dispatcher.has_method("Pet", "show_pet_by_id"));
    assert!(!dispatcher.has_method("Network", "lookup_ip"));
}

#[test]
fn test_request_id_header_is_reused() {
    let gateway = gateway_with_list_pets(|req: HandlerRequest| {
        let id = req.request_id.to_string();
        req.ok(json!({ "limit": 1, "request_id": id }));
    });
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/pets").with_header("X-Request-Id", id));
    assert_eq!(rendered.body()["request_id"], json!(id));
}

/// Rejects every instance at the document root.
struct RejectAll;

impl specgate::validator::SchemaValidator for RejectAll {
    fn validate(&self, _instance: &Value, _schema: &Schema) -> Vec<ValidationError> {
        vec![ValidationError::new("rejected", "/")]
    }
}

#[test]
fn test_custom_validator_is_used() {
    let mut dispatcher = pet_dispatcher().with_validator(Arc::new(RejectAll));
    dispatcher.register_hook("auth", Arc::new(ApiKeyHook));
    let gateway = petstore_gateway(dispatcher);

    // `limit` always has a value, so input validation fails first
    let rendered = get(&gateway, "/api/pets");
    assert_eq!(rendered.status, 400);
    assert_eq!(rendered.errors[0].message, "rejected");

    // No parameters: only the output schema is checked
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/secret").with_header("x-api-key", "s3cret"));
    assert_eq!(rendered.status, 500);
    assert_eq!(rendered.payload, Some(json!("the secret")));
}

#[test]
fn test_schemas_compile_at_registration_only() {
    let validator = Arc::new(JsonSchemaValidator::default());
    let mut dispatcher = pet_dispatcher().with_validator(validator.clone());
    dispatcher.register_hook("auth", Arc::new(ApiKeyHook));
    let gateway = petstore_gateway(dispatcher);

    let warmed = validator.compilations();
    assert!(warmed > 0);
    assert_eq!(validator.cached(), warmed);

    for _ in 0..3 {
        assert_eq!(get(&gateway, "/api/pets?limit=4").status, 200);
        assert_eq!(get(&gateway, "/api/pets?limit=many").status, 400);
        assert_eq!(get(&gateway, "/api/pets/13").status, 500);
        assert_eq!(get(&gateway, "/api/pets/404").status, 404);
        let pet = json!({ "id": 1, "name": "Rex" });
        let created = gateway.handle(RequestData::new(Method::POST, "/api/pets").with_json_body(pet));
        assert_eq!(created.status, 201);
        assert_eq!(gateway.handle(RequestData::new(Method::POST, "/api/pets")).status, 400);
        let secret = gateway.handle(RequestData::new(Method::GET, "/api/secret").with_header("x-api-key", "s3cret"));
        assert_eq!(secret.status, 200);
    }
    assert_eq!(validator.compilations(), warmed);
}
