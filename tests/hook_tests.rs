//! Tests for around hooks
//!
//! # Test Coverage
//!
//! - A hook short-circuits (401) without reaching the handler
//! - A hook that runs `next` returns the normal pipeline result
//! - Hooks see the routed context and operation descriptor
//! - Registration fails for an undeclared hook name

use http::Method;
use serde_json::json;
use specgate::dispatcher::{Dispatcher, RequestContext};
use specgate::echo::{register_pass_through_hooks, PassThroughHook};
use specgate::gateway::{compile, Gateway};
use specgate::hooks::{AroundHook, Next};
use specgate::render::Rendered;
use specgate::server::RequestData;
use specgate::spec::{CompileIssueKind, OperationDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;
use common::{default_gateway, pet_dispatcher, petstore_config, petstore_gateway};

#[test]
fn test_hook_short_circuits_without_key() {
    let gateway = default_gateway();
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/secret"));
    assert_eq!(rendered.status, 401);
    assert_eq!(
        rendered.body(),
        json!({ "valid": false, "errors": [{ "message": "Unauthorized.", "path": "/" }] })
    );
}

#[test]
fn test_hook_continues_with_key() {
    let gateway = default_gateway();
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/secret").with_header("X-Api-Key", "s3cret"));
    assert_eq!(rendered.status, 200);
    assert_eq!(rendered.body(), json!("the secret"));
    assert_eq!(rendered.body_bytes(), b"the secret".to_vec());
}

#[test]
fn test_hook_only_wraps_its_operation() {
    let gateway = default_gateway();
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/pets"));
    assert_eq!(rendered.status, 200);
}

struct Counting {
    seen: Arc<AtomicUsize>,
}

impl AroundHook for Counting {
    fn around(&self, next: Next<'_>, ctx: &RequestContext, op: &OperationDescriptor) -> Rendered {
        assert_eq!(op.method_name, "get_secret");
        assert_eq!(ctx.request.path, "/api/secret");
        self.seen.fetch_add(1, Ordering::SeqCst);
        next.run()
    }
}

#[test]
fn test_hook_receives_context_and_operation() {
    let seen = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(Counting { seen: Arc::clone(&seen) }));
    let gateway = petstore_gateway(dispatcher);

    gateway.handle(RequestData::new(Method::GET, "/api/secret"));
    gateway.handle(RequestData::new(Method::GET, "/api/pets"));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_hook_inspects_inner_response() {
    struct Inspect;
    impl AroundHook for Inspect {
        fn around(&self, next: Next<'_>, _ctx: &RequestContext, _op: &OperationDescriptor) -> Rendered {
            let inner = next.run();
            assert_eq!(inner.status, 200);
            inner
        }
    }
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(Inspect));
    let gateway = petstore_gateway(dispatcher);
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/secret"));
    assert_eq!(rendered.status, 200);
}

#[test]
fn test_unregistered_hook_fails_registration() {
    let err = Gateway::register(&petstore_config(), pet_dispatcher())
        .err()
        .expect("registration must fail without the auth hook");
    assert!(err.has_kind(CompileIssueKind::UnknownHook));
    assert!(err.to_string().contains("auth"));
}

#[test]
fn test_pass_through_hooks_fill_missing_names() {
    let operations = compile(&petstore_config()).unwrap();
    let mut dispatcher = Dispatcher::new();
    register_pass_through_hooks(&mut dispatcher, &operations);
    assert!(dispatcher.hooks().contains("auth"));

    // Existing registrations are left alone
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(common::ApiKeyHook));
    register_pass_through_hooks(&mut dispatcher, &operations);
    let gateway = Gateway::from_operations(operations, dispatcher).unwrap();
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/secret"));
    assert_eq!(rendered.status, 401);
}

#[test]
fn test_pass_through_hook_is_transparent() {
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(PassThroughHook));
    let gateway = petstore_gateway(dispatcher);
    let rendered = gateway.handle(RequestData::new(Method::GET, "/api/secret"));
    assert_eq!(rendered.status, 200);
    assert_eq!(rendered.body(), json!("the secret"));
}
