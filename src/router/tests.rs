use super::{compile_template, Router};
use crate::spec::{build_operations, load_spec_from_value, OperationDescriptor};
use http::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn op(method: Method, template: &str, defaults: &[(&str, Value)]) -> Arc<OperationDescriptor> {
    Arc::new(OperationDescriptor {
        method,
        path_template: template.to_string(),
        route_template: Arc::from(template),
        operation_id: None,
        method_name: "m".to_string(),
        controller_name: "C".to_string(),
        around_hook: None,
        parameters: Vec::new(),
        responses: BTreeMap::new(),
        defaults: defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    })
}

#[test]
fn test_root_path() {
    let (re, params) = compile_template("/", &BTreeMap::new()).unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/x"));
    assert!(params.is_empty());
}

#[test]
fn test_standard_placeholder_stops_at_dot() {
    let (re, params) = compile_template("/items/:id", &BTreeMap::new()).unwrap();
    assert!(re.is_match("/items/123"));
    assert!(re.is_match("/items/123/"));
    assert!(!re.is_match("/items/123.json"));
    assert!(!re.is_match("/items"));
    assert_eq!(params, vec![Arc::<str>::from("id")]);
}

#[test]
fn test_relaxed_and_wildcard_placeholders() {
    let (re, _) = compile_template("/v/#ver", &BTreeMap::new()).unwrap();
    assert!(re.is_match("/v/1.2.3"));
    assert!(!re.is_match("/v/1/2"));

    let (re, _) = compile_template("/files/*path", &BTreeMap::new()).unwrap();
    let caps = re.captures("/files/a/b/c.txt").unwrap();
    assert_eq!(&caps[1], "a/b/c.txt");
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = compile_template("/a+b/(x)", &BTreeMap::new()).unwrap();
    assert!(re.is_match("/a+b/(x)"));
    assert!(!re.is_match("/aab/x"));
}

#[test]
fn test_route_matches_method_and_extracts_params() {
    let router = Router::new(&[
        op(Method::GET, "/api/pets", &[]),
        op(Method::GET, "/api/pets/:id", &[]),
        op(Method::DELETE, "/api/pets/:id", &[]),
    ])
    .unwrap();

    let m = router.route(&Method::GET, "/api/pets/42").unwrap();
    assert_eq!(&*m.operation.route_template, "/api/pets/:id");
    assert_eq!(m.get_path_param("id"), Some("42"));

    let m = router.route(&Method::DELETE, "/api/pets/42").unwrap();
    assert_eq!(m.operation.method, Method::DELETE);

    assert!(router.route(&Method::POST, "/api/pets/42").is_none());
    assert!(router.route(&Method::GET, "/pets/42").is_none());
}

#[test]
fn test_path_params_are_percent_decoded() {
    let router = Router::new(&[op(Method::GET, "/tags/#name", &[])]).unwrap();
    let m = router.route(&Method::GET, "/tags/hello%20world").unwrap();
    assert_eq!(m.get_path_param("name"), Some("hello world"));
}

#[test]
fn test_trailing_default_is_optional() {
    let router = Router::new(&[op(Method::GET, "/pets/:page", &[("page", json!(1))])]).unwrap();

    let m = router.route(&Method::GET, "/pets").unwrap();
    assert_eq!(m.get_path_param("page"), Some("1"));

    let m = router.route(&Method::GET, "/pets/3").unwrap();
    assert_eq!(m.get_path_param("page"), Some("3"));
}

#[test]
fn test_first_registered_route_wins() {
    let router = Router::new(&[
        op(Method::GET, "/pets/mine", &[]),
        op(Method::GET, "/pets/:id", &[]),
    ])
    .unwrap();
    let m = router.route(&Method::GET, "/pets/mine").unwrap();
    assert_eq!(&*m.operation.route_template, "/pets/mine");
    assert!(m.path_params.is_empty());
}

#[test]
fn test_root_operation_reachable_at_bare_base_path() {
    let spec = load_spec_from_value(json!({
        "swagger": "2.0",
        "basePath": "/api",
        "x-specgate-controller": "Index",
        "paths": {
            "/": { "get": { "operationId": "home", "responses": {} } },
            "/pets": { "get": { "operationId": "listPets", "responses": {} } }
        }
    }))
    .unwrap();
    let ops: Vec<_> = build_operations(&spec, None)
        .unwrap()
        .into_iter()
        .map(Arc::new)
        .collect();
    let router = Router::new(&ops).unwrap();

    for path in ["/api", "/api/"] {
        let m = router.route(&Method::GET, path).unwrap();
        assert_eq!(m.operation.method_name, "home", "{path}");
    }
    assert_eq!(
        router.route(&Method::GET, "/api/pets").unwrap().operation.method_name,
        "list_pets"
    );
    assert!(router.route(&Method::GET, "/").is_none());
}
