use crate::cli::{format_route, Cli, Commands};
use crate::spec::{build_operations, load_spec_from_value};
use clap::Parser;
use serde_json::json;

#[test]
fn test_serve_command_parses() {
    let cli = Cli::try_parse_from([
        "specgate", "serve", "--spec", "pets.yaml", "--route", "/api", "--addr", "127.0.0.1:9000",
    ])
    .unwrap();
    match cli.command {
        Commands::Serve { spec, addr } => {
            assert_eq!(spec.spec.as_deref(), Some("pets.yaml"));
            assert_eq!(addr, "127.0.0.1:9000");
            let config = spec.gateway_config().unwrap();
            assert_eq!(config.url.as_deref(), Some("pets.yaml"));
            assert_eq!(config.route.as_deref(), Some("/api"));
        }
        other => panic!("expected serve, got {other:?}"),
    }
}

#[test]
fn test_serve_default_addr() {
    let cli = Cli::try_parse_from(["specgate", "serve", "--spec", "pets.yaml"]).unwrap();
    match cli.command {
        Commands::Serve { addr, .. } => assert_eq!(addr, "0.0.0.0:8080"),
        other => panic!("expected serve, got {other:?}"),
    }
}

#[test]
fn test_spec_and_config_conflict() {
    assert!(Cli::try_parse_from([
        "specgate", "check", "--spec", "a.yaml", "--config", "gateway.yaml"
    ])
    .is_err());
}

#[test]
fn test_routes_requires_a_source() {
    let cli = Cli::try_parse_from(["specgate", "routes"]).unwrap();
    match cli.command {
        Commands::Routes { spec } => assert!(spec.gateway_config().is_err()),
        other => panic!("expected routes, got {other:?}"),
    }
}

#[test]
fn test_format_route() {
    let spec = load_spec_from_value(json!({
        "swagger": "2.0",
        "basePath": "/api",
        "x-specgate-controller": "Pet",
        "paths": { "/pets/{id}": { "get": { "operationId": "showPetById", "x-specgate-around": "auth" } } }
    }))
    .unwrap();
    let ops = build_operations(&spec, None).unwrap();
    assert_eq!(
        format_route(&ops[0]),
        "GET     /api/pets/:id -> Pet#show_pet_by_id (around: auth)"
    );
}
