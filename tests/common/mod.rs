#![allow(dead_code)]

use serde_json::json;
use specgate::dispatcher::{Dispatcher, HandlerRequest, RequestContext};
use specgate::gateway::{Gateway, GatewayConfig};
use specgate::hooks::{AroundHook, Next};
use specgate::render::Rendered;
use specgate::spec::OperationDescriptor;
use std::sync::Arc;

/// Pet store document shared by the integration tests.
pub const PETSTORE_YAML: &str = r##"
swagger: "2.0"
info:
  title: Pets
  version: "1.0"
basePath: /api
x-specgate-controller: Pet
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - { name: limit, in: query, type: integer, default: 10 }
        - { name: tags, in: query, type: array, collectionFormat: pipes, items: { type: string } }
        - { name: verbose, in: query, type: boolean }
      responses:
        "200":
          description: ok
          schema:
            type: object
            required: [limit]
            properties:
              limit: { type: integer }
    post:
      operationId: addPet
      parameters:
        - { name: pet, in: body, required: true, schema: { $ref: "#/definitions/Pet" } }
      responses:
        "201":
          description: created
          schema: { $ref: "#/definitions/Pet" }
  /pets/{petId}:
    get:
      operationId: showPetById
      parameters:
        - { name: petId, in: path, required: true, type: integer }
      responses:
        "200":
          description: ok
          schema: { $ref: "#/definitions/Pet" }
        default:
          description: error
          schema: { $ref: "#/definitions/Error" }
  /ip:
    get:
      x-specgate-controller: Network
      operationId: lookupIp
      parameters:
        - { name: ip, in: query, required: true, type: string }
      responses:
        "200": { description: ok }
  /secret:
    get:
      operationId: getSecret
      x-specgate-around: auth
      responses:
        "200":
          description: ok
          schema: { type: string }
  /ghost:
    get:
      x-specgate-controller: Ghost
      operationId: haunt
      responses:
        "200": { description: ok }
definitions:
  Pet:
    type: object
    required: [id, name]
    properties:
      id: { type: integer }
      name: { type: string }
      tag: { type: string }
  Error:
    type: object
    required: [code]
    properties:
      code: { type: integer }
      message: { type: string }
"##;

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary file with the given extension.
    ///
    /// The file is removed when the returned handle is dropped.
    pub fn create_temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("specgate_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_spec(content, "json")
    }
}

pub mod test_server {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Once;
    use std::time::Duration;

    static MAY_INIT: Once = Once::new();

    /// Configure the may scheduler once per test binary.
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x10000);
        });
    }

    /// A loopback address whose port was free a moment ago.
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Split a raw response into status, header block and body.
    pub fn parse_response(resp: &str) -> (u16, String, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let status = head
            .lines()
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        (status, head.to_string(), body.to_string())
    }
}

/// Handlers for the pet store document.
///
/// `Ghost` is deliberately absent and `Network` has no `lookup_ip`.
pub fn pet_dispatcher() -> Dispatcher {
    test_server::setup_may_runtime();
    let mut dispatcher = Dispatcher::new();
    dispatcher.declare_controller("Network");
    unsafe {
        dispatcher.register_handler("Pet", "list_pets", |req: HandlerRequest| {
            let input = serde_json::Value::Object(req.input.clone());
            let limit = input["limit"].clone();
            req.ok(json!({ "limit": limit, "input": input }));
        });
        dispatcher.register_handler("Pet", "add_pet", |req: HandlerRequest| {
            let pet = req.input_value("pet").cloned().unwrap_or_default();
            req.complete(pet, 201);
        });
        dispatcher.register_handler("Pet", "show_pet_by_id", |req: HandlerRequest| {
            let id = req.input_value("petId").and_then(|v| v.as_i64());
            match id {
                // Deliberately violates the Pet schema
                Some(13) => req.ok(json!({ "id": "thirteen" })),
                Some(404) => req.complete(json!({ "code": 404, "message": "no such pet" }), 404),
                Some(id) => req.ok(json!({ "id": id, "name": format!("pet-{id}") })),
                None => req.complete(json!({ "code": 400 }), 400),
            }
        });
        dispatcher.register_handler("Pet", "get_secret", |req: HandlerRequest| {
            req.ok(json!("the secret"));
        });
    }
    dispatcher
}

pub fn petstore_config() -> GatewayConfig {
    let document: serde_json::Value = serde_yaml::from_str(PETSTORE_YAML).unwrap();
    GatewayConfig::from_document(document)
}

/// Gateway over the pet store; `dispatcher` must already carry an `auth` hook.
pub fn petstore_gateway(dispatcher: Dispatcher) -> Gateway {
    Gateway::register(&petstore_config(), dispatcher).unwrap()
}

/// Lets a request through only with `X-Api-Key: s3cret`.
pub struct ApiKeyHook;

impl AroundHook for ApiKeyHook {
    fn around(&self, next: Next<'_>, ctx: &RequestContext, _op: &OperationDescriptor) -> Rendered {
        match ctx.request.header("x-api-key") {
            Some("s3cret") => next.run(),
            _ => Rendered::error(401, "Unauthorized."),
        }
    }
}

/// Pet store handlers plus the `auth` hook.
pub fn default_gateway() -> Gateway {
    let mut dispatcher = pet_dispatcher();
    dispatcher.register_hook("auth", Arc::new(ApiKeyHook));
    petstore_gateway(dispatcher)
}
