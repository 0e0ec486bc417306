use super::request::parse_request;
use super::response::write_rendered;
use crate::gateway::Gateway;
use crate::render::Rendered;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;

/// `may_minihttp` service answering every request through a [`Gateway`].
#[derive(Clone)]
pub struct AppService {
    pub gateway: Arc<Gateway>,
}

impl AppService {
    pub fn new(gateway: Gateway) -> Self {
        AppService {
            gateway: Arc::new(gateway),
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let rendered = match parse_request(req) {
            Ok(request) => self.gateway.handle(request),
            Err(_) => Rendered::error(400, "Bad Request."),
        };
        write_rendered(res, &rendered);
        Ok(())
    }
}
