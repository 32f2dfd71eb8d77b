//! Token-to-store auth interceptor for the tenant RPC plane (§4.7).
//!
//! Appended nearest the handler so it runs after the request-count wrapper
//! (which is prepended at the server layer, see `services::metrics_service`).

use std::sync::Arc;

use tonic::{Request, Status};

use crate::store::StoreRepository;

const TOKEN_LENGTH: usize = 16;

#[derive(Clone)]
pub struct StoreExtractor {
    repository: Arc<StoreRepository>,
}

impl StoreExtractor {
    pub fn new(repository: Arc<StoreRepository>) -> Self {
        Self { repository }
    }
}

impl tonic::service::Interceptor for StoreExtractor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let tokens: Vec<_> = request.metadata().get_all("token").iter().collect();
        if tokens.len() != 1 {
            return Err(Status::unauthenticated("exactly one token metadata entry is required"));
        }
        let token = tokens[0].to_str().map_err(|_| Status::unauthenticated("token metadata is not valid ascii"))?;
        if token.len() != TOKEN_LENGTH {
            return Err(Status::unauthenticated("token must be 16 characters"));
        }

        let store = self
            .repository
            .get_by_token(token)
            .ok_or_else(|| Status::permission_denied("unknown token"))?;
        request.extensions_mut().insert(store);
        Ok(request)
    }
}
