//! Binary RPC surface: get/put/delete against the store the interceptor
//! resolved and attached to the request (C7).

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::store::Store;
use crate::tenant::proto::tenant_server::Tenant;
use crate::tenant::proto::{DeleteRequest, DeleteResponse, GetRequest, GetResponse, PutRequest, PutResponse};

#[derive(Default)]
pub struct TenantService;

fn resolved_store<T>(request: &Request<T>) -> Result<Arc<Store>, Status> {
    request
        .extensions()
        .get::<Arc<Store>>()
        .cloned()
        .ok_or_else(|| Status::internal("store extractor did not run"))
}

#[tonic::async_trait]
impl Tenant for TenantService {
    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let store = resolved_store(&request)?;
        let key = request.into_inner().key;
        let value = store.get(key.as_bytes()).map_err(|e| Status::internal(e.to_string()))?;
        match value {
            Some(value) => Ok(Response::new(GetResponse { value })),
            None => Err(Status::not_found("key not present")),
        }
    }

    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        let store = resolved_store(&request)?;
        let inner = request.into_inner();
        let Some(value) = inner.value else {
            return Err(Status::invalid_argument("value must not be null"));
        };
        store.put(inner.key.as_bytes(), &value).map_err(|e| Status::internal(e.to_string()))?;
        Ok(Response::new(PutResponse {}))
    }

    async fn delete(&self, request: Request<DeleteRequest>) -> Result<Response<DeleteResponse>, Status> {
        let store = resolved_store(&request)?;
        let key = request.into_inner().key;
        store.delete(key.as_bytes()).map_err(|e| Status::internal(e.to_string()))?;
        Ok(Response::new(DeleteResponse {}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_data() -> Arc<Store> {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path().join("glitchd.db")).unwrap();
        std::mem::forget(dir);
        let record = crate::store::StoreRecord { id: 1, token: "a".repeat(16), owner_id: 1, submission_id: 0 };
        Arc::new(Store::attach(&db, record).unwrap())
    }

    fn request_with_store<T>(body: T) -> Request<T> {
        let mut req = Request::new(body);
        req.extensions_mut().insert(store_with_data());
        req
    }

    #[tokio::test]
    async fn put_rejects_null_value() {
        let svc = TenantService;
        let req = request_with_store(PutRequest { key: "k".into(), value: None });
        let err = svc.put(req).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let svc = TenantService;
        let req = request_with_store(GetRequest { key: "missing".into() });
        let err = svc.get(req).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = store_with_data();
        let svc = TenantService;

        let mut put_req = Request::new(PutRequest { key: "a".into(), value: Some(b"x".to_vec()) });
        put_req.extensions_mut().insert(store.clone());
        svc.put(put_req).await.unwrap();

        let mut get_req = Request::new(GetRequest { key: "a".into() });
        get_req.extensions_mut().insert(store);
        let resp = svc.get(get_req).await.unwrap();
        assert_eq!(resp.into_inner().value, b"x");
    }
}
