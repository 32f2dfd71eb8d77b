//! HTTPS/JSON admin surface: list, create, patch, delete, rotate, metrics (C6).

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StorePatch, StoreRecord};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    #[serde(rename = "ownerId")]
    pub owner_id: u64,
    #[serde(rename = "submissionId", default)]
    pub submission_id: u64,
    #[serde(default)]
    pub id: u16,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RepositorySnapshot {
    pub items: HashMap<String, StoreRecord>,
}

pub async fn list_stores(State(state): State<AppState>) -> Json<RepositorySnapshot> {
    Json(RepositorySnapshot { items: state.repository.snapshot() })
}

pub async fn create_store(
    State(state): State<AppState>,
    body: Result<Json<CreateStoreRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<StoreRecord>, StatusCode> {
    let Json(req) = body.map_err(|_| StatusCode::BAD_REQUEST)?;
    if req.owner_id == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let store = state
        .repository
        .create(req.owner_id, req.submission_id, req.id, req.token)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to persist new store");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(store.record()))
}

fn parse_id(raw: &str) -> Result<u16, StatusCode> {
    raw.parse::<u16>().map_err(|_| StatusCode::BAD_REQUEST)
}

pub async fn patch_store(
    State(state): State<AppState>,
    Path(id_raw): Path<String>,
    body: Result<Json<StorePatch>, axum::extract::rejection::JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let id = parse_id(&id_raw)?;
    let Json(patch) = body.map_err(|_| StatusCode::BAD_REQUEST)?;

    let store = state.repository.get_by_id(id).ok_or(StatusCode::NOT_FOUND)?;
    let old_token = store.token();

    store.apply_patch(&patch);
    state.repository.save(&store).map_err(|e| {
        tracing::error!(error = %e, "failed to persist patched store");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let new_token = store.token();
    if new_token != old_token {
        state.repository.forget_token(&old_token);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_store(State(state): State<AppState>, Path(id_raw): Path<String>) -> Result<StatusCode, StatusCode> {
    let id = parse_id(&id_raw)?;
    if !state.repository.exists(id) {
        return Err(StatusCode::NOT_FOUND);
    }
    state.repository.delete(id).map_err(|e| {
        tracing::error!(error = %e, "failed to delete store");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rotate_token(State(state): State<AppState>, Path(id_raw): Path<String>) -> Result<String, StatusCode> {
    let id = parse_id(&id_raw)?;
    let store = state.repository.get_by_id(id).ok_or(StatusCode::NOT_FOUND)?;
    state.repository.rotate_token(&store).map_err(|e| {
        tracing::error!(error = %e, "failed to persist rotated token");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

pub async fn store_metrics(State(state): State<AppState>, Path(id_raw): Path<String>) -> Result<Json<Value>, StatusCode> {
    let id = parse_id(&id_raw).map_err(|_| StatusCode::NOT_FOUND)?;
    let store = state.repository.get_by_id(id).ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = store.metrics().collect();
    Ok(Json(serde_json::to_value(snapshot).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?))
}

pub async fn global_metrics(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let snapshot = state.global.collect();
    Ok(Json(serde_json::to_value(snapshot).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (axum::Router, AppState) {
        let state = AppState::for_test("admin-key");
        (crate::admin::router(state.clone()), state)
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn auth() -> (&'static str, &'static str) {
        ("authorization", "Bearer admin-key")
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let (app, _state) = app();
        let (hk, hv) = auth();
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stores")
                    .header(hk, hv)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ownerId":42}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body_json(resp).await;
        assert_eq!(created["ownerId"], 42);
        assert_eq!(created["id"], 1);
        let token = created["token"].as_str().unwrap().to_string();
        assert_eq!(token.len(), 16);

        let resp = app
            .oneshot(Request::builder().uri("/stores").header(hk, hv).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = body_json(resp).await;
        assert!(listed["items"].get(&token).is_some());
    }

    #[tokio::test]
    async fn create_without_owner_id_is_bad_request() {
        let (app, _state) = app();
        let (hk, hv) = auth();
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stores")
                    .header(hk, hv)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_unknown_store_is_not_found() {
        let (app, _state) = app();
        let (hk, hv) = auth();
        let resp = app
            .oneshot(Request::builder().method("DELETE").uri("/stores/99").header(hk, hv).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_id_is_bad_request() {
        let (app, _state) = app();
        let (hk, hv) = auth();
        let resp = app
            .oneshot(Request::builder().method("DELETE").uri("/stores/not-a-number").header(hk, hv).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
