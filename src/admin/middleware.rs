//! Bearer-token + privileged-key gate shared by every admin route (§4.6, §6).

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;

/// Missing header ⇒ 401; malformed `Bearer` scheme ⇒ 400; wrong key ⇒ 403.
pub async fn require_admin_key(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if header.len() <= 7 || !header[..7].eq_ignore_ascii_case("bearer ") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let token = &header[7..];
    if token != state.admin_key {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::for_test("secret-key")
    }

    fn app() -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route_layer(axum::middleware::from_fn_with_state(state(), require_admin_key))
            .with_state(state())
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let resp = app().oneshot(HttpRequest::builder().uri("/ping").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_scheme_is_bad_request() {
        let resp = app()
            .oneshot(
                HttpRequest::builder().uri("/ping").header(header::AUTHORIZATION, "Token abc").body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_key_is_forbidden() {
        let resp = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn correct_key_passes_through() {
        let resp = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header(header::AUTHORIZATION, "Bearer secret-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
