//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};

use super::{
    handlers,
    middleware::{self, MiddlewareConfig},
    state::AppState,
};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, cfg: MiddlewareConfig) -> Router {
    let routes = Router::new()
        .route("/link", post(handlers::create_link))
        .route("/pwd/:link", get(handlers::get_password))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found);
    middleware::apply(routes, cfg).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::crypto::SymmetricEncoder;
    use crate::health::{HealthCheck, StorageHealthCheck};
    use crate::link::LinkService;
    use crate::storage::{SessionFactory, SqlStore, StoreOptions};

    async fn app() -> Router {
        let store = SqlStore::connect("sqlite", "sqlite::memory:", &StoreOptions::default())
            .await
            .unwrap();
        store.migrate().await.unwrap();
        let sessions: Arc<dyn SessionFactory> = Arc::new(store);
        let encoder = SymmetricEncoder::new("123456789123456789012345", (1u8..=16).collect::<Vec<_>>());
        let links = LinkService::new(sessions.clone(), encoder, 8);
        let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(StorageHealthCheck::new(sessions))];
        let state = AppState::new(links, checks, "http://localhost:8080/pwd".into(), CancellationToken::new());
        build(state, MiddlewareConfig::default())
    }

    async fn json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app().await.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(json(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn health_route_reports_storage() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app().await.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = json(resp).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["reason"], "");
    }

    #[tokio::test]
    async fn created_link_redeems_secret() {
        let app = app().await;

        let create = Request::builder()
            .method("POST")
            .uri("/link")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"password":"hunter2"}"#))
            .unwrap();
        let resp = app.clone().oneshot(create).await.unwrap();
        assert_eq!(resp.status(), 201);
        let created = json(resp).await;
        let link = created["link"].as_str().unwrap().to_owned();
        assert_eq!(created["url"], format!("http://localhost:8080/pwd/{link}"));

        // Redemption does not consume the record.
        for _ in 0..2 {
            let fetch = Request::builder()
                .uri(format!("/pwd/{link}"))
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(fetch).await.unwrap();
            assert_eq!(resp.status(), 200);
            assert_eq!(json(resp).await["password"], "hunter2");
        }
    }
}
