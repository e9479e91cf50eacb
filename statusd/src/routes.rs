use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the full Axum app. Centralizes route registration so tests can
/// drive the router without binding a socket.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/clima", post(handlers::receive_clima))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthResponse, WeatherAck};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(port: u16) -> Router {
        build_app(Arc::new(AppState { port }))
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn root_reports_ok() {
        let (status, body) = get_body(app(8000), "/").await;
        assert_eq!(status, StatusCode::OK);

        let v: serde_json::Value = serde_json::from_slice(&body).expect("invalid JSON");
        assert_eq!(v["status"], "OK");
        assert!(v["message"].is_string());
    }

    #[tokio::test]
    async fn root_is_idempotent() {
        let app = app(8000);
        let (_, first) = get_body(app.clone(), "/").await;
        let (_, second) = get_body(app, "/").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn health_reports_configured_port() {
        let (status, body) = get_body(app(9090), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let health: HealthResponse = serde_json::from_slice(&body).expect("invalid JSON");
        assert_eq!(health.status, "healthy");
        assert_eq!(health.port, 9090);
    }

    #[tokio::test]
    async fn health_reports_default_port() {
        let (status, body) = get_body(app(crate::DEFAULT_PORT), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let health: HealthResponse = serde_json::from_slice(&body).expect("invalid JSON");
        assert_eq!(health.port, 8000);
    }

    #[tokio::test]
    async fn unmatched_route_is_404() {
        let (status, _) = get_body(app(8000), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clima_echoes_the_reading() {
        let payload = serde_json::json!({
            "name": "guatemala",
            "temperatura": 22,
            "humedad": 55,
            "clima": "nublado"
        });

        let response = app(8000)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/clima")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let ack: WeatherAck = serde_json::from_slice(&bytes).expect("invalid JSON");
        assert_eq!(ack.mensaje, "Datos de guatemala recibidos correctamente");
        assert_eq!(ack.datos_recibidos.name, "guatemala");
        assert_eq!(ack.datos_recibidos.temperatura, 22);
    }

    #[tokio::test]
    async fn clima_rejects_malformed_body() {
        let response = app(8000)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/clima")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "guatemala"}"#))
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed");

        assert!(response.status().is_client_error());
    }
}
