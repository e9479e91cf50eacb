use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::info;

use crate::models::{HealthResponse, RootResponse, WeatherAck, WeatherReport};
use crate::state::AppState;

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "¡Hola desde la API de Rust!".to_string(),
        status: "OK".to_string(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        port: state.port,
    })
}

pub async fn receive_clima(Json(report): Json<WeatherReport>) -> impl IntoResponse {
    info!(
        "Weather reading from {}: {}°C, {}% humidity, {}",
        report.name, report.temperatura, report.humedad, report.clima
    );

    let ack = WeatherAck {
        mensaje: format!("Datos de {} recibidos correctamente", report.name),
        datos_recibidos: report,
    };

    (StatusCode::OK, Json(ack))
}
