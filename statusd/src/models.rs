use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub port: u16,
}

/// Weather reading posted by the load generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub name: String,
    pub temperatura: i32,
    pub humedad: i32,
    pub clima: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeatherAck {
    pub mensaje: String,
    pub datos_recibidos: WeatherReport,
}
