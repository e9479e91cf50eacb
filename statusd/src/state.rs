#[derive(Debug, Clone)]
pub struct AppState {
    pub port: u16,
}
