use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<ServerStatus> {
    Json(ServerStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "serving",
    })
}
