use axum::Json;

pub async fn list() -> Json<[&'static str; 4]> {
    Json(["boat1", "boat2", "boat3", "boat4"])
}

pub async fn create() -> &'static str {
    "Creating boat"
}
