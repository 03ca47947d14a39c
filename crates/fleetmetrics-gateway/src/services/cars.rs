use axum::{extract::Path, Json};

pub async fn list() -> Json<[&'static str; 4]> {
    Json(["toyota", "honda", "mazda", "lexus"])
}

pub async fn get(Path(id): Path<u64>) -> &'static str {
    tracing::trace!(id, "get car");
    "Single car"
}

pub async fn create() -> &'static str {
    "Creating car"
}

pub async fn update(Path(id): Path<u64>) -> &'static str {
    tracing::trace!(id, "update car");
    "Updating car"
}

pub async fn delete(Path(id): Path<u64>) -> &'static str {
    tracing::trace!(id, "delete car");
    "Deleting car"
}
