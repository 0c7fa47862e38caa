use axum::{http::StatusCode, response::IntoResponse, Extension, Json};

use stockroom_auth::CurrentUser;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": user.user_id().to_string(),
        "roles": user.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}
