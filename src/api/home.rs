use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::services::catalog_service;
use crate::session::{self, SESSION_COOKIE};
use crate::state::AppState;

/// Home summary: catalog counts plus the per-session visit counter.
/// `num_visits` is the count before this request; a fresh session sees 0.
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let summary = match catalog_service::summary(&state.db).await {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    };

    let existing = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(session::session_id_from_cookies);

    let (session_id, is_new_session) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let num_visits = state.sessions.record_visit(&session_id);

    let body = Json(json!({
        "num_books": summary.num_books,
        "num_instances": summary.num_instances,
        "num_instances_available": summary.num_instances_available,
        "num_authors": summary.num_authors,
        "num_visits": num_visits,
    }));

    if is_new_session {
        let cookie = format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, session_id);
        ([(header::SET_COOKIE, cookie)], body).into_response()
    } else {
        body.into_response()
    }
}
