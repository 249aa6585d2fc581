pub mod auth;
pub mod author;
pub mod book;
pub mod genre;
pub mod home;
pub mod instance;
pub mod language;
pub mod loan;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::services::ServiceError;
use crate::state::AppState;

/// `?page=N`, 1-based. Lists are capped at a fixed page size.
#[derive(Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
}

impl Pagination {
    /// Zero-based page index for the paginator.
    pub fn index(&self) -> u64 {
        self.page.unwrap_or(1).saturating_sub(1)
    }
}

/// Map a service error onto the API error taxonomy.
pub(crate) fn service_error_response(e: ServiceError) -> (StatusCode, Json<Value>) {
    match e {
        ServiceError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Resource not found" })),
        ),
        ServiceError::Validation { field, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": { field: message } })),
        ),
        ServiceError::Database(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": msg })),
        ),
    }
}

/// Map a delete failure: a foreign-key rejection means the row is still
/// referenced, which callers must see as a conflict, not a server fault.
pub(crate) fn delete_error_response(entity: &str, e: sea_orm::DbErr) -> (StatusCode, Json<Value>) {
    let msg = e.to_string();
    if msg.contains("FOREIGN KEY") {
        (
            StatusCode::CONFLICT,
            Json(json!({
                "error": format!("{} is still referenced and cannot be deleted", entity)
            })),
        )
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg })))
    }
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Home summary
        .route("/", get(home::index))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Books
        .route("/books", get(book::list_books).post(book::create_book))
        .route(
            "/books/:id",
            get(book::get_book)
                .put(book::update_book)
                .delete(book::delete_book),
        )
        // Authors
        .route(
            "/authors",
            get(author::list_authors).post(author::create_author),
        )
        .route(
            "/authors/:id",
            get(author::get_author)
                .put(author::update_author)
                .delete(author::delete_author),
        )
        // Genres
        .route("/genres", get(genre::list_genres).post(genre::create_genre))
        .route(
            "/genres/:id",
            get(genre::get_genre)
                .put(genre::update_genre)
                .delete(genre::delete_genre),
        )
        // Languages
        .route(
            "/languages",
            get(language::list_languages).post(language::create_language),
        )
        .route(
            "/languages/:id",
            get(language::get_language)
                .put(language::update_language)
                .delete(language::delete_language),
        )
        // Book instances
        .route(
            "/instances",
            get(instance::list_instances).post(instance::create_instance),
        )
        .route(
            "/instances/:id",
            get(instance::get_instance)
                .put(instance::update_instance)
                .delete(instance::delete_instance),
        )
        // Renewal workflow
        .route(
            "/instances/:id/renew",
            get(instance::renew_form).post(instance::renew),
        )
        // Loan views
        .route("/loans/my", get(loan::my_loans))
        .route("/loans/all", get(loan::all_loans))
        .with_state(state)
}
