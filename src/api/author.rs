use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::{self, Entity as EntityKind, Operation};
use crate::auth::Claims;
use crate::models::author::{self, Entity as Author};
use crate::services::catalog_service::PAGE_SIZE;

use super::{delete_error_response, Pagination};

type ApiError = (StatusCode, Json<Value>);

fn db_error(e: DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

#[derive(Deserialize)]
pub struct AuthorRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
}

fn validate(payload: &AuthorRequest) -> Result<(), ApiError> {
    let mut errors = serde_json::Map::new();

    if payload.first_name.trim().is_empty() {
        errors.insert("first_name".into(), json!("First name is required"));
    }
    if payload.last_name.trim().is_empty() {
        errors.insert("last_name".into(), json!("Last name is required"));
    }
    for (field, value) in [
        ("date_of_birth", &payload.date_of_birth),
        ("date_of_death", &payload.date_of_death),
    ] {
        if let Some(raw) = value {
            if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
                errors.insert(
                    field.into(),
                    json!(format!("Invalid date '{}', expected YYYY-MM-DD", raw)),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        ))
    }
}

pub async fn list_authors(
    State(db): State<DatabaseConnection>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Value>, ApiError> {
    let paginator = Author::find().paginate(&db, PAGE_SIZE);
    let total = paginator.num_items().await.map_err(db_error)?;
    let authors = paginator
        .fetch_page(pagination.index())
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "authors": authors, "total": total })))
}

pub async fn get_author(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let author = Author::find_by_id(id).one(&db).await.unwrap_or(None);
    match author {
        Some(author) => (StatusCode::OK, Json(json!({ "author": author }))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Author not found" })),
        )
            .into_response(),
    }
}

pub async fn create_author(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<AuthorRequest>,
) -> Result<Response, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Add, EntityKind::Author),
    )?;
    validate(&payload)?;

    let now = chrono::Utc::now().to_rfc3339();
    let author = author::ActiveModel {
        first_name: Set(payload.first_name.trim().to_owned()),
        last_name: Set(payload.last_name.trim().to_owned()),
        date_of_birth: Set(payload.date_of_birth),
        date_of_death: Set(payload.date_of_death),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = author.insert(&db).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "author": saved }))).into_response())
}

pub async fn update_author(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<AuthorRequest>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Change, EntityKind::Author),
    )?;

    let author = Author::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Author not found" })),
        ))?;

    validate(&payload)?;

    let mut active: author::ActiveModel = author.into();
    active.first_name = Set(payload.first_name.trim().to_owned());
    active.last_name = Set(payload.last_name.trim().to_owned());
    active.date_of_birth = Set(payload.date_of_birth);
    active.date_of_death = Set(payload.date_of_death);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let updated = active.update(&db).await.map_err(db_error)?;
    Ok(Json(json!({ "author": updated })))
}

pub async fn delete_author(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Delete, EntityKind::Author),
    )?;

    let author = Author::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Author not found" })),
        ))?;

    author
        .delete(&db)
        .await
        .map_err(|e| delete_error_response("Author", e))?;

    Ok(Json(json!({ "message": "Author deleted" })))
}
