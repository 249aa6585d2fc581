use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::{self, Entity as EntityKind, Operation};
use crate::auth::Claims;
use crate::models::language::{self, Entity as Language};
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
pub struct LanguageRequest {
    pub name: String,
}

fn validate(payload: &LanguageRequest) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": { "name": "Name is required" } })),
        ));
    }
    Ok(())
}

pub async fn list_languages(
    State(db): State<DatabaseConnection>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Value>, ApiError> {
    let paginator = Language::find().paginate(&db, PAGE_SIZE);
    let total = paginator.num_items().await.map_err(db_error)?;
    let languages = paginator
        .fetch_page(pagination.index())
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "languages": languages, "total": total })))
}

pub async fn get_language(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let language = Language::find_by_id(id).one(&db).await.unwrap_or(None);
    match language {
        Some(language) => (StatusCode::OK, Json(json!({ "language": language }))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Language not found" })),
        )
            .into_response(),
    }
}

pub async fn create_language(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<LanguageRequest>,
) -> Result<Response, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Add, EntityKind::Language),
    )?;
    validate(&payload)?;

    let now = chrono::Utc::now().to_rfc3339();
    let language = language::ActiveModel {
        name: Set(payload.name.trim().to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = language.insert(&db).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "language": saved }))).into_response())
}

pub async fn update_language(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<LanguageRequest>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Change, EntityKind::Language),
    )?;

    let language = Language::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Language not found" })),
        ))?;

    validate(&payload)?;

    let mut active: language::ActiveModel = language.into();
    active.name = Set(payload.name.trim().to_owned());
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let updated = active.update(&db).await.map_err(db_error)?;
    Ok(Json(json!({ "language": updated })))
}

pub async fn delete_language(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Delete, EntityKind::Language),
    )?;

    let language = Language::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Language not found" })),
        ))?;

    language
        .delete(&db)
        .await
        .map_err(|e| delete_error_response("Language", e))?;

    Ok(Json(json!({ "message": "Language deleted" })))
}
