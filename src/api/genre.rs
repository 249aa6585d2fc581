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
use crate::models::genre::{self, Entity as Genre};
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
pub struct GenreRequest {
    pub name: String,
}

fn validate(payload: &GenreRequest) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": { "name": "Name is required" } })),
        ));
    }
    Ok(())
}

pub async fn list_genres(
    State(db): State<DatabaseConnection>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Value>, ApiError> {
    let paginator = Genre::find().paginate(&db, PAGE_SIZE);
    let total = paginator.num_items().await.map_err(db_error)?;
    let genres = paginator
        .fetch_page(pagination.index())
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "genres": genres, "total": total })))
}

pub async fn get_genre(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let genre = Genre::find_by_id(id).one(&db).await.unwrap_or(None);
    match genre {
        Some(genre) => (StatusCode::OK, Json(json!({ "genre": genre }))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Genre not found" })),
        )
            .into_response(),
    }
}

pub async fn create_genre(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<GenreRequest>,
) -> Result<Response, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Add, EntityKind::Genre),
    )?;
    validate(&payload)?;

    let now = chrono::Utc::now().to_rfc3339();
    let genre = genre::ActiveModel {
        name: Set(payload.name.trim().to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = genre.insert(&db).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "genre": saved }))).into_response())
}

pub async fn update_genre(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<GenreRequest>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Change, EntityKind::Genre),
    )?;

    let genre = Genre::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Genre not found" })),
        ))?;

    validate(&payload)?;

    let mut active: genre::ActiveModel = genre.into();
    active.name = Set(payload.name.trim().to_owned());
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let updated = active.update(&db).await.map_err(db_error)?;
    Ok(Json(json!({ "genre": updated })))
}

pub async fn delete_genre(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Delete, EntityKind::Genre),
    )?;

    let genre = Genre::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Genre not found" })),
        ))?;

    genre
        .delete(&db)
        .await
        .map_err(|e| delete_error_response("Genre", e))?;

    Ok(Json(json!({ "message": "Genre deleted" })))
}
