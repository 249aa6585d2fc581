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
use crate::models::author::Entity as Author;
use crate::models::book::{self, Entity as Book};
use crate::models::book_genre::{self, Entity as BookGenre};
use crate::models::genre::{self, Entity as Genre};
use crate::models::language::Entity as Language;
use crate::services::catalog_service::PAGE_SIZE;

use super::{delete_error_response, Pagination};

type ApiError = (StatusCode, Json<Value>);

fn db_error(e: DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Book not found" })),
    )
}

#[derive(Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub author_id: i32,
    pub summary: Option<String>,
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    pub language_id: i32,
}

/// Field checks that need the store: the author, language, and every genre
/// must exist before anything is persisted.
async fn validate(db: &DatabaseConnection, payload: &BookRequest) -> Result<(), ApiError> {
    let mut errors = serde_json::Map::new();

    if payload.title.trim().is_empty() {
        errors.insert("title".into(), json!("Title is required"));
    }

    if Author::find_by_id(payload.author_id)
        .one(db)
        .await
        .map_err(db_error)?
        .is_none()
    {
        errors.insert(
            "author_id".into(),
            json!(format!("No author with id {}", payload.author_id)),
        );
    }

    if Language::find_by_id(payload.language_id)
        .one(db)
        .await
        .map_err(db_error)?
        .is_none()
    {
        errors.insert(
            "language_id".into(),
            json!(format!("No language with id {}", payload.language_id)),
        );
    }

    if !payload.genre_ids.is_empty() {
        let found = Genre::find()
            .filter(genre::Column::Id.is_in(payload.genre_ids.clone()))
            .count(db)
            .await
            .map_err(db_error)?;
        if found != payload.genre_ids.len() as u64 {
            errors.insert("genre_ids".into(), json!("One or more genres do not exist"));
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

async fn set_genres<C: ConnectionTrait>(db: &C, book_id: i32, genre_ids: &[i32]) -> Result<(), ApiError> {
    BookGenre::delete_many()
        .filter(book_genre::Column::BookId.eq(book_id))
        .exec(db)
        .await
        .map_err(db_error)?;

    for genre_id in genre_ids {
        let link = book_genre::ActiveModel {
            book_id: Set(book_id),
            genre_id: Set(*genre_id),
        };
        link.insert(db).await.map_err(db_error)?;
    }
    Ok(())
}

pub async fn list_books(
    State(db): State<DatabaseConnection>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Value>, ApiError> {
    let paginator = Book::find().paginate(&db, PAGE_SIZE);
    let total = paginator.num_items().await.map_err(db_error)?;
    let books = paginator
        .fetch_page(pagination.index())
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "books": books, "total": total })))
}

pub async fn get_book(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let book = Book::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    let genres = book
        .find_related(Genre)
        .all(&db)
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "book": book, "genres": genres })))
}

pub async fn create_book(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<BookRequest>,
) -> Result<Response, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Add, EntityKind::Book),
    )?;
    validate(&db, &payload).await?;

    let now = chrono::Utc::now().to_rfc3339();
    let book = book::ActiveModel {
        title: Set(payload.title.trim().to_owned()),
        author_id: Set(payload.author_id),
        summary: Set(payload.summary.clone()),
        isbn: Set(payload.isbn.clone()),
        language_id: Set(payload.language_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    // Book row and genre links land together or not at all
    let txn = db.begin().await.map_err(db_error)?;
    let saved = book.insert(&txn).await.map_err(db_error)?;
    set_genres(&txn, saved.id, &payload.genre_ids).await?;
    txn.commit().await.map_err(db_error)?;

    Ok((StatusCode::CREATED, Json(json!({ "book": saved }))).into_response())
}

pub async fn update_book(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<BookRequest>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Change, EntityKind::Book),
    )?;

    let book = Book::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    validate(&db, &payload).await?;

    let mut active: book::ActiveModel = book.into();
    active.title = Set(payload.title.trim().to_owned());
    active.author_id = Set(payload.author_id);
    active.summary = Set(payload.summary.clone());
    active.isbn = Set(payload.isbn.clone());
    active.language_id = Set(payload.language_id);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let txn = db.begin().await.map_err(db_error)?;
    let updated = active.update(&txn).await.map_err(db_error)?;
    set_genres(&txn, updated.id, &payload.genre_ids).await?;
    txn.commit().await.map_err(db_error)?;

    Ok(Json(json!({ "book": updated })))
}

pub async fn delete_book(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Delete, EntityKind::Book),
    )?;

    let book = Book::find_by_id(id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    book.delete(&db)
        .await
        .map_err(|e| delete_error_response("Book", e))?;

    Ok(Json(json!({ "message": "Book deleted" })))
}
