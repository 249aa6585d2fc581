use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::{self, Entity as EntityKind, Operation};
use crate::auth::Claims;
use crate::models::book::Entity as Book;
use crate::models::book_instance::{self, status, Entity as BookInstance};
use crate::models::user::Entity as User;
use crate::services::{catalog_service::PAGE_SIZE, loan_service};

use super::{delete_error_response, service_error_response, Pagination};

type ApiError = (StatusCode, Json<Value>);

fn db_error(e: DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn field_error(field: &str, message: impl Into<String>) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": { field: message.into() } })),
    )
}

async fn find_instance(db: &DatabaseConnection, id: i32) -> Result<book_instance::Model, ApiError> {
    BookInstance::find_by_id(id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book instance not found" })),
        ))
}

fn validate_status(value: &str) -> Result<(), ApiError> {
    if status::ALL.contains(&value) {
        Ok(())
    } else {
        Err(field_error(
            "status",
            format!("Invalid status '{}', expected one of {:?}", value, status::ALL),
        ))
    }
}

fn validate_due_back(value: &Option<String>) -> Result<(), ApiError> {
    if let Some(raw) = value {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| field_error("due_back", format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?;
    }
    Ok(())
}

async fn validate_borrower(
    db: &DatabaseConnection,
    borrower_id: Option<i32>,
) -> Result<(), ApiError> {
    if let Some(id) = borrower_id {
        User::find_by_id(id)
            .one(db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| field_error("borrower_id", format!("No user with id {}", id)))?;
    }
    Ok(())
}

pub async fn list_instances(
    State(db): State<DatabaseConnection>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Value>, ApiError> {
    let paginator = BookInstance::find().paginate(&db, PAGE_SIZE);
    let total = paginator.num_items().await.map_err(db_error)?;
    let instances = paginator
        .fetch_page(pagination.index())
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "instances": instances, "total": total })))
}

pub async fn get_instance(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let instance = find_instance(&db, id).await?;
    Ok(Json(json!({ "instance": instance })))
}

#[derive(Deserialize)]
pub struct CreateInstanceRequest {
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<String>,
    pub borrower_id: Option<i32>,
    pub status: String,
}

pub async fn create_instance(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreateInstanceRequest>,
) -> Result<Response, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Add, EntityKind::BookInstance),
    )?;

    validate_status(&payload.status)?;
    validate_due_back(&payload.due_back)?;
    validate_borrower(&db, payload.borrower_id).await?;

    Book::find_by_id(payload.book_id)
        .one(&db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| field_error("book_id", format!("No book with id {}", payload.book_id)))?;

    let now = chrono::Utc::now().to_rfc3339();
    let instance = book_instance::ActiveModel {
        book_id: Set(payload.book_id),
        imprint: Set(payload.imprint),
        due_back: Set(payload.due_back),
        borrower_id: Set(payload.borrower_id),
        status: Set(payload.status),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = instance.insert(&db).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "instance": saved }))).into_response())
}

/// Update request deliberately has no `book_id`: the book reference is
/// immutable after creation.
#[derive(Deserialize)]
pub struct UpdateInstanceRequest {
    pub imprint: String,
    pub due_back: Option<String>,
    pub borrower_id: Option<i32>,
    pub status: String,
}

pub async fn update_instance(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInstanceRequest>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Change, EntityKind::BookInstance),
    )?;

    let instance = find_instance(&db, id).await?;

    validate_status(&payload.status)?;
    validate_due_back(&payload.due_back)?;
    validate_borrower(&db, payload.borrower_id).await?;

    let mut active: book_instance::ActiveModel = instance.into();
    active.imprint = Set(payload.imprint);
    active.due_back = Set(payload.due_back);
    active.borrower_id = Set(payload.borrower_id);
    active.status = Set(payload.status);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let updated = active.update(&db).await.map_err(db_error)?;
    Ok(Json(json!({ "instance": updated })))
}

pub async fn delete_instance(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    access::require(
        &claims,
        access::required_permission(Operation::Delete, EntityKind::BookInstance),
    )?;

    let instance = find_instance(&db, id).await?;

    instance
        .delete(&db)
        .await
        .map_err(|e| delete_error_response("Book instance", e))?;

    Ok(Json(json!({ "message": "Book instance deleted" })))
}

/// GET half of the renewal workflow: the instance plus the date the form is
/// pre-populated with (three weeks out).
///
/// Permission is checked before the existence lookup so an unauthorized
/// caller cannot probe which ids exist.
pub async fn renew_form(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    access::require(&claims, access::CAN_MARK_RETURNED)?;

    let instance = find_instance(&db, id).await?;
    let proposed = loan_service::proposed_renewal_date(Local::now().date_naive());

    Ok(Json(json!({
        "instance": instance,
        "proposed_renewal_date": proposed.format("%Y-%m-%d").to_string(),
    })))
}

#[derive(Deserialize)]
pub struct RenewRequest {
    pub renewal_date: String,
}

/// POST half of the renewal workflow. On success the due date is overwritten
/// and the caller is redirected to the all-loaned view; on a bad date the
/// instance is echoed back with field errors and nothing is persisted.
pub async fn renew(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<RenewRequest>,
) -> Result<Response, ApiError> {
    access::require(&claims, access::CAN_MARK_RETURNED)?;

    let instance = find_instance(&db, id).await?;

    let today = Local::now().date_naive();
    let renewal_date = match loan_service::validate_renewal_date(&payload.renewal_date, today) {
        Ok(date) => date,
        Err(crate::services::ServiceError::Validation { field, message }) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": { field: message }, "instance": instance })),
            )
                .into_response());
        }
        Err(e) => return Err(service_error_response(e)),
    };

    loan_service::renew_instance(&db, id, renewal_date)
        .await
        .map_err(service_error_response)?;

    tracing::info!("Instance {} renewed until {}", id, renewal_date);

    Ok(Redirect::to("/api/loans/all").into_response())
}
