use axum::{extract::State, http::StatusCode, Json};
use sea_orm::*;
use serde_json::{json, Value};

use crate::access;
use crate::auth::Claims;
use crate::models::user;
use crate::services::loan_service;

use super::service_error_response;

/// Instances on loan to the authenticated caller, soonest due first.
pub async fn my_loans(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user = user::Entity::find()
        .filter(user::Column::Username.eq(&claims.sub))
        .one(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unknown user" })),
        ))?;

    let loans = loan_service::loans_for_borrower(&db, user.id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "loans": loans })))
}

/// Every instance on loan, librarian view. Requires `can_mark_returned`;
/// lacking the permission is Forbidden, never NotFound.
pub async fn all_loans(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    access::require(&claims, access::CAN_MARK_RETURNED)?;

    let loans = loan_service::all_on_loan(&db)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "loans": loans })))
}
