use crate::access;
use crate::auth::{create_jwt, hash_password, verify_password, Claims};
use crate::models::{user, user_permission};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
}

/// Create a user. The first account gets the full librarian grant set;
/// everyone after that starts as a plain borrower.
pub async fn register(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": { "username": "Username and password are required" } })),
        )
            .into_response();
    }

    let existing_users = match user::Entity::find().count(&db).await {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    };

    let password_hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e })),
            )
                .into_response()
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let new_user = user::ActiveModel {
        username: Set(payload.username.trim().to_owned()),
        password_hash: Set(password_hash),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = match new_user.insert(&db).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": { "username": format!("Could not create user: {}", e) } })),
            )
                .into_response()
        }
    };

    if existing_users == 0 {
        for permission in access::librarian_grants() {
            let grant = user_permission::ActiveModel {
                user_id: Set(saved.id),
                permission: Set(permission.to_owned()),
            };
            if let Err(e) = grant.insert(&db).await {
                tracing::error!("Failed to grant {} to {}: {}", permission, saved.username, e);
            }
        }
        tracing::info!("First user {} registered as librarian", saved.username);
    }

    (
        StatusCode::CREATED,
        Json(json!({ "id": saved.id, "username": saved.username })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    tracing::info!("Login attempt for user: {}", payload.username);

    let user = match user::Entity::find()
        .filter(user::Column::Username.eq(&payload.username))
        .one(&db)
        .await
    {
        Ok(Some(u)) => u,
        _ => {
            tracing::warn!("User not found: {}", payload.username);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response();
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            let perms = match user_permission::Entity::find()
                .filter(user_permission::Column::UserId.eq(user.id))
                .all(&db)
                .await
            {
                Ok(rows) => rows.into_iter().map(|r| r.permission).collect(),
                Err(e) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": e.to_string() })),
                    )
                        .into_response()
                }
            };

            match create_jwt(&user.username, perms) {
                Ok(token) => (StatusCode::OK, Json(json!({ "token": token }))).into_response(),
                Err(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e })),
                )
                    .into_response(),
            }
        }
        _ => {
            tracing::warn!("Password verification failed for user: {}", user.username);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response()
        }
    }
}

pub async fn me(claims: Claims) -> impl IntoResponse {
    Json(json!({ "username": claims.sub, "permissions": claims.perms }))
}
