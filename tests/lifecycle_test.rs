use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tower::util::ServiceExt; // for `oneshot`

use librarium::models::{author, book, book_genre, book_instance, genre, language};
use librarium::state::AppState;
use librarium::{access, api, auth, db};

async fn setup_test_app() -> (Router, DatabaseConnection) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let state = AppState::new(db.clone());
    (api::api_router(state), db)
}

fn librarian_token() -> String {
    auth::create_jwt(
        "librarian",
        access::librarian_grants()
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
    )
    .expect("Failed to create token")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_language(db: &DatabaseConnection, name: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    language::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

async fn create_author(db: &DatabaseConnection) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    author::ActiveModel {
        first_name: Set("Ursula".to_string()),
        last_name: Set("Le Guin".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

async fn create_book(db: &DatabaseConnection, author_id: i32, language_id: i32) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    book::ActiveModel {
        title: Set("The Dispossessed".to_string()),
        author_id: Set(author_id),
        language_id: Set(language_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn test_mutations_require_token_then_permission() {
    let (app, _db) = setup_test_app().await;
    let payload = serde_json::json!({ "name": "Poetry" });

    // Anonymous: 401
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/genres", None, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Authenticated without the grant: 403
    let token = auth::create_jwt("reader", vec![]).unwrap();
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/genres", Some(&token), Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Librarian: 201
    let response = app
        .oneshot(request(
            Method::POST,
            "/genres",
            Some(&librarian_token()),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_author_create_rejects_malformed_dates() {
    let (app, db) = setup_test_app().await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/authors",
            Some(&librarian_token()),
            Some(serde_json::json!({
                "first_name": "Ursula",
                "last_name": "Le Guin",
                "date_of_birth": "21/10/1929"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert!(json["errors"]["date_of_birth"].is_string());

    let count = author::Entity::find().all(&db).await.unwrap().len();
    assert_eq!(count, 0, "Nothing may be persisted on validation failure");
}

#[tokio::test]
async fn test_author_create_requires_names() {
    let (app, _db) = setup_test_app().await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/authors",
            Some(&librarian_token()),
            Some(serde_json::json!({ "first_name": "", "last_name": " " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert!(json["errors"]["first_name"].is_string());
    assert!(json["errors"]["last_name"].is_string());
}

#[tokio::test]
async fn test_book_create_rejects_dangling_references() {
    let (app, db) = setup_test_app().await;
    let language_id = create_language(&db, "English").await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/books",
            Some(&librarian_token()),
            Some(serde_json::json!({
                "title": "Ghost Book",
                "author_id": 999,
                "language_id": language_id,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert!(json["errors"]["author_id"].is_string());
}

#[tokio::test]
async fn test_book_create_links_genres() {
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;
    let language_id = create_language(&db, "English").await;
    let now = chrono::Utc::now().to_rfc3339();
    let genre_id = genre::ActiveModel {
        name: Set("Science Fiction".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap()
    .id;

    let response = app
        .oneshot(request(
            Method::POST,
            "/books",
            Some(&librarian_token()),
            Some(serde_json::json!({
                "title": "The Dispossessed",
                "author_id": author_id,
                "language_id": language_id,
                "genre_ids": [genre_id],
                "summary": "An ambiguous utopia.",
                "isbn": "978-0061054884"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let book_id = json["book"]["id"].as_i64().unwrap() as i32;

    let links = book_genre::Entity::find().all(&db).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].book_id, book_id);
    assert_eq!(links[0].genre_id, genre_id);
}

#[tokio::test]
async fn test_book_update_replaces_genre_links_wholesale() {
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;
    let language_id = create_language(&db, "English").await;
    let book_id = create_book(&db, author_id, language_id).await;

    let now = chrono::Utc::now().to_rfc3339();
    let mut genre_ids = Vec::new();
    for name in ["Science Fiction", "Utopian", "Classic"] {
        let id = genre::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap()
        .id;
        genre_ids.push(id);
    }
    for genre_id in &genre_ids[..2] {
        book_genre::ActiveModel {
            book_id: Set(book_id),
            genre_id: Set(*genre_id),
        }
        .insert(&db)
        .await
        .unwrap();
    }

    let response = app
        .oneshot(request(
            Method::PUT,
            &format!("/books/{}", book_id),
            Some(&librarian_token()),
            Some(serde_json::json!({
                "title": "The Dispossessed",
                "author_id": author_id,
                "language_id": language_id,
                "genre_ids": [genre_ids[2]],
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old links are gone, only the submitted set remains
    let links = book_genre::Entity::find().all(&db).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].genre_id, genre_ids[2]);
}

#[tokio::test]
async fn test_instance_create_rejects_unknown_status() {
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;
    let language_id = create_language(&db, "English").await;
    let book_id = create_book(&db, author_id, language_id).await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/instances",
            Some(&librarian_token()),
            Some(serde_json::json!({
                "book_id": book_id,
                "imprint": "First edition",
                "status": "lost"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_instance_update_cannot_move_to_another_book() {
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;
    let language_id = create_language(&db, "English").await;
    let book_id = create_book(&db, author_id, language_id).await;

    let now = chrono::Utc::now().to_rfc3339();
    let instance = book_instance::ActiveModel {
        book_id: Set(book_id),
        imprint: Set("First edition".to_string()),
        status: Set(book_instance::status::AVAILABLE.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    // `book_id` in the payload is simply not part of the update contract
    let response = app
        .oneshot(request(
            Method::PUT,
            &format!("/instances/{}", instance.id),
            Some(&librarian_token()),
            Some(serde_json::json!({
                "book_id": 999,
                "imprint": "Second edition",
                "status": "maintenance"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = book_instance::Entity::find_by_id(instance.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.book_id, book_id);
    assert_eq!(updated.imprint, "Second edition");
}

#[tokio::test]
async fn test_update_missing_row_is_not_found() {
    let (app, _db) = setup_test_app().await;

    let response = app
        .oneshot(request(
            Method::PUT,
            "/genres/999",
            Some(&librarian_token()),
            Some(serde_json::json!({ "name": "Poetry" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_referenced_author_delete_conflicts_with_message() {
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;
    let language_id = create_language(&db, "English").await;
    create_book(&db, author_id, language_id).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/authors/{}", author_id),
            Some(&librarian_token()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("still referenced"));

    // The author must survive the failed delete
    let still_there = author::Entity::find_by_id(author_id)
        .one(&db)
        .await
        .unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn test_referenced_language_delete_conflicts_like_author() {
    // Delete-conflict handling is deliberately uniform across entity types.
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;
    let language_id = create_language(&db, "English").await;
    create_book(&db, author_id, language_id).await;

    let response = app
        .oneshot(request(
            Method::DELETE,
            &format!("/languages/{}", language_id),
            Some(&librarian_token()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unreferenced_delete_succeeds() {
    let (app, db) = setup_test_app().await;
    let author_id = create_author(&db).await;

    let response = app
        .oneshot(request(
            Method::DELETE,
            &format!("/authors/{}", author_id),
            Some(&librarian_token()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let gone = author::Entity::find_by_id(author_id)
        .one(&db)
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn test_first_registered_user_becomes_librarian() {
    let (app, db) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/auth/register",
            None,
            Some(serde_json::json!({ "username": "head_librarian", "password": "s3cret" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let grants = librarium::models::user_permission::Entity::find()
        .all(&db)
        .await
        .unwrap();
    assert_eq!(grants.len(), access::librarian_grants().len());

    // Second user gets nothing
    let response = app
        .oneshot(request(
            Method::POST,
            "/auth/register",
            None,
            Some(serde_json::json!({ "username": "reader", "password": "s3cret" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let grants = librarium::models::user_permission::Entity::find()
        .all(&db)
        .await
        .unwrap();
    assert_eq!(grants.len(), access::librarian_grants().len());
}

#[tokio::test]
async fn test_login_embeds_granted_permissions() {
    let (app, _db) = setup_test_app().await;

    app.clone()
        .oneshot(request(
            Method::POST,
            "/auth/register",
            None,
            Some(serde_json::json!({ "username": "head_librarian", "password": "s3cret" })),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(request(
            Method::POST,
            "/auth/login",
            None,
            Some(serde_json::json!({ "username": "head_librarian", "password": "s3cret" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let token = json["token"].as_str().unwrap();
    let claims = auth::decode_jwt(token).unwrap();
    assert!(claims.has_permission(access::CAN_MARK_RETURNED));
    assert!(claims.has_permission("delete_book"));
}
