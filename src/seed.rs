use crate::access;
use crate::auth::hash_password;
use crate::models::{author, book, book_genre, book_instance, genre, language, user, user_permission};
use sea_orm::*;

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    // 1. Users: one librarian, one plain borrower
    let librarian_password = hash_password("librarian").map_err(DbErr::Custom)?;
    let borrower_password = hash_password("borrower").map_err(DbErr::Custom)?;

    let librarian = user::ActiveModel {
        username: Set("librarian".to_owned()),
        password_hash: Set(librarian_password),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };
    let borrower = user::ActiveModel {
        username: Set("borrower".to_owned()),
        password_hash: Set(borrower_password),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };

    let librarian = librarian.insert(db).await?;
    let borrower = borrower.insert(db).await?;

    for permission in access::librarian_grants() {
        user_permission::ActiveModel {
            user_id: Set(librarian.id),
            permission: Set(permission.to_owned()),
        }
        .insert(db)
        .await?;
    }

    // 2. Reference data
    let english = language::ActiveModel {
        name: Set("English".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut genre_ids = Vec::new();
    for name in ["Fantasy", "Science Fiction", "Classic"] {
        let genre = genre::ActiveModel {
            name: Set(name.to_owned()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        genre_ids.push(genre.id);
    }

    let herbert = author::ActiveModel {
        first_name: Set("Frank".to_owned()),
        last_name: Set("Herbert".to_owned()),
        date_of_birth: Set(Some("1920-10-08".to_owned())),
        date_of_death: Set(Some("1986-02-11".to_owned())),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // 3. One book with two copies, one of them out on loan
    let dune = book::ActiveModel {
        title: Set("Dune".to_owned()),
        author_id: Set(herbert.id),
        summary: Set(Some("A spice planet story.".to_owned())),
        isbn: Set(Some("978-0441172719".to_owned())),
        language_id: Set(english.id),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    book_genre::ActiveModel {
        book_id: Set(dune.id),
        genre_id: Set(genre_ids[1]),
    }
    .insert(db)
    .await?;

    book_instance::ActiveModel {
        book_id: Set(dune.id),
        imprint: Set("Ace Books, 1990".to_owned()),
        status: Set(book_instance::status::AVAILABLE.to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let due = (chrono::Local::now().date_naive() + chrono::Duration::weeks(2))
        .format("%Y-%m-%d")
        .to_string();
    book_instance::ActiveModel {
        book_id: Set(dune.id),
        imprint: Set("Ace Books, 1990".to_owned()),
        due_back: Set(Some(due)),
        status: Set(book_instance::status::ON_LOAN.to_owned()),
        borrower_id: Set(Some(borrower.id)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(())
}
