//! Read-only catalog projections.

use sea_orm::*;

use super::ServiceError;
use crate::models::author::Entity as Author;
use crate::models::book::Entity as Book;
use crate::models::book_instance::{self, status, Entity as BookInstance};

/// Fixed page size for all list views.
pub const PAGE_SIZE: u64 = 10;

/// Counts shown on the home page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogSummary {
    pub num_books: u64,
    pub num_instances: u64,
    pub num_instances_available: u64,
    pub num_authors: u64,
}

pub async fn summary(db: &DatabaseConnection) -> Result<CatalogSummary, ServiceError> {
    let num_books = Book::find().count(db).await?;
    let num_instances = BookInstance::find().count(db).await?;
    let num_instances_available = BookInstance::find()
        .filter(book_instance::Column::Status.eq(status::AVAILABLE))
        .count(db)
        .await?;
    let num_authors = Author::find().count(db).await?;

    Ok(CatalogSummary {
        num_books,
        num_instances,
        num_instances_available,
        num_authors,
    })
}
