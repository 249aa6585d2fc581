use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan status values for a physical copy.
pub mod status {
    /// On shelf, can be loaned
    pub const AVAILABLE: &str = "available";
    /// Currently lent out; `due_back` holds the return date
    pub const ON_LOAN: &str = "on_loan";
    /// Being repaired or processed, not loanable
    pub const MAINTENANCE: &str = "maintenance";
    /// Held for a borrower, not on the open shelf
    pub const RESERVED: &str = "reserved";

    pub const ALL: [&str; 4] = [AVAILABLE, ON_LOAN, MAINTENANCE, RESERVED];
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "book_instances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Immutable after creation
    pub book_id: i32,
    pub imprint: String,
    /// YYYY-MM-DD; only meaningful while status is `on_loan`
    pub due_back: Option<String>,
    pub status: String,
    pub borrower_id: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BorrowerId",
        to = "super::user::Column::Id"
    )]
    Borrower,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrower.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
