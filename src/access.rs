//! Central capability table.
//!
//! Every mutating route resolves its required permission string here instead
//! of hardcoding it in the handler. The loan views use [`CAN_MARK_RETURNED`]
//! directly.

use axum::{extract::Json, http::StatusCode};
use serde_json::json;

use crate::auth::Claims;

/// Grants access to the all-loaned view and the renewal workflow.
pub const CAN_MARK_RETURNED: &str = "can_mark_returned";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Author,
    Book,
    Genre,
    Language,
    BookInstance,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Add,
    Change,
    Delete,
}

/// Permission string required for a CRUD operation on an entity type.
pub fn required_permission(op: Operation, entity: Entity) -> &'static str {
    match (op, entity) {
        (Operation::Add, Entity::Author) => "add_author",
        (Operation::Change, Entity::Author) => "change_author",
        (Operation::Delete, Entity::Author) => "delete_author",
        (Operation::Add, Entity::Book) => "add_book",
        (Operation::Change, Entity::Book) => "change_book",
        (Operation::Delete, Entity::Book) => "delete_book",
        (Operation::Add, Entity::Genre) => "add_genre",
        (Operation::Change, Entity::Genre) => "change_genre",
        (Operation::Delete, Entity::Genre) => "delete_genre",
        (Operation::Add, Entity::Language) => "add_language",
        (Operation::Change, Entity::Language) => "change_language",
        (Operation::Delete, Entity::Language) => "delete_language",
        (Operation::Add, Entity::BookInstance) => "add_bookinstance",
        (Operation::Change, Entity::BookInstance) => "change_bookinstance",
        (Operation::Delete, Entity::BookInstance) => "delete_bookinstance",
    }
}

/// The full librarian grant set, used when seeding and for the first
/// registered user.
pub fn librarian_grants() -> Vec<&'static str> {
    let mut grants = vec![CAN_MARK_RETURNED];
    for entity in [
        Entity::Author,
        Entity::Book,
        Entity::Genre,
        Entity::Language,
        Entity::BookInstance,
    ] {
        for op in [Operation::Add, Operation::Change, Operation::Delete] {
            grants.push(required_permission(op, entity));
        }
    }
    grants
}

/// Fail with 403 unless the caller holds `permission`.
///
/// Authorization is always evaluated before existence lookups, so an
/// unauthorized caller cannot probe which ids exist.
pub fn require(
    claims: &Claims,
    permission: &str,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    if claims.has_permission(permission) {
        Ok(())
    } else {
        tracing::warn!(
            "User {} denied: missing permission {}",
            claims.sub,
            permission
        );
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": format!("Permission '{}' required", permission) })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table_covers_all_entities() {
        let grants = librarian_grants();
        assert_eq!(grants.len(), 16); // can_mark_returned + 5 entities x 3 ops
        assert!(grants.contains(&"can_mark_returned"));
        assert!(grants.contains(&"add_bookinstance"));
        assert!(grants.contains(&"delete_language"));
    }

    #[test]
    fn test_permission_strings_are_distinct() {
        let grants = librarian_grants();
        let mut unique = grants.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), grants.len());
    }
}
