//! Loan queries and the renewal workflow, without the HTTP layer.

use chrono::{Duration, Local, NaiveDate};
use sea_orm::sea_query::Expr;
use sea_orm::*;

use super::ServiceError;
use crate::models::book::Entity as Book;
use crate::models::book_instance::{self, status, Entity as BookInstance};

/// The renewal form proposes three weeks out.
pub const PROPOSED_RENEWAL_WEEKS: i64 = 3;
/// A renewal may push the due date at most four weeks from today.
pub const MAX_RENEWAL_WEEKS: i64 = 4;

/// A loaned instance joined with its book title.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoanRow {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub imprint: String,
    pub due_back: Option<String>,
    pub status: String,
    pub borrower_id: Option<i32>,
}

fn to_loan_rows(rows: Vec<(book_instance::Model, Option<crate::models::book::Model>)>) -> Vec<LoanRow> {
    rows.into_iter()
        .map(|(instance, book)| LoanRow {
            id: instance.id,
            book_id: instance.book_id,
            book_title: book.map(|b| b.title).unwrap_or_else(|| "Unknown".to_string()),
            imprint: instance.imprint,
            due_back: instance.due_back,
            status: instance.status,
            borrower_id: instance.borrower_id,
        })
        .collect()
}

/// Instances on loan to one borrower, soonest due first. Instances without a
/// due date sort last.
pub async fn loans_for_borrower(
    db: &DatabaseConnection,
    borrower_id: i32,
) -> Result<Vec<LoanRow>, ServiceError> {
    let rows = BookInstance::find()
        .filter(book_instance::Column::BorrowerId.eq(borrower_id))
        .filter(book_instance::Column::Status.eq(status::ON_LOAN))
        // IS NULL sorts false-first, pushing missing due dates to the end
        .order_by(Expr::col(book_instance::Column::DueBack).is_null(), Order::Asc)
        .order_by(book_instance::Column::DueBack, Order::Asc)
        .find_also_related(Book)
        .all(db)
        .await?;

    Ok(to_loan_rows(rows))
}

/// Every instance currently on loan, soonest due first.
pub async fn all_on_loan(db: &DatabaseConnection) -> Result<Vec<LoanRow>, ServiceError> {
    let rows = BookInstance::find()
        .filter(book_instance::Column::Status.eq(status::ON_LOAN))
        .order_by(Expr::col(book_instance::Column::DueBack).is_null(), Order::Asc)
        .order_by(book_instance::Column::DueBack, Order::Asc)
        .find_also_related(Book)
        .all(db)
        .await?;

    Ok(to_loan_rows(rows))
}

/// Date the renewal form is pre-populated with.
pub fn proposed_renewal_date(today: NaiveDate) -> NaiveDate {
    today + Duration::weeks(PROPOSED_RENEWAL_WEEKS)
}

/// Validate a submitted renewal date against `today`.
///
/// The date must be strictly in the future (today itself is rejected) and at
/// most four weeks out (exactly 28 days ahead is the last valid value).
pub fn validate_renewal_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ServiceError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ServiceError::Validation {
        field: "renewal_date",
        message: format!("Invalid date '{}', expected YYYY-MM-DD", raw),
    })?;

    if date <= today {
        return Err(ServiceError::Validation {
            field: "renewal_date",
            message: "Invalid date - renewal in past".to_string(),
        });
    }

    if date > today + Duration::weeks(MAX_RENEWAL_WEEKS) {
        return Err(ServiceError::Validation {
            field: "renewal_date",
            message: "Invalid date - renewal more than 4 weeks ahead".to_string(),
        });
    }

    Ok(date)
}

/// Overwrite the due date of one instance. No other field is touched.
pub async fn renew_instance(
    db: &DatabaseConnection,
    id: i32,
    new_due: NaiveDate,
) -> Result<book_instance::Model, ServiceError> {
    let instance = BookInstance::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let mut active: book_instance::ActiveModel = instance.into();
    active.due_back = Set(Some(new_due.format("%Y-%m-%d").to_string()));
    active.updated_at = Set(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

    let updated = active.update(db).await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_proposed_date_is_three_weeks_out() {
        assert_eq!(proposed_renewal_date(day("2024-01-01")), day("2024-01-22"));
    }

    #[test]
    fn test_renewal_date_today_is_rejected() {
        let err = validate_renewal_date("2024-01-01", day("2024-01-01"));
        assert!(matches!(
            err,
            Err(ServiceError::Validation { field: "renewal_date", .. })
        ));
    }

    #[test]
    fn test_renewal_date_in_past_is_rejected() {
        assert!(validate_renewal_date("2023-12-31", day("2024-01-01")).is_err());
    }

    #[test]
    fn test_renewal_date_tomorrow_is_accepted() {
        let date = validate_renewal_date("2024-01-02", day("2024-01-01")).unwrap();
        assert_eq!(date, day("2024-01-02"));
    }

    #[test]
    fn test_renewal_date_exactly_four_weeks_is_accepted() {
        // 28 days ahead is the last valid value
        let date = validate_renewal_date("2024-01-29", day("2024-01-01")).unwrap();
        assert_eq!(date, day("2024-01-29"));
    }

    #[test]
    fn test_renewal_date_past_four_weeks_is_rejected() {
        assert!(validate_renewal_date("2024-01-30", day("2024-01-01")).is_err());
    }

    #[test]
    fn test_renewal_date_garbage_is_rejected() {
        assert!(validate_renewal_date("not-a-date", day("2024-01-01")).is_err());
        assert!(validate_renewal_date("29/01/2024", day("2024-01-01")).is_err());
        assert!(validate_renewal_date("", day("2024-01-01")).is_err());
    }
}
