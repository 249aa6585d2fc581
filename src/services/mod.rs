pub mod catalog_service;
pub mod loan_service;

/// Error type for service operations
#[derive(Debug)]
pub enum ServiceError {
    Database(String),
    NotFound,
    /// Field-level validation failure; the caller may correct and resubmit
    Validation { field: &'static str, message: String },
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Database(e.to_string())
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Database(msg) => write!(f, "Database error: {}", msg),
            ServiceError::NotFound => write!(f, "Resource not found"),
            ServiceError::Validation { field, message } => {
                write!(f, "Validation error on {}: {}", field, message)
            }
        }
    }
}

impl std::error::Error for ServiceError {}
