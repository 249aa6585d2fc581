//! Application state shared across all handlers

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

// Handlers that only touch the database extract the connection directly.
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
