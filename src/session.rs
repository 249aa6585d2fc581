//! In-process session store for the home-page visit counter.
//!
//! Keyed by a random session cookie; state lives only as long as the process
//! and the cookie, which is all the counter promises.

use dashmap::DashMap;

pub const SESSION_COOKIE: &str = "librarium_session";

#[derive(Default)]
pub struct SessionStore {
    visits: DashMap<String, u64>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit and return the count as it was before this one.
    /// A fresh session reports 0 and stores 1.
    pub fn record_visit(&self, session_id: &str) -> u64 {
        let mut entry = self.visits.entry(session_id.to_owned()).or_insert(0);
        let before = *entry;
        *entry = before + 1;
        before
    }

    pub fn clear(&self, session_id: &str) {
        self.visits.remove(session_id);
    }
}

/// Pull the session id out of a Cookie header value, if present.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}
