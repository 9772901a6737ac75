use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Principal;

/// A server-side login session keyed by an opaque random identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
