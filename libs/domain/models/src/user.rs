use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated user identifier: leading letter, then letters/digits/`_`/`-`, length 1-64.
pub fn is_valid_user_id(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    candidate.len() <= 64
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub credential_token: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
