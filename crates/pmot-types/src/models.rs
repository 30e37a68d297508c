use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

/// A journal entry told in three acts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub takeoff: String,
    pub turbulence: String,
    pub touchdown: String,
    pub media_links: Vec<MediaLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaLink {
    pub id: i64,
    pub story_id: i64,
    /// Free-form tag such as "image" or "video".
    pub media_type: String,
    pub url: String,
}
