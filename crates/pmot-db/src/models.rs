//! Database row types. These map directly to SQLite rows.
//! Distinct from pmot-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub is_premium: bool,
    pub created_at: String,
}

pub struct StoryRow {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub takeoff: String,
    pub turbulence: String,
    pub touchdown: String,
    pub created_at: String,
    pub updated_at: String,
    /// Ordered by submission position.
    pub media_links: Vec<MediaLinkRow>,
}

pub struct MediaLinkRow {
    pub id: i64,
    pub story_id: i64,
    pub media_type: String,
    pub url: String,
}

pub struct PremiumOrderRow {
    pub order_id: String,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
}

pub struct PaymentRow {
    pub id: i64,
    pub user_id: i64,
    pub payment_id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: String,
}

/// The mutable columns of a story. Every write goes through this struct so the
/// set of updatable fields is fixed here.
#[derive(Debug, Clone)]
pub struct StoryFields {
    pub title: String,
    pub takeoff: String,
    pub turbulence: String,
    pub touchdown: String,
}

#[derive(Debug, Clone)]
pub struct NewMediaLink {
    pub media_type: String,
    pub url: String,
}

pub struct NewPayment<'a> {
    pub user_id: i64,
    pub payment_id: &'a str,
    pub order_id: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub status: &'a str,
}
