use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::Database;
use crate::models::{
    MediaLinkRow, NewMediaLink, NewPayment, PaymentRow, PremiumOrderRow, StoryFields, StoryRow,
    UserRow,
};

impl Database {
    // -- Users --

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_id(conn, id))
    }

    // -- Stories --

    pub fn get_story_for_author(&self, story_id: i64, author_id: i64) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| story_for_author(conn, story_id, author_id))
    }

    pub fn list_stories_for_author(
        &self,
        author_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| stories_for_author(conn, author_id, offset, limit))
    }

    pub fn delete_story_for_author(&self, story_id: i64, author_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM stories WHERE id = ?1 AND author_id = ?2",
                params![story_id, author_id],
            )?;
            Ok(n > 0)
        })
    }
}

// -- Users --

const USER_COLUMNS: &str = "id, email, username, hashed_password, is_premium, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        hashed_password: row.get(3)?,
        is_premium: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_user(conn: &Connection, email: &str, username: &str, hashed_password: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (email, username, hashed_password) VALUES (?1, ?2, ?3)",
        (email, username, hashed_password),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    Ok(conn.query_row(&sql, [username], map_user).optional()?)
}

pub fn user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_user).optional()?)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE email = ?1", [email], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE username = ?1", [username], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Flip the premium flag on. There is deliberately no way to turn it off.
pub fn set_premium(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute("UPDATE users SET is_premium = 1 WHERE id = ?1", [user_id])?;
    Ok(())
}

// -- Stories --

const STORY_COLUMNS: &str =
    "id, author_id, title, takeoff, turbulence, touchdown, created_at, updated_at";

fn map_story(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        takeoff: row.get(3)?,
        turbulence: row.get(4)?,
        touchdown: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        media_links: Vec::new(),
    })
}

pub fn count_stories_for_author(conn: &Connection, author_id: i64) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM stories WHERE author_id = ?1",
        [author_id],
        |r| r.get(0),
    )?;
    Ok(count as u32)
}

pub fn insert_story(conn: &Connection, author_id: i64, fields: &StoryFields) -> Result<i64> {
    conn.execute(
        "INSERT INTO stories (author_id, title, takeoff, turbulence, touchdown)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            author_id,
            fields.title,
            fields.takeoff,
            fields.turbulence,
            fields.touchdown
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the text fields of a story owned by `author_id`.
/// Returns false when no such story exists for that author.
pub fn update_story_for_author(
    conn: &Connection,
    story_id: i64,
    author_id: i64,
    fields: &StoryFields,
) -> Result<bool> {
    let n = conn.execute(
        "UPDATE stories
         SET title = ?1, takeoff = ?2, turbulence = ?3, touchdown = ?4, updated_at = datetime('now')
         WHERE id = ?5 AND author_id = ?6",
        params![
            fields.title,
            fields.takeoff,
            fields.turbulence,
            fields.touchdown,
            story_id,
            author_id
        ],
    )?;
    Ok(n > 0)
}

pub fn story_for_author(conn: &Connection, story_id: i64, author_id: i64) -> Result<Option<StoryRow>> {
    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1 AND author_id = ?2");
    let story = conn
        .query_row(&sql, params![story_id, author_id], map_story)
        .optional()?;

    match story {
        Some(mut story) => {
            story.media_links = media_links_for_story(conn, story.id)?;
            Ok(Some(story))
        }
        None => Ok(None),
    }
}

pub fn stories_for_author(
    conn: &Connection,
    author_id: i64,
    offset: u32,
    limit: u32,
) -> Result<Vec<StoryRow>> {
    let sql = format!(
        "SELECT {STORY_COLUMNS} FROM stories WHERE author_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut stories = stmt
        .query_map(params![author_id, limit, offset], map_story)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let ids: Vec<i64> = stories.iter().map(|s| s.id).collect();
    let mut media = media_links_for_stories(conn, &ids)?;
    for story in &mut stories {
        story.media_links = media.remove(&story.id).unwrap_or_default();
    }

    Ok(stories)
}

// -- Media links --

fn map_media_link(row: &Row<'_>) -> rusqlite::Result<MediaLinkRow> {
    Ok(MediaLinkRow {
        id: row.get(0)?,
        story_id: row.get(1)?,
        media_type: row.get(2)?,
        url: row.get(3)?,
    })
}

pub fn media_links_for_story(conn: &Connection, story_id: i64) -> Result<Vec<MediaLinkRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, story_id, media_type, url FROM media_links
         WHERE story_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map([story_id], map_media_link)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Batch-fetch media links for a page of stories, grouped by story id.
fn media_links_for_stories(conn: &Connection, story_ids: &[i64]) -> Result<HashMap<i64, Vec<MediaLinkRow>>> {
    let mut grouped: HashMap<i64, Vec<MediaLinkRow>> = HashMap::new();
    if story_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders: Vec<String> = (1..=story_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, story_id, media_type, url FROM media_links
         WHERE story_id IN ({}) ORDER BY story_id, position",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(story_ids.iter()), map_media_link)?;
    for row in rows {
        let row = row?;
        grouped.entry(row.story_id).or_default().push(row);
    }

    Ok(grouped)
}

/// Drop every media link of a story and insert `links` in order.
pub fn replace_media_links(conn: &Connection, story_id: i64, links: &[NewMediaLink]) -> Result<()> {
    conn.execute("DELETE FROM media_links WHERE story_id = ?1", [story_id])?;
    insert_media_links(conn, story_id, links)
}

pub fn insert_media_links(conn: &Connection, story_id: i64, links: &[NewMediaLink]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO media_links (story_id, position, media_type, url) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, link) in links.iter().enumerate() {
        stmt.execute(params![story_id, position as i64, link.media_type, link.url])?;
    }
    Ok(())
}

// -- Premium orders --

pub fn insert_premium_order(
    conn: &Connection,
    order_id: &str,
    user_id: i64,
    amount: i64,
    currency: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO premium_orders (order_id, user_id, amount, currency) VALUES (?1, ?2, ?3, ?4)",
        params![order_id, user_id, amount, currency],
    )?;
    Ok(())
}

pub fn premium_order(conn: &Connection, order_id: &str) -> Result<Option<PremiumOrderRow>> {
    let row = conn
        .query_row(
            "SELECT order_id, user_id, amount, currency FROM premium_orders WHERE order_id = ?1",
            [order_id],
            |row| {
                Ok(PremiumOrderRow {
                    order_id: row.get(0)?,
                    user_id: row.get(1)?,
                    amount: row.get(2)?,
                    currency: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

// -- Payments --

const PAYMENT_COLUMNS: &str =
    "id, user_id, payment_id, order_id, amount, currency, status, created_at";

fn map_payment(row: &Row<'_>) -> rusqlite::Result<PaymentRow> {
    Ok(PaymentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        payment_id: row.get(2)?,
        order_id: row.get(3)?,
        amount: row.get(4)?,
        currency: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn payment_by_payment_id(conn: &Connection, payment_id: &str) -> Result<Option<PaymentRow>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = ?1");
    Ok(conn.query_row(&sql, [payment_id], map_payment).optional()?)
}

pub fn payment_by_order_id(conn: &Connection, order_id: &str) -> Result<Option<PaymentRow>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1");
    Ok(conn.query_row(&sql, [order_id], map_payment).optional()?)
}

pub fn insert_payment(conn: &Connection, payment: &NewPayment<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO payments (user_id, payment_id, order_id, amount, currency, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            payment.user_id,
            payment.payment_id,
            payment.order_id,
            payment.amount,
            payment.currency,
            payment.status
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
