//! Story ownership and the free-tier quota.
//!
//! Every story query here is scoped by author. A story that exists but
//! belongs to someone else is reported exactly like one that does not exist.

use rusqlite::Connection;
use tracing::{debug, warn};

use pmot_db::Database;
use pmot_db::models::{NewMediaLink, StoryFields};
use pmot_db::queries;
use pmot_types::api::{StoryQuery, StoryRequest};
use pmot_types::models::Story;

use crate::ApiError;
use crate::convert::story_from_row;
use crate::middleware::Identity;

/// Stories a non-premium user may own.
pub const FREE_STORY_LIMIT: u32 = 3;

/// Upper bound on a single listing page.
pub const MAX_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("story not found")]
    NotFound,

    #[error("free story quota of {0} reached")]
    QuotaExceeded(u32),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound => ApiError::NotFound,
            AccessError::QuotaExceeded(limit) => ApiError::QuotaExceeded(limit),
            AccessError::Storage(e) => ApiError::Internal(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl From<&StoryQuery> for Page {
    fn from(query: &StoryQuery) -> Self {
        Self {
            offset: query.skip,
            limit: query.limit.min(MAX_PAGE_LIMIT),
        }
    }
}

/// A validated story body: the four text fields plus the full media set.
#[derive(Debug, Clone)]
pub struct StoryDraft {
    pub fields: StoryFields,
    pub media_links: Vec<NewMediaLink>,
}

impl From<StoryRequest> for StoryDraft {
    fn from(req: StoryRequest) -> Self {
        Self {
            fields: StoryFields {
                title: req.title,
                takeoff: req.takeoff,
                turbulence: req.turbulence,
                touchdown: req.touchdown,
            },
            media_links: req
                .media_links
                .into_iter()
                .map(|m| NewMediaLink {
                    media_type: m.media_type,
                    url: m.url,
                })
                .collect(),
        }
    }
}

/// Fetch a story only if `identity` owns it.
pub fn authorize_story_access(conn: &Connection, identity: &Identity, story_id: i64) -> Result<Story, AccessError> {
    queries::story_for_author(conn, story_id, identity.id)?
        .map(story_from_row)
        .ok_or(AccessError::NotFound)
}

/// Premium users are never limited. Everyone else may own at most
/// [`FREE_STORY_LIMIT`] stories.
pub fn authorize_story_creation(conn: &Connection, identity: &Identity) -> Result<(), AccessError> {
    if identity.is_premium {
        return Ok(());
    }

    let owned = queries::count_stories_for_author(conn, identity.id)?;
    if owned >= FREE_STORY_LIMIT {
        warn!("User {} hit the free story quota ({} owned)", identity.username, owned);
        return Err(AccessError::QuotaExceeded(FREE_STORY_LIMIT));
    }
    Ok(())
}

pub fn list_stories(db: &Database, identity: &Identity, page: Page) -> Result<Vec<Story>, AccessError> {
    let rows = db.list_stories_for_author(identity.id, page.offset, page.limit)?;
    Ok(rows.into_iter().map(story_from_row).collect())
}

pub fn get_story(db: &Database, identity: &Identity, story_id: i64) -> Result<Story, AccessError> {
    db.get_story_for_author(story_id, identity.id)?
        .map(story_from_row)
        .ok_or(AccessError::NotFound)
}

/// Quota check and insert share one write transaction, so concurrent
/// creations by the same user cannot both pass the check.
pub fn create_story(db: &Database, identity: &Identity, draft: &StoryDraft) -> Result<Story, AccessError> {
    db.with_tx(|tx| {
        authorize_story_creation(tx, identity)?;
        let id = queries::insert_story(tx, identity.id, &draft.fields)?;
        queries::insert_media_links(tx, id, &draft.media_links)?;
        debug!("User {} created story {}", identity.username, id);
        authorize_story_access(tx, identity, id)
    })
}

/// Replace every field and the whole media set of an owned story.
pub fn update_story(
    db: &Database,
    identity: &Identity,
    story_id: i64,
    draft: &StoryDraft,
) -> Result<Story, AccessError> {
    db.with_tx(|tx| {
        if !queries::update_story_for_author(tx, story_id, identity.id, &draft.fields)? {
            return Err(AccessError::NotFound);
        }
        queries::replace_media_links(tx, story_id, &draft.media_links)?;
        authorize_story_access(tx, identity, story_id)
    })
}

pub fn delete_story(db: &Database, identity: &Identity, story_id: i64) -> Result<(), AccessError> {
    if db.delete_story_for_author(story_id, identity.id)? {
        debug!("User {} deleted story {}", identity.username, story_id);
        Ok(())
    } else {
        Err(AccessError::NotFound)
    }
}
