use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use pmot_db::models::{MediaLinkRow, StoryRow, UserRow};
use pmot_types::models::{MediaLink, Story, User};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC, accepting RFC 3339 as well.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn user_from_row(row: UserRow) -> User {
    User {
        id: row.id,
        email: row.email,
        username: row.username,
        is_premium: row.is_premium,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn story_from_row(row: StoryRow) -> Story {
    Story {
        id: row.id,
        author_id: row.author_id,
        title: row.title,
        takeoff: row.takeoff,
        turbulence: row.turbulence,
        touchdown: row.touchdown,
        media_links: row.media_links.into_iter().map(media_link_from_row).collect(),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

fn media_link_from_row(row: MediaLinkRow) -> MediaLink {
    MediaLink {
        id: row.id,
        story_id: row.story_id,
        media_type: row.media_type,
        url: row.url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339() {
        let ts = parse_timestamp("2024-03-05 07:08:09");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (7, 8, 9));

        let ts = parse_timestamp("2024-03-05T07:08:09Z");
        assert_eq!(ts.hour(), 7);
    }

    #[test]
    fn garbage_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
    }
}
