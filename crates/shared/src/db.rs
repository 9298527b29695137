//! Database utilities and the vote read path
//!
//! The schema is owned by the web app; this side only reads from it.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{str::FromStr, time::Duration};
use time::OffsetDateTime;

use crate::types::Vote;

/// Create a read-mostly SQLite connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    // The web app creates the file and runs migrations; never create it here.
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(false)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(60))
        .connect_with(options)
        .await
}

/// Fetch every vote cast on a story, oldest first
pub async fn fetch_story_votes(pool: &SqlitePool, story_id: &str) -> Result<Vec<Vote>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct VoteRow {
        member_id: String,
        story_id: String,
        vote: Option<i64>,
        created_at: i64,
    }

    let rows = sqlx::query_as::<_, VoteRow>(
        r#"
        SELECT memberId AS member_id, storyId AS story_id, vote, createdAt AS created_at
        FROM votes
        WHERE storyId = ?
        ORDER BY createdAt ASC
        "#,
    )
    .bind(story_id)
    .fetch_all(pool)
    .await?;

    tracing::debug!(story_id = %story_id, votes = rows.len(), "Fetched story votes");

    rows.into_iter()
        .map(|r| {
            // createdAt is a unix timestamp in seconds (drizzle `timestamp` mode)
            let created_at = OffsetDateTime::from_unix_timestamp(r.created_at)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            let vote = r
                .vote
                .map(i32::try_from)
                .transpose()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

            Ok(Vote {
                member_id: r.member_id,
                story_id: r.story_id,
                vote,
                created_at,
            })
        })
        .collect()
}
