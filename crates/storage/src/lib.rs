use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::domain::{Event, EventId, Participant, User, UserId, WizardState};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Insert form of an event; the id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    // -- users --------------------------------------------------------

    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (user_id, first_name, username, updated_at)
             VALUES (?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id) DO UPDATE SET
                 first_name = excluded.first_name,
                 username = excluded.username,
                 updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user.id.0)
        .bind(&user.first_name)
        .bind(&user.username)
        .execute(&self.pool)
        .await
        .context("failed to upsert user")?;
        Ok(())
    }

    pub async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, first_name, username FROM users WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| User {
            id: UserId(row.get(0)),
            first_name: row.get(1),
            username: row.get(2),
        }))
    }

    // -- events -------------------------------------------------------

    pub async fn insert_event(&self, event: &NewEvent) -> Result<EventId> {
        let rec = sqlx::query(
            "INSERT INTO events (owner_id, title, description, starts_at, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(event.owner_id.0)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert event")?;
        Ok(EventId(rec.get::<i64, _>(0)))
    }

    pub async fn event_by_id(&self, event_id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, description, starts_at, created_at, archived
             FROM events WHERE id = ?",
        )
        .bind(event_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(event_from_row).transpose()
    }

    pub async fn list_active_events(&self) -> Result<Vec<Event>> {
        self.list_events_where("archived = 0").await
    }

    pub async fn list_archived_events(&self) -> Result<Vec<Event>> {
        self.list_events_where("archived = 1").await
    }

    async fn list_events_where(&self, filter: &str) -> Result<Vec<Event>> {
        let query = format!(
            "SELECT id, owner_id, title, description, starts_at, created_at, archived
             FROM events WHERE {filter} ORDER BY starts_at ASC, id ASC",
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.into_iter().map(event_from_row).collect()
    }

    pub async fn events_by_owner(&self, owner_id: UserId) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, title, description, starts_at, created_at, archived
             FROM events WHERE owner_id = ? AND archived = 0
             ORDER BY starts_at ASC, id ASC",
        )
        .bind(owner_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(event_from_row).collect()
    }

    /// Returns false when no such event existed.
    pub async fn delete_event(&self, event_id: EventId) -> Result<bool> {
        let res = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(event_id.0)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM registrations WHERE event_id = ?")
            .bind(event_id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn archive_event(&self, event_id: EventId) -> Result<bool> {
        let res = sqlx::query("UPDATE events SET archived = 1 WHERE id = ? AND archived = 0")
            .bind(event_id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // -- registrations ------------------------------------------------

    pub async fn register(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO registrations (event_id, user_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(event_id, user_id) DO NOTHING",
        )
        .bind(event_id.0)
        .bind(user_id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("failed to register participant")?;
        Ok(())
    }

    /// Returns false when the user was not registered.
    pub async fn unregister(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let res = sqlx::query("DELETE FROM registrations WHERE event_id = ? AND user_id = ?")
            .bind(event_id.0)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn is_registered(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM registrations WHERE event_id = ? AND user_id = ?)",
        )
        .bind(event_id.0)
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn participants(&self, event_id: EventId) -> Result<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT u.user_id, u.first_name, u.username, r.created_at
             FROM registrations r
             JOIN users u ON r.user_id = u.user_id
             WHERE r.event_id = ?
             ORDER BY r.created_at ASC",
        )
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(participant_from_row).collect()
    }

    pub async fn participants_page(
        &self,
        event_id: EventId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Participant>, i64)> {
        let rows = sqlx::query(
            "SELECT u.user_id, u.first_name, u.username, r.created_at
             FROM registrations r
             JOIN users u ON r.user_id = u.user_id
             WHERE r.event_id = ?
             ORDER BY r.created_at ASC
             LIMIT ? OFFSET ?",
        )
        .bind(event_id.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let participants = rows
            .into_iter()
            .map(participant_from_row)
            .collect::<Result<Vec<_>>>()?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE event_id = ?")
                .bind(event_id.0)
                .fetch_one(&self.pool)
                .await
                .context("failed to count participants")?;
        Ok((participants, total))
    }

    // -- wizard states ------------------------------------------------

    pub async fn wizard_state(&self, user_id: UserId) -> Result<Option<WizardState>> {
        let row = sqlx::query("SELECT state_data FROM user_states WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            let raw: String = row.get(0);
            serde_json::from_str(&raw).context("failed to decode wizard state blob")
        })
        .transpose()
    }

    pub async fn save_wizard_state(&self, user_id: UserId, state: &WizardState) -> Result<()> {
        let raw = serde_json::to_string(state).context("failed to encode wizard state")?;
        sqlx::query(
            "INSERT INTO user_states (user_id, state_data, saved_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 state_data = excluded.state_data,
                 saved_at = excluded.saved_at",
        )
        .bind(user_id.0)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to save wizard state")?;
        Ok(())
    }

    pub async fn delete_wizard_state(&self, user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM user_states WHERE user_id = ?")
            .bind(user_id.0)
            .execute(&self.pool)
            .await
            .context("failed to delete wizard state")?;
        Ok(())
    }
}

fn event_from_row(row: SqliteRow) -> Result<Event> {
    Ok(Event {
        id: EventId(row.try_get("id")?),
        owner_id: UserId(row.try_get("owner_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        starts_at: row.try_get("starts_at")?,
        created_at: row.try_get("created_at")?,
        archived: row.try_get("archived")?,
    })
}

fn participant_from_row(row: SqliteRow) -> Result<Participant> {
    Ok(Participant {
        user: User {
            id: UserId(row.try_get("user_id")?),
            first_name: row.try_get("first_name")?,
            username: row.try_get("username")?,
        },
        registered_at: row.try_get("created_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create parent directory '{}' for database url '{database_url}'",
                parent.display()
            )
        })?;
    }

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
