use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{activity::Activity, participant::Participant, trip::Trip};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("participant already invited")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct CreateTripParams {
    pub destination: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub owner_name: String,
    pub owner_email: String,
    pub emails_to_invite: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateTripParams {
    pub id: String,
    pub destination: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_confirmed: bool,
}

#[derive(Clone)]
pub struct TripStore {
    db: SqlitePool,
}

impl TripStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Persists the trip together with its implicit owner participant and
    /// one participant per invited email, in a single transaction.
    pub async fn create_trip(&self, params: &CreateTripParams) -> Result<String, StoreError> {
        let trip_id = Uuid::new_v4().to_string();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO trips (id, destination, starts_at, ends_at, owner_name, owner_email, is_confirmed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
        )
        .bind(&trip_id)
        .bind(&params.destination)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(&params.owner_name)
        .bind(&params.owner_email)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO participants (id, trip_id, email, is_confirmed, is_owner) VALUES (?1, ?2, ?3, 0, 1)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&trip_id)
        .bind(&params.owner_email)
        .execute(&mut *tx)
        .await?;

        for email in &params.emails_to_invite {
            sqlx::query(
                "INSERT INTO participants (id, trip_id, email, is_confirmed, is_owner) VALUES (?1, ?2, ?3, 0, 0)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&trip_id)
            .bind(email)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(trip_id)
    }

    pub async fn get_trip(&self, trip_id: &str) -> Result<Trip, StoreError> {
        let row = sqlx::query(
            "SELECT id, destination, starts_at, ends_at, owner_name, owner_email, is_confirmed \
             FROM trips WHERE id = ?1",
        )
        .bind(trip_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(trip_from_row(&row))
    }

    /// Full-row update keyed by `params.id`.
    pub async fn update_trip(&self, params: &UpdateTripParams) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE trips SET destination = ?1, starts_at = ?2, ends_at = ?3, is_confirmed = ?4 \
             WHERE id = ?5",
        )
        .bind(&params.destination)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(params.is_confirmed)
        .bind(&params.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn get_participant(&self, participant_id: &str) -> Result<Participant, StoreError> {
        let row = sqlx::query(
            "SELECT id, trip_id, email, is_confirmed, is_owner FROM participants WHERE id = ?1",
        )
        .bind(participant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(participant_from_row(&row))
    }

    pub async fn get_participants(&self, trip_id: &str) -> Result<Vec<Participant>, StoreError> {
        if !self.trip_exists(trip_id).await? {
            return Err(StoreError::NotFound);
        }
        let rows = sqlx::query(
            "SELECT id, trip_id, email, is_confirmed, is_owner FROM participants \
             WHERE trip_id = ?1 ORDER BY is_owner DESC, email",
        )
        .bind(trip_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(participant_from_row).collect())
    }

    /// Sets the confirmed flag unconditionally; the caller is expected to
    /// have rejected an already-confirmed participant beforehand.
    pub async fn confirm_participant(&self, participant_id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE participants SET is_confirmed = 1 WHERE id = ?1")
            .bind(participant_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn invite_participant(
        &self,
        trip_id: &str,
        email: &str,
    ) -> Result<String, StoreError> {
        if !self.trip_exists(trip_id).await? {
            return Err(StoreError::NotFound);
        }
        let participant_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO participants (id, trip_id, email, is_confirmed, is_owner) VALUES (?1, ?2, ?3, 0, 0)",
        )
        .bind(&participant_id)
        .bind(trip_id)
        .bind(email)
        .execute(&self.db)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err)
                if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                StoreError::Duplicate
            }
            _ => StoreError::Database(err),
        })?;

        Ok(participant_id)
    }

    pub async fn create_activity(
        &self,
        trip_id: &str,
        title: &str,
        occurs_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        if !self.trip_exists(trip_id).await? {
            return Err(StoreError::NotFound);
        }
        let activity_id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO activities (id, trip_id, title, occurs_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&activity_id)
            .bind(trip_id)
            .bind(title)
            .bind(occurs_at)
            .execute(&self.db)
            .await?;

        Ok(activity_id)
    }

    pub async fn get_trip_activities(&self, trip_id: &str) -> Result<Vec<Activity>, StoreError> {
        if !self.trip_exists(trip_id).await? {
            return Err(StoreError::NotFound);
        }
        let rows = sqlx::query(
            "SELECT id, trip_id, title, occurs_at FROM activities \
             WHERE trip_id = ?1 ORDER BY occurs_at",
        )
        .bind(trip_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(activity_from_row).collect())
    }

    async fn trip_exists(&self, trip_id: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trips WHERE id = ?1")
            .bind(trip_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }
}

fn trip_from_row(row: &SqliteRow) -> Trip {
    Trip {
        id: row.get("id"),
        destination: row.get("destination"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        owner_name: row.get("owner_name"),
        owner_email: row.get("owner_email"),
        is_confirmed: row.get("is_confirmed"),
    }
}

fn participant_from_row(row: &SqliteRow) -> Participant {
    Participant {
        id: row.get("id"),
        trip_id: row.get("trip_id"),
        email: row.get("email"),
        is_confirmed: row.get("is_confirmed"),
        is_owner: row.get("is_owner"),
    }
}

fn activity_from_row(row: &SqliteRow) -> Activity {
    Activity {
        id: row.get("id"),
        trip_id: row.get("trip_id"),
        title: row.get("title"),
        occurs_at: row.get("occurs_at"),
    }
}
