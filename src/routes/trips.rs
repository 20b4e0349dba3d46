use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use validator::{Validate, ValidateEmail};

use crate::{
    error::AppError,
    models::activity::Activity,
    services::store::{CreateTripParams, StoreError, UpdateTripParams},
    state::AppState,
};

use super::{deserialize_loose_datetime, parse_id, GENERIC_FAILURE};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", post(create_trip))
        .route("/trips/:trip_id", get(get_trip).put(update_trip))
        .route("/trips/:trip_id/confirm", get(confirm_trip))
        .route("/trips/:trip_id/invites", post(invite_participant))
        .route(
            "/trips/:trip_id/activities",
            get(list_activities).post(create_activity),
        )
        .route("/trips/:trip_id/links", get(list_links).post(create_link))
        .route("/trips/:trip_id/participants", get(list_participants))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    #[validate(length(min = 4, message = "destination must be at least 4 characters"))]
    pub destination: String,
    #[serde(deserialize_with = "deserialize_loose_datetime")]
    pub starts_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_loose_datetime")]
    pub ends_at: DateTime<Utc>,
    #[validate(length(min = 1, message = "owner_name must not be empty"))]
    pub owner_name: String,
    #[validate(email(message = "owner_email must be a valid email"))]
    pub owner_email: String,
    #[serde(default)]
    pub emails_to_invite: Vec<String>,
}

#[derive(Serialize)]
struct CreateTripResponse {
    trip_id: String,
}

async fn create_trip(
    State(state): State<AppState>,
    body: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateTripResponse>), AppError> {
    let Json(body) = body.map_err(|err| AppError::BadRequest(format!("invalid JSON: {err}")))?;
    body.validate()
        .map_err(|err| AppError::BadRequest(format!("invalid input: {err}")))?;
    if body.ends_at < body.starts_at {
        return Err(AppError::BadRequest(
            "invalid input: trip ends before it starts".into(),
        ));
    }
    if let Some(email) = body.emails_to_invite.iter().find(|e| !e.validate_email()) {
        return Err(AppError::BadRequest(format!(
            "invalid input: {email:?} is not a valid email"
        )));
    }

    let params = CreateTripParams {
        destination: body.destination,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
        owner_name: body.owner_name,
        owner_email: body.owner_email,
        emails_to_invite: body.emails_to_invite,
    };
    let trip_id = state.store.create_trip(&params).await.map_err(|err| {
        error!(error = %err, "failed to create trip");
        AppError::Internal("failed to create trip, try again")
    })?;

    let mailer = state.mailer.clone();
    let id = trip_id.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_confirm_trip_email_to_trip_owner(&id).await {
            error!(error = %err, trip_id = %id, "failed to send confirmation request to trip owner");
        }
    });

    Ok((StatusCode::CREATED, Json(CreateTripResponse { trip_id })))
}

async fn get_trip(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn update_trip(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn list_links(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn create_link(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn confirm_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&trip_id)?;

    let trip = state.store.get_trip(&id).await.map_err(|err| match err {
        StoreError::NotFound => AppError::NotFound("trip not found"),
        err => {
            error!(error = %err, trip_id = %id, "failed to get trip by id");
            AppError::Internal(GENERIC_FAILURE)
        }
    })?;

    if trip.is_confirmed {
        return Err(AppError::Conflict("trip already confirmed"));
    }

    state
        .store
        .update_trip(&UpdateTripParams {
            id: id.clone(),
            destination: trip.destination,
            starts_at: trip.starts_at,
            ends_at: trip.ends_at,
            is_confirmed: true,
        })
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::NotFound("trip not found"),
            err => {
                error!(error = %err, trip_id = %id, "failed to update trip");
                AppError::Internal(GENERIC_FAILURE)
            }
        })?;

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_trip_confirmed_emails(&id).await {
            error!(error = %err, trip_id = %id, "failed to send trip confirmed emails");
        }
    });

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteParticipantRequest {
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
}

async fn invite_participant(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    body: Result<Json<InviteParticipantRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&trip_id)?;
    let Json(body) = body.map_err(|err| AppError::BadRequest(format!("invalid JSON: {err}")))?;
    body.validate()
        .map_err(|err| AppError::BadRequest(format!("invalid input: {err}")))?;

    let participant_id = state
        .store
        .invite_participant(&id, &body.email)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::NotFound("trip not found"),
            StoreError::Duplicate => AppError::Conflict("participant already invited"),
            err => {
                error!(
                    error = %err,
                    trip_id = %id,
                    participant_email = %body.email,
                    "failed to invite participant to trip"
                );
                AppError::Internal(GENERIC_FAILURE)
            }
        })?;

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_trip_confirmed_email(&id, &participant_id).await {
            error!(
                error = %err,
                trip_id = %id,
                participant_id = %participant_id,
                "failed to send trip confirmed email"
            );
        }
    });

    Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActivityRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(deserialize_with = "deserialize_loose_datetime")]
    pub occurs_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CreateActivityResponse {
    activity_id: String,
}

async fn create_activity(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    body: Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateActivityResponse>), AppError> {
    let id = parse_id(&trip_id)?;
    let Json(body) = body.map_err(|err| AppError::BadRequest(format!("invalid JSON: {err}")))?;
    body.validate()
        .map_err(|err| AppError::BadRequest(format!("invalid input: {err}")))?;

    let activity_id = state
        .store
        .create_activity(&id, &body.title, body.occurs_at)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::NotFound("trip not found"),
            err => {
                error!(error = %err, trip_id = %id, "failed to create trip activity");
                AppError::Internal(GENERIC_FAILURE)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateActivityResponse { activity_id }),
    ))
}

#[derive(Serialize)]
struct TripActivitiesResponse {
    activities: Vec<DayActivities>,
}

#[derive(Serialize)]
struct DayActivities {
    date: NaiveDate,
    activities: Vec<ActivityView>,
}

#[derive(Serialize)]
struct ActivityView {
    id: String,
    title: String,
    occurs_at: DateTime<Utc>,
}

async fn list_activities(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripActivitiesResponse>, AppError> {
    let id = parse_id(&trip_id)?;

    let activities = state
        .store
        .get_trip_activities(&id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::NotFound("trip not found"),
            err => {
                error!(error = %err, trip_id = %id, "failed to get trip activities");
                AppError::Internal(GENERIC_FAILURE)
            }
        })?;

    let days = group_activities_by_day(activities)
        .into_iter()
        .map(|(date, on_date)| DayActivities {
            date,
            activities: on_date
                .into_iter()
                .map(|activity| ActivityView {
                    id: activity.id,
                    title: activity.title,
                    occurs_at: activity.occurs_at,
                })
                .collect(),
        })
        .collect();

    Ok(Json(TripActivitiesResponse { activities: days }))
}

/// Buckets activities by the calendar date of their timestamp, ascending
/// by date and stable within a date.
fn group_activities_by_day(activities: Vec<Activity>) -> Vec<(NaiveDate, Vec<Activity>)> {
    let mut days: BTreeMap<NaiveDate, Vec<Activity>> = BTreeMap::new();
    for activity in activities {
        days.entry(activity.occurs_at.date_naive())
            .or_default()
            .push(activity);
    }
    days.into_iter().collect()
}

#[derive(Serialize)]
struct TripParticipantsResponse {
    participants: Vec<ParticipantView>,
}

#[derive(Serialize)]
struct ParticipantView {
    id: String,
    email: String,
    is_confirmed: bool,
    name: Option<String>,
}

async fn list_participants(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripParticipantsResponse>, AppError> {
    let id = parse_id(&trip_id)?;

    let participants = state
        .store
        .get_participants(&id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::NotFound("trip not found"),
            err => {
                error!(error = %err, trip_id = %id, "failed to find trip participants");
                AppError::Internal(GENERIC_FAILURE)
            }
        })?;

    let participants = participants
        .into_iter()
        .map(|participant| ParticipantView {
            name: participant.display_name(),
            id: participant.id,
            email: participant.email,
            is_confirmed: participant.is_confirmed,
        })
        .collect();

    Ok(Json(TripParticipantsResponse { participants }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn activity(title: &str, occurs_at: &str) -> Activity {
        Activity {
            id: uuid::Uuid::new_v4().to_string(),
            trip_id: "11111111-1111-1111-1111-111111111111".into(),
            title: title.into(),
            occurs_at: NaiveDateTime::parse_from_str(occurs_at, "%Y-%m-%d %H:%M")
                .expect("test timestamp")
                .and_utc(),
        }
    }

    #[test]
    fn groups_by_calendar_date_in_ascending_order() {
        let grouped = group_activities_by_day(vec![
            activity("dinner", "2024-01-02 20:00"),
            activity("museum", "2024-01-01 10:00"),
            activity("beach", "2024-01-01 15:00"),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0.to_string(), "2024-01-01");
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(grouped[1].0.to_string(), "2024-01-02");
        assert_eq!(grouped[1].1.len(), 1);
    }

    #[test]
    fn keeps_input_order_within_a_date() {
        let grouped = group_activities_by_day(vec![
            activity("museum", "2024-01-01 15:00"),
            activity("beach", "2024-01-01 10:00"),
        ]);

        assert_eq!(grouped[0].1[0].title, "museum");
        assert_eq!(grouped[0].1[1].title, "beach");
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_activities_by_day(Vec::new()).is_empty());
    }
}
