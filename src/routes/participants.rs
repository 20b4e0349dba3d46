use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::patch,
    Router,
};
use tracing::error;

use crate::{error::AppError, services::store::StoreError, state::AppState};

use super::{parse_id, GENERIC_FAILURE};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/participants/:participant_id/confirm",
        patch(confirm_participant),
    )
}

async fn confirm_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&participant_id)?;

    let participant = state
        .store
        .get_participant(&id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::NotFound("trip or participant not found"),
            err => {
                error!(error = %err, participant_id = %id, "failed to get participant");
                AppError::Internal(GENERIC_FAILURE)
            }
        })?;

    if participant.is_confirmed {
        return Err(AppError::Conflict("participant already confirmed"));
    }

    // Check-then-set across two store calls; the race window between two
    // concurrent confirmations stays open.
    state.store.confirm_participant(&id).await.map_err(|err| {
        error!(error = %err, participant_id = %id, "failed to confirm participant");
        AppError::Internal(GENERIC_FAILURE)
    })?;

    Ok(StatusCode::NO_CONTENT)
}
