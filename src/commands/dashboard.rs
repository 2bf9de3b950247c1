use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::client::surveys::SurveyRepository;
use crate::client::types::{ExportedFile, MessageReceipt};
use crate::error::ApiError;
use crate::state::{AppState, LivenessGuard, RequestTicket};
use crate::survey::types::{SharePermission, ShareRequest, Survey, SurveyDraft, SurveyId};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareArgs {
    pub survey_id: SurveyId,
    pub email: String,
    pub permission_type: SharePermission,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArgs {
    pub survey_id: SurveyId,
    pub output_dir: PathBuf,
}

/// Fetches the survey list for `ticket`. Returns `None` when the guard moved
/// on during the request, e.g. because the dashboard was torn down.
pub async fn load_surveys(
    repo: &SurveyRepository,
    guard: &LivenessGuard,
    ticket: RequestTicket,
) -> Option<Result<Vec<Survey>, ApiError>> {
    let result = repo.list_surveys().await;
    if !guard.is_current(ticket) {
        debug!("discarding stale survey list");
        return None;
    }
    Some(result)
}

/// Reloads the dashboard list. Returns false if a newer load or a detach
/// made this result stale.
///
/// This borrows the whole state for the request. A front end that must
/// stay responsive meanwhile calls `begin_load` and [`load_surveys`] with a
/// cloned repository and `list.guard()`, then applies the result with
/// `finish_load`.
pub async fn refresh_surveys(state: &mut AppState) -> bool {
    let ticket = state.list.begin_load();
    let guard = state.list.guard();
    let Some(result) = load_surveys(&state.surveys, &guard, ticket).await else {
        return false;
    };
    if let Err(e) = &result {
        if e.is_auth() {
            state.session.signed_out();
        }
    }
    state.list.finish_load(ticket, result)
}

pub async fn create_survey(state: &mut AppState, draft: SurveyDraft) -> Result<Survey, ApiError> {
    let result = state.surveys.create_survey(draft).await;
    match result {
        Ok(survey) => {
            state.list.apply_created(survey.clone());
            Ok(survey)
        }
        Err(e) => Err(note_failure(state, e)),
    }
}

/// The cached list only changes once the backend confirms the delete.
pub async fn delete_survey(state: &mut AppState, survey_id: SurveyId) -> Result<(), ApiError> {
    let result = state.surveys.delete_survey(survey_id).await;
    match result {
        Ok(()) => {
            state.list.apply_deleted(survey_id);
            Ok(())
        }
        Err(e) => Err(note_failure(state, e)),
    }
}

pub async fn share_survey(state: &mut AppState, args: ShareArgs) -> Result<MessageReceipt, ApiError> {
    let request = ShareRequest::new(args.email, args.permission_type);
    let result = state.surveys.share_survey(args.survey_id, &request).await;
    result.map_err(|e| note_failure(state, e))
}

pub async fn export_survey(state: &mut AppState, args: ExportArgs) -> Result<ExportedFile, ApiError> {
    let result = state.surveys.export_csv(args.survey_id, &args.output_dir).await;
    result.map_err(|e| note_failure(state, e))
}

fn note_failure(state: &mut AppState, err: ApiError) -> ApiError {
    warn!("dashboard action failed: {err}");
    if err.is_auth() {
        state.session.signed_out();
    }
    state.list.set_error(err.user_message());
    err
}
