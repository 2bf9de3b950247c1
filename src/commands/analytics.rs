use tracing::{debug, warn};

use crate::analytics::view_model::{build_survey_view, AnalyticsView};
use crate::client::surveys::SurveyRepository;
use crate::error::ApiError;
use crate::state::LivenessGuard;
use crate::survey::types::SurveyId;

/// Loads aggregates and turns them into the analytics screen model.
///
/// Returns `Ok(None)` when the guard moved on while the requests were in
/// flight; the caller must not render anything in that case. The survey is
/// fetched only for question titles, so a failure there (other than an
/// expired session) falls back to the text carried in the aggregates.
pub async fn load_analytics_view(
    repo: &SurveyRepository,
    guard: &LivenessGuard,
    survey_id: SurveyId,
) -> Result<Option<AnalyticsView>, ApiError> {
    let ticket = guard.begin();
    let analytics = repo.get_analytics(survey_id).await?;
    let survey = match repo.get_survey(survey_id).await {
        Ok(survey) => Some(survey),
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => {
            warn!(survey_id, "survey unavailable for analytics titles: {e}");
            None
        }
    };
    if !guard.is_current(ticket) {
        debug!(survey_id, "discarding stale analytics result");
        return Ok(None);
    }
    Ok(Some(build_survey_view(survey.as_ref(), &analytics)))
}
