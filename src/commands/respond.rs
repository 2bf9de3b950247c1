use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::surveys::SurveyRepository;
use crate::error::ApiError;
use crate::survey::codec::{encode_form, encode_wire, FormErrors, FormState};
use crate::survey::types::{QuestionId, Survey, SurveyId, SurveyResponse};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Answers as a front end collects them: one JSON string per field, or an
/// array of strings for multi-select questions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitArgs {
    pub survey_id: SurveyId,
    #[serde(default)]
    pub answers: BTreeMap<QuestionId, Value>,
}

/// Fetches a survey for the anonymous respond page with an empty form.
pub async fn open_form(
    repo: &SurveyRepository,
    survey_id: SurveyId,
) -> Result<(Survey, FormState), ApiError> {
    let survey = repo.get_survey(survey_id).await?;
    debug!(survey_id, questions = survey.questions.len(), "response form opened");
    Ok((survey, FormState::new()))
}

/// Encodes every answer and submits. Encoding problems are reported per
/// question and never reach the network.
pub async fn submit_form(
    repo: &SurveyRepository,
    survey: &Survey,
    form: &FormState,
) -> Result<SurveyResponse, SubmitError> {
    let submission = encode_form(survey, form)?;
    let stored = repo.submit_response(survey.id, &submission).await?;
    info!(survey_id = survey.id, answers = submission.responses.len(), "response submitted");
    Ok(stored)
}

/// Submits answers given as JSON values keyed by question id.
pub async fn submit_answers(
    repo: &SurveyRepository,
    args: SubmitArgs,
) -> Result<SurveyResponse, SubmitError> {
    let survey = repo.get_survey(args.survey_id).await?;
    let submission = encode_wire(&survey, &args.answers)?;
    let stored = repo.submit_response(survey.id, &submission).await?;
    info!(survey_id = survey.id, answers = submission.responses.len(), "response submitted");
    Ok(stored)
}
