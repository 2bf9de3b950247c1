use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::analytics::feedback::FeedbackAnalysis;
use crate::analytics::types::SurveyAnalytics;
use crate::error::{ApiError, ValidationError};
use crate::survey::types::{
    ResponseSubmission, ShareRequest, Survey, SurveyDraft, SurveyId, SurveyResponse,
};

use super::http::ApiClient;
use super::types::{ExportedFile, MessageReceipt};

/// One method per backend survey endpoint. Every call issues exactly one
/// request; nothing is retried or cached here.
#[derive(Clone, Debug)]
pub struct SurveyRepository {
    api: ApiClient,
}

impl SurveyRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Validates the draft locally before anything is sent.
    pub async fn create_survey(&self, draft: SurveyDraft) -> Result<Survey, ApiError> {
        let payload = draft.into_payload().map_err(ApiError::Validation)?;
        let survey: Survey = self.api.post_json("/surveys/create", &payload).await?;
        info!(survey_id = survey.id, "survey created");
        Ok(survey)
    }

    pub async fn list_surveys(&self) -> Result<Vec<Survey>, ApiError> {
        self.api.get_json("/surveys/list").await
    }

    pub async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, ApiError> {
        self.api.get_json(&format!("/surveys/{survey_id}")).await
    }

    pub async fn delete_survey(&self, survey_id: SurveyId) -> Result<(), ApiError> {
        self.api.delete(&format!("/surveys/{survey_id}")).await?;
        info!(survey_id, "survey deleted");
        Ok(())
    }

    /// Returns the response as the backend stored it.
    pub async fn submit_response(
        &self,
        survey_id: SurveyId,
        submission: &ResponseSubmission,
    ) -> Result<SurveyResponse, ApiError> {
        let stored: SurveyResponse = self
            .api
            .post_json(&format!("/surveys/{survey_id}/respond"), submission)
            .await?;
        debug!(survey_id, response_id = stored.id, "response stored");
        Ok(stored)
    }

    pub async fn get_analytics(&self, survey_id: SurveyId) -> Result<SurveyAnalytics, ApiError> {
        self.api
            .get_json(&format!("/surveys/analytics/{survey_id}"))
            .await
    }

    pub async fn share_survey(
        &self,
        survey_id: SurveyId,
        request: &ShareRequest,
    ) -> Result<MessageReceipt, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::Validation(vec![e]))?;
        self.api
            .post_json(&format!("/surveys/{survey_id}/share"), request)
            .await
    }

    /// Uploads a CSV of free-text feedback and returns the themes and
    /// question suggestions extracted from it.
    pub async fn analyze_feedback(&self, path: &Path) -> Result<FeedbackAnalysis, ApiError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ApiError::Validation(vec![ValidationError::new(
                "file",
                "Only CSV files are supported",
            )]));
        }
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("feedback.csv")
            .to_string();
        let bytes = fs::read(path).await?;
        let size = bytes.len();
        let part = Part::bytes(bytes).file_name(file_name).mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let request = self
            .api
            .request(Method::POST, "/surveys/analyze")
            .multipart(form);
        let analysis: FeedbackAnalysis = self.api.json(request).await?;
        info!(
            bytes = size,
            themes = analysis.themes.len(),
            suggestions = analysis.suggested_questions.len(),
            "feedback analyzed"
        );
        Ok(analysis)
    }

    /// Streams the CSV export into `dir`. The body lands in a `.part` file
    /// first and is renamed only once fully written; a failed download
    /// leaves nothing behind.
    pub async fn export_csv(&self, survey_id: SurveyId, dir: &Path) -> Result<ExportedFile, ApiError> {
        fs::create_dir_all(dir).await?;
        let file_name = format!("survey-{survey_id}.csv");
        let final_path = dir.join(&file_name);
        let part_path = dir.join(format!("{file_name}.part"));

        let request = self
            .api
            .request(Method::GET, &format!("/surveys/{survey_id}/export"));
        let response = self.api.send(request).await?;

        let (sha256, bytes_total) = match stream_to_file(response, &part_path).await {
            Ok(written) => written,
            Err(e) => {
                warn!(survey_id, "export interrupted: {e}");
                let _ = fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        fs::rename(&part_path, &final_path).await?;
        debug!(survey_id, bytes = bytes_total, %sha256, "export written");
        Ok(ExportedFile {
            path: final_path,
            sha256,
            bytes: bytes_total,
        })
    }
}

async fn stream_to_file(mut response: Response, path: &Path) -> Result<(String, u64), ApiError> {
    let mut file = fs::File::create(path).await?;
    let mut hasher = Sha256::new();
    let mut bytes_total: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        bytes_total += chunk.len() as u64;
    }
    file.flush().await?;
    Ok((hex::encode(hasher.finalize()), bytes_total))
}
