//! Themes and suggested questions the backend extracts from an uploaded
//! feedback CSV.

use serde::{Deserialize, Serialize};

use crate::survey::registry::{QuestionType, UnknownQuestionType};
use crate::survey::types::QuestionDraft;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub theme: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Share of feedback rows assigned to this theme.
    #[serde(default)]
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedQuestion {
    pub question_text: String,
    /// Raw tag as sent, usually lowercase (`rating`, `text`).
    pub question_type: String,
    #[serde(default)]
    pub theme_keywords: Vec<String>,
}

impl SuggestedQuestion {
    /// Turns the suggestion into a draft that can go straight into a new
    /// survey. Tags outside the registry are rejected.
    pub fn to_draft(&self) -> Result<QuestionDraft, UnknownQuestionType> {
        let question_type = QuestionType::from_tag(&self.question_type)?;
        Ok(QuestionDraft {
            question_text: self.question_text.trim().to_string(),
            question_type,
            options: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub suggested_questions: Vec<SuggestedQuestion>,
}

impl FeedbackAnalysis {
    /// Drafts for every suggestion with a known question type, in order.
    pub fn drafts(&self) -> Vec<QuestionDraft> {
        self.suggested_questions
            .iter()
            .filter_map(|q| q.to_draft().ok())
            .collect()
    }
}
