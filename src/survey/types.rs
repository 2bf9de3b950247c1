use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::error::ValidationError;
use crate::util::text::is_valid_email;

use super::registry::QuestionType;

pub type SurveyId = i64;
pub type QuestionId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub survey_id: SurveyId,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(
        default,
        deserialize_with = "options_lenient",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<String>,
}

impl Question {
    /// Values a respondent may pick, including the implicit pair for yes/no questions.
    pub fn choices(&self) -> Vec<&str> {
        match self.question_type.implicit_options() {
            Some(implicit) => implicit.to_vec(),
            None if self.question_type.requires_options() => {
                self.options.iter().map(String::as_str).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: UserId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl Survey {
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Answer value as sent to the backend. The variant is chosen by the codec
/// from the question type, never from the raw value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Choice(String),
    Rating(i64),
    Boolean(bool),
    Selections(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSubmission {
    pub responses: BTreeMap<QuestionId, Answer>,
}

/// A stored response as echoed back by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: i64,
    pub survey_id: SurveyId,
    #[serde(default)]
    pub respondent_id: Option<UserId>,
    pub responses: BTreeMap<QuestionId, Value>,
    #[serde(with = "timestamp")]
    pub submitted_at: DateTime<Utc>,
}

impl SurveyResponse {
    pub fn answer(&self, question_id: QuestionId) -> Option<&Value> {
        self.responses.get(&question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurveyDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<QuestionDraft>,
}

impl SurveyDraft {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors: Vec<ValidationError> = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(ValidationError::new("title", "Title is required"));
        }
        if self.questions.is_empty() {
            errors.push(ValidationError::new(
                "questions",
                "A survey needs at least one question",
            ));
        }
        for (index, q) in self.questions.iter().enumerate() {
            if q.question_text.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("questions.{index}.question_text"),
                    "Question text is required",
                ));
            }
            if !q.question_type.requires_options() {
                continue;
            }
            let field = format!("questions.{index}.options");
            if q.options.is_empty() {
                errors.push(ValidationError::new(
                    field.clone(),
                    format!("{} questions need at least one option", q.question_type.label()),
                ));
            }
            if q.options.iter().any(|o| o.trim().is_empty()) {
                errors.push(ValidationError::new(field.clone(), "Options cannot be blank"));
            }
            let mut seen: HashSet<&str> = HashSet::new();
            if let Some(dup) = q.options.iter().find(|o| !seen.insert(o.as_str())) {
                errors.push(ValidationError::new(field, format!("Duplicate option '{dup}'")));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validated copy ready to send; options are dropped for kinds that take none.
    pub fn into_payload(mut self) -> Result<SurveyDraft, Vec<ValidationError>> {
        self.validate()?;
        for q in &mut self.questions {
            if !q.question_type.requires_options() {
                q.options.clear();
            }
        }
        Ok(self)
    }
}

/// Splits the one-option-per-line text the authoring form collects.
pub fn options_from_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    View,
    Analyze,
}

impl SharePermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Analyze => "analyze",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRequest {
    pub email: String,
    pub permission_type: SharePermission,
}

impl ShareRequest {
    pub fn new(email: impl Into<String>, permission_type: SharePermission) -> Self {
        Self {
            email: email.into().trim().to_string(),
            permission_type,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_valid_email(&self.email) {
            Ok(())
        } else {
            Err(ValidationError::new("email", "Enter a valid email address"))
        }
    }
}

// Older backend revisions persisted options as a JSON-encoded string or a
// newline separated blob instead of an array.
fn options_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(serde::de::Error::custom(format!(
                    "option must be a string, got {other}"
                ))),
            })
            .collect(),
        Some(Value::String(s)) => {
            if let Ok(parsed) = serde_json::from_str::<Vec<String>>(&s) {
                Ok(parsed)
            } else {
                Ok(options_from_lines(&s))
            }
        }
        Some(other) => Err(serde::de::Error::custom(format!(
            "options must be a list, got {other}"
        ))),
    }
}

pub(crate) mod timestamp {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    /// Accepts RFC 3339 or the naive ISO form the backend emits, read as UTC.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> SurveyDraft {
        SurveyDraft {
            title: "Team pulse".to_string(),
            description: Some("Quarterly check-in".to_string()),
            questions: vec![
                QuestionDraft {
                    question_text: "Favourite colour?".to_string(),
                    question_type: QuestionType::MultipleChoice,
                    options: vec!["Red".to_string(), "Blue".to_string()],
                },
                QuestionDraft {
                    question_text: "Anything else?".to_string(),
                    question_type: QuestionType::Text,
                    options: vec!["stale".to_string()],
                },
            ],
        }
    }

    #[test]
    fn survey_parses_backend_payload_with_naive_timestamp() {
        let raw = r#"{
          "id": 7, "title": "T", "description": null, "created_by": 1,
          "created_at": "2024-05-01T10:20:30.123456",
          "questions": [
            {"id": 1, "survey_id": 7, "question_text": "Colour?", "question_type": "multiple_choice", "options": ["Red","Blue"]},
            {"id": 2, "survey_id": 7, "question_text": "Why?", "question_type": "TEXT", "options": null},
            {"id": 3, "survey_id": 7, "question_text": "Pick", "question_type": "DROPDOWN", "options": "[\"a\",\"b\"]"}
          ]
        }"#;
        let survey: Survey = serde_json::from_str(raw).expect("parse survey");
        assert_eq!(survey.questions.len(), 3);
        assert_eq!(survey.questions[0].question_type, QuestionType::MultipleChoice);
        assert!(survey.questions[1].options.is_empty());
        assert_eq!(survey.questions[2].options, vec!["a", "b"]);
        assert_eq!(survey.created_at.to_rfc3339(), "2024-05-01T10:20:30.123456+00:00");
        assert_eq!(survey.question(2).map(|q| q.question_text.as_str()), Some("Why?"));
        assert!(survey.question(99).is_none());
    }

    #[test]
    fn unknown_question_type_rejects_the_survey() {
        let raw = r#"{"id": 1, "title": "T", "created_by": 1, "created_at": "2024-05-01T10:20:30Z",
          "questions": [{"id": 1, "survey_id": 1, "question_text": "?", "question_type": "matrix"}]}"#;
        let err = serde_json::from_str::<Survey>(raw).expect_err("unknown type");
        assert!(err.to_string().contains("unknown question type 'matrix'"));
    }

    #[test]
    fn boolean_questions_expose_canonical_choices() {
        let q = Question {
            id: 1,
            survey_id: 1,
            question_text: "Agree?".to_string(),
            question_type: QuestionType::Boolean,
            options: vec![],
        };
        assert_eq!(q.choices(), vec!["true", "false"]);
    }

    #[test]
    fn valid_draft_drops_options_for_text_questions() {
        let payload = draft().into_payload().expect("valid");
        assert_eq!(payload.questions[0].options.len(), 2);
        assert!(payload.questions[1].options.is_empty());
        let json = serde_json::to_value(&payload).expect("json");
        assert!(json["questions"][1].get("options").is_none());
        assert_eq!(json["questions"][0]["question_type"], "MULTIPLE_CHOICE");
    }

    #[test]
    fn draft_validation_reports_each_field() {
        let mut d = draft();
        d.title = "  ".to_string();
        d.questions[0].options = vec!["Red".to_string(), "Red".to_string(), " ".to_string()];
        d.questions[1].question_text = String::new();
        d.questions.push(QuestionDraft {
            question_text: "Pick one".to_string(),
            question_type: QuestionType::Dropdown,
            options: vec![],
        });
        let errors = d.validate().expect_err("invalid");
        let fields = errors.iter().map(|e| e.field.as_str()).collect::<Vec<&str>>();
        assert_eq!(
            fields,
            vec![
                "title",
                "questions.0.options",
                "questions.0.options",
                "questions.1.question_text",
                "questions.2.options",
            ]
        );
        assert!(errors[2].message.contains("Duplicate option 'Red'"));
    }

    #[test]
    fn empty_draft_needs_a_question() {
        let d = SurveyDraft {
            title: "T".to_string(),
            ..Default::default()
        };
        let errors = d.validate().expect_err("no questions");
        assert_eq!(errors[0].field, "questions");
    }

    #[test]
    fn options_from_lines_skips_blanks() {
        assert_eq!(options_from_lines("Red\n\n  Blue \n"), vec!["Red", "Blue"]);
    }

    #[test]
    fn share_request_validates_email() {
        let ok = ShareRequest::new(" ana@example.com ", SharePermission::Analyze);
        assert!(ok.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&ok).expect("json"),
            serde_json::json!({"email": "ana@example.com", "permission_type": "analyze"})
        );
        let bad = ShareRequest::new("ana", SharePermission::View);
        assert_eq!(bad.validate().expect_err("bad").field, "email");
    }
}
