//! Conversion between what a respondent typed or picked and the typed
//! [`Answer`] the backend stores.
//!
//! Every question is required at submit time. Multi-choice selections are
//! de-duplicated silently, keeping the order in which options were first
//! picked.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::util::text::closest_match;

use super::registry::{QuestionType, BOOLEAN_FALSE, BOOLEAN_TRUE, RATING_MAX, RATING_MIN};
use super::types::{Answer, Question, QuestionId, ResponseSubmission, Survey};

/// Value held by a form control before it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFormValue {
    Single(String),
    Many(Vec<String>),
}

impl RawFormValue {
    pub fn single(value: impl Into<String>) -> Self {
        Self::Single(value.into())
    }

    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("This question requires an answer")]
    Required,

    #[error("{value} is outside the allowed range {min}-{max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("'{raw}' is not a number")]
    NotANumber { raw: String },

    #[error("'{value}' is not one of the available options{}", suggestion_suffix(.suggestion))]
    InvalidOption {
        value: String,
        suggestion: Option<String>,
    },

    #[error("Expected {expected}")]
    ShapeMismatch { expected: &'static str },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

fn invalid_option<'a, I>(value: &str, allowed: I) -> EncodeError
where
    I: IntoIterator<Item = &'a str>,
{
    EncodeError::InvalidOption {
        value: value.to_string(),
        suggestion: closest_match(value, allowed),
    }
}

pub fn encode(question: &Question, raw: &RawFormValue) -> Result<Answer, EncodeError> {
    match question.question_type {
        QuestionType::Text => {
            let value = single(question, raw)?;
            if value.trim().is_empty() {
                return Err(EncodeError::Required);
            }
            Ok(Answer::Text(value.to_string()))
        }
        QuestionType::Rating => encode_bounded(single(question, raw)?, RATING_MIN, RATING_MAX),
        QuestionType::Boolean => match single(question, raw)? {
            blank if blank.trim().is_empty() => Err(EncodeError::Required),
            BOOLEAN_TRUE => Ok(Answer::Boolean(true)),
            BOOLEAN_FALSE => Ok(Answer::Boolean(false)),
            other => Err(invalid_option(other, [BOOLEAN_TRUE, BOOLEAN_FALSE])),
        },
        QuestionType::Dropdown => {
            let value = single(question, raw)?;
            if value.trim().is_empty() {
                return Err(EncodeError::Required);
            }
            if !question.has_option(value) {
                return Err(invalid_option(value, question.choices()));
            }
            Ok(Answer::Choice(value.to_string()))
        }
        QuestionType::MultipleChoice => {
            let values = many(question, raw)?;
            if values.is_empty() {
                return Err(EncodeError::Required);
            }
            let mut seen: HashSet<&str> = HashSet::new();
            let mut selections: Vec<String> = Vec::new();
            for value in values {
                if !question.has_option(value) {
                    return Err(invalid_option(value, question.choices()));
                }
                if seen.insert(value.as_str()) {
                    selections.push(value.clone());
                }
            }
            Ok(Answer::Selections(selections))
        }
    }
}

fn single<'a>(question: &Question, raw: &'a RawFormValue) -> Result<&'a str, EncodeError> {
    match raw {
        RawFormValue::Single(value) => Ok(value.as_str()),
        RawFormValue::Many(_) => Err(EncodeError::ShapeMismatch {
            expected: question.question_type.shape().as_str(),
        }),
    }
}

fn many<'a>(question: &Question, raw: &'a RawFormValue) -> Result<&'a [String], EncodeError> {
    match raw {
        RawFormValue::Many(values) => Ok(values.as_slice()),
        RawFormValue::Single(_) => Err(EncodeError::ShapeMismatch {
            expected: question.question_type.shape().as_str(),
        }),
    }
}

fn encode_bounded(raw: &str, min: i64, max: i64) -> Result<Answer, EncodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EncodeError::Required);
    }
    let value = trimmed.parse::<i64>().map_err(|_| EncodeError::NotANumber {
        raw: raw.to_string(),
    })?;
    if value < min || value > max {
        return Err(EncodeError::OutOfRange { value, min, max });
    }
    Ok(Answer::Rating(value))
}

/// Inverse of [`encode`] for pre-filling a form from a stored answer.
pub fn decode(question: &Question, answer: &Answer) -> RawFormValue {
    let scalar = match answer {
        Answer::Text(s) | Answer::Choice(s) => s.clone(),
        Answer::Rating(n) => n.to_string(),
        Answer::Boolean(true) => BOOLEAN_TRUE.to_string(),
        Answer::Boolean(false) => BOOLEAN_FALSE.to_string(),
        Answer::Selections(values) => {
            if question.question_type.shape().is_set() {
                return RawFormValue::Many(values.clone());
            }
            values.first().cloned().unwrap_or_default()
        }
    };
    if question.question_type.shape().is_set() {
        RawFormValue::Many(vec![scalar])
    } else {
        RawFormValue::Single(scalar)
    }
}

/// Human-readable rendering of an answer, e.g. for a response summary.
pub fn display_text(question: &Question, answer: &Answer) -> String {
    match (question.question_type, answer) {
        (QuestionType::Boolean, Answer::Boolean(true)) => "Yes".to_string(),
        (QuestionType::Boolean, Answer::Boolean(false)) => "No".to_string(),
        (QuestionType::Rating, Answer::Rating(n)) => format!("{n} / {RATING_MAX}"),
        (_, Answer::Selections(values)) => values.join(", "),
        (_, Answer::Text(s)) | (_, Answer::Choice(s)) => s.clone(),
        (_, Answer::Rating(n)) => n.to_string(),
        (_, Answer::Boolean(b)) => b.to_string(),
    }
}

/// Reads a stored JSON answer back into form shape so it can be re-encoded.
pub fn raw_from_wire(value: &Value) -> Option<RawFormValue> {
    match value {
        Value::String(s) => Some(RawFormValue::Single(s.clone())),
        Value::Number(n) => Some(RawFormValue::Single(n.to_string())),
        Value::Bool(b) => Some(RawFormValue::Single(b.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
            .map(RawFormValue::Many),
        _ => None,
    }
}

/// In-progress answers for one survey, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    values: BTreeMap<QuestionId, RawFormValue>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fills the form from previously encoded answers.
    pub fn from_answers(survey: &Survey, answers: &BTreeMap<QuestionId, Answer>) -> Self {
        let mut state = Self::new();
        for (id, answer) in answers {
            if let Some(question) = survey.question(*id) {
                state.values.insert(*id, decode(question, answer));
            }
        }
        state
    }

    pub fn set(&mut self, question_id: QuestionId, value: RawFormValue) {
        self.values.insert(question_id, value);
    }

    pub fn set_text(&mut self, question_id: QuestionId, value: impl Into<String>) {
        self.set(question_id, RawFormValue::Single(value.into()));
    }

    /// Checks or unchecks one option of a multi-choice control.
    pub fn toggle(&mut self, question_id: QuestionId, option: &str, checked: bool) {
        let entry = self
            .values
            .entry(question_id)
            .or_insert_with(|| RawFormValue::Many(Vec::new()));
        if matches!(entry, RawFormValue::Single(_)) {
            *entry = RawFormValue::Many(Vec::new());
        }
        if let RawFormValue::Many(selected) = entry {
            let present = selected.iter().any(|s| s == option);
            if checked && !present {
                selected.push(option.to_string());
            } else if !checked {
                selected.retain(|s| s != option);
            }
        }
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&RawFormValue> {
        self.values.get(&question_id)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Per-question problems that block a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub errors: BTreeMap<QuestionId, EncodeError>,
    pub unknown_questions: Vec<QuestionId>,
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len() + self.unknown_questions.len();
        write!(f, "{count} question(s) need attention")
    }
}

impl std::error::Error for FormErrors {}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.unknown_questions.is_empty()
    }

    pub fn for_question(&self, question_id: QuestionId) -> Option<&EncodeError> {
        self.errors.get(&question_id)
    }
}

/// Encodes a whole form against its survey. Unanswered questions are
/// reported as required; answers for questions the survey does not contain
/// are rejected.
pub fn encode_form(survey: &Survey, form: &FormState) -> Result<ResponseSubmission, FormErrors> {
    let mut failures = FormErrors::default();
    let mut responses: BTreeMap<QuestionId, Answer> = BTreeMap::new();

    for question in &survey.questions {
        let outcome = match form.get(question.id) {
            Some(raw) => encode(question, raw),
            None => Err(EncodeError::Required),
        };
        match outcome {
            Ok(answer) => {
                responses.insert(question.id, answer);
            }
            Err(err) => {
                failures.errors.insert(question.id, err);
            }
        }
    }
    failures.unknown_questions = form
        .values
        .keys()
        .filter(|id| survey.question(**id).is_none())
        .copied()
        .collect();

    if failures.is_empty() {
        Ok(ResponseSubmission { responses })
    } else {
        Err(failures)
    }
}

/// Encodes answers that arrived as JSON, e.g. from a saved draft or the
/// command line. A value that cannot be read as form input is reported as a
/// shape mismatch for its question instead of being dropped.
pub fn encode_wire(
    survey: &Survey,
    answers: &BTreeMap<QuestionId, Value>,
) -> Result<ResponseSubmission, FormErrors> {
    let mut form = FormState::new();
    let mut unreadable: Vec<QuestionId> = Vec::new();
    for (id, value) in answers {
        match raw_from_wire(value) {
            Some(raw) => form.set(*id, raw),
            None => unreadable.push(*id),
        }
    }
    let mut failures = match encode_form(survey, &form) {
        Ok(submission) if unreadable.is_empty() => return Ok(submission),
        Ok(_) => FormErrors::default(),
        Err(failures) => failures,
    };
    for id in unreadable {
        match survey.question(id) {
            Some(question) => {
                failures.errors.insert(
                    id,
                    EncodeError::ShapeMismatch {
                        expected: question.question_type.shape().as_str(),
                    },
                );
            }
            None => failures.unknown_questions.push(id),
        }
    }
    failures.unknown_questions.sort_unstable();
    Err(failures)
}
