use serde_json::Value;
use thiserror::Error;

/// A problem with one form field, addressed by a dotted path such as
/// `questions.2.options`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Auth,

    #[error("network error: {0}")]
    Network(String),

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("not found")]
    NotFound,

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Maps an unsuccessful HTTP status and its body to the error taxonomy.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        match status {
            401 => Self::Auth,
            404 => Self::NotFound,
            422 => {
                let errors = parsed
                    .as_ref()
                    .map(validation_errors_from_detail)
                    .unwrap_or_default();
                if errors.is_empty() {
                    Self::Validation(vec![ValidationError::new("request", "Validation error")])
                } else {
                    Self::Validation(errors)
                }
            }
            s if s >= 500 => Self::Server { status: s },
            s => Self::Rejected {
                status: s,
                detail: parsed
                    .as_ref()
                    .and_then(detail_message)
                    .unwrap_or_else(|| body.trim().to_string()),
            },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }

    /// Short notice suitable for showing to the person using the app.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth => "Your session has expired. Please sign in again.".to_string(),
            Self::Network(_) => "Unable to reach the server. Check your connection.".to_string(),
            Self::Server { .. } => "Internal server error. Please try again later.".to_string(),
            Self::NotFound => "That item no longer exists.".to_string(),
            Self::Validation(errors) => join_errors(errors),
            Self::Rejected { detail, .. } => detail.clone(),
            Self::Decode(_) => "Unexpected response from the server.".to_string(),
            Self::Io(e) => format!("Unable to save file: {e}"),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("; ")
}

/// Reads FastAPI style `{"detail": [{"loc": [...], "msg": "..."}]}` bodies.
pub fn validation_errors_from_detail(body: &Value) -> Vec<ValidationError> {
    match body.get("detail") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let msg = item.get("msg").and_then(Value::as_str)?;
                let field = item
                    .get("loc")
                    .and_then(Value::as_array)
                    .map(|loc| {
                        loc.iter()
                            .map(|part| match part {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<String>>()
                            .join(".")
                    })
                    .unwrap_or_else(|| "request".to_string());
                Some(ValidationError::new(field, msg))
            })
            .collect(),
        Some(Value::String(detail)) => vec![ValidationError::new("request", detail.clone())],
        _ => Vec::new(),
    }
}

fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
