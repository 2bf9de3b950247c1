use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::util::text::{closest_match, normalize_token};

pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;
pub const BOOLEAN_TRUE: &str = "true";
pub const BOOLEAN_FALSE: &str = "false";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown question type '{tag}'{}", suggestion_suffix(.suggestion))]
pub struct UnknownQuestionType {
    pub tag: String,
    pub suggestion: Option<String>,
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

/// The closed set of question kinds a survey can contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuestionType {
    #[default]
    Text,
    MultipleChoice,
    Rating,
    Boolean,
    Dropdown,
}

/// Shape an answer must take for a given question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    ScalarString,
    ScalarBoundedInt { min: i64, max: i64 },
    ScalarBoolean,
    SetOfString,
}

impl AnswerShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScalarString => "a single value",
            Self::ScalarBoundedInt { .. } => "a whole number",
            Self::ScalarBoolean => "yes or no",
            Self::SetOfString => "a list of selections",
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::SetOfString)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionDescriptor {
    pub requires_options: bool,
    pub shape: AnswerShape,
    pub label: &'static str,
}

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        Self::Text,
        Self::MultipleChoice,
        Self::Rating,
        Self::Boolean,
        Self::Dropdown,
    ];

    pub fn descriptor(&self) -> QuestionDescriptor {
        match self {
            Self::Text => QuestionDescriptor {
                requires_options: false,
                shape: AnswerShape::ScalarString,
                label: "Text Answer",
            },
            Self::MultipleChoice => QuestionDescriptor {
                requires_options: true,
                shape: AnswerShape::SetOfString,
                label: "Multiple Choice",
            },
            Self::Rating => QuestionDescriptor {
                requires_options: false,
                shape: AnswerShape::ScalarBoundedInt {
                    min: RATING_MIN,
                    max: RATING_MAX,
                },
                label: "Rating (1-5)",
            },
            Self::Boolean => QuestionDescriptor {
                requires_options: false,
                shape: AnswerShape::ScalarBoolean,
                label: "Yes/No",
            },
            Self::Dropdown => QuestionDescriptor {
                requires_options: true,
                shape: AnswerShape::ScalarString,
                label: "Dropdown",
            },
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::MultipleChoice => "MULTIPLE_CHOICE",
            Self::Rating => "RATING",
            Self::Boolean => "BOOLEAN",
            Self::Dropdown => "DROPDOWN",
        }
    }

    /// Parses a wire tag. Matching is case-insensitive so legacy lowercase
    /// tags (`multiple_choice`, `text`, `rating`) resolve to the same kind.
    pub fn from_tag(tag: &str) -> Result<Self, UnknownQuestionType> {
        let normalized = normalize_token(tag);
        Self::ALL
            .into_iter()
            .find(|t| t.as_tag().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownQuestionType {
                tag: tag.to_string(),
                suggestion: closest_match(tag, Self::ALL.iter().map(|t| t.as_tag())),
            })
    }

    pub fn requires_options(&self) -> bool {
        self.descriptor().requires_options
    }

    pub fn shape(&self) -> AnswerShape {
        self.descriptor().shape
    }

    pub fn label(&self) -> &'static str {
        self.descriptor().label
    }

    /// Options a respondent picks from, when the kind has a fixed set of its own.
    pub fn implicit_options(&self) -> Option<[&'static str; 2]> {
        match self {
            Self::Boolean => Some([BOOLEAN_TRUE, BOOLEAN_FALSE]),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for QuestionType {
    type Err = UnknownQuestionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl Serialize for QuestionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for QuestionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_tag(&raw).map_err(serde::de::Error::custom)
    }
}
