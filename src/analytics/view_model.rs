use serde::Serialize;

use crate::survey::registry::AnswerShape;
use crate::survey::types::{Question, Survey};
use crate::util::text::clean_label;

use super::types::{QuestionAggregate, SurveyAnalytics};

/// Up to this many slices a distribution reads better as a pie than as bars.
const PIE_MAX_ENTRIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionEntry {
    pub label: String,
    pub count: u64,
    /// Share of all survey responses, 0-100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuestionViewKind {
    Distribution {
        entries: Vec<DistributionEntry>,
        chart: ChartKind,
    },
    Scalar {
        value: f64,
        display: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub question_id: String,
    pub title: String,
    #[serde(flatten)]
    pub kind: QuestionViewKind,
}

impl QuestionView {
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            QuestionViewKind::Distribution { entries, .. } => entries.is_empty(),
            QuestionViewKind::Scalar { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsView {
    pub total_responses: u64,
    /// True when nothing has been collected yet; render an empty state.
    pub empty: bool,
    pub questions: Vec<QuestionView>,
}

pub fn percentage(count: u64, total_responses: u64) -> f64 {
    if total_responses == 0 {
        return 0.0;
    }
    count as f64 / total_responses as f64 * 100.0
}

pub fn format_average(value: f64) -> String {
    format!("{value:.1}")
}

/// Reshapes one question's aggregate. An average makes it a scalar; otherwise
/// every distribution key becomes an entry, in the order the server sent them.
pub fn build(
    question_id: &str,
    question: Option<&Question>,
    aggregate: &QuestionAggregate,
    total_responses: u64,
) -> QuestionView {
    let title = question
        .map(|q| q.question_text.as_str())
        .or(aggregate.question_text.as_deref())
        .map(clean_label)
        .unwrap_or_else(|| format!("Question {question_id}"));
    let no_responses = total_responses == 0 || aggregate.responses == Some(0);
    let rated = question.map_or(false, |q| {
        matches!(q.question_type.shape(), AnswerShape::ScalarBoundedInt { .. })
    });
    // Rating questions stay scalar even before anyone has answered.
    let average = match aggregate.average_rating {
        None if rated && no_responses => Some(0.0),
        other => other,
    };

    let kind = match average {
        Some(avg) => {
            let value = if no_responses || !avg.is_finite() { 0.0 } else { avg };
            QuestionViewKind::Scalar {
                value,
                display: format_average(value),
            }
        }
        None => {
            let entries = if no_responses {
                Vec::new()
            } else {
                aggregate
                    .response_distribution
                    .iter()
                    .map(|(label, count)| DistributionEntry {
                        label: label.clone(),
                        count: *count,
                        percentage: percentage(*count, total_responses),
                    })
                    .collect::<Vec<DistributionEntry>>()
            };
            let chart = if entries.len() <= PIE_MAX_ENTRIES {
                ChartKind::Pie
            } else {
                ChartKind::Bar
            };
            QuestionViewKind::Distribution { entries, chart }
        }
    };

    QuestionView {
        question_id: question_id.to_string(),
        title,
        kind,
    }
}

/// Builds the whole analytics screen. Question titles come from the survey
/// when it is at hand, falling back to the text carried in the aggregate.
pub fn build_survey_view(survey: Option<&Survey>, analytics: &SurveyAnalytics) -> AnalyticsView {
    let questions = analytics
        .question_analytics
        .iter()
        .map(|(id, aggregate)| {
            let question = survey.and_then(|s| id.parse::<i64>().ok().and_then(|qid| s.question(qid)));
            build(id, question, aggregate, analytics.total_responses)
        })
        .collect::<Vec<QuestionView>>();
    AnalyticsView {
        total_responses: analytics.total_responses,
        empty: analytics.total_responses == 0,
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::types::Distribution;
    use crate::survey::registry::QuestionType;

    fn distribution(pairs: &[(&str, u64)]) -> QuestionAggregate {
        QuestionAggregate {
            response_distribution: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<Distribution>(),
            ..Default::default()
        }
    }

    #[test]
    fn distribution_keeps_source_order() {
        let view = build("1", None, &distribution(&[("Red", 3), ("Blue", 1)]), 4);
        match view.kind {
            QuestionViewKind::Distribution { entries, chart } => {
                let pairs = entries
                    .iter()
                    .map(|e| (e.label.as_str(), e.count))
                    .collect::<Vec<(&str, u64)>>();
                assert_eq!(pairs, vec![("Red", 3), ("Blue", 1)]);
                assert_eq!(entries[0].percentage, 75.0);
                assert_eq!(entries[1].percentage, 25.0);
                assert_eq!(chart, ChartKind::Pie);
            }
            other => panic!("expected distribution, got {other:?}"),
        }
        assert_eq!(view.title, "Question 1");
    }

    #[test]
    fn average_becomes_scalar() {
        let aggregate = QuestionAggregate {
            average_rating: Some(4.0),
            ..Default::default()
        };
        let view = build("1", None, &aggregate, 1);
        assert_eq!(
            view.kind,
            QuestionViewKind::Scalar {
                value: 4.0,
                display: "4.0".to_string()
            }
        );
    }

    #[test]
    fn zero_responses_render_empty_state_without_dividing() {
        assert_eq!(percentage(3, 0), 0.0);
        let view = build("1", None, &distribution(&[("Red", 3)]), 0);
        assert!(view.is_empty());

        let scalar = QuestionAggregate {
            average_rating: Some(f64::NAN),
            responses: Some(0),
            ..Default::default()
        };
        match build("2", None, &scalar, 0).kind {
            QuestionViewKind::Scalar { value, display } => {
                assert_eq!(value, 0.0);
                assert_eq!(display, "0.0");
            }
            other => panic!("expected scalar, got {other:?}"),
        }

        let survey_view = build_survey_view(None, &SurveyAnalytics::default());
        assert!(survey_view.empty);
        assert!(survey_view.questions.is_empty());
    }

    #[test]
    fn unanswered_rating_question_is_a_zero_scalar() {
        let question = Question {
            id: 1,
            survey_id: 1,
            question_text: "Rate us".to_string(),
            question_type: QuestionType::Rating,
            options: vec![],
        };
        let aggregate: QuestionAggregate =
            serde_json::from_str(r#"{"responses": 0, "average_rating": null}"#).expect("parse");
        let view = build("1", Some(&question), &aggregate, 0);
        assert_eq!(
            view.kind,
            QuestionViewKind::Scalar {
                value: 0.0,
                display: "0.0".to_string()
            }
        );

        // Without the question at hand there is nothing to say it is a rating.
        assert!(build("1", None, &aggregate, 0).is_empty());
    }

    #[test]
    fn many_options_switch_to_bar_chart() {
        let pairs = [("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1), ("f", 1)];
        match build("1", None, &distribution(&pairs), 6).kind {
            QuestionViewKind::Distribution { chart, .. } => assert_eq!(chart, ChartKind::Bar),
            other => panic!("expected distribution, got {other:?}"),
        }
    }

    #[test]
    fn title_prefers_survey_question_text() {
        let question = Question {
            id: 3,
            survey_id: 1,
            question_text: "How   was\nit?".to_string(),
            question_type: QuestionType::Rating,
            options: vec![],
        };
        let aggregate = QuestionAggregate {
            question_text: Some("stale".to_string()),
            average_rating: Some(3.26),
            ..Default::default()
        };
        let view = build("3", Some(&question), &aggregate, 4);
        assert_eq!(view.title, "How was it?");
        let json = serde_json::to_value(&view).expect("json");
        assert_eq!(json["kind"], "scalar");
        assert_eq!(json["display"], "3.3");
    }
}
