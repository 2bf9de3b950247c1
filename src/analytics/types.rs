use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Counts per option label, in the order the server listed them. Analytics
/// maps are rendered in source order, so they never pass through a sorted map.
pub type Distribution = IndexMap<String, u64>;

/// Server-computed summary for a single question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionAggregate {
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub responses: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub response_distribution: Distribution,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

/// Analytics payload for one survey, keyed by question id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurveyAnalytics {
    pub total_responses: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question_analytics: IndexMap<String, QuestionAggregate>,
}

fn null_as_empty<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let map = Option::<IndexMap<String, V>>::deserialize(deserializer)?;
    Ok(map.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_source_order_for_unsorted_keys() {
        let raw = r#"{"total_responses": 4, "question_analytics": {
            "9": {"response_distribution": {"Red": 3, "Blue": 1, "Amber": 0}},
            "2": {"average_rating": 4.0, "responses": 4}
        }}"#;
        let analytics: SurveyAnalytics = serde_json::from_str(raw).expect("parse");
        let ids = analytics
            .question_analytics
            .keys()
            .map(String::as_str)
            .collect::<Vec<&str>>();
        assert_eq!(ids, vec!["9", "2"]);
        let dist = &analytics.question_analytics["9"].response_distribution;
        let labels = dist
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect::<Vec<(&str, u64)>>();
        assert_eq!(labels, vec![("Red", 3), ("Blue", 1), ("Amber", 0)]);
    }

    #[test]
    fn missing_and_null_maps_are_empty() {
        let raw = r#"{"total_responses": 0, "question_analytics": null}"#;
        let analytics: SurveyAnalytics = serde_json::from_str(raw).expect("parse");
        assert!(analytics.question_analytics.is_empty());
        let bare: SurveyAnalytics = serde_json::from_str(r#"{"total_responses": 0}"#).expect("parse");
        assert!(bare.question_analytics.is_empty());
        let aggregate: QuestionAggregate =
            serde_json::from_str(r#"{"response_distribution": null}"#).expect("parse");
        assert!(aggregate.response_distribution.is_empty());
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut dist = Distribution::new();
        dist.insert("z".to_string(), 1);
        dist.insert("a".to_string(), 2);
        assert_eq!(serde_json::to_string(&dist).expect("json"), r#"{"z":1,"a":2}"#);
    }
}
