//! # Prediction
//!
//! The pure half of condition prediction: the request and response wire
//! shapes of the remote classifier, ranking of its answer, and the fixed
//! fallback list. The network call itself lives in the server's gateway.

use crate::primitives::{MAX_ITEMS, MAX_NAME_LENGTH};
use crate::records::{BloodPressure, ConditionItem};
use crate::CareError;
use serde::{Deserialize, Serialize};

/// Optional vital signs sent along with the symptom names.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<i64>,
}

/// Body of `POST {url}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<VitalsHint>,
}

impl PredictionRequest {
    /// Build a request, trimming names and rejecting blank or oversized ones.
    pub fn new(symptoms: Vec<String>, vitals: Option<VitalsHint>) -> Result<Self, CareError> {
        if symptoms.len() > MAX_ITEMS {
            return Err(CareError::Validation(format!(
                "At most {MAX_ITEMS} symptoms can be submitted"
            )));
        }
        let symptoms = symptoms
            .into_iter()
            .map(|name| {
                let name = name.trim().to_string();
                if name.is_empty() {
                    Err(CareError::invalid("Symptom names must not be empty"))
                } else if name.len() > MAX_NAME_LENGTH {
                    Err(CareError::Validation(format!(
                        "Symptom name exceeds {MAX_NAME_LENGTH} bytes"
                    )))
                } else {
                    Ok(name)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { symptoms, vitals })
    }
}

/// One prediction as the classifier sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamCondition {
    name: String,
    probability: f64,
    #[serde(default)]
    recommend_consultation: bool,
}

/// Body the classifier answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    predictions: Vec<UpstreamCondition>,
}

impl PredictionResponse {
    /// Validate and rank the classifier's answer.
    pub fn into_ranked(self) -> Result<Vec<ConditionItem>, CareError> {
        rank(
            self.predictions
                .into_iter()
                .map(|c| ConditionItem::new(c.name, c.probability, c.recommend_consultation))
                .collect(),
        )
    }
}

/// `Ok` when `p` is a finite number in `[0, 1]`.
pub fn check_probability(p: f64) -> Result<(), CareError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(CareError::Validation(format!(
            "Probability must be between 0 and 1, got {p}"
        )))
    }
}

/// Validate every item and sort by probability, highest first.
///
/// The sort is stable, so equal probabilities keep the classifier's order.
pub fn rank(mut items: Vec<ConditionItem>) -> Result<Vec<ConditionItem>, CareError> {
    for item in &items {
        if item.name.trim().is_empty() {
            return Err(CareError::invalid("Condition names must not be empty"));
        }
        check_probability(item.probability)?;
    }
    items.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(items)
}

/// The fixed list returned whenever the classifier cannot answer.
#[must_use]
pub fn fallback_predictions() -> Vec<ConditionItem> {
    vec![
        ConditionItem::new("Common Cold", 0.7, false),
        ConditionItem::new("Influenza", 0.5, true),
        ConditionItem::new("COVID-19", 0.3, true),
        ConditionItem::new("Allergies", 0.2, false),
        ConditionItem::new("Bronchitis", 0.1, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fallback_is_fixed() {
        let list = fallback_predictions();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0], ConditionItem::new("Common Cold", 0.7, false));
        assert_eq!(list[4], ConditionItem::new("Bronchitis", 0.1, true));
        assert_eq!(rank(list.clone()).expect("rank"), list);
    }

    #[test]
    fn rank_sorts_descending_and_stable() {
        let ranked = rank(vec![
            ConditionItem::new("A", 0.2, false),
            ConditionItem::new("B", 0.9, true),
            ConditionItem::new("C", 0.2, false),
        ])
        .expect("rank");
        let names: Vec<_> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn out_of_range_probability_rejected() {
        for p in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
            assert!(check_probability(p).is_err(), "{p}");
        }
        assert!(check_probability(0.0).is_ok());
        assert!(check_probability(1.0).is_ok());
    }

    #[test]
    fn response_parses_and_defaults_consultation() {
        let response: PredictionResponse = serde_json::from_value(json!({
            "predictions": [
                {"name": "Flu", "probability": 0.4},
                {"name": "Migraine", "probability": 0.8, "recommendConsultation": true}
            ]
        }))
        .expect("parse");
        let ranked = response.into_ranked().expect("rank");
        assert_eq!(ranked[0], ConditionItem::new("Migraine", 0.8, true));
        assert_eq!(ranked[1], ConditionItem::new("Flu", 0.4, false));
    }

    #[test]
    fn request_omits_absent_vitals() {
        let req = PredictionRequest::new(vec![" Fever ".into(), "Cough".into()], None)
            .expect("request");
        assert_eq!(
            serde_json::to_value(&req).expect("json"),
            json!({"symptoms": ["Fever", "Cough"]})
        );
    }

    #[test]
    fn blank_symptom_name_rejected() {
        assert!(PredictionRequest::new(vec!["  ".into()], None).is_err());
    }
}
