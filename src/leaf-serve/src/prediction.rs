use std::cmp::Ordering;

use serde::Serialize;

use crate::labels::{identifier, LabelSet};

/// Scores at or below this are left out of the ranked list.
pub const MIN_CONFIDENCE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPrediction {
    pub class: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPrediction {
    /// Normalized identifier, e.g. `bird_eye_spot`.
    pub name: String,
    pub confidence: f32,
    /// Display name, e.g. `bird eye spot`.
    pub class: String,
}

/// Outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub prediction: TopPrediction,
    pub predictions: Vec<RankedPrediction>,
}

impl Classification {
    /// Rank `scores` against `labels`.
    ///
    /// `scores` must hold exactly one finite value per label; the pipeline
    /// checks this before calling.
    pub fn from_scores(labels: &LabelSet, scores: &[f32]) -> Self {
        debug_assert_eq!(labels.len(), scores.len());

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        // stable: equal scores keep index order
        ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        let (top_index, top_score) = ranked.first().copied().unwrap_or((0, 0.0));

        let predictions = ranked
            .into_iter()
            .filter(|&(_, score)| score > MIN_CONFIDENCE)
            .filter_map(|(i, score)| {
                labels.name(i).map(|name| RankedPrediction {
                    name: identifier(name),
                    confidence: score,
                    class: name.to_owned(),
                })
            })
            .collect();

        Classification {
            prediction: TopPrediction {
                class: labels.name(top_index).unwrap_or_default().to_owned(),
                confidence: top_score,
            },
            predictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(scores: &[f32]) -> Classification {
        Classification::from_scores(&LabelSet::default(), scores)
    }

    #[test]
    fn top_prediction_is_argmax() {
        let c = classify(&[0.05, 0.0, 0.1, 0.0, 0.0, 0.8, 0.05, 0.0]);
        assert_eq!(c.prediction.class, "healthy");
        assert_eq!(c.prediction.confidence, 0.8);
    }

    #[test]
    fn ranked_list_is_descending_and_filtered() {
        let c = classify(&[0.2, 0.005, 0.3, 0.01, 0.0, 0.45, 0.02, 0.015]);

        let confidences: Vec<f32> = c.predictions.iter().map(|p| p.confidence).collect();
        assert_eq!(confidences, vec![0.45, 0.3, 0.2, 0.02, 0.015]);
        assert!(c.predictions.iter().all(|p| p.confidence > MIN_CONFIDENCE));
        assert_eq!(c.predictions[0].class, c.prediction.class);
    }

    #[test]
    fn ranked_entries_carry_identifier_and_display_name() {
        let c = classify(&[0.0, 0.0, 0.9, 0.0, 0.0, 0.1, 0.0, 0.0]);
        assert_eq!(
            c.predictions[0],
            RankedPrediction {
                name: "bird_eye_spot".to_owned(),
                confidence: 0.9,
                class: "bird eye spot".to_owned(),
            }
        );
    }

    #[test]
    fn ties_keep_label_order() {
        let c = classify(&[0.0, 0.25, 0.0, 0.25, 0.0, 0.25, 0.25, 0.0]);
        let order: Vec<&str> = c.predictions.iter().map(|p| p.class.as_str()).collect();
        assert_eq!(order, ["algal leaf", "brown blight", "healthy", "red leaf spot"]);
        assert_eq!(c.prediction.class, "algal leaf");
    }

    #[test]
    fn flat_low_scores_leave_an_empty_list_but_a_top_class() {
        let c = classify(&[0.01; 8]);
        assert!(c.predictions.is_empty());
        assert_eq!(c.prediction.class, "Anthracnose");
        assert_eq!(c.prediction.confidence, 0.01);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let c = classify(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["prediction"]["class"], "healthy");
        assert_eq!(json["predictions"][0]["name"], "healthy");
        assert_eq!(json["predictions"][0]["class"], "healthy");
        assert_eq!(json["predictions"][0]["confidence"], 1.0);
    }
}
