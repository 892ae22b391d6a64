use crate::emotion::{ClassifierError, EmotionLabel};
use serde::{Deserialize, Serialize};

/// A classifier confidence, guaranteed to lie in `[0, 1]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct ClassificationScore(f32);

impl ClassificationScore {
    pub fn new(value: f32) -> Result<Self, ClassifierError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ClassifierError::InvalidScore(value))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

/// Scores at or above `min_score` (and below the previous bucket's
/// `min_score`) map to `label`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreBucket {
    pub min_score: f32,
    pub label: EmotionLabel,
}

impl ScoreBucket {
    pub fn default_buckets() -> Vec<Self> {
        vec![
            ScoreBucket {
                min_score: 0.80,
                label: EmotionLabel::VeryPositive,
            },
            ScoreBucket {
                min_score: 0.60,
                label: EmotionLabel::Positive,
            },
            ScoreBucket {
                min_score: 0.40,
                label: EmotionLabel::Neutral,
            },
            ScoreBucket {
                min_score: 0.20,
                label: EmotionLabel::Negative,
            },
            ScoreBucket {
                min_score: 0.0,
                label: EmotionLabel::VeryNegative,
            },
        ]
    }
}

/// Closed-open threshold table over `[0, 1]`, most positive bucket first.
///
/// Expects a validated config: thresholds strictly descending and the last
/// one equal to `0.0`.
#[derive(Clone, Debug)]
pub struct ScoreBuckets {
    buckets: Vec<ScoreBucket>,
}

impl ScoreBuckets {
    pub fn new(buckets: &[ScoreBucket]) -> Self {
        Self {
            buckets: buckets.to_vec(),
        }
    }

    pub fn bucket(&self, score: ClassificationScore) -> EmotionLabel {
        let value = score.value();
        self.buckets
            .iter()
            .find(|b| value >= b.min_score)
            .or_else(|| self.buckets.last())
            .map(|b| b.label)
            .unwrap_or(EmotionLabel::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(v: f32) -> EmotionLabel {
        ScoreBuckets::new(&ScoreBucket::default_buckets())
            .bucket(ClassificationScore::new(v).unwrap())
    }

    #[test]
    fn default_ranges() {
        assert_eq!(bucket(1.0), EmotionLabel::VeryPositive);
        assert_eq!(bucket(0.7), EmotionLabel::Positive);
        assert_eq!(bucket(0.5), EmotionLabel::Neutral);
        assert_eq!(bucket(0.3), EmotionLabel::Negative);
        assert_eq!(bucket(0.1), EmotionLabel::VeryNegative);
        assert_eq!(bucket(0.0), EmotionLabel::VeryNegative);
    }

    #[test]
    fn boundaries_resolve_to_higher_bucket() {
        assert_eq!(bucket(0.80), EmotionLabel::VeryPositive);
        assert_eq!(bucket(0.60), EmotionLabel::Positive);
        assert_eq!(bucket(0.40), EmotionLabel::Neutral);
        assert_eq!(bucket(0.20), EmotionLabel::Negative);
        assert_eq!(bucket(0.7999), EmotionLabel::Positive);
    }

    #[test]
    fn higher_score_never_yields_more_negative_bucket() {
        let rank = |label: EmotionLabel| {
            ScoreBucket::default_buckets()
                .iter()
                .position(|b| b.label == label)
                .unwrap()
        };
        let mut previous = rank(bucket(0.0));
        for step in 1..=100 {
            let current = rank(bucket(step as f32 / 100.0));
            assert!(current <= previous, "score {step}/100 went more negative");
            previous = current;
        }
    }

    #[test]
    fn custom_bucket_count() {
        let three = ScoreBuckets::new(&[
            ScoreBucket {
                min_score: 0.5,
                label: EmotionLabel::Positive,
            },
            ScoreBucket {
                min_score: 0.0,
                label: EmotionLabel::Negative,
            },
        ]);
        let score = |v| ClassificationScore::new(v).unwrap();
        assert_eq!(three.bucket(score(0.5)), EmotionLabel::Positive);
        assert_eq!(three.bucket(score(0.49)), EmotionLabel::Negative);
    }

    #[test]
    fn out_of_range_scores_rejected() {
        assert!(ClassificationScore::new(1.01).is_err());
        assert!(ClassificationScore::new(-0.1).is_err());
        assert!(ClassificationScore::new(f32::NAN).is_err());
    }
}
