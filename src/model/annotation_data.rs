//! Persisted annotation unit and image metadata.

use serde::{Deserialize, Serialize};

use super::feature::{Feature, FeatureRecord, Grade};

/// Metadata of an uploaded image or mask, produced at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub id: String,
    pub original_name: String,
    pub mime_type: String,
    pub encoding: String,
    pub width: u32,
    pub height: u32,
    /// File size in bytes.
    pub size: u64,
}

impl ImageMetadata {
    /// Metadata with only an id and pixel size; names are left empty.
    pub fn with_size(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            original_name: String::new(),
            mime_type: String::new(),
            encoding: String::new(),
            width,
            height,
            size: 0,
        }
    }
}

/// The persisted annotation unit of one mask.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationData {
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
    /// Session-level accuracy rating, 0-100.
    #[serde(default)]
    pub overall_score: Option<u8>,
}

impl AnnotationData {
    pub fn new(features: Vec<FeatureRecord>, overall_score: Option<u8>) -> Self {
        Self {
            features,
            overall_score,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Grade counts over a set of features.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradeStatistics {
    pub overall_score: Option<u8>,
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub unspecified: usize,
    pub total: usize,
}

impl GradeStatistics {
    pub fn collect<'a>(
        features: impl IntoIterator<Item = &'a Feature>,
        overall_score: Option<u8>,
    ) -> Self {
        let mut stats = Self {
            overall_score,
            ..Self::default()
        };
        for feature in features {
            stats.total += 1;
            match feature.properties.grade {
                Some(Grade::TruePositive) => stats.true_positive += 1,
                Some(Grade::FalsePositive) => stats.false_positive += 1,
                Some(Grade::FalseNegative) => stats.false_negative += 1,
                None => stats.unspecified += 1,
            }
        }
        stats
    }

    /// Share of `count` in the total, in percent. Zero when there are no
    /// features.
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        count as f64 / self.total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::feature::FeatureDraft;

    #[test]
    fn test_annotation_data_json() {
        let json = r#"{"features": [], "overallScore": 80}"#;
        let data = AnnotationData::from_json(json).unwrap();
        assert_eq!(data.overall_score, Some(80));
        assert!(data.features.is_empty());

        let back = data.to_json().unwrap();
        assert!(back.contains("\"overallScore\":80"));
    }

    #[test]
    fn test_missing_overall_score() {
        let data = AnnotationData::from_json(r#"{"features": []}"#).unwrap();
        assert_eq!(data.overall_score, None);
        let data = AnnotationData::from_json(r#"{"features": [], "overallScore": null}"#).unwrap();
        assert_eq!(data.overall_score, None);
    }

    #[test]
    fn test_image_metadata_camel_case() {
        let meta = ImageMetadata::with_size("abc", 100, 200);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["originalName"], "");
        assert_eq!(json["mimeType"], "");
        assert_eq!(json["width"], 100);
    }

    #[test]
    fn test_statistics() {
        let mut features = Vec::new();
        for (fid, grade) in [
            Some(Grade::TruePositive),
            Some(Grade::TruePositive),
            Some(Grade::FalseNegative),
            None,
        ]
        .into_iter()
        .enumerate()
        {
            let mut feature = Feature::new(fid as u32, FeatureDraft::default());
            feature.properties.grade = grade;
            features.push(feature);
        }

        let stats = GradeStatistics::collect(&features, Some(70));
        assert_eq!(stats.total, 4);
        assert_eq!(stats.true_positive, 2);
        assert_eq!(stats.false_positive, 0);
        assert_eq!(stats.false_negative, 1);
        assert_eq!(stats.unspecified, 1);
        assert_eq!(stats.percentage(stats.true_positive), 50.0);
        assert_eq!(stats.overall_score, Some(70));
    }

    #[test]
    fn test_statistics_empty() {
        let stats = GradeStatistics::collect(std::iter::empty(), None);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage(0), 0.0);
    }
}
