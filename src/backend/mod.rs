//! Persistence boundary.
//!
//! A backend stores, per image and mask, the ingestion-time annotation
//! snapshot and the most recently saved one. Fetching prefers the saved
//! snapshot; resetting drops it so the ingestion-time data is served again.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::model::{AnnotationData, FeatureRecord, ImageMetadata};

/// Identifies the annotation data of one mask of one image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaskKey {
    pub image_id: String,
    pub mask_id: String,
}

impl MaskKey {
    pub fn new(image_id: impl Into<String>, mask_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            mask_id: mask_id.into(),
        }
    }
}

impl std::fmt::Display for MaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.image_id, self.mask_id)
    }
}

/// Storage for image metadata and annotation data.
pub trait AnnotationBackend {
    /// Metadata of the image the masks belong to.
    fn fetch_image_metadata(&self, image_id: &str) -> Result<ImageMetadata, BackendError>;

    /// Most recently saved annotation data, or the ingestion-time data if
    /// nothing was saved since.
    fn fetch_annotation_data(&self, key: &MaskKey) -> Result<AnnotationData, BackendError>;

    fn save_annotation_data(
        &mut self,
        key: &MaskKey,
        data: &AnnotationData,
    ) -> Result<(), BackendError>;

    /// Restore the ingestion-time snapshot. Callers must fetch again.
    fn reset_annotation_data(&mut self, key: &MaskKey) -> Result<(), BackendError>;

    /// Store the ingestion-time snapshot of a new mask.
    fn ingest(
        &mut self,
        key: &MaskKey,
        image: &ImageMetadata,
        features: Vec<FeatureRecord>,
    ) -> Result<(), BackendError>;
}

/// GeoJSON feature collection as written to disk and produced by the
/// polygonizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

impl FeatureCollection {
    pub fn new(features: Vec<FeatureRecord>) -> Self {
        Self {
            kind: feature_collection_type(),
            features,
        }
    }
}

/// Session-level metadata stored next to the features.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskMetadata {
    #[serde(default)]
    pub overall_score: Option<u8>,
}
