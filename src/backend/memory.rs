//! In-memory backend.

use std::collections::HashMap;

use super::{AnnotationBackend, MaskKey};
use crate::error::BackendError;
use crate::model::{AnnotationData, FeatureRecord, ImageMetadata};

#[derive(Debug, Clone, Default)]
struct MaskEntry {
    original: AnnotationData,
    saved: Option<AnnotationData>,
}

/// Backend keeping everything in memory.
///
/// Individual calls can be made to fail, which lets callers check that a
/// failed request leaves their state untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    images: HashMap<String, ImageMetadata>,
    masks: HashMap<MaskKey, MaskEntry>,
    pub fail_fetch: bool,
    pub fail_save: bool,
    pub fail_reset: bool,
    /// Number of successful saves.
    pub save_count: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend holding one freshly ingested mask.
    pub fn with_mask(key: &MaskKey, image: ImageMetadata, data: AnnotationData) -> Self {
        let mut backend = Self::new();
        backend.images.insert(key.image_id.clone(), image);
        backend.masks.insert(
            key.clone(),
            MaskEntry {
                original: data,
                saved: None,
            },
        );
        backend
    }

    /// The ingestion-time snapshot of a mask.
    pub fn original(&self, key: &MaskKey) -> Option<&AnnotationData> {
        self.masks.get(key).map(|entry| &entry.original)
    }

    /// The last saved snapshot of a mask.
    pub fn saved(&self, key: &MaskKey) -> Option<&AnnotationData> {
        self.masks.get(key)?.saved.as_ref()
    }

    fn entry_mut(&mut self, key: &MaskKey) -> Result<&mut MaskEntry, BackendError> {
        self.masks
            .get_mut(key)
            .ok_or_else(|| BackendError::not_found(&key.image_id, &key.mask_id))
    }
}

impl AnnotationBackend for MemoryBackend {
    fn fetch_image_metadata(&self, image_id: &str) -> Result<ImageMetadata, BackendError> {
        if self.fail_fetch {
            return Err(BackendError::unavailable("fetch failed"));
        }
        self.images
            .get(image_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(image_id, ""))
    }

    fn fetch_annotation_data(&self, key: &MaskKey) -> Result<AnnotationData, BackendError> {
        if self.fail_fetch {
            return Err(BackendError::unavailable("fetch failed"));
        }
        let entry = self
            .masks
            .get(key)
            .ok_or_else(|| BackendError::not_found(&key.image_id, &key.mask_id))?;
        Ok(entry.saved.clone().unwrap_or_else(|| entry.original.clone()))
    }

    fn save_annotation_data(
        &mut self,
        key: &MaskKey,
        data: &AnnotationData,
    ) -> Result<(), BackendError> {
        if self.fail_save {
            return Err(BackendError::unavailable("save failed"));
        }
        self.entry_mut(key)?.saved = Some(data.clone());
        self.save_count += 1;
        Ok(())
    }

    fn reset_annotation_data(&mut self, key: &MaskKey) -> Result<(), BackendError> {
        if self.fail_reset {
            return Err(BackendError::unavailable("reset failed"));
        }
        self.entry_mut(key)?.saved = None;
        Ok(())
    }

    fn ingest(
        &mut self,
        key: &MaskKey,
        image: &ImageMetadata,
        features: Vec<FeatureRecord>,
    ) -> Result<(), BackendError> {
        self.images.insert(key.image_id.clone(), image.clone());
        self.masks.insert(
            key.clone(),
            MaskEntry {
                original: AnnotationData::new(features, None),
                saved: None,
            },
        );
        Ok(())
    }
}
