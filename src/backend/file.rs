//! Filesystem backend.
//!
//! Layout below the root directory:
//!
//! ```text
//! images/<imageId>/metadata.json                      image metadata
//! images/<imageId>/masks/<maskId>/geojson.json        ingestion-time features
//! images/<imageId>/masks/<maskId>/geojson_updated.json  saved features
//! images/<imageId>/masks/<maskId>/metadata.json       ingestion-time overall score
//! images/<imageId>/masks/<maskId>/metadata_updated.json saved overall score
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{AnnotationBackend, FeatureCollection, MaskKey, MaskMetadata};
use crate::error::BackendError;
use crate::model::{AnnotationData, FeatureRecord, ImageMetadata};

const IMAGE_METADATA_FILE: &str = "metadata.json";
const FEATURES_FILE: &str = "geojson.json";
const FEATURES_UPDATED_FILE: &str = "geojson_updated.json";
const MASK_METADATA_FILE: &str = "metadata.json";
const MASK_METADATA_UPDATED_FILE: &str = "metadata_updated.json";

#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn image_dir(&self, image_id: &str) -> PathBuf {
        self.root.join("images").join(image_id)
    }

    pub fn mask_dir(&self, key: &MaskKey) -> PathBuf {
        self.image_dir(&key.image_id)
            .join("masks")
            .join(&key.mask_id)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BackendError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(value)?)?;
    Ok(())
}

/// Read the first of `paths` that exists.
fn read_first_existing<T: DeserializeOwned>(paths: &[PathBuf]) -> Result<Option<T>, BackendError> {
    match paths.iter().find(|path| path.exists()) {
        Some(path) => {
            log::debug!("📂 Reading {:?}", path);
            read_json(path).map(Some)
        }
        None => Ok(None),
    }
}

fn remove_if_exists(path: &Path) -> Result<(), BackendError> {
    if path.exists() {
        fs::remove_file(path)?;
        log::debug!("🗑️ Removed {:?}", path);
    }
    Ok(())
}

impl AnnotationBackend for FileBackend {
    fn fetch_image_metadata(&self, image_id: &str) -> Result<ImageMetadata, BackendError> {
        let path = self.image_dir(image_id).join(IMAGE_METADATA_FILE);
        if !path.exists() {
            return Err(BackendError::MissingImageInfo { path });
        }
        read_json(&path)
    }

    fn fetch_annotation_data(&self, key: &MaskKey) -> Result<AnnotationData, BackendError> {
        let dir = self.mask_dir(key);
        let collection: FeatureCollection = read_first_existing(&[
            dir.join(FEATURES_UPDATED_FILE),
            dir.join(FEATURES_FILE),
        ])?
        .ok_or_else(|| BackendError::not_found(&key.image_id, &key.mask_id))?;
        let metadata: MaskMetadata = read_first_existing(&[
            dir.join(MASK_METADATA_UPDATED_FILE),
            dir.join(MASK_METADATA_FILE),
        ])?
        .unwrap_or_default();
        Ok(AnnotationData::new(
            collection.features,
            metadata.overall_score,
        ))
    }

    fn save_annotation_data(
        &mut self,
        key: &MaskKey,
        data: &AnnotationData,
    ) -> Result<(), BackendError> {
        let dir = self.mask_dir(key);
        if !dir.join(FEATURES_FILE).exists() {
            return Err(BackendError::not_found(&key.image_id, &key.mask_id));
        }
        write_json(
            &dir.join(FEATURES_UPDATED_FILE),
            &FeatureCollection::new(data.features.clone()),
        )?;
        write_json(
            &dir.join(MASK_METADATA_UPDATED_FILE),
            &MaskMetadata {
                overall_score: data.overall_score,
            },
        )?;
        log::info!("💾 Saved {} feature(s) for {}", data.features.len(), key);
        Ok(())
    }

    fn reset_annotation_data(&mut self, key: &MaskKey) -> Result<(), BackendError> {
        let dir = self.mask_dir(key);
        if !dir.join(FEATURES_FILE).exists() {
            return Err(BackendError::not_found(&key.image_id, &key.mask_id));
        }
        remove_if_exists(&dir.join(FEATURES_UPDATED_FILE))?;
        remove_if_exists(&dir.join(MASK_METADATA_UPDATED_FILE))?;
        log::info!("↩️ Reset annotation data for {}", key);
        Ok(())
    }

    fn ingest(
        &mut self,
        key: &MaskKey,
        image: &ImageMetadata,
        features: Vec<FeatureRecord>,
    ) -> Result<(), BackendError> {
        let image_metadata = self.image_dir(&key.image_id).join(IMAGE_METADATA_FILE);
        write_json(&image_metadata, image)?;

        let dir = self.mask_dir(key);
        let count = features.len();
        write_json(&dir.join(FEATURES_FILE), &FeatureCollection::new(features))?;
        write_json(&dir.join(MASK_METADATA_FILE), &MaskMetadata::default())?;
        remove_if_exists(&dir.join(FEATURES_UPDATED_FILE))?;
        remove_if_exists(&dir.join(MASK_METADATA_UPDATED_FILE))?;
        log::info!("📥 Ingested {} feature(s) for {}", count, key);
        Ok(())
    }
}
