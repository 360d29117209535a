//! Export boundary: JSON document and raster URL.
//!
//! The engine only builds the artifacts. Rasterizing graded features into
//! a mask image is done by the service behind the raster URL.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::{MaskKey, MaskMetadata};
use crate::error::ExportError;
use crate::model::{AnnotationData, FeatureRecord};

/// Downloadable serialization of a mask's annotation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: MaskMetadata,
    pub features: Vec<FeatureRecord>,
}

impl ExportDocument {
    pub fn from_data(data: &AnnotationData) -> Self {
        Self {
            metadata: MaskMetadata {
                overall_score: data.overall_score,
            },
            features: data.features.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the document to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("📤 Exported {} feature(s) to {:?}", self.features.len(), path);
        Ok(())
    }
}

/// Which graded features the raster export renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterOptions {
    pub true_positive: bool,
    pub false_positive: bool,
    pub false_negative: bool,
    pub grayscale: bool,
}

impl RasterOptions {
    /// Render every graded feature in color.
    pub fn all_grades() -> Self {
        Self {
            true_positive: true,
            false_positive: true,
            false_negative: true,
            grayscale: false,
        }
    }
}

/// URL of the rasterized mask, filtered by `options`.
pub fn raster_url(api_url: &str, key: &MaskKey, options: RasterOptions) -> Result<Url, ExportError> {
    let mut url = Url::parse(api_url)?;
    url.path_segments_mut()
        .map_err(|_| ExportError::CannotBeBase {
            url: api_url.to_string(),
        })?
        .pop_if_empty()
        .extend(["api", "images", &key.image_id, "masks", &key.mask_id]);
    url.query_pairs_mut()
        .append_pair("true-positive", bool_flag(options.true_positive))
        .append_pair("false-positive", bool_flag(options.false_positive))
        .append_pair("false-negative", bool_flag(options.false_negative))
        .append_pair("grayscale", bool_flag(options.grayscale));
    Ok(url)
}

fn bool_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Receiver of export artifacts.
pub trait ExportSink {
    fn export(
        &mut self,
        key: &MaskKey,
        document: &ExportDocument,
        raster_url: &Url,
    ) -> Result<(), ExportError>;
}

/// Writes the document to a file and logs the raster URL.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    path: PathBuf,
}

impl FileExportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExportSink for FileExportSink {
    fn export(
        &mut self,
        key: &MaskKey,
        document: &ExportDocument,
        raster_url: &Url,
    ) -> Result<(), ExportError> {
        document.write_to(&self.path)?;
        log::info!("🖼️ Raster export for {}: {}", key, raster_url);
        Ok(())
    }
}

/// Keeps every export in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryExportSink {
    pub exports: Vec<(MaskKey, ExportDocument, Url)>,
}

impl ExportSink for MemoryExportSink {
    fn export(
        &mut self,
        key: &MaskKey,
        document: &ExportDocument,
        raster_url: &Url,
    ) -> Result<(), ExportError> {
        self.exports
            .push((key.clone(), document.clone(), raster_url.clone()));
        Ok(())
    }
}
