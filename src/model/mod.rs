//! Data models for the annotation engine.

mod annotation_data;
mod feature;

pub use annotation_data::{AnnotationData, GradeStatistics, ImageMetadata};
pub use feature::{
    Feature, FeatureDraft, FeatureId, FeatureKind, FeatureProperties, FeatureRecord, Geometry,
    Grade, MAX_SIMPLIFY_TOLERANCE, MIN_CLOSED_RING_LEN, MIN_POLYGON_VERTICES, Position,
    RecordProperties, Ring, close_ring, close_rings, is_ring_closed,
};
