//! Segment (feature) types: polygon geometry plus grading properties.
//!
//! Geometry is always stored in image pixel space as a list of closed rings:
//! ring 0 is the outer boundary, every further ring is a hole.

use serde::{Deserialize, Serialize};

/// Identity of a feature within one annotation session.
pub type FeatureId = u32;

/// A `[x, y]` position in pixel space.
pub type Position = [f64; 2];

/// A ring of positions. Stored rings are closed (first == last).
pub type Ring = Vec<Position>;

/// Ceiling for [`FeatureProperties::simplify_tolerance`].
pub const MAX_SIMPLIFY_TOLERANCE: u32 = 10_000;

/// Minimum number of positions in a closed ring (a closed triangle).
pub const MIN_CLOSED_RING_LEN: usize = 4;

/// Minimum number of distinct vertices needed to draw a polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Classification of a segment relative to ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grade {
    TruePositive,
    FalsePositive,
    FalseNegative,
}

impl Grade {
    /// Get the display name for this grade.
    pub fn name(&self) -> &'static str {
        match self {
            Grade::TruePositive => "True positive",
            Grade::FalsePositive => "False positive",
            Grade::FalseNegative => "False negative",
        }
    }

    /// Get all grades in display order.
    pub fn all() -> &'static [Grade] {
        &[Grade::TruePositive, Grade::FalsePositive, Grade::FalseNegative]
    }
}

/// Grading and editing properties of a feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureProperties {
    pub grade: Option<Grade>,
    /// Segment accuracy, 0-100.
    pub score: Option<u8>,
    /// Last tolerance the feature was simplified with. Only grows, except
    /// through undo.
    pub simplify_tolerance: u32,
    /// Properties written by other tools (e.g. the polygonizer); kept as-is.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Geometry and properties of a feature that has no identity yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureDraft {
    pub rings: Vec<Ring>,
    pub properties: FeatureProperties,
}

impl FeatureDraft {
    /// A draft with default properties. Rings are closed.
    pub fn from_rings(rings: Vec<Ring>) -> Self {
        let mut draft = Self {
            rings,
            properties: FeatureProperties::default(),
        };
        close_rings(&mut draft.rings);
        draft
    }
}

/// A polygon annotation held by the feature store.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub fid: FeatureId,
    pub rings: Vec<Ring>,
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn new(fid: FeatureId, draft: FeatureDraft) -> Self {
        Self {
            fid,
            rings: draft.rings,
            properties: draft.properties,
        }
    }

    pub fn outer_ring(&self) -> Option<&Ring> {
        self.rings.first()
    }

    /// Number of holes (rings after the outer boundary).
    pub fn hole_count(&self) -> usize {
        self.rings.len().saturating_sub(1)
    }

    /// Whether some ring has more points than a closed triangle.
    pub fn has_non_triangular_ring(&self) -> bool {
        self.rings.iter().any(|ring| ring.len() > MIN_CLOSED_RING_LEN)
    }

    /// Point count of every ring, in order.
    pub fn ring_shape(&self) -> Vec<usize> {
        self.rings.iter().map(Vec::len).collect()
    }

    /// Whether simplification may still be applied.
    pub fn can_simplify(&self, max_tolerance: u32) -> bool {
        self.has_non_triangular_ring() && self.properties.simplify_tolerance < max_tolerance
    }

    /// Pixel-space bounding box as `(min, max)`.
    pub fn bounding_box(&self) -> Option<(Position, Position)> {
        let mut points = self.rings.iter().flatten();
        let first = *points.next()?;
        let mut min = first;
        let mut max = first;
        for p in points {
            min = [min[0].min(p[0]), min[1].min(p[1])];
            max = [max[0].max(p[0]), max[1].max(p[1])];
        }
        Some((min, max))
    }

    pub fn is_closed(&self) -> bool {
        self.rings.iter().all(|ring| is_ring_closed(ring))
    }

    pub fn to_record(&self) -> FeatureRecord {
        FeatureRecord {
            kind: FeatureKind::Feature,
            properties: RecordProperties {
                fid: Some(self.fid),
                grade: self.properties.grade,
                score: self.properties.score,
                simplify_tolerance: self.properties.simplify_tolerance,
                extra: self.properties.extra.clone(),
            },
            geometry: Some(Geometry::Polygon {
                coordinates: self.rings.clone(),
            }),
        }
    }
}

// ============================================================================
// Ring helpers
// ============================================================================

pub fn is_ring_closed(ring: &[Position]) -> bool {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) => first == last,
        _ => true,
    }
}

/// Append the first position to a ring whose last position differs.
pub fn close_ring(ring: &mut Ring) {
    if let Some(first) = ring.first().copied() {
        if ring.last() != Some(&first) {
            ring.push(first);
        }
    }
}

pub fn close_rings(rings: &mut [Ring]) {
    for ring in rings {
        close_ring(ring);
    }
}

// ============================================================================
// GeoJSON wire format
// ============================================================================

/// The only GeoJSON object type a record may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Feature,
}

/// GeoJSON geometry of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

impl Geometry {
    /// Split into single polygons.
    pub fn into_polygons(self) -> Vec<Vec<Ring>> {
        match self {
            Geometry::Polygon { coordinates } => vec![coordinates],
            Geometry::MultiPolygon { coordinates } => coordinates,
        }
    }
}

/// Properties of a record as persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fid: Option<FeatureId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_score"
    )]
    pub score: Option<u8>,
    #[serde(default)]
    pub simplify_tolerance: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A GeoJSON feature as stored by the persistence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "type", default)]
    pub kind: FeatureKind,
    #[serde(default)]
    pub properties: RecordProperties,
    pub geometry: Option<Geometry>,
}

impl FeatureRecord {
    /// A polygon record without an fid.
    pub fn polygon(rings: Vec<Ring>) -> Self {
        Self {
            kind: FeatureKind::Feature,
            properties: RecordProperties::default(),
            geometry: Some(Geometry::Polygon { coordinates: rings }),
        }
    }

    pub fn with_fid(mut self, fid: FeatureId) -> Self {
        self.properties.fid = Some(fid);
        self
    }

    pub fn with_grade(mut self, grade: Grade) -> Self {
        self.properties.grade = Some(grade);
        self
    }

    /// Split the record into drafts, one per polygon, with normalized
    /// properties and closed rings. The record's fid is returned alongside.
    pub fn into_drafts(self) -> (Option<FeatureId>, Vec<FeatureDraft>) {
        let RecordProperties {
            fid,
            grade,
            score,
            simplify_tolerance,
            extra,
        } = self.properties;
        let properties = FeatureProperties {
            grade,
            score,
            simplify_tolerance,
            extra,
        };
        let polygons = self
            .geometry
            .map(Geometry::into_polygons)
            .unwrap_or_default();
        let drafts = polygons
            .into_iter()
            .filter(|rings| rings.first().is_some_and(|outer| !outer.is_empty()))
            .map(|mut rings| {
                close_rings(&mut rings);
                FeatureDraft {
                    rings,
                    properties: properties.clone(),
                }
            })
            .collect();
        (fid, drafts)
    }
}

/// Accept any JSON value for a score; anything that is not an integer in
/// 0-100 is treated as unset.
fn deserialize_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|score| score.fract() == 0.0 && (0.0..=100.0).contains(score))
        .map(|score| score as u8))
}
