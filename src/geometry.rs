//! Geometry operations on features.
//!
//! Every function here is pure: it takes features and returns new geometry
//! (or drafts of new features). Nothing in this module touches the store,
//! the undo stack or the renderer. The heavy lifting (boolean ops, hulls,
//! Ramer-Douglas-Peucker) is done by the `geo` crate.

use bioannot_view::{DisplayPoint, PixelPoint, Projection};
use geo::{
    Area, BooleanOps, Contains, ConvexHull, Coord, Intersects, Line, LineString, MultiPoint,
    MultiPolygon, Point, Polygon, Simplify,
};

use crate::model::{Feature, FeatureDraft, MIN_CLOSED_RING_LEN, Position, Ring, close_ring};

/// Polygons with an area at or below this are treated as empty.
pub const AREA_EPSILON: f64 = 1e-9;

// ============================================================================
// Conversions
// ============================================================================

fn ring_to_line_string(ring: &[Position]) -> LineString<f64> {
    LineString::from(
        ring.iter()
            .map(|p| Coord { x: p[0], y: p[1] })
            .collect::<Vec<_>>(),
    )
}

fn line_string_to_ring(line: &LineString<f64>) -> Ring {
    let mut ring: Ring = line.coords().map(|c| [c.x, c.y]).collect();
    close_ring(&mut ring);
    ring
}

/// Build a `geo` polygon from pixel-space rings.
pub fn to_polygon(rings: &[Ring]) -> Polygon<f64> {
    let mut iter = rings.iter();
    let exterior = iter
        .next()
        .map(|ring| ring_to_line_string(ring))
        .unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = iter.map(|ring| ring_to_line_string(ring)).collect();
    Polygon::new(exterior, interiors)
}

/// Rings of a `geo` polygon, each closed.
pub fn from_polygon(polygon: &Polygon<f64>) -> Vec<Ring> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_string_to_ring)
        .collect()
}

/// Project pixel-space rings into a display-space polygon (x = lng, y = lat).
fn to_display_polygon(rings: &[Ring], projection: &Projection) -> Polygon<f64> {
    let display: Vec<Ring> = rings
        .iter()
        .map(|ring| {
            projection
                .ring_to_display(ring)
                .into_iter()
                .map(|p| [p.lng, p.lat])
                .collect()
        })
        .collect();
    to_polygon(&display)
}

/// Reproject a display-space polygon (x = lng, y = lat) back to pixel rings.
fn from_display_polygon(polygon: &Polygon<f64>, projection: &Projection) -> Vec<Ring> {
    from_polygon(polygon)
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|[lng, lat]| {
                    projection
                        .display_to_pixel(DisplayPoint::new(lat, lng))
                        .to_position()
                })
                .collect()
        })
        .collect()
}

/// Display-space vertices as a polygon; the ring is closed if needed.
fn display_shape(points: &[DisplayPoint]) -> Polygon<f64> {
    let mut ring: Ring = points.iter().map(|p| [p.lng, p.lat]).collect();
    close_ring(&mut ring);
    Polygon::new(ring_to_line_string(&ring), Vec::new())
}

// ============================================================================
// Predicates
// ============================================================================

/// Drop consecutive repeated vertices, including a trailing copy of the
/// first vertex. The result is an open ring.
pub fn remove_repeated_vertices(ring: &[Position]) -> Ring {
    let mut result: Ring = Vec::with_capacity(ring.len());
    for p in ring {
        if result.last() != Some(p) {
            result.push(*p);
        }
    }
    while result.len() > 1 && result.first() == result.last() {
        result.pop();
    }
    result
}

/// Whether a ring crosses itself. Adjacent segments sharing their endpoint
/// do not count; repeated vertices are ignored.
pub fn is_self_intersecting(ring: &[Position]) -> bool {
    let mut ring = remove_repeated_vertices(ring);
    close_ring(&mut ring);
    let segments: Vec<Line<f64>> = ring
        .windows(2)
        .map(|w| Line::new(Coord { x: w[0][0], y: w[0][1] }, Coord { x: w[1][0], y: w[1][1] }))
        .collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 2)..n {
            // First and last segment share the closing vertex.
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                return true;
            }
        }
    }
    false
}

/// Whether a pixel-space point lies inside the feature (holes excluded).
pub fn contains_point(feature: &Feature, point: PixelPoint) -> bool {
    to_polygon(&feature.rings).contains(&Point::new(point.x, point.y))
}

// ============================================================================
// Cut
// ============================================================================

/// Result of cutting one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum CutOutcome {
    /// The cut shape does not take anything away from the feature.
    Untouched,
    /// Nothing with a positive area is left.
    Removed,
    /// One draft per remaining polygon, all with cleared properties.
    Split(Vec<FeatureDraft>),
}

/// Geometry left after cutting `cutter` (display space) out of `feature`.
///
/// Returns `None` when the cutter does not overlap the feature's interior,
/// mirroring a cut tool that only reports features it actually changed.
pub fn cut_geometry(
    feature: &Feature,
    cutter: &[DisplayPoint],
    projection: &Projection,
) -> Option<MultiPolygon<f64>> {
    if cutter.len() < 3 {
        return None;
    }
    let original = to_display_polygon(&feature.rings, projection);
    let cutter = display_shape(cutter);
    if !original.intersects(&cutter) {
        return None;
    }
    let remaining = MultiPolygon::new(vec![original.clone()])
        .difference(&MultiPolygon::new(vec![cutter]));
    if (remaining.unsigned_area() - original.unsigned_area()).abs() <= AREA_EPSILON {
        return None;
    }
    Some(remaining)
}

/// Turn the post-cut display geometry of `feature` into new features.
///
/// A result without any polygon of positive area means the feature was cut
/// away completely.
pub fn split_cut_result(remaining: &MultiPolygon<f64>, projection: &Projection) -> CutOutcome {
    let drafts: Vec<FeatureDraft> = remaining
        .iter()
        .filter(|polygon| polygon.unsigned_area() > AREA_EPSILON)
        .map(|polygon| FeatureDraft::from_rings(from_display_polygon(polygon, projection)))
        .collect();
    if drafts.is_empty() {
        CutOutcome::Removed
    } else {
        CutOutcome::Split(drafts)
    }
}

/// Cut `cutter` out of `feature`.
pub fn cut(feature: &Feature, cutter: &[DisplayPoint], projection: &Projection) -> CutOutcome {
    match cut_geometry(feature, cutter, projection) {
        Some(remaining) => split_cut_result(&remaining, projection),
        None => CutOutcome::Untouched,
    }
}

// ============================================================================
// Merge / convex hull
// ============================================================================

/// Union all features into one geometry, split back into single polygons.
///
/// Needs at least two features; returns `None` otherwise.
pub fn merge(features: &[&Feature]) -> Option<Vec<FeatureDraft>> {
    if features.len() < 2 {
        return None;
    }
    let mut iter = features.iter();
    let first = iter.next()?;
    let mut merged = MultiPolygon::new(vec![to_polygon(&first.rings)]);
    for feature in iter {
        merged = merged.union(&MultiPolygon::new(vec![to_polygon(&feature.rings)]));
    }
    let drafts: Vec<FeatureDraft> = merged
        .iter()
        .filter(|polygon| polygon.unsigned_area() > AREA_EPSILON)
        .map(|polygon| FeatureDraft::from_rings(from_polygon(polygon)))
        .collect();
    if drafts.is_empty() { None } else { Some(drafts) }
}

/// Convex hull of all points of the given features.
///
/// Returns `None` when the points do not span an area (empty input, a
/// single point, collinear points).
pub fn convex_hull(features: &[&Feature]) -> Option<FeatureDraft> {
    let points: Vec<Point<f64>> = features
        .iter()
        .flat_map(|feature| feature.rings.iter().flatten())
        .map(|p| Point::new(p[0], p[1]))
        .collect();
    if points.len() < 3 {
        return None;
    }
    let hull = MultiPoint::new(points).convex_hull();
    if hull.unsigned_area() <= AREA_EPSILON {
        return None;
    }
    Some(FeatureDraft::from_rings(from_polygon(&hull)))
}

// ============================================================================
// Simplify / holes
// ============================================================================

/// Result of simplifying one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyOutcome {
    pub feature: Feature,
    /// Whether the tolerance (and possibly the geometry) moved.
    pub changed: bool,
}

/// Simplify every ring with Ramer-Douglas-Peucker. A ring that would drop
/// below a closed triangle is kept as it was.
fn simplify_rings(rings: &[Ring], tolerance: f64) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| {
            let simplified = line_string_to_ring(&ring_to_line_string(ring).simplify(&tolerance));
            if simplified.len() < MIN_CLOSED_RING_LEN {
                ring.clone()
            } else {
                simplified
            }
        })
        .collect()
}

/// One user-visible simplification step.
///
/// The tolerance is raised by one at a time, starting above the feature's
/// current tolerance, until the simplified shape differs from the input in
/// ring or point count, no ring has more than a closed triangle, or the
/// tolerance reaches `max_tolerance`. The first differing shape is kept.
pub fn simplify(feature: &Feature, max_tolerance: u32) -> SimplifyOutcome {
    let original_shape = feature.ring_shape();
    let mut result = feature.clone();
    let mut changed = false;

    while result.has_non_triangular_ring()
        && result.properties.simplify_tolerance < max_tolerance
        && result.ring_shape() == original_shape
    {
        result.properties.simplify_tolerance += 1;
        changed = true;
        result.rings = simplify_rings(
            &feature.rings,
            f64::from(result.properties.simplify_tolerance),
        );
    }

    if changed {
        log::debug!(
            "✂️ Simplified fid {} to tolerance {} ({:?} -> {:?})",
            feature.fid,
            result.properties.simplify_tolerance,
            original_shape,
            result.ring_shape()
        );
    }
    SimplifyOutcome {
        feature: result,
        changed,
    }
}

/// Keep only the outer ring. Returns `None` if the feature has no holes.
pub fn remove_holes(feature: &Feature) -> Option<Feature> {
    if feature.hole_count() == 0 {
        return None;
    }
    let mut result = feature.clone();
    result.rings.truncate(1);
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Grade, MAX_SIMPLIFY_TOLERANCE};

    fn rect(fid: u32, x0: f64, y0: f64, x1: f64, y1: f64) -> Feature {
        Feature::new(
            fid,
            FeatureDraft::from_rings(vec![vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]]),
        )
    }

    fn display_rect(projection: &Projection, x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<DisplayPoint> {
        [[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
            .into_iter()
            .map(|p| projection.pixel_to_display(PixelPoint::from_position(p)))
            .collect()
    }

    fn area(rings: &[Ring]) -> f64 {
        to_polygon(rings).unsigned_area()
    }

    #[test]
    fn test_polygon_conversion_closes_rings() {
        let rings = vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]]];
        let back = from_polygon(&to_polygon(&rings));
        assert_eq!(back[0].first(), back[0].last());
        assert_eq!(back[0].len(), 4);
    }

    #[test]
    fn test_self_intersection() {
        let bow_tie = vec![[0.0, 0.0], [4.0, 4.0], [4.0, 0.0], [0.0, 4.0]];
        assert!(is_self_intersecting(&bow_tie));
        let square = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        assert!(!is_self_intersecting(&square));
    }

    #[test]
    fn test_repeated_vertex_is_not_a_crossing() {
        let triangle = vec![[10.0, 10.0], [50.0, 10.0], [10.0, 50.0], [10.0, 50.0]];
        assert!(!is_self_intersecting(&triangle));
        assert_eq!(
            remove_repeated_vertices(&triangle),
            vec![[10.0, 10.0], [50.0, 10.0], [10.0, 50.0]]
        );

        let closed = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 0.0], [0.0, 4.0], [0.0, 0.0]];
        assert_eq!(remove_repeated_vertices(&closed).len(), 3);
        assert!(!is_self_intersecting(&closed));
    }

    #[test]
    fn test_contains_point() {
        let feature = rect(0, 0.0, 0.0, 10.0, 10.0);
        assert!(contains_point(&feature, PixelPoint::new(5.0, 5.0)));
        assert!(!contains_point(&feature, PixelPoint::new(15.0, 5.0)));
    }

    #[test]
    fn test_cut_outside_is_untouched() {
        let projection = Projection::new(2);
        let feature = rect(0, 0.0, 0.0, 10.0, 10.0);
        let cutter = display_rect(&projection, 20.0, 20.0, 30.0, 30.0);
        assert_eq!(cut(&feature, &cutter, &projection), CutOutcome::Untouched);
    }

    #[test]
    fn test_cut_covering_removes() {
        let projection = Projection::new(2);
        let feature = rect(0, 0.0, 0.0, 10.0, 10.0);
        let cutter = display_rect(&projection, -5.0, -5.0, 15.0, 15.0);
        assert_eq!(cut(&feature, &cutter, &projection), CutOutcome::Removed);
    }

    #[test]
    fn test_cut_partial_keeps_one_polygon() {
        let projection = Projection::new(3);
        let mut feature = rect(4, 0.0, 0.0, 10.0, 10.0);
        feature.properties.grade = Some(Grade::TruePositive);
        let cutter = display_rect(&projection, 5.0, -5.0, 15.0, 15.0);

        let CutOutcome::Split(drafts) = cut(&feature, &cutter, &projection) else {
            panic!("expected a split");
        };
        assert_eq!(drafts.len(), 1);
        assert!((area(&drafts[0].rings) - 50.0).abs() < 1e-6);
        assert_eq!(drafts[0].properties.grade, None);
        assert!(drafts[0].rings.iter().all(|r| r.first() == r.last()));
    }

    #[test]
    fn test_cut_through_middle_splits() {
        let projection = Projection::new(1);
        let feature = rect(0, 0.0, 0.0, 30.0, 10.0);
        let cutter = display_rect(&projection, 10.0, -5.0, 20.0, 15.0);

        let CutOutcome::Split(drafts) = cut(&feature, &cutter, &projection) else {
            panic!("expected a split");
        };
        assert_eq!(drafts.len(), 2);
        for draft in &drafts {
            assert!((area(&draft.rings) - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_split_of_empty_result_is_removed() {
        let projection = Projection::new(0);
        let empty = MultiPolygon::new(Vec::new());
        assert_eq!(split_cut_result(&empty, &projection), CutOutcome::Removed);
    }

    #[test]
    fn test_merge_overlapping() {
        let a = rect(0, 0.0, 0.0, 10.0, 10.0);
        let b = rect(1, 5.0, 0.0, 15.0, 10.0);
        let drafts = merge(&[&a, &b]).unwrap();
        assert_eq!(drafts.len(), 1);
        assert!((area(&drafts[0].rings) - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_merge_disjoint_stays_split() {
        let a = rect(0, 0.0, 0.0, 10.0, 10.0);
        let b = rect(1, 20.0, 0.0, 30.0, 10.0);
        let c = rect(2, 40.0, 0.0, 50.0, 10.0);
        let drafts = merge(&[&a, &b, &c]).unwrap();
        assert_eq!(drafts.len(), 3);
    }

    #[test]
    fn test_merge_needs_two() {
        let a = rect(0, 0.0, 0.0, 10.0, 10.0);
        assert!(merge(&[&a]).is_none());
    }

    #[test]
    fn test_convex_hull() {
        let a = rect(0, 0.0, 0.0, 10.0, 10.0);
        let b = rect(1, 20.0, 0.0, 30.0, 10.0);
        let hull = convex_hull(&[&a, &b]).unwrap();
        assert!((area(&hull.rings) - 300.0).abs() < 1e-6);
        assert_eq!(hull.rings.len(), 1);
    }

    #[test]
    fn test_convex_hull_degenerate() {
        let line = Feature::new(
            0,
            FeatureDraft::from_rings(vec![vec![[0.0, 0.0], [5.0, 5.0], [10.0, 10.0]]]),
        );
        assert!(convex_hull(&[&line]).is_none());
        assert!(convex_hull(&[]).is_none());
    }

    #[test]
    fn test_simplify_triangle_is_noop() {
        let triangle = Feature::new(
            0,
            FeatureDraft::from_rings(vec![vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]]]),
        );
        let outcome = simplify(&triangle, MAX_SIMPLIFY_TOLERANCE);
        assert!(!outcome.changed);
        assert_eq!(outcome.feature, triangle);
    }

    #[test]
    fn test_simplify_removes_near_collinear_point() {
        // The point at (5, 0.4) is within 1 px of the bottom edge.
        let feature = Feature::new(
            0,
            FeatureDraft::from_rings(vec![vec![
                [0.0, 0.0],
                [5.0, 0.4],
                [10.0, 0.0],
                [10.0, 10.0],
                [0.0, 10.0],
            ]]),
        );
        let outcome = simplify(&feature, MAX_SIMPLIFY_TOLERANCE);
        assert!(outcome.changed);
        assert_eq!(outcome.feature.properties.simplify_tolerance, 1);
        assert_eq!(outcome.feature.ring_shape(), vec![5]);
        assert!(outcome.feature.is_closed());
    }

    #[test]
    fn test_simplify_raises_tolerance_until_change() {
        // The middle vertex is 3 px off the edge: tolerances 1 and 2 keep it.
        let feature = Feature::new(
            0,
            FeatureDraft::from_rings(vec![vec![
                [0.0, 0.0],
                [50.0, 3.0],
                [100.0, 0.0],
                [100.0, 100.0],
                [0.0, 100.0],
            ]]),
        );
        let outcome = simplify(&feature, MAX_SIMPLIFY_TOLERANCE);
        assert!(outcome.changed);
        assert_eq!(outcome.feature.properties.simplify_tolerance, 3);
        assert_eq!(outcome.feature.ring_shape(), vec![5]);
    }

    #[test]
    fn test_simplify_at_ceiling_is_noop() {
        let mut feature = rect(0, 0.0, 0.0, 10.0, 10.0);
        feature.properties.simplify_tolerance = MAX_SIMPLIFY_TOLERANCE;
        let outcome = simplify(&feature, MAX_SIMPLIFY_TOLERANCE);
        assert!(!outcome.changed);
        assert_eq!(outcome.feature.properties.simplify_tolerance, MAX_SIMPLIFY_TOLERANCE);
    }

    #[test]
    fn test_simplify_stops_at_ceiling_without_change() {
        // A square never loses a vertex without collapsing, so the tolerance
        // climbs to the ceiling and the geometry stays.
        let feature = rect(0, 0.0, 0.0, 10.0, 10.0);
        let outcome = simplify(&feature, 50);
        assert!(outcome.changed);
        assert_eq!(outcome.feature.properties.simplify_tolerance, 50);
        assert_eq!(outcome.feature.rings, feature.rings);
    }

    #[test]
    fn test_remove_holes() {
        let mut feature = rect(0, 0.0, 0.0, 10.0, 10.0);
        assert!(remove_holes(&feature).is_none());
        feature
            .rings
            .push(vec![[2.0, 2.0], [4.0, 2.0], [4.0, 4.0], [2.0, 2.0]]);
        let result = remove_holes(&feature).unwrap();
        assert_eq!(result.rings.len(), 1);
        assert_eq!(result.rings[0], feature.rings[0]);
    }
}
