//! Feature store: the authoritative feature map and its rendered layer.
//!
//! The feature map and the rendered [`FeatureLayer`] are always updated in
//! the same call, so both hold the same fids after every public operation.

use std::collections::{BTreeMap, BTreeSet};

use bioannot_view::{FeatureLayer, FeatureStyle, Projection, RenderedFeature, StrokeColor};

use crate::model::{Feature, FeatureDraft, FeatureId, FeatureRecord, Grade};

/// Stroke color for a grade.
pub fn grade_color(grade: Option<Grade>) -> StrokeColor {
    match grade {
        Some(Grade::TruePositive) => StrokeColor::Green,
        Some(Grade::FalsePositive) => StrokeColor::Red,
        Some(Grade::FalseNegative) => StrokeColor::Orange,
        None => StrokeColor::Default,
    }
}

#[derive(Debug)]
pub struct FeatureStore {
    features: BTreeMap<FeatureId, Feature>,
    layer: FeatureLayer,
    /// Fids marked for multi-feature operations.
    selection: BTreeSet<FeatureId>,
    projection: Projection,
    /// Highest fid ever assigned in this session. Never decreases.
    max_fid: Option<FeatureId>,
}

impl FeatureStore {
    pub fn new(projection: Projection) -> Self {
        Self {
            features: BTreeMap::new(),
            layer: FeatureLayer::new(),
            selection: BTreeSet::new(),
            projection,
            max_fid: None,
        }
    }

    /// Drop every feature, the selection and the fid high-water mark.
    /// Input handlers attached to the layer are kept.
    pub fn reset(&mut self, projection: Projection) {
        self.features.clear();
        self.layer.clear();
        self.selection.clear();
        self.projection = projection;
        self.max_fid = None;
        log::debug!("🗑️ Feature store cleared");
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Next free fid: one above every fid assigned so far.
    pub fn next_fid(&self) -> FeatureId {
        self.max_fid.map_or(0, |max| max + 1)
    }

    /// Insert a feature, assigning a fresh fid when `fid` is `None`.
    ///
    /// An existing feature with the same fid is overwritten.
    pub fn upsert(&mut self, fid: Option<FeatureId>, draft: FeatureDraft) -> FeatureId {
        let fid = fid.unwrap_or_else(|| self.next_fid());
        self.max_fid = Some(self.max_fid.map_or(fid, |max| max.max(fid)));
        let feature = Feature::new(fid, draft);
        log::debug!(
            "➕ Store: upsert fid {} ({} ring(s))",
            fid,
            feature.rings.len()
        );
        self.features.insert(fid, feature);
        self.render(fid);
        fid
    }

    /// Insert a new feature under a fresh fid.
    pub fn insert(&mut self, draft: FeatureDraft) -> FeatureId {
        self.upsert(None, draft)
    }

    /// Load a persisted record. Multi-polygons become one feature per part;
    /// the record's fid is kept for the first part unless it is already in
    /// use. Returns the fids of the loaded features.
    pub fn load_record(&mut self, record: FeatureRecord) -> Vec<FeatureId> {
        let (fid, drafts) = record.into_drafts();
        let mut fid = fid.filter(|fid| !self.features.contains_key(fid));
        drafts
            .into_iter()
            .map(|draft| self.upsert(fid.take(), draft))
            .collect()
    }

    /// Put a full feature back, keeping its fid. Used by undo and by edits.
    pub fn replace(&mut self, feature: Feature) {
        let fid = feature.fid;
        self.max_fid = Some(self.max_fid.map_or(fid, |max| max.max(fid)));
        log::debug!("🔄 Store: replace fid {}", fid);
        self.layer.remove(fid);
        self.features.insert(fid, feature);
        self.render(fid);
    }

    /// Remove a feature from both maps and from the selection.
    pub fn remove(&mut self, fid: FeatureId) -> Option<Feature> {
        let feature = self.features.remove(&fid)?;
        self.layer.remove(fid);
        self.selection.remove(&fid);
        log::debug!("➖ Store: remove fid {}", fid);
        Some(feature)
    }

    /// Change the grade of a feature and restyle it.
    pub fn set_grade(&mut self, fid: FeatureId, grade: Option<Grade>) -> bool {
        let Some(feature) = self.features.get_mut(&fid) else {
            return false;
        };
        feature.properties.grade = grade;
        self.restyle(fid);
        true
    }

    /// Change the score of a feature. Rendering does not depend on it.
    pub fn set_score(&mut self, fid: FeatureId, score: Option<u8>) -> bool {
        match self.features.get_mut(&fid) {
            Some(feature) => {
                feature.properties.score = score;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn base_style(&self, feature: &Feature) -> FeatureStyle {
        if self.selection.contains(&feature.fid) {
            FeatureStyle::selected()
        } else {
            FeatureStyle::colored(grade_color(feature.properties.grade))
        }
    }

    /// Rebuild the rendered representation of a feature from scratch.
    fn render(&mut self, fid: FeatureId) {
        let Some(feature) = self.features.get(&fid) else {
            return;
        };
        let rings = feature
            .rings
            .iter()
            .map(|ring| self.projection.ring_to_display(ring))
            .collect();
        let rendered = RenderedFeature::new(fid, rings, self.base_style(feature));
        self.layer.add(rendered);
    }

    fn restyle(&mut self, fid: FeatureId) {
        if let Some(feature) = self.features.get(&fid) {
            let style = self.base_style(feature);
            self.layer.set_base_style(fid, style);
        }
    }

    pub fn layer(&self) -> &FeatureLayer {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut FeatureLayer {
        &mut self.layer
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, fid: FeatureId) -> Option<&Feature> {
        self.features.get(&fid)
    }

    pub fn contains(&self, fid: FeatureId) -> bool {
        self.features.contains_key(&fid)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn fids(&self) -> Vec<FeatureId> {
        self.features.keys().copied().collect()
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// All features as persisted records, ordered by fid.
    pub fn to_records(&self) -> Vec<FeatureRecord> {
        self.features.values().map(Feature::to_record).collect()
    }

    /// Whether both maps hold exactly the same fids.
    pub fn is_consistent(&self) -> bool {
        self.features.keys().copied().eq(self.layer.fids())
            && self.selection.iter().all(|fid| self.features.contains_key(fid))
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Add or remove a feature from the selection. Returns whether it is
    /// selected afterwards.
    pub fn toggle_selected(&mut self, fid: FeatureId) -> bool {
        if !self.features.contains_key(&fid) {
            return false;
        }
        let selected = if self.selection.remove(&fid) {
            false
        } else {
            self.selection.insert(fid);
            true
        };
        log::debug!("🔘 Selection: fid {} -> {}", fid, selected);
        self.restyle(fid);
        selected
    }

    pub fn is_selected(&self, fid: FeatureId) -> bool {
        self.selection.contains(&fid)
    }

    pub fn selection(&self) -> Vec<FeatureId> {
        self.selection.iter().copied().collect()
    }

    pub fn clear_selection(&mut self) {
        let cleared = std::mem::take(&mut self.selection);
        for fid in cleared {
            self.restyle(fid);
        }
    }
}
