//! Batched undo for feature edits.
//!
//! Every user-visible operation records the state of each feature it is
//! about to touch as one [`UndoBatch`]. Undoing a batch restores those
//! snapshots; a snapshot without geometry (a tombstone) means the feature
//! did not exist before the operation and is deleted instead.

use crate::model::{Feature, FeatureId, FeatureProperties, Ring};

// ============================================================================
// Snapshots
// ============================================================================

/// Pre-operation state of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSnapshot {
    pub fid: FeatureId,
    /// `None` marks a tombstone.
    pub rings: Option<Vec<Ring>>,
    pub properties: FeatureProperties,
}

impl FeatureSnapshot {
    /// Full copy of an existing feature.
    pub fn of(feature: &Feature) -> Self {
        Self {
            fid: feature.fid,
            rings: Some(feature.rings.clone()),
            properties: feature.properties.clone(),
        }
    }

    /// Marker for a feature created by the operation.
    pub fn tombstone(fid: FeatureId) -> Self {
        Self {
            fid,
            rings: None,
            properties: FeatureProperties::default(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.rings.is_none()
    }

    /// The feature to restore, or `None` for a tombstone.
    pub fn into_feature(self) -> Option<Feature> {
        let rings = self.rings?;
        Some(Feature {
            fid: self.fid,
            rings,
            properties: self.properties,
        })
    }
}

/// Snapshots that together reverse one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoBatch {
    /// Description of the operation, for logs and the undo control.
    pub description: String,
    pub snapshots: Vec<FeatureSnapshot>,
}

impl UndoBatch {
    pub fn new(description: impl Into<String>, snapshots: Vec<FeatureSnapshot>) -> Self {
        Self {
            description: description.into(),
            snapshots,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// Configuration for the undo stack
#[derive(Debug, Clone, Default)]
pub struct UndoConfig {
    /// Maximum number of batches to keep; `None` keeps everything.
    pub max_history: Option<usize>,
}

/// Stack of undo batches, most recent at the end.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    batches: Vec<UndoBatch>,
    config: UndoConfig,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Push a batch. Empty batches are dropped; returns whether the batch
    /// was recorded.
    pub fn push(&mut self, batch: UndoBatch) -> bool {
        if batch.is_empty() {
            log::trace!("Undo: skipped empty batch '{}'", batch.description);
            return false;
        }
        log::debug!(
            "📝 Undo: pushed '{}' ({} snapshot(s))",
            batch.description,
            batch.len()
        );
        self.batches.push(batch);

        if let Some(max) = self.config.max_history {
            while self.batches.len() > max {
                self.batches.remove(0);
            }
        }
        true
    }

    /// Pop the most recent batch.
    pub fn pop(&mut self) -> Option<UndoBatch> {
        let batch = self.batches.pop()?;
        log::debug!("⏪ Undo: '{}'", batch.description);
        Some(batch)
    }

    /// Whether the undo control should be shown.
    pub fn can_undo(&self) -> bool {
        !self.batches.is_empty()
    }

    /// Description of the batch that would be undone next.
    pub fn undo_description(&self) -> Option<&str> {
        self.batches.last().map(|b| b.description.as_str())
    }

    pub fn clear(&mut self) {
        self.batches.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureDraft, Grade};

    fn feature(fid: FeatureId) -> Feature {
        let mut feature = Feature::new(
            fid,
            FeatureDraft::from_rings(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]]),
        );
        feature.properties.grade = Some(Grade::FalseNegative);
        feature
    }

    #[test]
    fn test_undo_stack_basic() {
        let mut stack = UndoStack::new();
        assert!(!stack.can_undo());

        stack.push(UndoBatch::new("Create", vec![FeatureSnapshot::tombstone(0)]));
        assert!(stack.can_undo());
        assert_eq!(stack.undo_description(), Some("Create"));

        let batch = stack.pop().unwrap();
        assert!(batch.snapshots[0].is_tombstone());
        assert!(!stack.can_undo());
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let mut stack = UndoStack::new();
        assert!(!stack.push(UndoBatch::new("Simplify", Vec::new())));
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_max_history() {
        let mut stack = UndoStack::with_config(UndoConfig {
            max_history: Some(3),
        });
        for fid in 0..5 {
            stack.push(UndoBatch::new("Create", vec![FeatureSnapshot::tombstone(fid)]));
        }
        assert_eq!(stack.len(), 3);
        // Oldest batches are dropped first.
        assert_eq!(stack.pop().unwrap().snapshots[0].fid, 4);
    }

    #[test]
    fn test_unlimited_history() {
        let mut stack = UndoStack::new();
        for fid in 0..500 {
            stack.push(UndoBatch::new("Create", vec![FeatureSnapshot::tombstone(fid)]));
        }
        assert_eq!(stack.len(), 500);
    }

    #[test]
    fn test_snapshot_restores_feature() {
        let original = feature(7);
        let snapshot = FeatureSnapshot::of(&original);
        assert!(!snapshot.is_tombstone());
        assert_eq!(snapshot.into_feature(), Some(original));
        assert_eq!(FeatureSnapshot::tombstone(7).into_feature(), None);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut original = feature(1);
        let snapshot = FeatureSnapshot::of(&original);
        original.rings[0][0] = [5.0, 5.0];
        original.properties.grade = None;
        let restored = snapshot.into_feature().unwrap();
        assert_eq!(restored.rings[0][0], [0.0, 0.0]);
        assert_eq!(restored.properties.grade, Some(Grade::FalseNegative));
    }
}
