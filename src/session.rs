//! Annotation session controller.
//!
//! Every user gesture maps to one method here. Each method runs to
//! completion in the same order: mutate the feature store, push the undo
//! batch, refresh the rendered layer, set the unsaved-changes flag. Calls to
//! the persistence and export boundaries never apply partially: on failure
//! the in-memory state is left exactly as it was and a notice is queued.

use web_time::Instant;

use bioannot_view::{DisplayPoint, FeatureHandler, TileSource, Viewport};

use crate::backend::{AnnotationBackend, MaskKey};
use crate::config::AppConfig;
use crate::constants::EXPORT_BLOCKED_MESSAGE;
use crate::error::{SessionError, SessionResult};
use crate::export::{ExportDocument, ExportSink, RasterOptions, raster_url};
use crate::geometry::{self, CutOutcome};
use crate::mode::{Affordances, Mode, ModeMachine};
use crate::model::{
    AnnotationData, Feature, FeatureDraft, FeatureId, Grade, GradeStatistics, ImageMetadata,
    MIN_POLYGON_VERTICES, Position, Ring, close_ring,
};
use crate::store::FeatureStore;
use crate::undo::{FeatureSnapshot, UndoBatch, UndoStack};

/// Message for the user, shown as a blocking notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Actions offered in the popup of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureActions {
    pub fid: FeatureId,
    /// "Edit", or "Finish edit" while the feature is being reshaped.
    pub edit_label: &'static str,
    /// Hidden (`None`) once the feature cannot be simplified further.
    pub simplify_label: Option<&'static str>,
    /// Hidden (`None`) for features without holes.
    pub remove_holes_label: Option<&'static str>,
    pub grade: Option<Grade>,
    pub score: Option<u8>,
}

/// Result of clicking a rendered feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureClick {
    PopupOpened(FeatureActions),
    SelectionToggled { selected: bool },
    /// The click belongs to an active tool or nothing was hit.
    Ignored,
}

/// Session-wide controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionControls {
    pub toolbar: Affordances,
    pub show_undo: bool,
    pub unsaved_changes: bool,
}

/// What a single undo call did.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoReport {
    pub description: String,
    /// Features put back into the store.
    pub restored: Vec<FeatureId>,
    /// Features the undone operation had created.
    pub deleted: Vec<FeatureId>,
    /// Where the viewport was panned, for single-feature batches.
    pub panned_to: Option<DisplayPoint>,
}

pub struct AnnotationSession<B: AnnotationBackend> {
    backend: B,
    key: MaskKey,
    config: AppConfig,
    image: ImageMetadata,
    tiles: TileSource,
    viewport: Viewport,
    store: FeatureStore,
    undo: UndoStack,
    modes: ModeMachine,
    /// Feature currently being reshaped.
    editing: Option<FeatureId>,
    overall_score: Option<u8>,
    unsaved_changes: bool,
    notices: Vec<Notice>,
}

impl<B: AnnotationBackend> AnnotationSession<B> {
    /// Fetch the image and its annotation data and start a fresh session.
    pub fn start(backend: B, key: MaskKey, config: AppConfig) -> SessionResult<Self> {
        let image = backend.fetch_image_metadata(&key.image_id)?;
        let data = backend.fetch_annotation_data(&key)?;
        let tiles = TileSource::new(
            &config.api_url,
            &key.image_id,
            image.width,
            image.height,
            config.tile_size,
        );
        let mut session = Self {
            store: FeatureStore::new(tiles.projection()),
            undo: UndoStack::with_config(config.undo_config()),
            viewport: Viewport::new(),
            modes: ModeMachine::new(),
            editing: None,
            overall_score: None,
            unsaved_changes: false,
            notices: Vec::new(),
            backend,
            key,
            config,
            image,
            tiles,
        };
        session.initialize(data);
        Ok(session)
    }

    /// Reset every piece of session state and load `data`.
    fn initialize(&mut self, data: AnnotationData) {
        self.modes.enter(Mode::Idle, &mut self.store);
        self.editing = None;
        self.store.reset(self.tiles.projection());
        self.undo.clear();

        let record_count = data.features.len();
        for record in data.features {
            self.store.load_record(record);
        }
        self.overall_score = data.overall_score;
        self.unsaved_changes = false;

        let max_bounds = self.tiles.max_bounds(self.config.max_bounds_tile_offset);
        self.viewport = Viewport::new().with_max_bounds(max_bounds);
        self.viewport
            .set_view(self.tiles.image_bounds().center(), 0.0);

        log::info!(
            "🚀 Session {}: {} record(s) -> {} feature(s), native zoom {}",
            self.key,
            record_count,
            self.store.len(),
            self.tiles.max_native_zoom()
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn key(&self) -> &MaskKey {
        &self.key
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn image(&self) -> &ImageMetadata {
        &self.image
    }

    pub fn tiles(&self) -> &TileSource {
        &self.tiles
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn feature(&self, fid: FeatureId) -> Option<&Feature> {
        self.store.get(fid)
    }

    pub fn current_mode(&self) -> Mode {
        self.modes.current_mode()
    }

    pub fn editing(&self) -> Option<FeatureId> {
        self.editing
    }

    pub fn overall_score(&self) -> Option<u8> {
        self.overall_score
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    /// Whether closing or navigating away needs a warning.
    pub fn should_warn_before_close(&self) -> bool {
        self.unsaved_changes
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn controls(&self) -> SessionControls {
        SessionControls {
            toolbar: self.modes.affordances(),
            show_undo: self.undo.can_undo(),
            unsaved_changes: self.unsaved_changes,
        }
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// The persisted unit as it would be saved now.
    pub fn annotation_data(&self) -> AnnotationData {
        AnnotationData::new(self.store.to_records(), self.overall_score)
    }

    pub fn statistics(&self) -> GradeStatistics {
        GradeStatistics::collect(self.store.features(), self.overall_score)
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn mark_unsaved(&mut self) {
        if !self.unsaved_changes {
            log::debug!("✏️ Unsaved changes");
        }
        self.unsaved_changes = true;
    }

    /// Record an operation. Operations that touched nothing leave no trace.
    fn record(&mut self, description: &str, snapshots: Vec<FeatureSnapshot>) -> bool {
        let recorded = self.undo.push(UndoBatch::new(description, snapshots));
        if recorded {
            self.mark_unsaved();
        }
        recorded
    }

    /// Replace `consumed` features by new ones built from `drafts`, returning
    /// the undo snapshots and the new fids.
    fn consume_and_insert(
        &mut self,
        consumed: &[FeatureId],
        drafts: Vec<FeatureDraft>,
    ) -> (Vec<FeatureSnapshot>, Vec<FeatureId>) {
        let mut snapshots = Vec::with_capacity(consumed.len() + drafts.len());
        for fid in consumed {
            if let Some(feature) = self.store.remove(*fid) {
                snapshots.push(FeatureSnapshot::of(&feature));
            }
        }
        let created: Vec<FeatureId> = drafts
            .into_iter()
            .map(|draft| self.store.insert(draft))
            .collect();
        snapshots.extend(created.iter().map(|fid| FeatureSnapshot::tombstone(*fid)));
        (snapshots, created)
    }

    /// Features a batch operation applies to: the selection, or everything
    /// when nothing is selected.
    fn batch_targets(&self) -> Vec<FeatureId> {
        let selection = self.store.selection();
        if selection.is_empty() {
            self.store.fids()
        } else {
            selection
        }
    }

    // ========================================================================
    // Modes
    // ========================================================================

    pub fn enter_mode(&mut self, mode: Mode) -> Affordances {
        self.cancel_edit();
        self.modes.enter(mode, &mut self.store)
    }

    pub fn exit_mode(&mut self, mode: Mode) -> Affordances {
        self.modes.exit(mode, &mut self.store)
    }

    pub fn toggle_mode(&mut self, mode: Mode) -> Affordances {
        self.cancel_edit();
        self.modes.toggle(mode, &mut self.store)
    }

    pub fn toggle_toolbar(&mut self) -> Affordances {
        self.modes.toggle_toolbar()
    }

    /// Place a vertex for the draw or cut tool.
    pub fn place_vertex(&mut self, point: DisplayPoint) -> bool {
        self.modes.place_vertex(point)
    }

    pub fn remove_last_vertex(&mut self) -> Affordances {
        self.modes.remove_last_vertex(&mut self.store)
    }

    // ========================================================================
    // Feature clicks
    // ========================================================================

    /// Route a click on a rendered feature to the handler attached to it.
    pub fn click_feature(&mut self, fid: FeatureId) -> FeatureClick {
        let Some(handler) = self.store.layer().get(fid).map(|f| f.handler) else {
            return FeatureClick::Ignored;
        };
        match handler {
            FeatureHandler::OpenPopup => match self.open_popup(fid) {
                Some(actions) => FeatureClick::PopupOpened(actions),
                None => FeatureClick::Ignored,
            },
            FeatureHandler::ToggleSelection => FeatureClick::SelectionToggled {
                selected: self.store.toggle_selected(fid),
            },
            FeatureHandler::Captured | FeatureHandler::VertexEdit { .. } => FeatureClick::Ignored,
        }
    }

    /// Open the popup of a feature and describe its actions.
    pub fn open_popup(&mut self, fid: FeatureId) -> Option<FeatureActions> {
        if !self.modes.allows_feature_popup() {
            return None;
        }
        if !self.store.layer_mut().open_popup(fid) {
            return None;
        }
        self.feature_actions(fid)
    }

    pub fn close_popup(&mut self) {
        self.store.layer_mut().close_popup();
    }

    pub fn feature_actions(&self, fid: FeatureId) -> Option<FeatureActions> {
        let feature = self.store.get(fid)?;
        let simplify_label = if !feature.can_simplify(self.config.max_simplify_tolerance) {
            None
        } else if feature.properties.simplify_tolerance == 0 {
            Some("Simplify")
        } else {
            Some("Simplify more")
        };
        let remove_holes_label = match feature.hole_count() {
            0 => None,
            1 => Some("Remove hole"),
            _ => Some("Remove holes"),
        };
        Some(FeatureActions {
            fid,
            edit_label: if self.editing == Some(fid) {
                "Finish edit"
            } else {
                "Edit"
            },
            simplify_label,
            remove_holes_label,
            grade: feature.properties.grade,
            score: feature.properties.score,
        })
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Complete the polygon being drawn.
    ///
    /// Repeated consecutive clicks count once. Fewer than three distinct
    /// vertices or a self-intersecting outline leave draw mode active and
    /// create nothing.
    pub fn finish_drawing(&mut self) -> Option<FeatureId> {
        if !self.modes.is_active(Mode::Draw) {
            return None;
        }
        let ring: Ring = geometry::remove_repeated_vertices(
            &self.store.projection().ring_to_pixel(self.modes.vertices()),
        );
        let mut distinct: Vec<Position> = Vec::with_capacity(ring.len());
        for p in &ring {
            if !distinct.contains(p) {
                distinct.push(*p);
            }
        }
        if distinct.len() < MIN_POLYGON_VERTICES {
            log::warn!("Ignoring polygon with {} distinct vertices", distinct.len());
            return None;
        }
        if geometry::is_self_intersecting(&ring) {
            log::warn!("Ignoring self-intersecting polygon");
            return None;
        }
        self.modes.finish_draw(&mut self.store)?;

        let fid = self.store.insert(FeatureDraft::from_rings(vec![ring]));
        self.record("Create", vec![FeatureSnapshot::tombstone(fid)]);
        log::debug!("🆕 Created feature {}", fid);
        Some(fid)
    }

    /// Discard the polygon being drawn.
    pub fn cancel_drawing(&mut self) -> Affordances {
        self.modes.exit(Mode::Draw, &mut self.store)
    }

    // ========================================================================
    // Reshape
    // ========================================================================

    /// Show vertex handles on a feature.
    pub fn begin_edit(&mut self, fid: FeatureId) -> bool {
        if !self.modes.allows_feature_popup() || !self.store.contains(fid) {
            return false;
        }
        self.cancel_edit();
        let marker_limit = self.config.edit_marker_limit;
        let layer = self.store.layer_mut();
        layer.close_popup();
        layer.set_handler(fid, FeatureHandler::VertexEdit { marker_limit });
        self.editing = Some(fid);
        log::debug!("📐 Editing feature {}", fid);
        true
    }

    /// Store the rings produced by the vertex editor.
    ///
    /// Rings are closed before storage. An outline with fewer than three
    /// vertices is rejected and the edit cancelled.
    pub fn commit_edit(&mut self, rings: Vec<Vec<DisplayPoint>>) -> bool {
        let Some(fid) = self.editing.take() else {
            return false;
        };
        let Some(old) = self.store.get(fid).cloned() else {
            return false;
        };

        let mut new_rings: Vec<Ring> = rings
            .iter()
            .map(|ring| self.store.projection().ring_to_pixel(ring))
            .filter(|ring| !ring.is_empty())
            .collect();
        for ring in &mut new_rings {
            close_ring(ring);
        }
        let outer_ok = new_rings
            .first()
            .is_some_and(|outer| outer.len() > MIN_POLYGON_VERTICES);
        if !outer_ok || new_rings == old.rings {
            if !outer_ok {
                log::warn!("Ignoring degenerate edit of feature {}", fid);
            }
            let handler = self.store.layer().default_handler();
            self.store.layer_mut().set_handler(fid, handler);
            return false;
        }

        let snapshot = FeatureSnapshot::of(&old);
        let mut feature = old;
        feature.rings = new_rings;
        self.store.replace(feature);
        self.record("Edit", vec![snapshot])
    }

    /// Drop the vertex handles without changing the feature. Every other
    /// geometry operation ends an active edit this way first.
    pub fn cancel_edit(&mut self) {
        if let Some(fid) = self.editing.take() {
            let handler = self.store.layer().default_handler();
            self.store.layer_mut().set_handler(fid, handler);
            log::debug!("📐 Edit of feature {} cancelled", fid);
        }
    }

    // ========================================================================
    // Cut
    // ========================================================================

    /// Apply the cut shape placed in cut mode to every feature it overlaps.
    ///
    /// Cut mode is left afterwards; the whole gesture is one undo step.
    /// Returns the fids of the features created by splitting.
    pub fn finish_cut(&mut self) -> Vec<FeatureId> {
        self.cancel_edit();
        let Some(cutter) = self.modes.finish_cut(&mut self.store) else {
            return Vec::new();
        };
        let projection = *self.store.projection();
        let outcomes: Vec<(FeatureId, CutOutcome)> = self
            .store
            .features()
            .map(|feature| (feature.fid, geometry::cut(feature, &cutter, &projection)))
            .filter(|(_, outcome)| *outcome != CutOutcome::Untouched)
            .collect();

        let mut snapshots = Vec::new();
        let mut created = Vec::new();
        for (fid, outcome) in outcomes {
            let drafts = match outcome {
                CutOutcome::Untouched => continue,
                CutOutcome::Removed => {
                    log::debug!("✂️ Cut removed feature {}", fid);
                    Vec::new()
                }
                CutOutcome::Split(drafts) => {
                    log::debug!("✂️ Cut split feature {} into {}", fid, drafts.len());
                    drafts
                }
            };
            let (mut batch, mut new_fids) = self.consume_and_insert(&[fid], drafts);
            snapshots.append(&mut batch);
            created.append(&mut new_fids);
        }
        self.record("Cut", snapshots);
        created
    }

    // ========================================================================
    // Merge / convex hull
    // ========================================================================

    /// Union the selected features. Needs at least two.
    pub fn merge_selected(&mut self) -> Vec<FeatureId> {
        self.cancel_edit();
        let selection = self.store.selection();
        let features: Vec<&Feature> = selection.iter().filter_map(|fid| self.store.get(*fid)).collect();
        let Some(drafts) = geometry::merge(&features) else {
            log::debug!("Merge needs at least two selected features");
            return Vec::new();
        };
        let (snapshots, created) = self.consume_and_insert(&selection, drafts);
        self.record("Merge", snapshots);
        log::debug!("🔗 Merged {:?} into {:?}", selection, created);
        created
    }

    /// Replace the selected features by their convex hull.
    pub fn convex_hull_selected(&mut self) -> Option<FeatureId> {
        self.cancel_edit();
        let selection = self.store.selection();
        let features: Vec<&Feature> = selection.iter().filter_map(|fid| self.store.get(*fid)).collect();
        let Some(draft) = geometry::convex_hull(&features) else {
            log::warn!("Selection does not span a convex hull");
            return None;
        };
        let (snapshots, created) = self.consume_and_insert(&selection, vec![draft]);
        self.record("Convex hull", snapshots);
        created.first().copied()
    }

    // ========================================================================
    // Simplify / holes
    // ========================================================================

    /// Simplify without recording; returns the pre-step snapshot if the
    /// feature changed.
    fn simplify_feature(&mut self, fid: FeatureId) -> Option<FeatureSnapshot> {
        let feature = self.store.get(fid)?;
        let outcome = geometry::simplify(feature, self.config.max_simplify_tolerance);
        if !outcome.changed {
            return None;
        }
        let snapshot = FeatureSnapshot::of(feature);
        self.store.replace(outcome.feature);
        Some(snapshot)
    }

    pub fn simplify(&mut self, fid: FeatureId) -> bool {
        self.cancel_edit();
        match self.simplify_feature(fid) {
            Some(snapshot) => self.record("Simplify", vec![snapshot]),
            None => false,
        }
    }

    /// Simplify the selection (or every feature). Returns how many changed.
    pub fn simplify_all(&mut self) -> usize {
        self.cancel_edit();
        let snapshots: Vec<FeatureSnapshot> = self
            .batch_targets()
            .into_iter()
            .filter_map(|fid| self.simplify_feature(fid))
            .collect();
        let count = snapshots.len();
        self.record("Simplify all", snapshots);
        count
    }

    fn remove_holes_feature(&mut self, fid: FeatureId) -> Option<FeatureSnapshot> {
        let feature = self.store.get(fid)?;
        let result = geometry::remove_holes(feature)?;
        let snapshot = FeatureSnapshot::of(feature);
        self.store.replace(result);
        Some(snapshot)
    }

    pub fn remove_holes(&mut self, fid: FeatureId) -> bool {
        self.cancel_edit();
        match self.remove_holes_feature(fid) {
            Some(snapshot) => self.record("Remove holes", vec![snapshot]),
            None => false,
        }
    }

    /// Remove holes from the selection (or every feature). Returns how many
    /// features changed.
    pub fn remove_all_holes(&mut self) -> usize {
        self.cancel_edit();
        let snapshots: Vec<FeatureSnapshot> = self
            .batch_targets()
            .into_iter()
            .filter_map(|fid| self.remove_holes_feature(fid))
            .collect();
        let count = snapshots.len();
        self.record("Remove all holes", snapshots);
        count
    }

    // ========================================================================
    // Delete
    // ========================================================================

    pub fn delete(&mut self, fid: FeatureId) -> bool {
        self.cancel_edit();
        match self.store.remove(fid) {
            Some(feature) => self.record("Delete", vec![FeatureSnapshot::of(&feature)]),
            None => false,
        }
    }

    /// Delete every selected feature as one undo step.
    pub fn delete_selected(&mut self) -> usize {
        self.cancel_edit();
        let selection = self.store.selection();
        let (snapshots, _) = self.consume_and_insert(&selection, Vec::new());
        let count = snapshots.len();
        self.record("Delete selected", snapshots);
        count
    }

    // ========================================================================
    // Grading
    // ========================================================================

    pub fn set_grade(&mut self, fid: FeatureId, grade: Option<Grade>) -> bool {
        if !self.store.set_grade(fid, grade) {
            return false;
        }
        self.mark_unsaved();
        true
    }

    /// Set a feature's score from user text. Empty text clears the score;
    /// anything that is not an integer in 0-100 is ignored.
    pub fn set_score_text(&mut self, fid: FeatureId, text: &str) -> bool {
        let text = text.trim();
        let score = if text.is_empty() {
            None
        } else {
            match parse_score(text) {
                Some(score) => Some(score),
                None => {
                    log::warn!("Ignoring invalid score {:?} for feature {}", text, fid);
                    return false;
                }
            }
        };
        if !self.store.set_score(fid, score) {
            return false;
        }
        self.mark_unsaved();
        true
    }

    /// Set the overall score from user text. Empty text (a dismissed prompt)
    /// and invalid values leave the score unchanged.
    pub fn set_overall_score_text(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(score) = parse_score(text) else {
            log::warn!("Ignoring invalid overall score {:?}", text);
            return false;
        };
        self.overall_score = Some(score);
        self.mark_unsaved();
        true
    }

    // ========================================================================
    // Undo
    // ========================================================================

    pub fn undo(&mut self) -> Option<UndoReport> {
        self.undo_at(Instant::now())
    }

    /// Undo the most recent operation; highlights run from `now`.
    pub fn undo_at(&mut self, now: Instant) -> Option<UndoReport> {
        self.cancel_edit();
        let batch = self.undo.pop()?;
        let single = batch.len() == 1;

        let mut restored = Vec::new();
        let mut deleted = Vec::new();
        for snapshot in batch.snapshots.into_iter().rev() {
            let fid = snapshot.fid;
            match snapshot.into_feature() {
                Some(feature) => {
                    self.store.replace(feature);
                    restored.push(fid);
                }
                None => {
                    self.store.remove(fid);
                    deleted.push(fid);
                }
            }
        }

        let duration = self.config.highlight_duration();
        for fid in &restored {
            self.store.layer_mut().highlight(*fid, now, duration);
        }

        let mut panned_to = None;
        if single {
            if let Some(center) = restored
                .first()
                .and_then(|fid| self.store.layer().bounds(*fid))
                .map(|bounds| bounds.center())
            {
                self.viewport.pan_to(center);
                panned_to = Some(center);
            }
        }

        self.mark_unsaved();
        Some(UndoReport {
            description: batch.description,
            restored,
            deleted,
            panned_to,
        })
    }

    /// Advance timers: expired undo highlights go back to normal styling.
    pub fn tick(&mut self) -> Vec<FeatureId> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Vec<FeatureId> {
        self.store.layer_mut().expire_highlights(now)
    }

    // ========================================================================
    // Persistence / export
    // ========================================================================

    fn report_failure(&mut self, action: &str, error: SessionError) -> SessionError {
        log::warn!("{} failed: {}", action, error);
        self.notices
            .push(Notice::Error(format!("{} failed: {}", action, error)));
        error
    }

    /// Push the current annotation data to the backend.
    pub fn save(&mut self) -> SessionResult<()> {
        let data = self.annotation_data();
        if let Err(e) = self.backend.save_annotation_data(&self.key, &data) {
            return Err(self.report_failure("Save", e.into()));
        }
        self.unsaved_changes = false;
        log::info!("💾 Saved {} feature(s)", data.features.len());
        self.notices.push(Notice::Info("Changes saved.".to_string()));
        Ok(())
    }

    /// Discard every edit, saved or not, and restart from the
    /// ingestion-time data. `confirm` is asked first.
    pub fn reset(&mut self, confirm: impl FnOnce() -> bool) -> SessionResult<()> {
        if !confirm() {
            log::debug!("Reset not confirmed");
            return Err(SessionError::ResetNotConfirmed);
        }
        if let Err(e) = self.backend.reset_annotation_data(&self.key) {
            return Err(self.report_failure("Reset", e.into()));
        }
        let data = match self.backend.fetch_annotation_data(&self.key) {
            Ok(data) => data,
            Err(e) => return Err(self.report_failure("Reset", e.into())),
        };
        self.initialize(data);
        log::info!("↩️ Session {} reset", self.key);
        Ok(())
    }

    /// Hand the saved annotation data to `sink`. Refused while there are
    /// unsaved changes.
    pub fn export(&mut self, sink: &mut dyn ExportSink, options: RasterOptions) -> SessionResult<()> {
        if self.unsaved_changes {
            log::warn!("Export refused: unsaved changes");
            self.notices
                .push(Notice::Error(EXPORT_BLOCKED_MESSAGE.to_string()));
            return Err(SessionError::UnsavedChanges);
        }
        let document = ExportDocument::from_data(&self.annotation_data());
        let result = raster_url(&self.config.api_url, &self.key, options)
            .and_then(|url| sink.export(&self.key, &document, &url));
        if let Err(e) = result {
            return Err(self.report_failure("Export", e.into()));
        }
        log::info!("📤 Exported {}", self.key);
        Ok(())
    }
}

/// Parse an integer score in 0-100.
fn parse_score(text: &str) -> Option<u8> {
    text.parse::<u8>().ok().filter(|score| *score <= 100)
}
