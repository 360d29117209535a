//! End-to-end annotation session scenarios.

use bioannot::model::{
    AnnotationData, FeatureId, FeatureRecord, Geometry, Grade, ImageMetadata,
    MAX_SIMPLIFY_TOLERANCE, Ring,
};
use bioannot::{
    AnnotationBackend, AnnotationSession, AppConfig, FileBackend, MaskKey, MemoryBackend,
    MemoryExportSink, Mode, Notice, RasterOptions, SessionError,
};
use bioannot_view::{PixelPoint, Projection};

type Session = AnnotationSession<MemoryBackend>;

fn key() -> MaskKey {
    MaskKey::new("image-1", "mask-1")
}

fn square(x: f64, y: f64, size: f64) -> FeatureRecord {
    FeatureRecord::polygon(vec![vec![
        [x, y],
        [x + size, y],
        [x + size, y + size],
        [x, y + size],
        [x, y],
    ]])
}

/// A 1024 x 1024 image: native zoom 3, eight pixels per display unit.
fn session_with(records: Vec<FeatureRecord>) -> Session {
    let backend = MemoryBackend::with_mask(
        &key(),
        ImageMetadata::with_size("image-1", 1024, 1024),
        AnnotationData::new(records, None),
    );
    AnnotationSession::start(backend, key(), AppConfig::default()).unwrap()
}

fn projection(session: &Session) -> Projection {
    *session.store().projection()
}

fn draw(session: &mut Session, points: &[[f64; 2]]) -> Option<FeatureId> {
    let projection = projection(session);
    session.enter_mode(Mode::Draw);
    for p in points {
        session.place_vertex(projection.pixel_to_display(PixelPoint::from_position(*p)));
    }
    session.finish_drawing()
}

fn cut(session: &mut Session, points: &[[f64; 2]]) -> Vec<FeatureId> {
    let projection = projection(session);
    session.enter_mode(Mode::Cut);
    for p in points {
        session.place_vertex(projection.pixel_to_display(PixelPoint::from_position(*p)));
    }
    session.finish_cut()
}

fn all_rings_closed(session: &Session) -> bool {
    session.store().features().all(|f| f.is_closed())
}

#[test]
fn transform_round_trips() {
    for zoom in [0u8, 3, 9, 14] {
        let projection = Projection::new(zoom);
        for p in [[0.0, 0.0], [1.5, 2.25], [123_456.0, 98_765.5], [7.0, 40_000.125]] {
            let point = PixelPoint::from_position(p);
            let back = projection.display_to_pixel(projection.pixel_to_display(point));
            assert!((back.x - point.x).abs() < 1e-9);
            assert!((back.y - point.y).abs() < 1e-9);
        }
    }
}

#[test]
fn create_then_undo() {
    let mut session = session_with(Vec::new());
    let fid = draw(&mut session, &[[10.0, 10.0], [50.0, 10.0], [10.0, 50.0]]).unwrap();

    assert_eq!(session.store().len(), 1);
    let feature = session.feature(fid).unwrap();
    assert_eq!(feature.properties.simplify_tolerance, 0);
    assert_eq!(feature.rings[0].len(), 4);
    assert!(all_rings_closed(&session));
    assert_eq!(session.current_mode(), Mode::Idle);
    assert!(session.controls().show_undo);
    assert!(session.has_unsaved_changes());

    let report = session.undo().unwrap();
    assert_eq!(report.deleted, vec![fid]);
    assert!(session.store().is_empty());
    assert!(!session.controls().show_undo);
    assert!(session.has_unsaved_changes());
    assert!(session.store().is_consistent());
}

#[test]
fn no_op_simplify_leaves_no_trace() {
    let triangle = FeatureRecord::polygon(vec![vec![[0.0, 0.0], [40.0, 0.0], [0.0, 40.0], [0.0, 0.0]]]);
    let mut session = session_with(vec![triangle]);

    assert!(!session.simplify(0));
    assert_eq!(session.simplify_all(), 0);
    assert!(!session.can_undo());
    assert!(!session.has_unsaved_changes());
}

#[test]
fn simplify_ceiling() {
    let mut record = square(0.0, 0.0, 100.0);
    record.properties.simplify_tolerance = MAX_SIMPLIFY_TOLERANCE;
    let mut session = session_with(vec![record]);

    let before = session.feature(0).unwrap().clone();
    assert!(!session.simplify(0));
    assert_eq!(session.feature(0).unwrap(), &before);
    assert_eq!(session.feature_actions(0).unwrap().simplify_label, None);
    assert!(!session.can_undo());
}

#[test]
fn simplify_all_records_only_changed_features() {
    let triangle = FeatureRecord::polygon(vec![vec![[0.0, 0.0], [40.0, 0.0], [0.0, 40.0], [0.0, 0.0]]]);
    let bumpy = FeatureRecord::polygon(vec![vec![
        [200.0, 200.0],
        [250.0, 200.5],
        [300.0, 200.0],
        [300.0, 300.0],
        [200.0, 300.0],
        [200.0, 200.0],
    ]]);
    let mut session = session_with(vec![triangle, bumpy]);

    assert_eq!(session.simplify_all(), 1);
    assert_eq!(session.undo_len(), 1);
    assert_eq!(session.feature(1).unwrap().rings[0].len(), 5);
    assert_eq!(session.feature_actions(1).unwrap().simplify_label, Some("Simplify more"));

    let report = session.undo().unwrap();
    assert_eq!(report.restored, vec![1]);
    assert_eq!(session.feature(1).unwrap().rings[0].len(), 6);
    assert_eq!(session.feature(1).unwrap().properties.simplify_tolerance, 0);
}

#[test]
fn merge_undo_restores_both_inputs() {
    let mut a = square(0.0, 0.0, 100.0);
    a.properties.grade = Some(Grade::TruePositive);
    let mut b = square(50.0, 0.0, 100.0);
    b.properties.grade = Some(Grade::FalseNegative);
    b.properties.score = Some(30);
    let mut session = session_with(vec![a, b]);
    let before: Vec<_> = session.store().features().cloned().collect();

    session.enter_mode(Mode::MultiSelect);
    session.click_feature(0);
    session.click_feature(1);
    let created = session.merge_selected();
    assert_eq!(created.len(), 1);
    assert_eq!(session.store().len(), 1);
    let merged = session.feature(created[0]).unwrap();
    assert_eq!(merged.properties.grade, None);
    assert!(merged.is_closed());
    assert!(session.store().selection().is_empty());

    let report = session.undo().unwrap();
    assert_eq!(report.deleted, created);
    assert_eq!(report.panned_to, None);
    let after: Vec<_> = session.store().features().cloned().collect();
    assert_eq!(after, before);
    assert!(!session.can_undo());
}

#[test]
fn merge_needs_two_selected() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0), square(50.0, 0.0, 10.0)]);
    session.enter_mode(Mode::MultiSelect);
    session.click_feature(0);
    assert!(session.merge_selected().is_empty());
    assert_eq!(session.store().len(), 2);
    assert!(!session.has_unsaved_changes());
}

#[test]
fn convex_hull_replaces_selection() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)]);
    session.enter_mode(Mode::MultiSelect);
    session.click_feature(0);
    session.click_feature(1);
    let hull = session.convex_hull_selected().unwrap();
    assert_eq!(session.store().fids(), vec![hull]);
    assert!(hull > 1);

    session.undo();
    assert_eq!(session.store().fids(), vec![0, 1]);
}

#[test]
fn degenerate_convex_hull_is_a_no_op() {
    let line = FeatureRecord::polygon(vec![vec![[0.0, 0.0], [5.0, 5.0], [10.0, 10.0], [0.0, 0.0]]]);
    let mut session = session_with(vec![line]);
    session.enter_mode(Mode::MultiSelect);
    session.click_feature(0);
    assert_eq!(session.convex_hull_selected(), None);
    assert_eq!(session.store().len(), 1);
    assert!(!session.can_undo());
}

#[test]
fn cut_splits_and_undoes_in_one_step() {
    let mut session = session_with(vec![square(0.0, 0.0, 300.0), square(600.0, 600.0, 50.0)]);
    let created = cut(
        &mut session,
        &[[100.0, -50.0], [200.0, -50.0], [200.0, 350.0], [100.0, 350.0]],
    );

    assert_eq!(created.len(), 2);
    assert_eq!(session.current_mode(), Mode::Idle);
    assert!(!session.store().contains(0));
    assert!(session.store().contains(1));
    assert!(all_rings_closed(&session));
    assert_eq!(session.undo_len(), 1);

    let report = session.undo().unwrap();
    assert_eq!(report.restored, vec![0]);
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(session.store().fids(), vec![0, 1]);
}

#[test]
fn cut_covering_feature_removes_it() {
    let mut session = session_with(vec![square(10.0, 10.0, 20.0)]);
    let created = cut(&mut session, &[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]]);
    assert!(created.is_empty());
    assert!(session.store().is_empty());
    assert!(session.can_undo());
}

#[test]
fn cut_missing_everything_is_a_no_op() {
    let mut session = session_with(vec![square(10.0, 10.0, 20.0)]);
    cut(&mut session, &[[500.0, 500.0], [600.0, 500.0], [600.0, 600.0]]);
    assert_eq!(session.store().len(), 1);
    assert!(!session.can_undo());
    assert!(!session.has_unsaved_changes());
}

#[test]
fn fids_are_never_reused() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0).with_fid(4)]);
    let triangle = [[100.0, 100.0], [140.0, 100.0], [100.0, 140.0]];

    let mut assigned = vec![4];
    for _ in 0..3 {
        let fid = draw(&mut session, &triangle).unwrap();
        assert!(assigned.iter().all(|previous| fid > *previous));
        assigned.push(fid);
    }
    session.delete(assigned[2]);
    session.undo();
    session.undo();

    let fid = draw(&mut session, &triangle).unwrap();
    assert!(assigned.iter().all(|previous| fid > *previous));

    let live = session.store().fids();
    let mut unique = live.clone();
    unique.dedup();
    assert_eq!(live, unique);
}

#[test]
fn remove_holes_single_and_batch() {
    let mut with_hole = square(0.0, 0.0, 100.0);
    if let Some(Geometry::Polygon { coordinates }) = &mut with_hole.geometry {
        coordinates.push(vec![[10.0, 10.0], [20.0, 10.0], [20.0, 20.0], [10.0, 10.0]]);
    }
    let mut session = session_with(vec![with_hole.clone(), with_hole, square(300.0, 300.0, 10.0)]);

    assert!(session.remove_holes(0));
    assert_eq!(session.feature(0).unwrap().hole_count(), 0);
    assert_eq!(session.remove_all_holes(), 1);
    assert_eq!(session.undo_len(), 2);
    assert_eq!(session.remove_all_holes(), 0);
    assert_eq!(session.undo_len(), 2);
}

#[test]
fn delete_selected_is_one_step() {
    let mut session = session_with(vec![
        square(0.0, 0.0, 10.0),
        square(20.0, 0.0, 10.0),
        square(40.0, 0.0, 10.0),
    ]);
    session.enter_mode(Mode::MultiSelect);
    session.click_feature(0);
    session.click_feature(2);
    assert_eq!(session.delete_selected(), 2);
    assert_eq!(session.store().fids(), vec![1]);

    session.undo();
    assert_eq!(session.store().fids(), vec![0, 1, 2]);
}

#[test]
fn reset_discards_unsaved_edits() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)]);
    let initial = session.annotation_data();

    session.delete(0);
    session.set_overall_score_text("80");
    assert!(session.has_unsaved_changes());

    session.reset(|| true).unwrap();
    assert_eq!(session.annotation_data(), initial);
    assert!(!session.has_unsaved_changes());
    assert!(!session.can_undo());
    assert_eq!(session.overall_score(), None);
}

#[test]
fn reset_discards_saved_edits() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0)]);
    let initial = session.annotation_data();
    session.delete(0);
    session.save().unwrap();

    session.reset(|| true).unwrap();
    assert_eq!(session.annotation_data(), initial);
    assert_eq!(session.backend().saved(&key()), None);
}

#[test]
fn declined_reset_changes_nothing() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0)]);
    session.delete(0);
    let result = session.reset(|| false);
    assert!(matches!(result, Err(SessionError::ResetNotConfirmed)));
    assert!(session.store().is_empty());
    assert!(session.has_unsaved_changes());
    assert!(session.can_undo());
}

#[test]
fn failed_reset_leaves_state_untouched() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0)]);
    session.delete(0);
    session.backend_mut().fail_reset = true;
    assert!(session.reset(|| true).is_err());
    assert!(session.store().is_empty());
    assert!(session.can_undo());
    assert!(matches!(session.take_notices().as_slice(), [Notice::Error(_)]));
}

#[test]
fn export_blocked_with_unsaved_changes() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0)]);
    session.set_grade(0, Some(Grade::FalsePositive));

    let mut sink = MemoryExportSink::default();
    let result = session.export(&mut sink, RasterOptions::all_grades());
    assert!(matches!(result, Err(SessionError::UnsavedChanges)));
    assert!(sink.exports.is_empty());
    assert_eq!(
        session.take_notices(),
        vec![Notice::Error(
            "Changes must be saved before the mask can be exported.".to_string()
        )]
    );

    session.save().unwrap();
    session.export(&mut sink, RasterOptions::all_grades()).unwrap();
    assert_eq!(sink.exports.len(), 1);
    let (exported_key, document, url) = &sink.exports[0];
    assert_eq!(exported_key, &key());
    assert_eq!(document.features.len(), 1);
    assert_eq!(
        url.as_str(),
        "http://localhost:3000/api/images/image-1/masks/mask-1\
         ?true-positive=true&false-positive=true&false-negative=true&grayscale=false"
    );
}

#[test]
fn failed_save_keeps_unsaved_flag() {
    let mut session = session_with(vec![square(0.0, 0.0, 10.0)]);
    session.delete(0);
    session.backend_mut().fail_save = true;

    assert!(matches!(session.save(), Err(SessionError::Backend(_))));
    assert!(session.has_unsaved_changes());
    assert!(session.should_warn_before_close());
    assert!(session.store().is_empty());
    assert_eq!(session.backend().save_count, 0);

    session.backend_mut().fail_save = false;
    session.save().unwrap();
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.backend().saved(&key()).unwrap().features.len(), 0);
}

#[test]
fn failed_start_reports_error() {
    let mut backend = MemoryBackend::new();
    backend.fail_fetch = true;
    let result = AnnotationSession::start(backend, key(), AppConfig::default());
    assert!(matches!(result, Err(SessionError::Backend(_))));
}

#[test]
fn statistics_follow_grades() {
    let mut session = session_with(vec![
        square(0.0, 0.0, 10.0).with_grade(Grade::TruePositive),
        square(20.0, 0.0, 10.0).with_grade(Grade::FalsePositive),
        square(40.0, 0.0, 10.0),
        square(60.0, 0.0, 10.0),
    ]);
    session.set_overall_score_text("64");
    let stats = session.statistics();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.true_positive, 1);
    assert_eq!(stats.false_positive, 1);
    assert_eq!(stats.unspecified, 2);
    assert_eq!(stats.percentage(stats.unspecified), 50.0);
    assert_eq!(stats.overall_score, Some(64));
}

#[test]
fn file_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = FileBackend::new(dir.path());
    backend
        .ingest(
            &key(),
            &ImageMetadata::with_size("image-1", 4000, 3000),
            vec![square(0.0, 0.0, 100.0), square(500.0, 500.0, 100.0)],
        )
        .unwrap();

    let mut session =
        AnnotationSession::start(backend.clone(), key(), AppConfig::default()).unwrap();
    // 4000 px needs five halvings to fit a 128 px tile.
    assert_eq!(session.tiles().max_native_zoom(), 5);
    session.set_grade(1, Some(Grade::TruePositive));
    session.delete(0);
    session.save().unwrap();

    let mut reopened = AnnotationSession::start(backend, key(), AppConfig::default()).unwrap();
    assert_eq!(reopened.store().fids(), vec![1]);
    assert_eq!(reopened.feature(1).unwrap().properties.grade, Some(Grade::TruePositive));

    reopened.reset(|| true).unwrap();
    assert_eq!(reopened.store().fids(), vec![0, 1]);
    assert_eq!(reopened.feature(1).unwrap().properties.grade, None);
}

#[test]
fn closed_rings_after_edit() {
    let mut session = session_with(vec![square(0.0, 0.0, 40.0)]);
    let projection = projection(&session);
    assert!(session.begin_edit(0));
    let open_ring: Ring = vec![[0.0, 0.0], [80.0, 0.0], [80.0, 80.0], [0.0, 80.0]];
    assert!(session.commit_edit(vec![projection.ring_to_display(&open_ring)]));
    assert!(all_rings_closed(&session));
    assert_eq!(session.feature(0).unwrap().rings[0].len(), 5);
}

#[test]
fn memory_backend_is_object_safe() {
    let backend: Box<dyn AnnotationBackend> = Box::new(MemoryBackend::new());
    assert!(backend.fetch_annotation_data(&key()).is_err());
}
