use super::*;
use crate::config::EngineConfig;
use crate::coords::{Dimensions, PageRect, Rect};
use crate::model::Permissions;

fn view() -> PageView {
    PageView {
        page: 1,
        rect: PageRect { left: 20.0, top: 10.0, width: 600.0, height: 830.0 },
        zoom: 1.0,
        padding_top: 15.0,
        padding_bottom: 15.0,
    }
}

/// Highlight over the client rect `(120, 110)..(220, 130)`.
fn quads_location() -> Location {
    let v = view();
    let rects = [Rect::new(120.0, 110.0, 220.0, 130.0)];
    let quads = quad::quads_from_rects(&rects, v.origin(), v.page_height(), v.zoom).unwrap();
    Location::quads(1, v.dimensions(), quads)
}

fn saved(thread: &ThreadData, id: &str, text: &str, can_delete: bool) -> Annotation {
    Annotation {
        id: id.into(),
        thread_id: thread.id,
        thread_number: Some("7".into()),
        kind: thread.kind,
        location: thread.location.clone(),
        text: text.into(),
        user: "ann".into(),
        permissions: Permissions { can_edit: can_delete, can_delete },
    }
}

fn loaded_highlight(texts: &[&str]) -> HighlightThread {
    let pending = HighlightThread::pending(quads_location());
    let annotations =
        texts.iter().enumerate().map(|(i, t)| saved(pending.data(), &format!("a{i}"), t, true)).collect();
    HighlightThread::from_annotations(AnnotationType::Highlight, quads_location(), annotations)
}

fn temp_id_of(actions: &[Action]) -> String {
    actions
        .iter()
        .find_map(|a| match a {
            Action::Persist(Intent::Create { temp_id, .. }) => Some(temp_id.clone()),
            _ => None,
        })
        .expect("create intent")
}

const INSIDE: (f64, f64) = (170.0, 120.0);
const OUTSIDE: (f64, f64) = (400.0, 400.0);

// =============================================================
// Highlight lifecycle
// =============================================================

#[test]
fn pending_highlight_saved_with_comment_is_clickable() {
    let v = view();
    let mut t = HighlightThread::pending(quads_location());
    assert_eq!(t.data().state, ThreadState::Pending);

    let actions = t.on_dialog_event(&DialogEvent::CommentPost { text: "nice".into() }, &v, "ann").unwrap();
    assert_eq!(actions[0], Action::ClearSelection);
    assert_eq!(t.data().annotations.len(), 1);
    assert_eq!(t.data().kind, AnnotationType::HighlightComment);
    assert_eq!(t.data().state, ThreadState::Hover);

    t.reset(&v).unwrap();
    let (hit, _) = t.on_click(&PointerEvent::at(INSIDE.0, INSIDE.1), &v, false).unwrap();
    assert!(hit);
    assert_eq!(t.data().state, ThreadState::Hover);
}

#[test]
fn empty_comment_post_saves_plain_highlight() {
    let mut t = HighlightThread::pending(quads_location());
    let actions = t.on_dialog_event(&DialogEvent::CommentPost { text: String::new() }, &view(), "ann").unwrap();
    let Some(Action::Persist(Intent::Create { draft, .. })) = actions.get(1) else {
        panic!("expected a create after clearing the selection");
    };
    assert_eq!(draft.kind, AnnotationType::Highlight);
    assert_eq!(draft.user, "ann");
    assert_eq!(t.data().annotations[0].permissions, Permissions::OWNER);
}

#[test]
fn confirmed_create_replaces_temporary_record() {
    let v = view();
    let mut t = HighlightThread::pending(quads_location());
    let actions = t.on_dialog_event(&DialogEvent::CommentPost { text: "x".into() }, &v, "ann").unwrap();
    let temp = temp_id_of(&actions);

    let server = saved(t.data(), "srv-1", "x", false);
    assert!(t.on_create_result(&temp, Ok(server), &v).unwrap().is_empty());
    assert_eq!(t.data().annotations.len(), 1);
    assert_eq!(t.data().annotations[0].id, "srv-1");
    assert_eq!(t.data().thread_number.as_deref(), Some("7"));
    assert!(!t.data().has_request_in_flight());
}

#[test]
fn failed_create_rolls_back() {
    let v = view();
    let mut t = HighlightThread::pending(quads_location());
    let actions = t.on_dialog_event(&DialogEvent::CommentPost { text: "x".into() }, &v, "ann").unwrap();
    let temp = temp_id_of(&actions);

    let after = t.on_create_result(&temp, Err(ServiceError::Unavailable), &v).unwrap();
    assert!(matches!(after[0], Action::Failure(Failure::CreateFailed { .. })));
    assert!(t.data().annotations.is_empty());
    assert_eq!(t.data().state, ThreadState::Pending);
    assert_eq!(t.data().kind, AnnotationType::Highlight);
}

#[test]
fn second_save_while_in_flight_is_rejected() {
    let v = view();
    let mut t = HighlightThread::pending(quads_location());
    t.save_annotation(AnnotationType::HighlightComment, "a", &v, "ann").unwrap();
    let err = t.save_annotation(AnnotationType::HighlightComment, "b", &v, "ann").unwrap_err();
    assert!(matches!(err, ThreadError::RequestInFlight(_)));
    assert_eq!(t.data().annotations.len(), 1);
}

#[test]
fn post_that_cannot_be_shown_leaves_nothing_in_flight() {
    let v = view();
    let mut t = loaded_highlight(&["first"]);
    t.data_mut().location.dimensions = Some(Dimensions { x: 0.0, y: 0.0 });

    let err = t.on_dialog_event(&DialogEvent::CommentPost { text: "second".into() }, &v, "ann").unwrap_err();
    assert!(matches!(err, ThreadError::Geometry(GeometryError::InvalidDimensions { .. })));
    assert_eq!(t.data().annotations.len(), 1);
    assert!(!t.data().has_request_in_flight());
    assert_eq!(t.data().state, ThreadState::Inactive);

    t.data_mut().location = quads_location();
    let actions = t.on_dialog_event(&DialogEvent::CommentPost { text: "second".into() }, &v, "ann").unwrap();
    assert!(actions.iter().any(|a| matches!(a, Action::Persist(Intent::Create { .. }))));
}

#[test]
fn unknown_create_result_is_an_error() {
    let mut t = HighlightThread::pending(quads_location());
    let err = t.on_create_result("nope", Err(ServiceError::Unavailable), &view()).unwrap_err();
    assert_eq!(err, ThreadError::UnknownAnnotation("nope".into()));
}

#[test]
fn loaded_plain_type_with_text_is_promoted() {
    assert_eq!(loaded_highlight(&["note"]).data().kind, AnnotationType::HighlightComment);
    assert_eq!(loaded_highlight(&["", "reply"]).data().kind, AnnotationType::HighlightComment);
    assert_eq!(loaded_highlight(&[""]).data().kind, AnnotationType::Highlight);
    assert_eq!(loaded_highlight(&[""]).data().state, ThreadState::Inactive);
}

// =============================================================
// Pointer handling
// =============================================================

#[test]
fn mousedown_destroys_pending_highlight() {
    let mut t = HighlightThread::pending(quads_location());
    let actions = t.on_mousedown();
    assert!(actions.contains(&Action::ClearSelection));
    assert!(matches!(actions.last(), Some(Action::ThreadDestroyed { page: 1, .. })));

    let mut kept = loaded_highlight(&["x"]);
    assert!(kept.on_mousedown().is_empty());
}

#[test]
fn mousemove_classifies_hover() {
    let v = view();
    let mut t = loaded_highlight(&["x"]);
    let out = PointerEvent::at(OUTSIDE.0, OUTSIDE.1);

    assert_eq!(t.on_mousemove(&out, &v).unwrap(), MoveOutcome::Ignore);
    assert_eq!(t.on_mousemove(&PointerEvent::at(INSIDE.0, INSIDE.1), &v).unwrap(), MoveOutcome::Delay);
    assert_eq!(t.data().state, ThreadState::Hover);
    assert_eq!(t.on_mousemove(&out, &v).unwrap(), MoveOutcome::ScheduleExit);

    let in_dialog = out.in_dialog(t.data().id);
    assert_eq!(t.on_mousemove(&in_dialog, &v).unwrap(), MoveOutcome::Delay);
}

#[test]
fn mousemove_leaves_open_comment_box_alone() {
    let v = view();
    let mut t = HighlightThread::pending(quads_location());
    t.on_dialog_event(&DialogEvent::Comment, &v, "ann").unwrap();
    assert_eq!(t.data().state, ThreadState::PendingActive);
    let out = PointerEvent::at(OUTSIDE.0, OUTSIDE.1);
    assert_eq!(t.on_mousemove(&out, &v).unwrap(), MoveOutcome::Ignore);
}

#[test]
fn consumed_click_resets_to_normal_fill() {
    let v = view();
    let mut t = loaded_highlight(&["x"]);
    let (hit, actions) = t.on_click(&PointerEvent::at(INSIDE.0, INSIDE.1), &v, true).unwrap();
    assert!(!hit);
    assert_eq!(t.data().state, ThreadState::Inactive);
    assert!(matches!(actions.last(), Some(Action::PaintHighlight { fill: HighlightFill::Normal, .. })));
}

#[test]
fn show_active_paints_and_anchors_dialog_at_last_quad() {
    let v = view();
    let mut t = loaded_highlight(&["x"]);
    t.data_mut().state = ThreadState::Hover;
    let actions = t.show(&v).unwrap();
    let Some(Action::ShowDialog { anchor, .. }) = actions.first() else {
        panic!("expected dialog first");
    };
    // lower-right of the selection rect, page-relative
    assert!((anchor.x - 200.0).abs() < 1e-3);
    assert!((anchor.y - 105.0).abs() < 1e-3);
    assert!(matches!(actions[1], Action::PaintHighlight { fill: HighlightFill::Active, .. }));
}

#[test]
fn hide_erases_quads() {
    let t = loaded_highlight(&["x"]);
    let actions = t.hide(&view()).unwrap();
    assert!(matches!(actions[..], [Action::PaintHighlight { fill: HighlightFill::Erase, .. }]));
}

#[test]
fn unlaid_page_fails_instead_of_painting() {
    let mut v = view();
    v.zoom = 0.0;
    let mut t = loaded_highlight(&["x"]);
    assert!(t.show(&v).is_err());
    assert!(t.on_mousemove(&PointerEvent::at(INSIDE.0, INSIDE.1), &v).is_err());
}

// =============================================================
// Cancel and delete
// =============================================================

#[test]
fn cancel_without_annotations_destroys() {
    let mut t = HighlightThread::pending(quads_location());
    let actions = t.on_dialog_event(&DialogEvent::Cancel, &view(), "ann").unwrap();
    assert!(matches!(actions.last(), Some(Action::ThreadDestroyed { .. })));
}

#[test]
fn cancel_with_annotations_goes_inactive() {
    let mut t = loaded_highlight(&["x"]);
    t.data_mut().state = ThreadState::Hover;
    t.on_dialog_event(&DialogEvent::Cancel, &view(), "ann").unwrap();
    assert_eq!(t.data().state, ThreadState::Inactive);
}

#[test]
fn delete_is_pessimistic() {
    let v = view();
    let mut t = loaded_highlight(&["a", "b"]);
    let actions = t.on_dialog_event(&DialogEvent::Delete { annotation_id: Some("a1".into()) }, &v, "ann").unwrap();
    assert!(matches!(&actions[0], Action::Persist(Intent::Delete { annotation_id, .. }) if annotation_id == "a1"));
    assert_eq!(t.data().annotations.len(), 2);

    let err = t.delete_annotation("a0").unwrap_err();
    assert_eq!(err, ThreadError::RequestInFlight("a1".into()));

    t.on_delete_result("a1", Ok(()), &v).unwrap();
    assert_eq!(t.data().annotations.len(), 1);
}

#[test]
fn failed_delete_keeps_annotation() {
    let v = view();
    let mut t = loaded_highlight(&["a"]);
    t.delete_annotation("a0").unwrap();
    let actions = t.on_delete_result("a0", Err(ServiceError::Unavailable), &v).unwrap();
    assert!(matches!(actions[..], [Action::Failure(Failure::DeleteFailed { .. })]));
    assert_eq!(t.data().annotations.len(), 1);
}

#[test]
fn deleting_last_comment_over_blank_highlight_removes_both() {
    let v = view();
    let mut t = loaded_highlight(&["", "reply"]);
    t.delete_annotation("a1").unwrap();
    let actions = t.on_delete_result("a1", Ok(()), &v).unwrap();
    assert!(matches!(&actions[0], Action::Persist(Intent::Delete { annotation_id, .. }) if annotation_id == "a0"));
    assert!(matches!(actions.last(), Some(Action::ThreadDestroyed { .. })));
}

#[test]
fn delete_requires_permission() {
    let pending = HighlightThread::pending(quads_location());
    let locked = saved(pending.data(), "locked", "x", false);
    let mut t = HighlightThread::from_annotations(AnnotationType::HighlightComment, quads_location(), vec![locked]);
    assert_eq!(t.delete_annotation("locked").unwrap_err(), ThreadError::PermissionDenied("locked".into()));
    assert_eq!(t.delete_annotation("ghost").unwrap_err(), ThreadError::UnknownAnnotation("ghost".into()));
}

// =============================================================
// PointThread
// =============================================================

fn point_location() -> Location {
    // doc (75, 525) is page-relative screen (100, 100)
    Location::point(1, view().dimensions(), 75.0, 525.0)
}

#[test]
fn point_marker_hit_uses_radius() {
    let v = view();
    let t = PointThread::new(point_location(), Vec::new(), 16.0);
    // page origin is (20, 25) in client space
    assert!(t.is_on_marker(&PointerEvent::at(130.0, 125.0), &v).unwrap());
    assert!(!t.is_on_marker(&PointerEvent::at(137.0, 125.0), &v).unwrap());
}

#[test]
fn point_comment_post_persists_point() {
    let v = view();
    let mut t = PointThread::new(point_location(), Vec::new(), 16.0);
    let actions = t.on_dialog_event(&DialogEvent::CommentPost { text: "here".into() }, &v, "ann").unwrap();
    let Some(Action::Persist(Intent::Create { draft, .. })) = actions.first() else {
        panic!("expected create");
    };
    assert_eq!(draft.kind, AnnotationType::Point);
    assert!(actions.iter().any(|a| matches!(a, Action::PlaceMarker { .. })));
}

#[test]
fn point_destroy_removes_marker() {
    let mut t = PointThread::new(point_location(), Vec::new(), 16.0);
    let actions = t.destroy();
    assert_eq!(actions[0], Action::RemoveMarker { thread: t.data().id });
}

// =============================================================
// Thread
// =============================================================

#[test]
fn create_checks_shape_against_kind() {
    let config = EngineConfig::default();
    let err = Thread::create(AnnotationType::Point, quads_location(), Vec::new(), &config).unwrap_err();
    assert_eq!(err, ThreadError::ShapeMismatch(AnnotationType::Point));

    let t = Thread::create(AnnotationType::Highlight, quads_location(), Vec::new(), &config).unwrap();
    assert!(t.is_highlight());
    assert_eq!(t.state(), ThreadState::Pending);
}

#[test]
fn create_rejects_unusable_saved_dimensions() {
    let config = EngineConfig::default();
    let mut location = quads_location();
    location.dimensions = Some(Dimensions { x: 600.0, y: 0.0 });
    let err = Thread::create(AnnotationType::Highlight, location, Vec::new(), &config).unwrap_err();
    assert!(matches!(err, ThreadError::Geometry(GeometryError::InvalidDimensions { .. })));
}

#[test]
fn create_takes_thread_id_from_records() {
    let config = EngineConfig::default();
    let pending = HighlightThread::pending(quads_location());
    let record = saved(pending.data(), "a", "x", true);
    let t = Thread::create(AnnotationType::HighlightComment, quads_location(), vec![record], &config).unwrap();
    assert_eq!(t.id(), pending.data().id);
    assert_eq!(t.page(), 1);
}

#[test]
fn cancel_pending_point_destroys_it() {
    let config = EngineConfig::default();
    let mut t = Thread::create(AnnotationType::Point, point_location(), Vec::new(), &config).unwrap();
    let actions = t.cancel_pending(&view()).unwrap();
    assert!(matches!(actions.last(), Some(Action::ThreadDestroyed { .. })));
}
