use super::*;
use crate::fakes::{Paint, RecordingPainter, RecordingSink, Stroke};
use crate::path::Sample;

// =============================================================
// FixedRateScheduler
// =============================================================

#[test]
fn fixed_rate_coalesces_outstanding_requests() {
    let mut sched = FixedRateScheduler::new(16.0);
    let a = sched.request_tick();
    let b = sched.request_tick();
    assert_eq!(a, b);
    assert_eq!(sched.requests(), 1);
}

#[test]
fn fixed_rate_fire_consumes_tick() {
    let mut sched = FixedRateScheduler::new(16.0);
    let a = sched.request_tick();
    assert_eq!(sched.fire(), a);
    assert_eq!(sched.fire(), None);
    let b = sched.request_tick();
    assert_ne!(a, b);
    assert_eq!(sched.requests(), 2);
}

#[test]
fn fixed_rate_cancel_ignores_stale_handle() {
    let mut sched = FixedRateScheduler::new(16.0);
    let a = sched.request_tick().unwrap();
    sched.cancel_tick(TickHandle(a.0 + 100));
    assert_eq!(sched.pending(), Some(a));
    sched.cancel_tick(a);
    assert_eq!(sched.pending(), None);
}

// =============================================================
// paint_quads
// =============================================================

#[test]
fn paint_cuts_out_before_filling() {
    let quad = QuadPoint([0.0, 10.0, 10.0, 10.0, 10.0, 0.0, 0.0, 0.0]);
    let mut painter = RecordingPainter::default();
    paint_quads(&mut painter, &[quad], HighlightFill::Active);
    assert_eq!(painter.ops, vec![Paint::Erase(quad.0), Paint::Fill(quad.0, HighlightFill::Active)]);
}

#[test]
fn paint_erase_only_cuts() {
    let quad = QuadPoint([0.0; 8]);
    let mut painter = RecordingPainter::default();
    paint_quads(&mut painter, &[quad, quad], HighlightFill::Erase);
    assert_eq!(painter.ops, vec![Paint::Erase(quad.0), Paint::Erase(quad.0)]);
}

#[test]
fn fills_have_distinct_css() {
    assert_ne!(HighlightFill::Normal.css(), HighlightFill::Active.css());
}

// =============================================================
// stroke_paths
// =============================================================

#[test]
fn stroke_paths_wraps_every_path_in_one_stroke() {
    let mut a = DrawingPath::new();
    a.add_coordinate(Sample::at(0.0, 0.0), Some(Point::new(0.0, 0.0)));
    let mut b = DrawingPath::new();
    b.add_coordinate(Sample::at(1.0, 1.0), Some(Point::new(5.0, 5.0)));

    let style = StrokeStyle { line_width: 6.0 };
    let mut sink = RecordingSink::default();
    stroke_paths(&mut sink, style, &[a, b]);

    assert_eq!(sink.ops.first(), Some(&Stroke::Style(style)));
    assert_eq!(sink.ops[1], Stroke::Begin);
    assert_eq!(sink.ops.last(), Some(&Stroke::Finish));
    let moves = sink.ops.iter().filter(|op| matches!(op, Stroke::MoveTo(_))).count();
    assert_eq!(moves, 2);
}

// =============================================================
// Events
// =============================================================

#[test]
fn pointer_event_builders() {
    let id = ThreadId::nil();
    let ev = PointerEvent::at(1.0, 2.0).on_page(3).in_dialog(id).double();
    assert_eq!(ev.client, Point::new(1.0, 2.0));
    assert_eq!(ev.page, Some(3));
    assert_eq!(ev.dialog, Some(id));
    assert!(ev.dblclick);
}

#[test]
fn dialog_event_parses_tagged_json() {
    let ev: DialogEvent = serde_json::from_str(r#"{ "event": "comment_post", "text": "hi" }"#).unwrap();
    assert_eq!(ev, DialogEvent::CommentPost { text: "hi".into() });
    let ev: DialogEvent = serde_json::from_str(r#"{ "event": "delete" }"#).unwrap();
    assert_eq!(ev, DialogEvent::Delete { annotation_id: None });
}

#[test]
fn failure_carries_service_reason() {
    let err = ServiceError::Rejected { reason: "quota".into() };
    let Failure::CreateFailed { reason, .. } = Failure::create(ThreadId::nil(), &err) else {
        panic!("expected create failure");
    };
    assert!(reason.contains("quota"));
}
