use super::test_support::ScriptedEngine;
use super::*;

fn resolve(engine: &ScriptedEngine, job: &RenderJob) -> RenderCompletion {
    let mut mount = MountTarget::new();
    let result = render(engine, &job.id, &job.sanitized, &job.raw, &mut mount);
    RenderCompletion {
        seq: job.seq,
        result,
        mount,
    }
}

#[test]
fn test_initial_state_is_empty() {
    let surface = DiagramSurface::default();
    assert_eq!(surface.state(), SurfaceState::Empty);
    assert!(surface.mount().is_empty());
    assert!(surface.result().is_none());
}

#[test]
fn test_empty_payload_never_queues_a_render() {
    let mut surface = DiagramSurface::new(100);
    surface.submit(Some("   \n"), false, 0);

    assert_eq!(surface.state(), SurfaceState::Empty);
    assert!(surface.take_ready(10_000).is_none());
    assert!(surface.result().is_none());
}

#[test]
fn test_render_waits_for_coalescing_delay() {
    let mut surface = DiagramSurface::new(100);
    surface.submit(Some("graph TD\nA-->B"), false, 1_000);

    assert_eq!(surface.state(), SurfaceState::Pending);
    assert!(surface.take_ready(1_050).is_none());
    assert_eq!(surface.ready_in(1_050), Some(50));

    let job = surface.take_ready(1_100).unwrap();
    assert_eq!(job.sanitized, "graph TD\nA-->B");
    assert_eq!(job.id, format!("diagram-{}", job.seq));
    assert_eq!(surface.state(), SurfaceState::Pending);
}

#[test]
fn test_rapid_updates_coalesce_into_one_render() {
    let mut surface = DiagramSurface::new(100);
    surface.submit(Some("graph TD\nA-->B"), false, 0);
    surface.submit(Some("graph TD\nA-->C"), false, 40);
    surface.submit(Some("graph TD\nA-->D"), false, 80);

    assert!(surface.take_ready(150).is_none());
    let job = surface.take_ready(180).unwrap();
    assert_eq!(job.sanitized, "graph TD\nA-->D");
    assert!(surface.take_ready(10_000).is_none());
}

#[test]
fn test_successful_render_is_committed() {
    let engine = ScriptedEngine::accepting();
    let mut surface = DiagramSurface::new(0);
    surface.submit(Some("```mermaid\ngraph TD\nA-->B\n```"), false, 0);
    let job = surface.take_ready(0).unwrap();

    assert!(surface.complete(resolve(&engine, &job)));
    assert_eq!(surface.state(), SurfaceState::Rendered);
    assert!(!surface.mount().is_empty());
}

#[test]
fn test_failed_render_keeps_raw_payload_verbatim() {
    let engine = ScriptedEngine::strict();
    let raw = "Here you go:\n```mermaid\nflowchart LR\nA --\n```";
    let mut surface = DiagramSurface::new(0);
    surface.submit(Some(raw), false, 0);
    let job = surface.take_ready(0).unwrap();
    surface.complete(resolve(&engine, &job));

    assert_eq!(surface.state(), SurfaceState::RenderFailed);
    assert!(surface.mount().is_empty());
    let result = surface.result().unwrap();
    assert_eq!(result.original_payload(), Some(raw));
    match result {
        RenderResult::Failed { reason, .. } => assert_eq!(*reason, SYNTAX_ERROR_MESSAGE),
        RenderResult::Rendered(_) => panic!("expected failure"),
    }
}

#[test]
fn test_stale_completion_never_overrides_newer_payload() {
    let engine = ScriptedEngine::strict();
    let mut surface = DiagramSurface::new(0);

    surface.submit(Some("graph TD\nA-->B"), false, 0);
    let first = surface.take_ready(0).unwrap();
    surface.submit(Some("graph TD\nA--"), false, 5);
    let second = surface.take_ready(5).unwrap();

    // Newer resolves first, older arrives late.
    assert!(surface.complete(resolve(&engine, &second)));
    assert!(!surface.complete(resolve(&engine, &first)));

    assert_eq!(surface.state(), SurfaceState::RenderFailed);
    assert!(surface.mount().is_empty());
}

#[test]
fn test_stale_completion_dropped_when_older_resolves_first() {
    let engine = ScriptedEngine::strict();
    let mut surface = DiagramSurface::new(0);

    surface.submit(Some("graph TD\nA--"), false, 0);
    let first = surface.take_ready(0).unwrap();
    surface.submit(Some("graph TD\nA-->B"), false, 5);
    let second = surface.take_ready(5).unwrap();

    assert!(!surface.complete(resolve(&engine, &first)));
    assert_eq!(surface.state(), SurfaceState::Pending);
    assert!(surface.complete(resolve(&engine, &second)));

    assert_eq!(surface.state(), SurfaceState::Rendered);
}

#[test]
fn test_loading_takes_precedence_over_terminal_state() {
    let engine = ScriptedEngine::accepting();
    let mut surface = DiagramSurface::new(0);
    surface.submit(Some("graph TD\nA-->B"), false, 0);
    let job = surface.take_ready(0).unwrap();
    surface.complete(resolve(&engine, &job));
    assert_eq!(surface.state(), SurfaceState::Rendered);

    surface.submit(Some("graph TD\nA-->B"), true, 10);
    assert_eq!(surface.state(), SurfaceState::Loading);

    surface.submit(Some("graph TD\nA-->B"), false, 20);
    assert_eq!(surface.state(), SurfaceState::Rendered);
}

#[test]
fn test_new_request_clears_previous_result() {
    let engine = ScriptedEngine::accepting();
    let mut surface = DiagramSurface::new(0);
    surface.submit(Some("graph TD\nA-->B"), false, 0);
    let job = surface.take_ready(0).unwrap();
    surface.complete(resolve(&engine, &job));

    surface.submit(None, true, 10);
    assert_eq!(surface.state(), SurfaceState::Loading);
    assert!(surface.result().is_none());
    assert!(surface.mount().is_empty());

    surface.submit(None, false, 20);
    assert_eq!(surface.state(), SurfaceState::Empty);
}

#[test]
fn test_identical_payload_does_not_issue_new_sequence() {
    let mut surface = DiagramSurface::new(0);
    assert!(surface.submit(Some("graph TD\nA-->B"), false, 0));
    let seq = surface.latest_seq();
    assert!(!surface.submit(Some("graph TD\nA-->B"), false, 50));
    assert_eq!(surface.latest_seq(), seq);
}

#[test]
fn test_completion_for_undispatched_sequence_is_ignored() {
    let engine = ScriptedEngine::accepting();
    let mut surface = DiagramSurface::new(100);
    surface.submit(Some("graph TD\nA-->B"), false, 0);
    let forged = RenderJob {
        seq: surface.latest_seq(),
        id: "diagram-x".to_string(),
        sanitized: "graph TD\nA-->B".to_string(),
        raw: "graph TD\nA-->B".to_string(),
    };

    assert!(!surface.complete(resolve(&engine, &forged)));
    assert_eq!(surface.state(), SurfaceState::Pending);
}

#[test]
fn test_abandoned_job_leaves_pending_as_failure() {
    let mut surface = DiagramSurface::new(0);
    let raw = "```mermaid\ngraph TD\nA-->B\n```";
    surface.submit(Some(raw), false, 0);
    let job = surface.take_ready(0).unwrap();
    assert_eq!(surface.state(), SurfaceState::Pending);

    assert!(surface.complete(RenderCompletion::abandoned(job)));

    assert_eq!(surface.state(), SurfaceState::RenderFailed);
    assert!(surface.mount().is_empty());
    assert_eq!(surface.result().unwrap().original_payload(), Some(raw));

    surface.submit(Some("graph LR\nX-->Y"), false, 10);
    assert_eq!(surface.state(), SurfaceState::Pending);
    assert!(surface.take_ready(10).is_some());
}
