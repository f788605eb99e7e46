//! Integration tests for the Rescue Flow
//!
//! Mid-tier rejections report a transient rejected status, rest the proposal
//! in a paired rescue window, and allow exactly one follow-up decision by the
//! same authority tier.

use std::sync::Arc;

use agenda::audit::AuditAction;
use agenda::{
    AgendaLevel, AgendaStatus, AgendaStore, AuditLog, Collaborators, DecisionEngine,
    DecisionError, DecisionRequest, DecisionType, Ladder, MemoryStore, PermissionProfile,
    Proposal, RescueWindow, StaticDirectory, TransitionGraph,
};

const REASON: &str = "Reviewed again with the department heads";

fn directory() -> StaticDirectory {
    StaticDirectory::new([
        PermissionProfile::new("sup-1", 3.5),
        PermissionProfile::new("mgr-1", 7.0)
            .in_facility("fac-1")
            .in_department("nursing"),
        PermissionProfile::new("dd-1", 8.0).in_facility("fac-1"),
        PermissionProfile::new("ga-1", 11.0),
        PermissionProfile::new("gad-1", 18.0),
    ])
}

fn decider_for(window: &RescueWindow) -> &'static str {
    match window.rejection {
        DecisionType::RejectByManager => "mgr-1",
        DecisionType::RejectByDeputyDirector => "dd-1",
        _ => "ga-1",
    }
}

/// Status a window's rejection is submitted from
fn rejecting_status(window: &RescueWindow) -> AgendaStatus {
    Ladder::standard()
        .rungs()
        .iter()
        .find(|rung| rung.transition(window.rejection).is_some())
        .map(|rung| rung.status)
        .unwrap()
}

fn setup(status: AgendaStatus) -> (DecisionEngine, Arc<MemoryStore>, Arc<AuditLog>) {
    let store = MemoryStore::new().shared();
    store
        .put_proposal(
            &Proposal::new("post-1", "author-1")
                .with_organisation("fac-1", "nursing")
                .with_score(400)
                .with_status(status),
        )
        .unwrap();
    let audit = Arc::new(AuditLog::new());
    let engine = DecisionEngine::new(
        Collaborators::new(store.clone(), Arc::new(directory())).with_audit(audit.clone()),
    );
    (engine, store, audit)
}

/// Test: Scenario B - manager rejection opens the rescue window immediately
#[test]
fn test_manager_rejection_accepts_rescue_without_extra_call() {
    let (engine, store, _) = setup(AgendaStatus::RecommendedToManager);

    let outcome = engine
        .submit_decision(DecisionRequest::new(
            "post-1",
            DecisionType::RejectByManager,
            "mgr-1",
            REASON,
        ))
        .unwrap();
    assert_eq!(outcome.new_status, AgendaStatus::RejectedByManager);
    assert_eq!(outcome.resting_status, AgendaStatus::PendingRescueByManager);

    let stored = store.get_proposal("post-1").unwrap().unwrap();
    assert!(RescueWindow::is_open(&stored));
    assert_eq!(stored.agenda_rescue_level, Some(AgendaLevel::DeptAgenda));

    let rescued = engine
        .submit_decision(DecisionRequest::new(
            "post-1",
            DecisionType::RescueAsDeptAgenda,
            "mgr-1",
            REASON,
        ))
        .unwrap();
    assert_eq!(rescued.new_status, AgendaStatus::RescuedAsDeptAgenda);
    assert_eq!(rescued.agenda_level, AgendaLevel::DeptAgenda);

    let stored = store.get_proposal("post-1").unwrap().unwrap();
    assert_eq!(stored.agenda_rescue_level, None);
    assert!(!RescueWindow::is_open(&stored));
}

/// Test: Each window's rescue exit lands on its terminal at its granted level
#[test]
fn test_every_window_rescue_exit() {
    for window in RescueWindow::all() {
        let (engine, store, audit) = setup(rejecting_status(window));
        let decider = decider_for(window);

        engine
            .submit_decision(DecisionRequest::new("post-1", window.rejection, decider, REASON))
            .unwrap();
        let outcome = engine
            .submit_decision(DecisionRequest::new(
                "post-1",
                window.rescue_decision,
                decider,
                REASON,
            ))
            .unwrap();

        assert_eq!(outcome.new_status, window.rescued_status);
        let stored = store.get_proposal("post-1").unwrap().unwrap();
        assert_eq!(stored.agenda_level, window.rescue_level);
        assert!(stored.agenda_status.is_terminal());

        let actions: Vec<_> = audit.entries().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::RescueWindowOpened, AuditAction::DecisionSubmitted]
        );
    }
}

/// Test: complete_rejection closes each window for good
#[test]
fn test_every_window_complete_rejection() {
    for window in RescueWindow::all() {
        let (engine, store, _) = setup(rejecting_status(window));
        let decider = decider_for(window);

        engine
            .submit_decision(DecisionRequest::new("post-1", window.rejection, decider, REASON))
            .unwrap();
        let outcome = engine
            .submit_decision(DecisionRequest::new(
                "post-1",
                DecisionType::CompleteRejection,
                decider,
                REASON,
            ))
            .unwrap();
        assert_eq!(outcome.new_status, AgendaStatus::CompletelyRejected);

        // Single hop: nothing further is accepted.
        let err = engine
            .submit_decision(DecisionRequest::new(
                "post-1",
                window.rescue_decision,
                decider,
                REASON,
            ))
            .unwrap_err();
        assert!(matches!(err, DecisionError::InvalidTransition { .. }));
        assert_eq!(store.decision_records("post-1").unwrap().len(), 2);
    }
}

/// Test: Only the rejecting tier may act inside the window
#[test]
fn test_other_tiers_cannot_rescue() {
    let (engine, _, _) = setup(AgendaStatus::PendingDeputyDirectorReview);
    engine
        .submit_decision(DecisionRequest::new(
            "post-1",
            DecisionType::RejectByDeputyDirector,
            "dd-1",
            REASON,
        ))
        .unwrap();

    for decider in ["sup-1", "mgr-1", "ga-1", "gad-1"] {
        let err = engine
            .submit_decision(DecisionRequest::new(
                "post-1",
                DecisionType::RescueAsDeptAgenda,
                decider,
                REASON,
            ))
            .unwrap_err();
        assert!(
            matches!(err, DecisionError::PermissionDenied { .. }),
            "{} should be denied",
            decider
        );
    }
}

/// Test: Supervisor rejection is terminal with no window
#[test]
fn test_supervisor_rejection_is_terminal() {
    let (engine, store, audit) = setup(AgendaStatus::Pending);
    let outcome = engine
        .submit_decision(DecisionRequest::new(
            "post-1",
            DecisionType::RejectBySupervisor,
            "sup-1",
            REASON,
        ))
        .unwrap();

    assert_eq!(outcome.new_status, AgendaStatus::RejectedBySupervisor);
    assert_eq!(outcome.resting_status, AgendaStatus::RejectedBySupervisor);
    let stored = store.get_proposal("post-1").unwrap().unwrap();
    assert_eq!(stored.agenda_rescue_level, None);
    assert_eq!(audit.entries()[0].action, AuditAction::DecisionSubmitted);

    for decision in [DecisionType::RescueAsDeptAgenda, DecisionType::CompleteRejection] {
        let err = engine
            .submit_decision(DecisionRequest::new("post-1", decision, "sup-1", REASON))
            .unwrap_err();
        assert!(matches!(err, DecisionError::InvalidTransition { .. }));
    }
}

/// Test: Rescue windows are reachable only from their paired rejection
#[test]
fn test_windows_have_a_single_predecessor() {
    let ladder = Ladder::standard();
    let graph = TransitionGraph::from_ladder(ladder);
    graph.validate(ladder).unwrap();

    for window in RescueWindow::all() {
        assert_eq!(
            graph.predecessors(window.window_status),
            vec![window.rejected_status]
        );
        assert!(!graph.can_reach(AgendaStatus::RejectedBySupervisor, window.window_status));
        assert!(!graph
            .reachable_from(window.window_status)
            .iter()
            .any(|s| s.is_rescue_window()));
    }

    // Pending reaches a window only through a manager-or-higher rejection.
    assert!(!graph
        .predecessors(AgendaStatus::PendingRescueByManager)
        .contains(&AgendaStatus::Pending));
}
