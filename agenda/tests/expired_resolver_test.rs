//! Integration tests for the Expired Escalation Resolver
//!
//! Records resolutions for proposals whose voting deadline passed and checks
//! the frozen metrics, the terminal status mapping, and the history and
//! pending queries.

use std::sync::Arc;

use agenda::audit::AuditAction;
use agenda::{
    AgendaLevel, AgendaStatus, AgendaStore, AuditLog, Collaborators, DecisionError,
    ExpiredDecision, ExpiredDecisionRequest, ExpiredEscalationResolver, HistoryQuery,
    MemoryStore, NotificationKind, PendingQuery, PermissionProfile, Proposal, StaticDirectory,
};
use chrono::{Duration, Utc};

const REASON: &str = "Voting period ended below the target score";

struct Fixture {
    resolver: ExpiredEscalationResolver,
    store: Arc<MemoryStore>,
    audit: Arc<AuditLog>,
    services: Collaborators,
}

fn fixture(proposals: Vec<Proposal>) -> Fixture {
    let store = MemoryStore::new().shared();
    for proposal in &proposals {
        store.put_proposal(proposal).unwrap();
    }
    let directory = StaticDirectory::new([
        PermissionProfile::new("dd-1", 8.0)
            .in_facility("fac-1")
            .in_department("nursing"),
        PermissionProfile::new("dd-2", 8.0)
            .in_facility("fac-2")
            .in_department("rehab"),
        PermissionProfile::new("head-1", 10.0).in_facility("fac-1"),
    ]);
    let audit = Arc::new(AuditLog::new());
    let services = Collaborators::new(store.clone(), Arc::new(directory)).with_audit(audit.clone());
    Fixture {
        resolver: ExpiredEscalationResolver::new(services.clone()),
        store,
        audit,
        services,
    }
}

fn overdue(id: &str, facility: &str, department: &str, days: i64) -> Proposal {
    Proposal::new(id, format!("author-{}", id))
        .with_organisation(facility, department)
        .with_level(AgendaLevel::DeptReview)
        .with_status(AgendaStatus::RecommendedToManager)
        .with_score(90)
        .with_deadline(Utc::now() - Duration::days(days))
}

fn request(post_id: &str, decision: ExpiredDecision, decider: &str) -> ExpiredDecisionRequest {
    ExpiredDecisionRequest {
        post_id: post_id.into(),
        decision,
        decider_id: decider.into(),
        decision_reason: REASON.into(),
        current_score: 90,
        target_score: 100,
        agenda_level: AgendaLevel::DeptReview,
        proposal_type: Some("improvement".into()),
        department: None,
        facility_id: None,
    }
}

fn admin_history() -> HistoryQuery {
    HistoryQuery {
        user_id: "admin".into(),
        permission_level: 99.0,
        ..Default::default()
    }
}

/// Test: Scenario C - downgrade five days after the deadline
#[test]
fn test_downgrade_five_days_overdue() {
    let f = fixture(vec![overdue("post-1", "fac-1", "nursing", 5)]);

    let record = f
        .resolver
        .record_decision(request("post-1", ExpiredDecision::Downgrade, "dd-1"))
        .unwrap();

    assert_eq!(record.achievement_rate, 90.0);
    assert_eq!(record.days_overdue, 5);
    assert_eq!(record.facility_id.as_deref(), Some("fac-1"));
    assert_eq!(record.department.as_deref(), Some("nursing"));

    let stored = f.store.get_proposal("post-1").unwrap().unwrap();
    assert_eq!(stored.agenda_status, AgendaStatus::Downgraded);
    assert_eq!(stored.agenda_level, AgendaLevel::None);
    assert_eq!(stored.agenda_decision_by.as_deref(), Some("dd-1"));

    let persisted = f.store.expired_decision_for("post-1").unwrap().unwrap();
    assert_eq!(persisted, record);
    assert_eq!(f.audit.entries()[0].action, AuditAction::ExpiredDecisionRecorded);
}

/// Test: Each resolution maps to its terminal status
#[test]
fn test_resolution_status_mapping() {
    for (i, decision) in ExpiredDecision::all().iter().enumerate() {
        let id = format!("post-{}", i);
        let f = fixture(vec![overdue(&id, "fac-1", "nursing", 2)]);
        f.resolver
            .record_decision(request(&id, *decision, "dd-1"))
            .unwrap();
        let stored = f.store.get_proposal(&id).unwrap().unwrap();
        assert_eq!(stored.agenda_status, decision.terminal_status());
        assert!(stored.agenda_status.is_terminal());
    }
}

/// Test: Input and state failures come back typed and write nothing
#[test]
fn test_rejected_requests_write_nothing() {
    let no_deadline = Proposal::new("post-2", "author-2").with_level(AgendaLevel::DeptReview);
    let f = fixture(vec![overdue("post-1", "fac-1", "nursing", 3), no_deadline]);

    let mut short = request("post-1", ExpiredDecision::Reject, "dd-1");
    short.decision_reason = "too short".into();
    assert!(matches!(
        f.resolver.record_decision(short).unwrap_err(),
        DecisionError::Validation { .. }
    ));

    assert!(matches!(
        f.resolver
            .record_decision(request("missing", ExpiredDecision::Reject, "dd-1"))
            .unwrap_err(),
        DecisionError::NotFound { .. }
    ));

    assert!(matches!(
        f.resolver
            .record_decision(request("post-2", ExpiredDecision::Reject, "dd-1"))
            .unwrap_err(),
        DecisionError::Validation { .. }
    ));

    assert!(f.store.expired_decisions().unwrap().is_empty());
    assert!(f.audit.entries().is_empty());
}

/// Test: The author is told about the resolution
#[test]
fn test_author_is_notified() {
    let f = fixture(vec![overdue("post-1", "fac-1", "nursing", 1)]);
    let mut receiver = f.services.dispatcher.subscribe();

    f.resolver
        .record_decision(request("post-1", ExpiredDecision::ApproveAtCurrentLevel, "dd-1"))
        .unwrap();

    let notification = receiver.try_recv().unwrap();
    assert_eq!(notification.recipient_id, "author-post-1");
    assert_eq!(
        notification.kind,
        NotificationKind::ExpiredResolved {
            decision: ExpiredDecision::ApproveAtCurrentLevel,
            agenda_level: AgendaLevel::DeptReview,
        }
    );
}

/// Test: History is newest first with a summary over every match
#[test]
fn test_history_summary_and_pagination() {
    let f = fixture(vec![
        overdue("post-1", "fac-1", "nursing", 2),
        overdue("post-2", "fac-1", "nursing", 4),
        overdue("post-3", "fac-1", "nursing", 6),
    ]);
    let now = Utc::now();
    for (i, (id, decision)) in [
        ("post-1", ExpiredDecision::Reject),
        ("post-2", ExpiredDecision::Downgrade),
        ("post-3", ExpiredDecision::Reject),
    ]
    .into_iter()
    .enumerate()
    {
        f.resolver
            .record_decision_at(
                request(id, decision, "dd-1"),
                now + Duration::minutes(i as i64),
            )
            .unwrap();
    }

    let page = f
        .resolver
        .history(&HistoryQuery {
            limit: Some(2),
            ..admin_history()
        })
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].post_id, "post-3");
    assert_eq!(page.records[1].post_id, "post-2");
    assert_eq!(page.summary.total, 3);
    assert_eq!(page.summary.counts.reject, 2);
    assert_eq!(page.summary.counts.downgrade, 1);
    assert_eq!(page.summary.counts.approve_at_current_level, 0);
    assert_eq!(page.summary.average_achievement_rate, 90.0);
    assert_eq!(page.summary.average_days_overdue, 4.0);

    let rest = f
        .resolver
        .history(&HistoryQuery {
            limit: Some(2),
            offset: 2,
            ..admin_history()
        })
        .unwrap();
    assert_eq!(rest.records.len(), 1);
    assert_eq!(rest.records[0].post_id, "post-1");

    // Inclusive date bounds
    let window = f
        .resolver
        .history(&HistoryQuery {
            start_date: Some(now + Duration::minutes(1)),
            end_date: Some(now + Duration::minutes(1)),
            ..admin_history()
        })
        .unwrap();
    assert_eq!(window.total, 1);
    assert_eq!(window.records[0].post_id, "post-2");
}

/// Test: Pending lists only overdue, escalated, unresolved proposals
#[test]
fn test_pending_proposals_filtering() {
    let now = Utc::now();
    let not_yet = Proposal::new("future", "a")
        .with_organisation("fac-1", "nursing")
        .with_level(AgendaLevel::DeptReview)
        .with_deadline(now + Duration::days(2));
    let not_escalated = Proposal::new("team", "a")
        .with_organisation("fac-1", "nursing")
        .with_deadline(now - Duration::days(2));
    let closed = overdue("closed", "fac-1", "nursing", 3).with_status(AgendaStatus::ApprovedAsDeptAgenda);
    let f = fixture(vec![
        overdue("post-1", "fac-1", "nursing", 1),
        overdue("post-2", "fac-1", "nursing", 7),
        overdue("post-3", "fac-1", "nursing", 4),
        not_yet,
        not_escalated,
        closed,
    ]);
    f.resolver
        .record_decision(request("post-3", ExpiredDecision::Reject, "dd-1"))
        .unwrap();

    let page = f
        .resolver
        .pending_proposals(&PendingQuery {
            user_id: "admin".into(),
            permission_level: 99.0,
            ..Default::default()
        })
        .unwrap();

    let ids: Vec<_> = page.proposals.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["post-2", "post-1"]);
    assert_eq!(page.total, 2);

    let most_overdue = &page.proposals[0];
    assert_eq!(most_overdue.days_overdue, 7);
    assert_eq!(most_overdue.target_score, Some(100));
    assert_eq!(most_overdue.achievement_rate, Some(90.0));
}

/// Test: Facility and department scopes narrow both queries
#[test]
fn test_organisational_scopes() {
    let f = fixture(vec![
        overdue("a", "fac-1", "nursing", 2),
        overdue("b", "fac-1", "rehab", 2),
        overdue("c", "fac-2", "rehab", 2),
    ]);

    let pending = |level: f64, user: &str| {
        let page = f
            .resolver
            .pending_proposals(&PendingQuery {
                user_id: user.into(),
                permission_level: level,
                ..Default::default()
            })
            .unwrap();
        let mut ids: Vec<_> = page.proposals.into_iter().map(|p| p.post_id).collect();
        ids.sort();
        ids
    };

    assert_eq!(pending(15.0, "corp"), vec!["a", "b", "c"]);
    assert_eq!(pending(10.0, "head-1"), vec!["a", "b"]);
    assert_eq!(pending(8.0, "dd-1"), vec!["a"]);
    assert_eq!(pending(8.0, "dd-2"), vec!["c"]);
    // Level 9+ without a facility anywhere sees nothing
    assert!(pending(10.0, "stranger").is_empty());

    for id in ["a", "b", "c"] {
        f.resolver
            .record_decision(request(id, ExpiredDecision::Reject, "dd-1"))
            .unwrap();
    }
    let history = f
        .resolver
        .history(&HistoryQuery {
            user_id: "someone".into(),
            permission_level: 12.0,
            facility_id: Some("fac-2".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.records[0].post_id, "c");
}

/// Test: Proposals still voting or never escalated are not resolved
#[test]
fn test_only_awaiting_proposals_are_resolved() {
    let now = Utc::now();
    let fresh = Proposal::new("fresh", "author-fresh").with_deadline(now + Duration::days(10));
    let voting = overdue("voting", "fac-1", "nursing", 0).with_deadline(now + Duration::days(1));
    let f = fixture(vec![fresh, voting]);

    for id in ["fresh", "voting"] {
        let mut req = request(id, ExpiredDecision::ApproveAtCurrentLevel, "nobody-at-all");
        req.agenda_level = AgendaLevel::None;
        let err = f.resolver.record_decision_at(req, now).unwrap_err();
        assert!(
            matches!(err, DecisionError::InvalidTransition { .. }),
            "{} should be refused",
            id
        );
    }

    let fresh = f.store.get_proposal("fresh").unwrap().unwrap();
    assert_eq!(fresh.agenda_status, AgendaStatus::Pending);
    assert_eq!(fresh.agenda_level, AgendaLevel::None);
    assert!(f.store.expired_decisions().unwrap().is_empty());
    assert!(f.audit.entries().is_empty());
}
