//! Property tests for permission-scoped queries
//!
//! Deterministic loops over callers, levels and filters against a fixed
//! population of expired decisions and overdue proposals.

use std::sync::Arc;

use agenda::{
    AgendaLevel, AgendaStatus, AgendaStore, Collaborators, ExpiredDecision,
    ExpiredDecisionRequest, ExpiredEscalationResolver, HistoryQuery, MemoryStore, PendingQuery,
    PermissionProfile, Proposal, StaticDirectory, VisibilityScope,
};
use chrono::{Duration, Utc};

const DECIDERS: &[&str] = &["alice", "bob", "carol"];
const FACILITIES: &[&str] = &["fac-1", "fac-2"];
const DEPARTMENTS: &[&str] = &["nursing", "rehab"];

/// Resolver over 12 proposals: 8 resolved by the deciders in turn, 4 left pending
/// with their last ladder decision by the same deciders.
fn populated() -> ExpiredEscalationResolver {
    let store = MemoryStore::new().shared();
    let directory = StaticDirectory::new(
        DECIDERS
            .iter()
            .map(|d| PermissionProfile::new(*d, 6.0).in_facility("fac-1").in_department("nursing")),
    );
    let resolver =
        ExpiredEscalationResolver::new(Collaborators::new(store.clone(), Arc::new(directory)));

    for i in 0..12 {
        let facility = FACILITIES[i % FACILITIES.len()];
        let department = DEPARTMENTS[(i / 2) % DEPARTMENTS.len()];
        let decider = DECIDERS[i % DECIDERS.len()];
        let mut proposal = Proposal::new(format!("post-{}", i), "author")
            .with_organisation(facility, department)
            .with_level(AgendaLevel::FacilityAgenda)
            .with_status(AgendaStatus::PendingDeputyDirectorReview)
            .with_score(80)
            .with_deadline(Utc::now() - Duration::days(1 + i as i64));
        proposal.agenda_decision_by = Some(decider.to_string());
        store.put_proposal(&proposal).unwrap();

        if i < 8 {
            resolver
                .record_decision(ExpiredDecisionRequest {
                    post_id: proposal.id.clone(),
                    decision: ExpiredDecision::all()[i % 3],
                    decider_id: decider.to_string(),
                    decision_reason: "Deadline passed below target".into(),
                    current_score: 80,
                    target_score: 300,
                    agenda_level: AgendaLevel::FacilityAgenda,
                    proposal_type: None,
                    department: None,
                    facility_id: None,
                })
                .unwrap();
        }
    }
    resolver
}

/// Filter combinations a caller might send
fn filters() -> Vec<(Option<String>, Option<String>)> {
    let mut out = vec![(None, None)];
    for f in FACILITIES {
        out.push((Some(f.to_string()), None));
        for d in DEPARTMENTS {
            out.push((Some(f.to_string()), Some(d.to_string())));
            out.push((None, Some(d.to_string())));
        }
    }
    out
}

/// Test: Levels 5-6 never see another decider's records
#[test]
fn prop_own_scope_sees_only_own_decisions() {
    let resolver = populated();
    for caller in DECIDERS {
        for level in [5.0, 5.5, 6.0, 6.9] {
            for (facility, department) in filters() {
                let history = resolver
                    .history(&HistoryQuery {
                        user_id: caller.to_string(),
                        permission_level: level,
                        facility_id: facility.clone(),
                        department: department.clone(),
                        limit: Some(200),
                        ..Default::default()
                    })
                    .unwrap();
                assert!(history.total > 0);
                assert!(history.records.iter().all(|r| r.decider_id == *caller));

                let pending = resolver
                    .pending_proposals(&PendingQuery {
                        user_id: caller.to_string(),
                        permission_level: level,
                        facility_id: facility,
                        department,
                        limit: Some(200),
                        ..Default::default()
                    })
                    .unwrap();
                assert!(pending.total > 0);
                for item in &pending.proposals {
                    assert_eq!(DECIDERS[post_index(&item.post_id) % DECIDERS.len()], *caller);
                }
            }
        }
    }
}

/// Test: Below level 5 every query is empty, whatever the filters
#[test]
fn prop_low_levels_see_nothing() {
    let resolver = populated();
    for level in [-1.0, 0.0, 1.0, 3.0, 3.5, 4.0, 4.99] {
        for (facility, department) in filters() {
            let history = resolver
                .history(&HistoryQuery {
                    user_id: "alice".into(),
                    permission_level: level,
                    facility_id: facility.clone(),
                    department: department.clone(),
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(history.total, 0);
            assert!(history.records.is_empty());
            assert_eq!(history.summary.total, 0);

            let pending = resolver
                .pending_proposals(&PendingQuery {
                    user_id: "alice".into(),
                    permission_level: level,
                    facility_id: facility,
                    department,
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(pending.total, 0);
            assert!(pending.proposals.is_empty());
        }
    }
}

/// Test: Unrestricted and corporation scopes ignore organisational filters
#[test]
fn prop_high_levels_see_everything() {
    let resolver = populated();
    for level in [14.0, 15.0, 16.0, 17.0, 99.0] {
        let history = resolver
            .history(&HistoryQuery {
                user_id: "exec".into(),
                permission_level: level,
                facility_id: Some("fac-1".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(history.total, 8);

        let pending = resolver
            .pending_proposals(&PendingQuery {
                user_id: "exec".into(),
                permission_level: level,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.total, 4);
    }
}

/// Test: Page size defaults and clamping
#[test]
fn test_limits_default_and_clamp() {
    let resolver = populated();
    let page = resolver
        .history(&HistoryQuery {
            user_id: "exec".into(),
            permission_level: 99.0,
            limit: Some(0),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.records.len(), 1);

    let page = resolver
        .history(&HistoryQuery {
            user_id: "exec".into(),
            permission_level: 99.0,
            limit: Some(10_000),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.records.len(), 8);
}

/// Test: The resolved scope for each band
#[test]
fn test_scope_bands_with_profile_fallback() {
    let directory = StaticDirectory::new([PermissionProfile::new("alice", 8.0)
        .in_facility("fac-1")
        .in_department("nursing")]);
    assert_eq!(
        VisibilityScope::resolve("alice", 8.0, None, None, &directory),
        VisibilityScope::Department {
            facility_id: Some("fac-1".into()),
            department: "nursing".into(),
        }
    );
    assert_eq!(
        VisibilityScope::resolve("alice", 6.0, Some("fac-9"), None, &directory),
        VisibilityScope::Own {
            user_id: "alice".into()
        }
    );
}

fn post_index(post_id: &str) -> usize {
    post_id
        .trim_start_matches("post-")
        .parse()
        .unwrap_or(usize::MAX)
}
