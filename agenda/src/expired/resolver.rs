//! Expired escalation resolver implementation

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::metrics::{achievement_rate, days_overdue};
use super::scope::VisibilityScope;
use super::{
    ExpiredDecisionRequest, HistoryPage, HistoryQuery, HistorySummary, PendingPage,
    PendingProposal, PendingQuery,
};
use crate::audit::{AuditAction, AuditEvent};
use crate::collaborators::Collaborators;
use crate::config::{AgendaConfig, QueryConfig};
use crate::decision::engine::validate_reason;
use crate::error::{DecisionError, DecisionResult};
use crate::ladder::AgendaStatus;
use crate::notify::{Notification, NotificationKind};
use crate::proposal::{ExpiredDecision, ExpiredEscalationDecision, Proposal};

/// Records expired-deadline resolutions and answers the scoped queries.
pub struct ExpiredEscalationResolver {
    services: Collaborators,
    min_reason_length: usize,
    queries: QueryConfig,
}

impl ExpiredEscalationResolver {
    /// Resolver with default reason and page limits.
    pub fn new(services: Collaborators) -> Self {
        Self::with_config(services, &AgendaConfig::default())
    }

    /// Resolver using the reason floor and page sizes from `config`.
    pub fn with_config(services: Collaborators, config: &AgendaConfig) -> Self {
        Self {
            services,
            min_reason_length: config.decision.min_reason_length,
            queries: config.queries.clone(),
        }
    }

    /// Record a resolution as of the current time.
    pub fn record_decision(
        &self,
        request: ExpiredDecisionRequest,
    ) -> DecisionResult<ExpiredEscalationDecision> {
        self.record_decision_at(request, Utc::now())
    }

    /// Record a resolution as of `now`.
    pub fn record_decision_at(
        &self,
        request: ExpiredDecisionRequest,
        now: DateTime<Utc>,
    ) -> DecisionResult<ExpiredEscalationDecision> {
        let reason = validate_reason(&request.decision_reason, self.min_reason_length)?;
        let rate = achievement_rate(request.current_score, request.target_score)?;

        let proposal = self
            .services
            .store
            .get_proposal(&request.post_id)?
            .ok_or_else(|| DecisionError::not_found(format!("proposal {}", request.post_id)))?;
        let deadline = proposal.agenda_voting_deadline.ok_or_else(|| {
            DecisionError::validation(format!(
                "proposal {} has no voting deadline",
                request.post_id
            ))
        })?;

        let expected = proposal.agenda_status;
        if !awaits_resolution(&proposal, now) {
            warn!(
                post_id = %proposal.id,
                status = %expected,
                level = %proposal.agenda_level,
                "Expired decision on a proposal not awaiting resolution"
            );
            return Err(DecisionError::InvalidTransition {
                status: expected,
                decision: request.decision.to_string(),
            });
        }

        let record = ExpiredEscalationDecision {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: proposal.id.clone(),
            decider_id: request.decider_id.clone(),
            decision: request.decision,
            decision_reason: reason.to_string(),
            current_score: request.current_score,
            target_score: request.target_score,
            achievement_rate: rate,
            days_overdue: days_overdue(deadline, now),
            agenda_level: request.agenda_level,
            proposal_type: request
                .proposal_type
                .clone()
                .or_else(|| proposal.proposal_type.clone()),
            department: request
                .department
                .clone()
                .or_else(|| proposal.department.clone()),
            facility_id: request
                .facility_id
                .clone()
                .or_else(|| proposal.facility_id.clone()),
            created_at: now,
        };

        let mut updated = proposal;
        updated.agenda_status = request.decision.terminal_status();
        if request.decision == ExpiredDecision::Downgrade {
            updated.agenda_level = updated.agenda_level.downgraded();
        }
        updated.agenda_rescue_level = None;
        updated.agenda_decision_by = Some(request.decider_id.clone());
        updated.agenda_decision_at = Some(now);
        updated.agenda_decision_reason = Some(reason.to_string());

        if let Err(e) = self
            .services
            .store
            .commit_expired_decision(expected, &updated, &record)
        {
            let err = DecisionError::from(e);
            warn!(post_id = %updated.id, "Expired decision commit failed: {}", err);
            return Err(err);
        }

        info!(
            post_id = %updated.id,
            decider_id = %record.decider_id,
            decision = %record.decision,
            achievement_rate = record.achievement_rate,
            days_overdue = record.days_overdue,
            to = %updated.agenda_status,
            "Expired decision recorded"
        );

        self.append_audit(&record, expected, updated.agenda_status);
        self.notify_author(&updated, &record);
        Ok(record)
    }

    /// Scoped, paginated history of expired decisions, newest first.
    pub fn history(&self, query: &HistoryQuery) -> DecisionResult<HistoryPage> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(DecisionError::validation("start date is after end date"));
            }
        }
        let scope = self.scope(
            &query.user_id,
            query.permission_level,
            query.facility_id.as_deref(),
            query.department.as_deref(),
        );
        if scope.is_nothing() {
            return Ok(HistoryPage {
                records: Vec::new(),
                total: 0,
                summary: HistorySummary::default(),
            });
        }

        let mut matching: Vec<ExpiredEscalationDecision> = self
            .services
            .store
            .expired_decisions()?
            .into_iter()
            .filter(|r| scope.admits_record(r))
            .filter(|r| query.start_date.map_or(true, |start| r.created_at >= start))
            .filter(|r| query.end_date.map_or(true, |end| r.created_at <= end))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len();
        let summary = HistorySummary::from_records(&matching);
        let limit = self.queries.clamp(query.limit, self.queries.history_limit);
        let records = matching
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .collect();

        Ok(HistoryPage {
            records,
            total,
            summary,
        })
    }

    /// Scoped proposals past their deadline awaiting resolution, most
    /// overdue first.
    pub fn pending_proposals(&self, query: &PendingQuery) -> DecisionResult<PendingPage> {
        self.pending_proposals_at(query, Utc::now())
    }

    /// Pending proposals as of `now`.
    pub fn pending_proposals_at(
        &self,
        query: &PendingQuery,
        now: DateTime<Utc>,
    ) -> DecisionResult<PendingPage> {
        let scope = self.scope(
            &query.user_id,
            query.permission_level,
            query.facility_id.as_deref(),
            query.department.as_deref(),
        );
        if scope.is_nothing() {
            return Ok(PendingPage {
                proposals: Vec::new(),
                total: 0,
            });
        }

        let mut matching = Vec::new();
        for proposal in self.services.store.list_proposals()? {
            if !awaits_resolution(&proposal, now) || !scope.admits_proposal(&proposal) {
                continue;
            }
            if self.services.store.expired_decision_for(&proposal.id)?.is_some() {
                continue;
            }
            if let Some(item) = pending_item(proposal, now) {
                matching.push(item);
            }
        }
        matching.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.post_id.cmp(&b.post_id)));

        let total = matching.len();
        let limit = self.queries.clamp(query.limit, self.queries.pending_limit);
        debug!(total, limit, offset = query.offset, "Pending expired proposals");
        Ok(PendingPage {
            proposals: matching.into_iter().skip(query.offset).take(limit).collect(),
            total,
        })
    }

    fn scope(
        &self,
        user_id: &str,
        permission_level: f64,
        facility_id: Option<&str>,
        department: Option<&str>,
    ) -> VisibilityScope {
        VisibilityScope::resolve(
            user_id,
            permission_level,
            facility_id,
            department,
            self.services.directory.as_ref(),
        )
    }

    fn append_audit(
        &self,
        record: &ExpiredEscalationDecision,
        from: AgendaStatus,
        to: AgendaStatus,
    ) {
        let event = AuditEvent {
            post_id: record.post_id.clone(),
            actor_id: record.decider_id.clone(),
            action: AuditAction::ExpiredDecisionRecorded,
            from_status: from,
            to_status: to,
            detail: format!("{}: {}", record.decision, record.decision_reason),
        };
        if let Err(e) = self.services.audit.record(event) {
            warn!(post_id = %record.post_id, record_id = %record.id, "Audit append failed: {}", e);
        }
    }

    fn notify_author(&self, proposal: &Proposal, record: &ExpiredEscalationDecision) {
        let notification = Notification::new(
            proposal.author_id.clone(),
            proposal.id.clone(),
            NotificationKind::ExpiredResolved {
                decision: record.decision,
                agenda_level: proposal.agenda_level,
            },
            format!(
                "Your proposal's voting period ended at {:.1}% of target: {}",
                record.achievement_rate, proposal.agenda_status
            ),
        );
        self.services.dispatcher.dispatch(vec![notification]);
    }
}

/// Past its deadline, escalated beyond the team, and still open.
fn awaits_resolution(proposal: &Proposal, now: DateTime<Utc>) -> bool {
    proposal.is_past_deadline(now)
        && proposal.agenda_level.is_escalated()
        && !proposal.agenda_status.is_terminal()
}

fn pending_item(proposal: Proposal, now: DateTime<Utc>) -> Option<PendingProposal> {
    let deadline = proposal.agenda_voting_deadline?;
    let target_score = proposal.agenda_level.next_target_score();
    let rate = target_score.and_then(|t| achievement_rate(proposal.agenda_score, t).ok());
    Some(PendingProposal {
        post_id: proposal.id,
        author_id: proposal.author_id,
        agenda_status: proposal.agenda_status,
        agenda_level: proposal.agenda_level,
        current_score: proposal.agenda_score,
        target_score,
        achievement_rate: rate,
        deadline,
        days_overdue: days_overdue(deadline, now),
        proposal_type: proposal.proposal_type,
        department: proposal.department,
        facility_id: proposal.facility_id,
    })
}
