//! Decision engine implementation

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{DecisionOutcome, DecisionRequest};
use crate::audit::{AuditAction, AuditEvent};
use crate::collaborators::Collaborators;
use crate::config::{DecisionConfig, MIN_REASON_LENGTH};
use crate::error::{DecisionError, DecisionResult};
use crate::ladder::{AgendaStatus, DecisionType, EscalationRung, Ladder, Tier, Transition};
use crate::notify::{Notification, NotificationKind};
use crate::proposal::{DecisionRecord, Proposal};
use crate::rescue::RescueWindow;

/// Check a free-text reason and return it trimmed. `min_length` never
/// drops below [`MIN_REASON_LENGTH`].
pub(crate) fn validate_reason(reason: &str, min_length: usize) -> DecisionResult<&str> {
    let min_length = min_length.max(MIN_REASON_LENGTH);
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(DecisionError::validation("reason is required"));
    }
    let length = trimmed.chars().count();
    if length < min_length {
        return Err(DecisionError::validation(format!(
            "reason must be at least {} characters (got {})",
            min_length, length
        )));
    }
    Ok(trimmed)
}

/// Applies decisions against the standard ladder.
pub struct DecisionEngine {
    ladder: &'static Ladder,
    services: Collaborators,
    config: DecisionConfig,
}

impl DecisionEngine {
    /// Engine with the default reason floor.
    pub fn new(services: Collaborators) -> Self {
        Self::with_config(services, DecisionConfig::default())
    }

    /// Engine with an explicit decision config.
    pub fn with_config(services: Collaborators, config: DecisionConfig) -> Self {
        Self {
            ladder: Ladder::standard(),
            services,
            config,
        }
    }

    pub fn ladder(&self) -> &'static Ladder {
        self.ladder
    }

    /// Validate and apply one decision.
    pub fn submit_decision(&self, request: DecisionRequest) -> DecisionResult<DecisionOutcome> {
        let decision = request.decision_type;
        let reason = validate_reason(&request.reason, self.config.min_reason_length)?;

        let proposal = self
            .services
            .store
            .get_proposal(&request.post_id)?
            .ok_or_else(|| DecisionError::not_found(format!("proposal {}", request.post_id)))?;
        let expected = proposal.agenda_status;

        let (rung, transition) = self.resolve(expected, decision)?;
        self.authorize(rung, &request)?;

        let now = Utc::now();
        let resting = transition.resting_status();
        let mut updated = proposal;
        updated.agenda_status = resting;
        if let Some(level) = transition.level {
            updated.agenda_level = level;
        }
        updated.agenda_rescue_level = RescueWindow::for_status(resting).map(|w| w.rescue_level);
        updated.agenda_decision_by = Some(request.decider_id.clone());
        updated.agenda_decision_at = Some(now);
        updated.agenda_decision_reason = Some(reason.to_string());
        updated.agenda_committee_id = request.committee_id.clone();

        let record = DecisionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: updated.id.clone(),
            decider_id: request.decider_id.clone(),
            decision_type: decision,
            reason: reason.to_string(),
            previous_status: expected,
            new_status: transition.target,
            rescue_status: transition.rescue_target,
            committee_id: request.committee_id.clone(),
            timestamp: now,
        };

        if let Err(e) = self
            .services
            .store
            .commit_decision(expected, &updated, &record)
        {
            let err = DecisionError::from(e);
            warn!(
                post_id = %updated.id,
                decision = %decision,
                "Decision commit failed: {}",
                err
            );
            return Err(err);
        }

        info!(
            post_id = %updated.id,
            decider_id = %request.decider_id,
            decision = %decision,
            from = %expected,
            to = %resting,
            level = %updated.agenda_level,
            "Decision committed"
        );

        self.append_audit(&record, resting);
        let notifications_sent = self.fan_out(&updated, &record);

        Ok(DecisionOutcome {
            new_status: transition.target,
            resting_status: resting,
            agenda_level: updated.agenda_level,
            notifications_sent,
            record_id: record.id,
        })
    }

    /// Decision records for a proposal, in commit order.
    pub fn decision_history(&self, post_id: &str) -> DecisionResult<Vec<DecisionRecord>> {
        if self.services.store.get_proposal(post_id)?.is_none() {
            return Err(DecisionError::not_found(format!("proposal {}", post_id)));
        }
        let mut records = self.services.store.decision_records(post_id)?;
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Decisions `user_id` may take on the proposal right now.
    pub fn available_decisions(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> DecisionResult<Vec<DecisionType>> {
        let proposal = self
            .services
            .store
            .get_proposal(post_id)?
            .ok_or_else(|| DecisionError::not_found(format!("proposal {}", post_id)))?;
        Ok(match self.services.directory.profile(user_id) {
            Some(profile) => self
                .ladder
                .available_decisions(proposal.agenda_status, profile.permission_level),
            None => Vec::new(),
        })
    }

    fn resolve(
        &self,
        status: AgendaStatus,
        decision: DecisionType,
    ) -> DecisionResult<(&'static EscalationRung, &'static Transition)> {
        let rung = self.ladder.rung(status);
        match rung.and_then(|r| r.transition(decision).map(|t| (r, t))) {
            Some(found) => Ok(found),
            None => {
                warn!(%status, %decision, "Decision not on the menu");
                Err(DecisionError::invalid_transition(status, decision))
            }
        }
    }

    fn authorize(&self, rung: &EscalationRung, request: &DecisionRequest) -> DecisionResult<()> {
        let level = self
            .services
            .directory
            .profile(&request.decider_id)
            .map(|p| p.permission_level);
        if level.is_some_and(|l| rung.authorized.contains(l)) {
            return Ok(());
        }
        warn!(
            post_id = %request.post_id,
            decider_id = %request.decider_id,
            ?level,
            required = %rung.authorized,
            "Decider not authorized for rung {}",
            rung.name
        );
        Err(DecisionError::PermissionDenied {
            decider_id: request.decider_id.clone(),
            level,
            status: rung.status,
            required: rung.authorized,
        })
    }

    fn append_audit(&self, record: &DecisionRecord, resting: AgendaStatus) {
        let action = if record.rescue_status.is_some() {
            AuditAction::RescueWindowOpened
        } else {
            AuditAction::DecisionSubmitted
        };
        let event = AuditEvent {
            post_id: record.post_id.clone(),
            actor_id: record.decider_id.clone(),
            action,
            from_status: record.previous_status,
            to_status: resting,
            detail: format!("{}: {}", record.decision_type, record.reason),
        };
        if let Err(e) = self.services.audit.record(event) {
            warn!(post_id = %record.post_id, record_id = %record.id, "Audit append failed: {}", e);
        }
    }

    /// Notify the author and the reviewers of the rung the proposal now
    /// rests on. Returns the number of distinct recipients.
    fn fan_out(&self, proposal: &Proposal, record: &DecisionRecord) -> usize {
        let mut notifications = vec![Notification::new(
            proposal.author_id.clone(),
            proposal.id.clone(),
            NotificationKind::DecisionMade {
                decision_type: record.decision_type,
                new_status: record.new_status,
            },
            format!(
                "Your proposal was updated: {} ({})",
                record.new_status, record.decision_type
            ),
        )];

        if let Some(next) = self.ladder.rung(proposal.agenda_status) {
            let (facility, department) = reviewer_scope(next.tier, proposal);
            let reviewers = self
                .services
                .directory
                .reviewers(next.authorized, facility, department);
            debug!(
                post_id = %proposal.id,
                rung = next.name,
                reviewers = reviewers.len(),
                "Requesting review"
            );
            notifications.extend(reviewers.into_iter().map(|reviewer| {
                Notification::new(
                    reviewer,
                    proposal.id.clone(),
                    NotificationKind::ReviewRequested {
                        status: proposal.agenda_status,
                    },
                    format!("A proposal awaits your decision ({})", proposal.agenda_status),
                )
            }));
        }

        self.services.dispatcher.dispatch(notifications)
    }
}

/// Organisational filter for reviewers of a rung at `tier`.
fn reviewer_scope(tier: Tier, proposal: &Proposal) -> (Option<&str>, Option<&str>) {
    match tier {
        Tier::Team | Tier::Department => {
            (proposal.facility_id.as_deref(), proposal.department.as_deref())
        }
        Tier::Facility => (proposal.facility_id.as_deref(), None),
        Tier::Corporation => (None, None),
    }
}
