//! Wire layer — camelCase request/response types and the service facade
//!
//! Every operation returns either its response or an [`ApiFailure`]; no
//! error crosses this boundary in any other shape. Enum-valued fields arrive
//! as strings and are parsed here, so a malformed value is a
//! `ValidationError` rather than a deserialization failure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::collaborators::Collaborators;
use crate::config::AgendaConfig;
use crate::decision::{DecisionEngine, DecisionRequest};
use crate::error::{DecisionError, ErrorKind};
use crate::expired::{
    DecisionCounts, ExpiredDecisionRequest, ExpiredEscalationResolver, HistoryQuery,
    HistorySummary, PendingProposal, PendingQuery,
};
use crate::ladder::{AgendaLevel, AgendaStatus, DecisionType};
use crate::proposal::{DecisionRecord, ExpiredDecision, ExpiredEscalationDecision};

/// Structured failure returned instead of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiFailure {
    /// Always false
    pub success: bool,
    pub error_kind: ErrorKind,
    pub message: String,
    /// What the caller should do next
    pub recovery_action: String,
    #[serde(default)]
    pub retryable: bool,
    /// Relevant identifiers for the caller
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl ApiFailure {
    /// HTTP status for the error kind.
    pub fn http_status(&self) -> u16 {
        self.error_kind.http_status()
    }

    fn with_context(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

impl From<DecisionError> for ApiFailure {
    fn from(err: DecisionError) -> Self {
        let kind = err.kind();
        let failure = Self {
            success: false,
            error_kind: kind,
            message: err.to_string(),
            recovery_action: err.recovery_action().to_string(),
            retryable: kind.is_retryable(),
            context: HashMap::new(),
        };
        match &err {
            DecisionError::Conflict {
                expected, actual, ..
            } => failure
                .with_context("expectedStatus", expected.as_str())
                .with_context("actualStatus", actual.as_str()),
            DecisionError::InvalidTransition { status, .. } => {
                failure.with_context("currentStatus", status.as_str())
            }
            DecisionError::PermissionDenied { required, .. } => {
                failure.with_context("requiredLevel", required.to_string())
            }
            _ => failure,
        }
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_kind, self.message)
    }
}

impl std::error::Error for ApiFailure {}

pub type ApiResult<T> = Result<T, ApiFailure>;

fn parse_field<T>(field: &str, value: &str) -> Result<T, DecisionError>
where
    T: std::str::FromStr<Err = crate::ladder::UnknownVariant>,
{
    value
        .parse()
        .map_err(|e| DecisionError::validation(format!("{}: {}", field, e)))
}

// ============================================================================
// submitDecision
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDecisionRequest {
    pub post_id: String,
    #[schemars(description = "One of the sixteen ladder decision types, e.g. recommend_to_manager")]
    pub decision_type: String,
    pub decider_id: String,
    #[schemars(description = "Free-text reason, at least 10 characters")]
    pub reason: String,
    #[serde(default)]
    #[schemars(description = "Optional committee reference; never validated")]
    pub committee_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDecisionResponse {
    pub success: bool,
    pub new_status: AgendaStatus,
    pub notifications_sent: usize,
}

// ============================================================================
// recordDecision (expired path)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordExpiredRequest {
    pub post_id: String,
    #[schemars(description = "approve_at_current_level, downgrade or reject")]
    pub decision: String,
    pub decider_id: String,
    #[schemars(description = "Free-text reason, at least 10 characters")]
    pub decision_reason: String,
    pub current_score: u32,
    pub target_score: u32,
    #[schemars(description = "Level the proposal sat at when its deadline passed")]
    pub agenda_level: String,
    #[serde(default)]
    pub proposal_type: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub facility_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordExpiredResponse {
    pub success: bool,
    pub decision_id: String,
}

// ============================================================================
// getHistory / getPendingProposals
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub user_id: String,
    pub permission_level: f64,
    #[serde(default)]
    pub facility_id: Option<String>,
    #[serde(default, alias = "departmentId")]
    pub department: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schemars(description = "Page size (default 50)")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub decisions: Vec<ExpiredEscalationDecision>,
    /// Matching records before pagination
    pub total: usize,
    pub summary: HistorySummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub user_id: String,
    pub permission_level: f64,
    #[serde(default)]
    pub facility_id: Option<String>,
    #[serde(default, alias = "departmentId")]
    pub department: Option<String>,
    #[serde(default)]
    #[schemars(description = "Page size (default 20)")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub success: bool,
    pub proposals: Vec<PendingProposal>,
    pub total: usize,
}

/// Menu a decider may act on, for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDecisionsResponse {
    pub success: bool,
    pub post_id: String,
    pub decisions: Vec<DecisionType>,
}

// ============================================================================
// Service facade
// ============================================================================

/// Engine and resolver behind one wire-shaped facade.
pub struct AgendaService {
    engine: DecisionEngine,
    resolver: ExpiredEscalationResolver,
}

impl AgendaService {
    /// Engine and resolver configured from `config`.
    pub fn new(services: Collaborators, config: &AgendaConfig) -> Self {
        Self {
            engine: DecisionEngine::with_config(services.clone(), config.decision.clone()),
            resolver: ExpiredEscalationResolver::with_config(services, config),
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn resolver(&self) -> &ExpiredEscalationResolver {
        &self.resolver
    }

    /// Parse, validate and apply a ladder decision.
    pub fn submit_decision(&self, request: SubmitDecisionRequest) -> ApiResult<SubmitDecisionResponse> {
        let decision_type: DecisionType = parse_field("decisionType", &request.decision_type)?;
        let mut core = DecisionRequest::new(
            request.post_id,
            decision_type,
            request.decider_id,
            request.reason,
        );
        core.committee_id = request.committee_id;

        let outcome = self.engine.submit_decision(core)?;
        Ok(SubmitDecisionResponse {
            success: true,
            new_status: outcome.new_status,
            notifications_sent: outcome.notifications_sent,
        })
    }

    /// Parse and record an expired-deadline resolution.
    pub fn record_expired_decision(
        &self,
        request: RecordExpiredRequest,
    ) -> ApiResult<RecordExpiredResponse> {
        let decision: ExpiredDecision = parse_field("decision", &request.decision)?;
        let agenda_level: AgendaLevel = parse_field("agendaLevel", &request.agenda_level)?;
        let record = self.resolver.record_decision(ExpiredDecisionRequest {
            post_id: request.post_id,
            decision,
            decider_id: request.decider_id,
            decision_reason: request.decision_reason,
            current_score: request.current_score,
            target_score: request.target_score,
            agenda_level,
            proposal_type: request.proposal_type,
            department: request.department,
            facility_id: request.facility_id,
        })?;
        Ok(RecordExpiredResponse {
            success: true,
            decision_id: record.id,
        })
    }

    /// Scoped expired-decision history with summary.
    pub fn history(&self, request: HistoryRequest) -> ApiResult<HistoryResponse> {
        let page = self.resolver.history(&HistoryQuery {
            user_id: request.user_id,
            permission_level: request.permission_level,
            facility_id: request.facility_id,
            department: request.department,
            start_date: request.start_date,
            end_date: request.end_date,
            limit: request.limit,
            offset: request.offset,
        })?;
        Ok(HistoryResponse {
            success: true,
            decisions: page.records,
            total: page.total,
            summary: page.summary,
        })
    }

    /// Scoped list of overdue, unresolved proposals.
    pub fn pending_proposals(&self, request: PendingRequest) -> ApiResult<PendingResponse> {
        let page = self.resolver.pending_proposals(&PendingQuery {
            user_id: request.user_id,
            permission_level: request.permission_level,
            facility_id: request.facility_id,
            department: request.department,
            limit: request.limit,
            offset: request.offset,
        })?;
        Ok(PendingResponse {
            success: true,
            proposals: page.proposals,
            total: page.total,
        })
    }

    /// Menu of decisions `user_id` may take on `post_id` right now.
    pub fn available_decisions(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> ApiResult<AvailableDecisionsResponse> {
        let decisions = self.engine.available_decisions(post_id, user_id)?;
        Ok(AvailableDecisionsResponse {
            success: true,
            post_id: post_id.to_string(),
            decisions,
        })
    }

    /// Decision records for a proposal, in commit order.
    pub fn decision_history(&self, post_id: &str) -> ApiResult<Vec<DecisionRecord>> {
        Ok(self.engine.decision_history(post_id)?)
    }
}

/// JSON Schemas of every request and response, keyed by type name.
pub fn wire_schemas() -> serde_json::Value {
    let mut schemas = serde_json::Map::new();
    macro_rules! add {
        ($($ty:ty),* $(,)?) => {
            $(
                let schema = schemars::schema_for!($ty);
                schemas.insert(
                    stringify!($ty).to_string(),
                    serde_json::to_value(&schema).unwrap_or(serde_json::Value::Null),
                );
            )*
        };
    }
    add!(
        SubmitDecisionRequest,
        SubmitDecisionResponse,
        RecordExpiredRequest,
        RecordExpiredResponse,
        HistoryRequest,
        HistoryResponse,
        PendingRequest,
        PendingResponse,
        AvailableDecisionsResponse,
        ApiFailure,
        DecisionCounts,
    );
    serde_json::Value::Object(schemas)
}
