//! Permission-scoped visibility for the expired-escalation queries
//!
//! | level           | scope                 |
//! |-----------------|-----------------------|
//! | 99, ≥ 16        | everything            |
//! | 14 ..< 16       | corporation-wide      |
//! | 9 ..< 14        | caller's facility     |
//! | 7 ..< 9         | caller's department   |
//! | 5 ..< 7         | caller's own records  |
//! | < 5             | nothing               |

use serde::Serialize;

use crate::profile::ProfileDirectory;
use crate::proposal::{ExpiredEscalationDecision, Proposal, UserId};

/// System administrator level.
pub const ADMIN_LEVEL: f64 = 99.0;

/// What a caller may see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum VisibilityScope {
    All,
    Corporation,
    Facility {
        facility_id: String,
    },
    Department {
        facility_id: Option<String>,
        department: String,
    },
    Own {
        user_id: UserId,
    },
    Nothing,
}

impl VisibilityScope {
    /// Scope for a caller. Missing facility or department falls back to the
    /// caller's profile; if still missing the caller sees nothing.
    pub fn resolve(
        user_id: &str,
        permission_level: f64,
        facility_id: Option<&str>,
        department: Option<&str>,
        directory: &dyn ProfileDirectory,
    ) -> Self {
        let level = permission_level;
        if level == ADMIN_LEVEL || level >= 16.0 {
            return Self::All;
        }
        if level >= 14.0 {
            return Self::Corporation;
        }
        if level.is_nan() || level < 5.0 {
            return Self::Nothing;
        }
        if level < 7.0 {
            return Self::Own {
                user_id: user_id.to_string(),
            };
        }

        let profile = directory.profile(user_id);
        let facility = facility_id
            .map(str::to_string)
            .or_else(|| profile.as_ref().and_then(|p| p.facility_id.clone()));

        if level >= 9.0 {
            return match facility {
                Some(facility_id) => Self::Facility { facility_id },
                None => Self::Nothing,
            };
        }

        let department = department
            .map(str::to_string)
            .or_else(|| profile.as_ref().and_then(|p| p.department.clone()));
        match department {
            Some(department) => Self::Department {
                facility_id: facility,
                department,
            },
            None => Self::Nothing,
        }
    }

    /// True when the caller may see nothing at all.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Whether an expired decision falls inside this scope.
    pub fn admits_record(&self, record: &ExpiredEscalationDecision) -> bool {
        self.admits(
            record.facility_id.as_deref(),
            record.department.as_deref(),
            Some(record.decider_id.as_str()),
        )
    }

    /// Own scope matches the proposal's last decider.
    pub fn admits_proposal(&self, proposal: &Proposal) -> bool {
        self.admits(
            proposal.facility_id.as_deref(),
            proposal.department.as_deref(),
            proposal.agenda_decision_by.as_deref(),
        )
    }

    fn admits(&self, facility: Option<&str>, department: Option<&str>, decider: Option<&str>) -> bool {
        match self {
            Self::All | Self::Corporation => true,
            Self::Facility { facility_id } => facility == Some(facility_id.as_str()),
            Self::Department {
                facility_id,
                department: wanted,
            } => {
                department == Some(wanted.as_str())
                    && facility_id
                        .as_deref()
                        .map_or(true, |f| facility.map_or(true, |actual| actual == f))
            }
            Self::Own { user_id } => decider == Some(user_id.as_str()),
            Self::Nothing => false,
        }
    }
}
