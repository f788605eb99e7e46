//! Permission profiles and reviewer lookup
//!
//! Authentication lives outside this crate. The core only needs to know a
//! user's permission level and organisational placement, and who sits at a
//! given level within a facility or department.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ladder::PermissionRange;
use crate::proposal::UserId;

/// Who a user is, as far as agenda decisions are concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionProfile {
    pub user_id: UserId,
    /// Fractional authority level; 99 is the system administrator.
    pub permission_level: f64,
    #[serde(default)]
    pub facility_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl PermissionProfile {
    /// Profile with no facility or department.
    pub fn new(user_id: impl Into<UserId>, permission_level: f64) -> Self {
        Self {
            user_id: user_id.into(),
            permission_level,
            facility_id: None,
            department: None,
            display_name: None,
        }
    }

    pub fn in_facility(mut self, facility_id: impl Into<String>) -> Self {
        self.facility_id = Some(facility_id.into());
        self
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// Lookup of profiles and reviewers.
///
/// Implementations must be cheap to call; the engine calls `profile` once per
/// decision and `reviewers` once per notification fan-out.
pub trait ProfileDirectory: Send + Sync {
    fn profile(&self, user_id: &str) -> Option<PermissionProfile>;

    /// Users whose level is in `range`, narrowed to `facility` and
    /// `department` when given.
    fn reviewers(
        &self,
        range: PermissionRange,
        facility: Option<&str>,
        department: Option<&str>,
    ) -> Vec<UserId>;
}

/// Shared reference to a profile directory
pub type SharedDirectory = Arc<dyn ProfileDirectory>;

/// In-memory directory built from a fixed list of profiles.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    profiles: BTreeMap<UserId, PermissionProfile>,
}

impl StaticDirectory {
    /// Directory over a fixed set of profiles, keyed by user id.
    pub fn new(profiles: impl IntoIterator<Item = PermissionProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.user_id.clone(), p))
                .collect(),
        }
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: PermissionProfile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileDirectory for StaticDirectory {
    fn profile(&self, user_id: &str) -> Option<PermissionProfile> {
        self.profiles.get(user_id).cloned()
    }

    fn reviewers(
        &self,
        range: PermissionRange,
        facility: Option<&str>,
        department: Option<&str>,
    ) -> Vec<UserId> {
        self.profiles
            .values()
            .filter(|p| range.contains(p.permission_level))
            .filter(|p| facility.map_or(true, |f| p.facility_id.as_deref() == Some(f)))
            .filter(|p| department.map_or(true, |d| p.department.as_deref() == Some(d)))
            .map(|p| p.user_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        StaticDirectory::new([
            PermissionProfile::new("mgr-a", 7.0)
                .in_facility("fac-1")
                .in_department("nursing"),
            PermissionProfile::new("mgr-b", 7.0)
                .in_facility("fac-1")
                .in_department("rehab"),
            PermissionProfile::new("mgr-c", 7.0)
                .in_facility("fac-2")
                .in_department("nursing"),
            PermissionProfile::new("dd-1", 8.0).in_facility("fac-1"),
            PermissionProfile::new("ga-1", 11.0),
        ])
    }

    #[test]
    fn test_profile_lookup() {
        let dir = directory();
        assert_eq!(dir.profile("dd-1").unwrap().permission_level, 8.0);
        assert!(dir.profile("nobody").is_none());
        assert_eq!(dir.len(), 5);
    }

    #[test]
    fn test_reviewers_are_scoped() {
        let dir = directory();
        let range = PermissionRange::exactly(7.0);
        assert_eq!(
            dir.reviewers(range, Some("fac-1"), Some("nursing")),
            vec!["mgr-a".to_string()]
        );
        assert_eq!(dir.reviewers(range, Some("fac-1"), None).len(), 2);
        assert_eq!(dir.reviewers(range, None, None).len(), 3);
        assert_eq!(
            dir.reviewers(PermissionRange::exactly(11.0), None, None),
            vec!["ga-1".to_string()]
        );
    }
}
