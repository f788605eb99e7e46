//! Column family definitions for the RocksDB store
//!
//! Each column family holds one record type; keys are prefixed so prefix
//! iteration stays within a post.

/// Column family for proposals
pub const CF_PROPOSALS: &str = "proposals";

/// Column family for decision records
pub const CF_DECISIONS: &str = "decisions";

/// Column family for expired-deadline decisions
pub const CF_EXPIRED: &str = "expired";

/// All column family names
pub const ALL_CFS: &[&str] = &[CF_PROPOSALS, CF_DECISIONS, CF_EXPIRED];

/// Key prefixes for compound keys
pub mod keys {
    pub const PROPOSAL_PREFIX: &str = "post:";
    pub const EXPIRED_PREFIX: &str = "expired:";

    /// Key of a proposal in `CF_PROPOSALS`
    pub fn proposal(post_id: &str) -> String {
        format!("post:{}", post_id)
    }

    /// Decision key: post, then zero-padded timestamp so records sort
    /// chronologically within a post.
    pub fn decision(post_id: &str, timestamp_nanos: i64, record_id: &str) -> String {
        format!("dec:{}:{:020}:{}", post_id, timestamp_nanos, record_id)
    }

    /// Prefix covering every decision of one post.
    pub fn decision_prefix(post_id: &str) -> String {
        format!("dec:{}:", post_id)
    }

    /// Key of a resolution in `CF_EXPIRED`
    pub fn expired(post_id: &str) -> String {
        format!("expired:{}", post_id)
    }
}
