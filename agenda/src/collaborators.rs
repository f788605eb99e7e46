//! The services the engine and resolver lean on

use std::sync::Arc;

use crate::audit::{AuditLog, SharedAuditSink};
use crate::notify::{NotificationDispatcher, SharedDispatcher};
use crate::profile::SharedDirectory;
use crate::store::SharedStore;

/// Store, profile lookup, audit trail and notification dispatcher.
///
/// Cloning is cheap; every field is an `Arc`.
#[derive(Clone)]
pub struct Collaborators {
    pub store: SharedStore,
    pub directory: SharedDirectory,
    pub audit: SharedAuditSink,
    pub dispatcher: SharedDispatcher,
}

impl Collaborators {
    /// Defaults to an in-process [`AuditLog`] and a fresh dispatcher.
    pub fn new(store: SharedStore, directory: SharedDirectory) -> Self {
        Self {
            store,
            directory,
            audit: Arc::new(AuditLog::new()),
            dispatcher: NotificationDispatcher::new().shared(),
        }
    }

    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: SharedDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}
