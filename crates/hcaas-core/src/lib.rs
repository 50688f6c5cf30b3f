//! Reconcilers for HCaaS (healthcheck-as-a-service) resources.
//!
//! URLs, watchers and groups are registered on an HCaaS instance through the
//! tsuru service proxy. Mutating calls go through [`LockedExecutor`], which
//! retries while the platform reports the target as event locked.

pub mod connection;
pub mod error;
pub mod executor;
pub mod kinds;
pub mod reconciler;
pub mod resource;
pub mod session;

use std::sync::Arc;

pub use connection::{Connection, DEFAULT_SERVICE_NAME, Placement};
pub use error::{HcaasError, Result};
pub use executor::{
    DEADLINE_SAFETY_MARGIN, EVENT_LOCKED_MARKER, LockedExecutor, LockedRequest, RetryPolicy,
    deadline_for,
};
pub use kinds::{GroupKind, GroupRecord, UrlKind, UrlRecord, WatcherKind, WatcherRecord};
pub use reconciler::Reconciler;
pub use resource::{
    DEFAULT_OPERATION_TIMEOUT, DeleteMode, ResourceKind, Timeouts, TrackedResource,
};
pub use session::{ConnectionResolver, SessionLookup, TsuruSession};

/// The three reconcilers of one session, sharing a connection and HTTP client.
#[derive(Clone)]
pub struct Provider {
    pub urls: Reconciler<UrlKind>,
    pub watchers: Reconciler<WatcherKind>,
    pub groups: Reconciler<GroupKind>,
}

impl Provider {
    pub fn new(connection: Connection, executor: LockedExecutor, timeouts: Timeouts) -> Self {
        let connection = Arc::new(connection);
        Self {
            urls: Reconciler::new(Arc::clone(&connection), executor.clone())
                .with_timeouts(timeouts),
            watchers: Reconciler::new(Arc::clone(&connection), executor.clone())
                .with_timeouts(timeouts),
            groups: Reconciler::new(connection, executor).with_timeouts(timeouts),
        }
    }
}
