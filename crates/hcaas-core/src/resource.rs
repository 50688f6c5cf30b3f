use std::fmt::Debug;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::connection::Placement;

/// How a kind identifies the object to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// `DELETE {base}/{sub_path}` with a JSON body naming the object.
    Body,
    /// `DELETE {base}/{sub_path}/{id}` with no body.
    PathAppended,
}

/// Per-kind descriptor consumed by [`crate::Reconciler`]. Kinds only differ
/// in payload shapes, sub-path and how a listing entry is matched.
pub trait ResourceKind: Send + Sync + 'static {
    /// Declared, create-only attributes.
    type Record: Debug + Clone + Default + Serialize + DeserializeOwned + Send + Sync;
    /// One element of the JSON array returned by the listing endpoint.
    type ListItem: DeserializeOwned + Send;

    const NAME: &'static str;
    const SUB_PATH: &'static str;
    const DELETE_MODE: DeleteMode;

    /// Natural key of a declared record; becomes the tracked id.
    fn natural_key(record: &Self::Record) -> &str;

    fn create_payload(record: &Self::Record) -> serde_json::Value;

    /// Body for [`DeleteMode::Body`] deletes; never sent for
    /// [`DeleteMode::PathAppended`].
    fn delete_payload(_id: &str, _record: &Self::Record) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn item_key(item: &Self::ListItem) -> &str;

    /// Copies observed attributes from a matching listing entry.
    fn refresh(record: &mut Self::Record, item: Self::ListItem);
}

/// State the host keeps between reconciliation calls. An empty `id` means
/// the remote object does not exist (or was never created).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedResource<R> {
    pub id: String,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(flatten)]
    pub record: R,
}

impl<R: Default> TrackedResource<R> {
    /// Import passthrough: only the id is known until the next read.
    pub fn imported(placement: Placement, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            placement,
            record: R::default(),
        }
    }
}

impl<R> TrackedResource<R> {
    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn mark_absent(&mut self) {
        self.id.clear();
    }
}

/// Per-operation timeouts configured on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub delete: Duration,
}

/// Host framework default for operations without an explicit timeout.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(20 * 60);

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_OPERATION_TIMEOUT,
            delete: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            delete: timeout,
        }
    }
}
