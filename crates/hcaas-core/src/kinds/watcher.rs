use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::resource::{DeleteMode, ResourceKind};

/// An account notified when a monitored URL fails.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherRecord {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for WatcherRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherRecord")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

pub struct WatcherKind;

impl ResourceKind for WatcherKind {
    type Record = WatcherRecord;
    type ListItem = String;

    const NAME: &'static str = "watcher";
    const SUB_PATH: &'static str = "watcher";
    const DELETE_MODE: DeleteMode = DeleteMode::PathAppended;

    fn natural_key(record: &WatcherRecord) -> &str {
        &record.email
    }

    fn create_payload(record: &WatcherRecord) -> serde_json::Value {
        json!({
            "watcher": record.email,
            "password": record.password,
        })
    }

    fn item_key(item: &String) -> &str {
        item
    }

    fn refresh(record: &mut WatcherRecord, item: String) {
        record.email = item;
    }
}
