use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::resource::{DeleteMode, ResourceKind};

/// A monitored URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    /// Substring the response body must contain.
    #[serde(default)]
    pub expected_string: String,
    /// Free text attached to alerts.
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlEntry {
    pub url: String,
    #[serde(default)]
    pub comment: String,
}

pub struct UrlKind;

impl ResourceKind for UrlKind {
    type Record = UrlRecord;
    type ListItem = UrlEntry;

    const NAME: &'static str = "url";
    const SUB_PATH: &'static str = "url";
    const DELETE_MODE: DeleteMode = DeleteMode::Body;

    fn natural_key(record: &UrlRecord) -> &str {
        &record.url
    }

    fn create_payload(record: &UrlRecord) -> serde_json::Value {
        json!({
            "url": record.url,
            "expected_string": record.expected_string,
            "comment": record.comment,
        })
    }

    fn delete_payload(id: &str, _record: &UrlRecord) -> serde_json::Value {
        json!({ "url": id })
    }

    fn item_key(item: &UrlEntry) -> &str {
        &item.url
    }

    fn refresh(record: &mut UrlRecord, item: UrlEntry) {
        record.url = item.url;
        record.comment = item.comment;
    }
}
