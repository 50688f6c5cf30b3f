use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::resource::{DeleteMode, ResourceKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group: String,
}

pub struct GroupKind;

impl ResourceKind for GroupKind {
    type Record = GroupRecord;
    type ListItem = String;

    const NAME: &'static str = "group";
    const SUB_PATH: &'static str = "groups";
    const DELETE_MODE: DeleteMode = DeleteMode::Body;

    fn natural_key(record: &GroupRecord) -> &str {
        &record.group
    }

    fn create_payload(record: &GroupRecord) -> serde_json::Value {
        json!({ "group": record.group })
    }

    fn delete_payload(id: &str, record: &GroupRecord) -> serde_json::Value {
        // imported groups carry no record until the first read
        let group = if record.group.is_empty() { id } else { &record.group };
        json!({ "group": group })
    }

    fn item_key(item: &String) -> &str {
        item
    }

    fn refresh(record: &mut GroupRecord, item: String) {
        record.group = item;
    }
}
