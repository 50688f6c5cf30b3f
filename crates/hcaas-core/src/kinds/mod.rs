mod group;
mod url;
mod watcher;

pub use group::{GroupKind, GroupRecord};
pub use url::{UrlEntry, UrlKind, UrlRecord};
pub use watcher::{WatcherKind, WatcherRecord};
