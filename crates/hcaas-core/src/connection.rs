use serde::{Deserialize, Serialize};

/// Service name used when a resource does not declare one.
pub const DEFAULT_SERVICE_NAME: &str = "healthcheck";

/// Resolved tsuru API target shared read-only by every reconciler of a session.
#[derive(Clone)]
pub struct Connection {
    host: String,
    token: String,
}

impl Connection {
    pub fn new(host: &str, token: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Builds the proxy URL that tsuru forwards to the HCaaS instance:
    /// `{host}/services/{service}/proxy/{instance}?callback=/resources/{instance}/{path}`.
    pub fn service_url(&self, service_name: &str, instance: &str, path: &str) -> String {
        let callback = format!("/resources/{}/{}", instance, path.trim_start_matches('/'));
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("callback", &callback)
            .finish();
        format!(
            "{}/services/{}/proxy/{}?{}",
            self.host, service_name, instance, query
        )
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("token", &"***")
            .finish()
    }
}

/// Which HCaaS instance a resource lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub instance: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl Placement {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            service_name: default_service_name(),
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_encodes_callback() {
        let conn = Connection::new("https://tsuru.example.com/", "t0k");
        assert_eq!(
            conn.service_url("healthcheck", "my-hc", "url"),
            "https://tsuru.example.com/services/healthcheck/proxy/my-hc?callback=%2Fresources%2Fmy-hc%2Furl"
        );
    }

    #[test]
    fn test_service_url_trims_leading_slashes() {
        let conn = Connection::new("http://h", "t");
        assert_eq!(
            conn.service_url("hc", "i", "//groups"),
            conn.service_url("hc", "i", "groups")
        );
    }

    #[test]
    fn test_service_url_escapes_email_segment() {
        let conn = Connection::new("http://h", "t");
        let url = conn.service_url("healthcheck", "i", "watcher/user@example.com");
        assert!(url.ends_with("callback=%2Fresources%2Fi%2Fwatcher%2Fuser%40example.com"));
    }

    #[test]
    fn test_placement_defaults_service_name() {
        let placement: Placement = serde_json::from_str(r#"{"instance":"i"}"#).unwrap();
        assert_eq!(placement.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(Placement::new("i"), placement);
    }

    #[test]
    fn test_debug_hides_token() {
        let conn = Connection::new("http://h", "secret");
        assert!(!format!("{conn:?}").contains("secret"));
    }
}
