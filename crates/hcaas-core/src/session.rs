//! Connection resolution: explicit settings first, then the ambient tsuru
//! session stored under `~/.tsuru`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::connection::Connection;
use crate::error::{HcaasError, Result};

/// Ambient session state the resolver falls back to.
pub trait SessionLookup: Send + Sync {
    fn target(&self) -> Result<String>;
    fn token(&self) -> Result<String>;
}

/// Reads the active target and token the same way the tsuru client does.
#[derive(Debug, Clone)]
pub struct TsuruSession {
    dir: PathBuf,
    target_override: Option<String>,
    token_override: Option<String>,
}

impl TsuruSession {
    /// Session rooted at `dir` with no environment overrides.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            target_override: None,
            token_override: None,
        }
    }

    /// `~/.tsuru`, honoring `TSURU_TARGET` and `TSURU_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| HcaasError::resolution("Cannot determine home directory"))?
            .join(".tsuru");
        Ok(Self::new(dir)
            .with_target_override(std::env::var("TSURU_TARGET").ok())
            .with_token_override(std::env::var("TSURU_TOKEN").ok()))
    }

    pub fn with_target_override(mut self, target: Option<String>) -> Self {
        self.target_override = target.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        self.token_override = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Looks `label` up in the `targets` file (`<label> <url>` per line).
    fn target_by_label(&self, label: &str) -> Result<Option<String>> {
        let Some(content) = read_optional(&self.dir.join("targets"))? else {
            return Ok(None);
        };
        Ok(content.lines().find_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(name), Some(url)) if name == label => Some(url.to_string()),
                _ => None,
            }
        }))
    }
}

impl SessionLookup for TsuruSession {
    fn target(&self) -> Result<String> {
        if let Some(target) = &self.target_override {
            let target = target.trim();
            let resolved = self
                .target_by_label(target)?
                .unwrap_or_else(|| target.to_string());
            return normalize_target(&resolved);
        }
        match read_optional(&self.dir.join("target"))? {
            Some(target) => normalize_target(&target),
            None => Err(HcaasError::resolution(
                "You don't have a tsuru target. Set one with `tsuru target-set` or configure a host",
            )),
        }
    }

    fn token(&self) -> Result<String> {
        if let Some(token) = &self.token_override {
            return Ok(token.trim().to_string());
        }
        let token = read_optional(&self.dir.join("token"))?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if token.is_empty() {
            return Err(HcaasError::resolution(
                "No tsuru token found. Run `tsuru login` or configure a token",
            ));
        }
        Ok(token)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn normalize_target(raw: &str) -> Result<String> {
    let target = raw.trim().trim_end_matches('/');
    if target.is_empty() {
        return Err(HcaasError::resolution("tsuru target is empty"));
    }
    if target.contains("://") {
        Ok(target.to_string())
    } else {
        Ok(format!("http://{target}"))
    }
}

/// Produces the [`Connection`] for a reconciliation session.
pub struct ConnectionResolver {
    session: Box<dyn SessionLookup>,
}

impl ConnectionResolver {
    pub fn new(session: impl SessionLookup + 'static) -> Self {
        Self {
            session: Box::new(session),
        }
    }

    /// Explicit values win; empty strings count as unset.
    pub fn resolve(&self, host: Option<&str>, token: Option<&str>) -> Result<Connection> {
        let host = match host.filter(|h| !h.trim().is_empty()) {
            Some(h) => h.trim().to_string(),
            None => {
                debug!("No explicit host, using tsuru target");
                self.session.target()?
            }
        };
        let token = match token.filter(|t| !t.trim().is_empty()) {
            Some(t) => t.trim().to_string(),
            None => {
                debug!("No explicit token, using tsuru session token");
                self.session.token()?
            }
        };
        Ok(Connection::new(&host, &token))
    }
}
