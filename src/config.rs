//! The records file: global probe settings plus the configured mailboxes and
//! outboxes.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::error::{ProbeError, Result};
use crate::mailbox::Mailbox;
use crate::outbox::Outbox;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_O365_CLIENT_ID_KEY: &str = "O365_CLIENT_ID";
pub const DEFAULT_O365_CLIENT_SECRET_KEY: &str = "O365_CLIENT_SECRET";

/// Contents of `mailprobe.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub probe: ProbeSettings,
    pub office365: Office365Settings,
    /// OAuth access tokens keyed by account address (Gmail XOAUTH2).
    pub oauth_tokens: HashMap<String, String>,
    #[serde(rename = "mailbox")]
    pub mailboxes: Vec<Mailbox>,
    #[serde(rename = "outbox")]
    pub outboxes: Vec<Outbox>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub timeout_secs: u64,
    /// Skip certificate and hostname checks, for self-signed test servers.
    pub accept_invalid_certs: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

/// App registrations used for Office365 accounts.
///
/// `credentials` holds the shared keys (`O365_CLIENT_ID`, `O365_CLIENT_SECRET`,
/// or whatever names the records refer to); `apps` holds per-application
/// tables selected by a record's `client_app_id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Office365Settings {
    /// Token authority including the tenant, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    pub graph_url: String,
    pub credentials: HashMap<String, String>,
    pub apps: HashMap<String, HashMap<String, String>>,
}

impl Default for Office365Settings {
    fn default() -> Self {
        Self {
            authority: "https://login.microsoftonline.com/common".to_string(),
            graph_url: "https://graph.microsoft.com/v1.0".to_string(),
            credentials: HashMap::new(),
            apps: HashMap::new(),
        }
    }
}

impl Office365Settings {
    /// Look up the client id and secret named by a record.
    ///
    /// With a `client_app_id` the keys are read from that app's table,
    /// otherwise from the shared credentials.
    pub fn resolve(
        &self,
        client_app_id: Option<&str>,
        client_id_key: &str,
        client_secret_key: &str,
    ) -> Result<(String, String)> {
        let (table, scope) = match client_app_id.filter(|id| !id.is_empty()) {
            Some(app) => (
                self.apps.get(app).ok_or_else(|| {
                    ProbeError::Config(format!("Office365 app {app} is not configured"))
                })?,
                format!("office365.apps.{app}"),
            ),
            None => (&self.credentials, "office365.credentials".to_string()),
        };

        let lookup = |key: &str| {
            table
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| ProbeError::Config(format!("{scope}.{key} not set")))
        };
        Ok((lookup(client_id_key)?, lookup(client_secret_key)?))
    }
}

/// What the testers need from the settings, without the records.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub office365: Office365Settings,
    pub oauth_tokens: HashMap<String, String>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Settings::default().options()
    }
}

impl ProbeOptions {
    pub fn oauth_token(&self, account: &str) -> Option<&str> {
        self.oauth_tokens
            .get(account)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::io(format!("cannot read {}", path.display()), e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.check_unique_ids()?;
        Ok(settings)
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(m) = self.mailboxes.iter().find(|m| !seen.insert(m.id)) {
            return Err(ProbeError::Config(format!("duplicate mailbox id {}", m.id)));
        }
        seen.clear();
        if let Some(o) = self.outboxes.iter().find(|o| !seen.insert(o.id)) {
            return Err(ProbeError::Config(format!("duplicate outbox id {}", o.id)));
        }
        Ok(())
    }

    pub fn options(&self) -> ProbeOptions {
        ProbeOptions {
            timeout: Duration::from_secs(self.probe.timeout_secs),
            accept_invalid_certs: self.probe.accept_invalid_certs,
            office365: self.office365.clone(),
            oauth_tokens: self.oauth_tokens.clone(),
        }
    }
}
