//! Maps an outbox to the connection its backend would open.

use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::config::{ProbeOptions, DEFAULT_O365_CLIENT_ID_KEY, DEFAULT_O365_CLIENT_SECRET_KEY};
use crate::error::{ProbeError, Result};
use crate::office365::types::GraphConfig;
use crate::outbox::Outbox;
use crate::smtp::types::SmtpConfig;
use crate::transport::{Auth, ConnectRequest};

pub const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";
const OFFICE365_SCHEME: &str = "office365";
const KEY_SEPARATOR: &str = ";;;";

/// The sending backend an outbox goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendAlias {
    Smtp,
    Office365,
    Gmail,
}

impl BackendAlias {
    /// Explicit `provider` first, then a guess from the host name.
    pub fn for_outbox(outbox: &Outbox) -> Result<Self> {
        if let Some(provider) = outbox.provider.as_deref().filter(|p| !p.is_empty()) {
            return provider.parse();
        }
        let host = outbox.email_host.to_ascii_lowercase();
        Ok(if host.contains("office365") {
            BackendAlias::Office365
        } else if host.contains("gmail") {
            BackendAlias::Gmail
        } else {
            BackendAlias::Smtp
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendAlias::Smtp => "smtp",
            BackendAlias::Office365 => "o365",
            BackendAlias::Gmail => "gmail",
        }
    }

    /// `o365;;;owner@example.com`
    pub fn keyed(self, from_email: &str) -> String {
        format!("{}{KEY_SEPARATOR}{from_email}", self.as_str())
    }
}

impl FromStr for BackendAlias {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(BackendAlias::Smtp),
            "o365" | "office365" => Ok(BackendAlias::Office365),
            "gmail" => Ok(BackendAlias::Gmail),
            other => Err(ProbeError::UnsupportedKind(format!(
                "{other} is not a valid backend alias"
            ))),
        }
    }
}

impl fmt::Display for BackendAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `alias;;;from_email` into its parts; a bare alias has no sender.
pub fn split_keyed(alias: &str) -> Result<(BackendAlias, Option<&str>)> {
    match alias.split_once(KEY_SEPARATOR) {
        Some((name, from_email)) => {
            let from_email = Some(from_email).filter(|e| !e.is_empty());
            Ok((name.parse()?, from_email))
        }
        None => Ok((alias.parse()?, None)),
    }
}

/// Builds the connection request for an alias and an outbox.
///
/// Nothing is cached: every call describes a fresh connection.
pub struct ConnectionHandler<'a> {
    options: &'a ProbeOptions,
}

impl<'a> ConnectionHandler<'a> {
    pub fn new(options: &'a ProbeOptions) -> Self {
        Self { options }
    }

    /// `alias` is either a bare alias or the keyed `alias;;;from_email` form.
    pub fn request(&self, alias: &str, outbox: &Outbox) -> Result<ConnectRequest> {
        let (alias, from_email) = split_keyed(alias)?;
        let sender = from_email.unwrap_or(&outbox.email_host_user);
        log::debug!("building {alias} connection for {sender}");

        match alias {
            BackendAlias::Smtp => Ok(ConnectRequest::Smtp(self.smtp(
                outbox,
                &outbox.email_host,
                None,
            ))),
            BackendAlias::Gmail => {
                let host = match outbox.email_host.trim() {
                    "" => GMAIL_SMTP_HOST,
                    host => host,
                };
                let token = self.options.oauth_token(sender);
                Ok(ConnectRequest::Smtp(self.smtp(outbox, host, token)))
            }
            BackendAlias::Office365 => {
                Ok(ConnectRequest::Office365(self.office365(outbox, sender)?))
            }
        }
    }

    fn smtp(&self, outbox: &Outbox, host: &str, token: Option<&str>) -> SmtpConfig {
        let auth = match token {
            Some(token) => Auth::OAuth2 {
                username: outbox.email_host_user.clone(),
                access_token: token.to_string(),
            },
            None => Auth::Password {
                username: outbox.email_host_user.clone(),
                password: outbox.email_host_password.clone(),
            },
        };
        SmtpConfig {
            host: host.to_string(),
            port: outbox.email_port,
            security: outbox.security(),
            auth,
            timeout: outbox.timeout(),
            accept_invalid_certs: self.options.accept_invalid_certs,
        }
    }

    /// `email_host` looks like `office365://?client_app_id=..&client_id_key=..`.
    fn office365(&self, outbox: &Outbox, owner: &str) -> Result<GraphConfig> {
        let url = Url::parse(&outbox.email_host).map_err(|e| {
            ProbeError::Config(format!("invalid EMAIL_HOST {}: {e}", outbox.email_host))
        })?;
        if !url.scheme().eq_ignore_ascii_case(OFFICE365_SCHEME) {
            return Err(ProbeError::Config(format!(
                "invalid EMAIL_HOST scheme, expected \"{OFFICE365_SCHEME}\", got \"{}\"",
                url.scheme()
            )));
        }
        if owner.is_empty() {
            return Err(ProbeError::Config("from_email required".to_string()));
        }

        let query = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };
        let client_id_key =
            query("client_id_key").unwrap_or_else(|| DEFAULT_O365_CLIENT_ID_KEY.to_string());
        let client_secret_key = query("client_secret_key")
            .unwrap_or_else(|| DEFAULT_O365_CLIENT_SECRET_KEY.to_string());
        let client_app_id = query("client_app_id");

        let o365 = &self.options.office365;
        let (client_id, client_secret) =
            o365.resolve(client_app_id.as_deref(), &client_id_key, &client_secret_key)?;

        Ok(GraphConfig {
            authority: o365.authority.clone(),
            graph_url: o365.graph_url.clone(),
            client_id,
            client_secret,
            owner: owner.to_string(),
            timeout: outbox.timeout(),
        })
    }
}
