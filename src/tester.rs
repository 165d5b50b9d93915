//! Connection testers for mailboxes and outboxes.
//!
//! A tester never returns an error and never touches the record it is given:
//! every outcome becomes a [`ConnectionTestResult`].

use std::path::Path;

use crate::config::{ProbeOptions, DEFAULT_O365_CLIENT_ID_KEY, DEFAULT_O365_CLIENT_SECRET_KEY};
use crate::connections::{BackendAlias, ConnectionHandler};
use crate::error::{ProbeError, Result};
use crate::imap::types::ImapConfig;
use crate::local::{self, LocalFormat};
use crate::mailbox::{Mailbox, MailboxKind, MailboxUri, GMAIL_IMAP_HOST};
use crate::office365::types::GraphConfig;
use crate::outbox::Outbox;
use crate::pop3::types::Pop3Config;
use crate::result::ConnectionTestResult;
use crate::transport::{probe, Auth, ConnectRequest, Connector, NetworkConnector, Security};

const DEFAULT_FOLDER: &str = "INBOX";

/// Tests inbound accounts.
pub struct MailboxConnectionTester<C = NetworkConnector> {
    connector: C,
    options: ProbeOptions,
}

impl Default for MailboxConnectionTester<NetworkConnector> {
    fn default() -> Self {
        Self::new(NetworkConnector, ProbeOptions::default())
    }
}

impl<C: Connector> MailboxConnectionTester<C> {
    pub fn new(connector: C, options: ProbeOptions) -> Self {
        Self { connector, options }
    }

    pub async fn test(&self, mailbox: &Mailbox) -> ConnectionTestResult {
        log::info!("testing connection for mailbox {mailbox}");
        match self.attempt(mailbox).await {
            Ok(target) => ConnectionTestResult::passed(format!(
                "Successfully connected to {} ({target})",
                mailbox.name
            )),
            Err(e) => {
                log::warn!("mailbox {mailbox}: {e}");
                ConnectionTestResult::from_error(&e)
            }
        }
    }

    /// Returns the `<KIND> <target>` part of the success message.
    async fn attempt(&self, mailbox: &Mailbox) -> Result<String> {
        let uri = mailbox.parsed_uri()?;
        let kind = uri.kind();

        let request = match kind {
            MailboxKind::Imap => ConnectRequest::Imap(self.imap(&uri)?),
            MailboxKind::Gmail => ConnectRequest::Imap(self.gmail(&uri)),
            MailboxKind::Pop3 => ConnectRequest::Pop3(self.pop3(&uri)?),
            MailboxKind::Office365 => ConnectRequest::Office365(self.office365(mailbox, &uri)?),
            MailboxKind::Maildir => return self.local(LocalFormat::Maildir, &uri).await,
            MailboxKind::Mbox => return self.local(LocalFormat::Mbox, &uri).await,
            MailboxKind::Babyl => return self.local(LocalFormat::Babyl, &uri).await,
            MailboxKind::Mh => return self.local(LocalFormat::Mh, &uri).await,
            MailboxKind::Mmdf => return self.local(LocalFormat::Mmdf, &uri).await,
        };

        probe(&self.connector, &request, self.options.timeout).await?;
        let target = match &request {
            ConnectRequest::Office365(config) => config.owner.clone(),
            ConnectRequest::Imap(ImapConfig { host, port, .. })
            | ConnectRequest::Pop3(Pop3Config { host, port, .. }) => format!("{host}:{port}"),
            ConnectRequest::Smtp(config) => format!("{}:{}", config.host, config.port),
        };
        Ok(format!("{} {target}", kind.label()))
    }

    async fn local(&self, format: LocalFormat, uri: &MailboxUri) -> Result<String> {
        let location = uri.location();
        if location.is_empty() {
            return Err(ProbeError::Config("local mailbox URI has no path".to_string()));
        }
        local::check(format, Path::new(&location)).await?;
        Ok(format!("{} {location}", uri.kind().label()))
    }

    fn endpoint(&self, uri: &MailboxUri) -> Result<(String, u16)> {
        let host = uri
            .host()
            .ok_or_else(|| ProbeError::Config(format!("{} URI has no host", uri.kind().label())))?;
        let port = uri
            .port()
            .ok_or_else(|| ProbeError::Config(format!("{} URI has no port", uri.kind().label())))?;
        Ok((host.to_string(), port))
    }

    fn password_auth(uri: &MailboxUri) -> Auth {
        Auth::Password {
            username: uri.username().to_string(),
            password: uri.password().to_string(),
        }
    }

    fn imap(&self, uri: &MailboxUri) -> Result<ImapConfig> {
        let (host, port) = self.endpoint(uri)?;
        Ok(ImapConfig {
            host,
            port,
            security: uri.security(),
            auth: Self::password_auth(uri),
            folder: Some(uri.folder().unwrap_or(DEFAULT_FOLDER).to_string()),
            accept_invalid_certs: self.options.accept_invalid_certs,
        })
    }

    /// XOAUTH2 when a token is configured for the account, the URI password otherwise.
    fn token_or_password(&self, uri: &MailboxUri) -> Auth {
        match self.options.oauth_token(uri.username()) {
            Some(token) => Auth::OAuth2 {
                username: uri.username().to_string(),
                access_token: token.to_string(),
            },
            None => Self::password_auth(uri),
        }
    }

    /// Always implicit TLS.
    fn gmail(&self, uri: &MailboxUri) -> ImapConfig {
        let auth = self.token_or_password(uri);
        ImapConfig {
            host: uri.host().unwrap_or(GMAIL_IMAP_HOST).to_string(),
            port: uri.port().unwrap_or(ImapConfig::TLS_PORT),
            security: Security::Tls,
            auth,
            folder: Some(uri.folder().unwrap_or(DEFAULT_FOLDER).to_string()),
            accept_invalid_certs: self.options.accept_invalid_certs,
        }
    }

    fn pop3(&self, uri: &MailboxUri) -> Result<Pop3Config> {
        let (host, port) = self.endpoint(uri)?;
        Ok(Pop3Config {
            host,
            port,
            security: uri.security(),
            auth: self.token_or_password(uri),
            accept_invalid_certs: self.options.accept_invalid_certs,
        })
    }

    fn office365(&self, mailbox: &Mailbox, uri: &MailboxUri) -> Result<GraphConfig> {
        let owner = mailbox
            .from_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProbeError::Config("from_email required".to_string()))?;
        let o365 = &self.options.office365;
        let (client_id, client_secret) = o365.resolve(
            uri.query("client_app_id"),
            uri.query("client_id_key").unwrap_or(DEFAULT_O365_CLIENT_ID_KEY),
            uri.query("client_secret_key").unwrap_or(DEFAULT_O365_CLIENT_SECRET_KEY),
        )?;
        Ok(GraphConfig {
            authority: o365.authority.clone(),
            graph_url: o365.graph_url.clone(),
            client_id,
            client_secret,
            owner: owner.to_string(),
            timeout: Some(self.options.timeout),
        })
    }
}

/// Tests outbound accounts through the backend their alias selects.
pub struct OutboxConnectionTester<C = NetworkConnector> {
    connector: C,
    options: ProbeOptions,
}

impl Default for OutboxConnectionTester<NetworkConnector> {
    fn default() -> Self {
        Self::new(NetworkConnector, ProbeOptions::default())
    }
}

impl<C: Connector> OutboxConnectionTester<C> {
    pub fn new(connector: C, options: ProbeOptions) -> Self {
        Self { connector, options }
    }

    pub async fn test(&self, outbox: &Outbox) -> ConnectionTestResult {
        log::info!("testing connection for outbox {} ({outbox})", outbox.name);
        match self.attempt(outbox).await {
            Ok(()) => ConnectionTestResult::passed(format!(
                "Successfully connected to {}",
                outbox.email_host
            )),
            Err(e) => {
                log::warn!("outbox {} (ID: {}): {e}", outbox.name, outbox.id);
                ConnectionTestResult::from_error(&e)
            }
        }
    }

    async fn attempt(&self, outbox: &Outbox) -> Result<()> {
        outbox.validate()?;
        let alias = BackendAlias::for_outbox(outbox)?;
        let request = ConnectionHandler::new(&self.options)
            .request(&alias.keyed(&outbox.email_host_user), outbox)?;
        let limit = outbox.timeout().unwrap_or(self.options.timeout);
        probe(&self.connector, &request, limit).await
    }
}
