use async_imap::{Authenticator, Client, Session};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::types::ImapConfig;
use crate::error::{ProbeError, Result};
use crate::transport::stream::{self, MailStream};
use crate::transport::{Auth, Connection, Security};

// ---------- XOAUTH2 authenticator ----------

struct XOAuth2 {
    response: Vec<u8>,
}

impl XOAuth2 {
    fn new(user: &str, access_token: &str) -> Self {
        // XOAUTH2 format: "user=" {user} "\x01auth=Bearer " {token} "\x01\x01"
        let s = format!("user={}\x01auth=Bearer {}\x01\x01", user, access_token);
        Self {
            response: s.into_bytes(),
        }
    }
}

impl Authenticator for XOAuth2 {
    type Response = Vec<u8>;
    fn process(&mut self, _challenge: &[u8]) -> Self::Response {
        // A second challenge means the token was refused; answer empty so the
        // server finishes with a tagged NO we can report.
        std::mem::take(&mut self.response)
    }
}

type ImapSession = Session<MailStream>;

/// An authenticated IMAP session, logged out on close.
pub struct ImapConnection {
    session: ImapSession,
    folder: Option<String>,
}

impl ImapConnection {
    /// Connect and authenticate.
    ///
    /// Supports TLS (direct), STARTTLS (upgrade), and plain connections.
    pub async fn open(config: &ImapConfig) -> Result<Self> {
        let session = match config.security {
            // The greeting is consumed during the upgrade, so STARTTLS gets its own flow.
            Security::StartTls => connect_starttls(config).await?,
            Security::Tls | Security::None => {
                let stream = stream::connect(
                    &config.host,
                    config.port,
                    config.security == Security::Tls,
                    config.accept_invalid_certs,
                )
                .await?;
                authenticate(Client::new(stream), config).await?
            }
        };

        Ok(Self {
            session,
            folder: config.folder.clone(),
        })
    }
}

#[async_trait]
impl Connection for ImapConnection {
    async fn verify(&mut self) -> Result<()> {
        self.session
            .noop()
            .await
            .map_err(|e| ProbeError::Imap(format!("NOOP failed: {e}")))?;

        if let Some(folder) = &self.folder {
            // Modified UTF-7 (RFC 3501 §5.1.3) on the wire
            let raw = utf7_imap::encode_utf7_imap(folder.clone());
            self.session
                .examine(&raw)
                .await
                .map_err(|e| ProbeError::Imap(format!("EXAMINE {folder} failed: {e}")))?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut session = self.session;
        session
            .logout()
            .await
            .map_err(|e| ProbeError::Imap(format!("LOGOUT failed: {e}")))
    }
}

/// Connect plain, upgrade with STARTTLS, then authenticate on the TLS stream.
async fn connect_starttls(config: &ImapConfig) -> Result<ImapSession> {
    let mut tcp = stream::connect_tcp(&config.host, config.port).await?;

    let mut buf = vec![0u8; 4096];
    let n = tcp
        .read(&mut buf)
        .await
        .map_err(|e| ProbeError::io("failed to read server greeting", e))?;
    let greeting = String::from_utf8_lossy(&buf[..n]);
    if !greeting.contains("OK") {
        return Err(ProbeError::Imap(format!(
            "unexpected server greeting: {}",
            greeting.trim_end()
        )));
    }

    tcp.write_all(b"a001 STARTTLS\r\n")
        .await
        .map_err(|e| ProbeError::io("failed to send STARTTLS", e))?;

    let n = tcp
        .read(&mut buf)
        .await
        .map_err(|e| ProbeError::io("failed to read STARTTLS response", e))?;
    let response = String::from_utf8_lossy(&buf[..n]);
    if !response.contains("OK") {
        return Err(ProbeError::Imap(format!(
            "STARTTLS rejected: {}",
            response.trim_end()
        )));
    }

    let tls = stream::upgrade(tcp, &config.host, config.accept_invalid_certs).await?;
    authenticate(Client::new(tls), config).await
}

/// Authenticate with the IMAP server (LOGIN or XOAUTH2).
async fn authenticate(client: Client<MailStream>, config: &ImapConfig) -> Result<ImapSession> {
    match &config.auth {
        Auth::OAuth2 {
            username,
            access_token,
        } => {
            let auth = XOAuth2::new(username, access_token);
            client
                .authenticate("XOAUTH2", auth)
                .await
                .map_err(|(e, _)| ProbeError::Auth(format!("IMAP XOAUTH2 rejected: {e}")))
        }
        Auth::Password { username, password } => client
            .login(username, password)
            .await
            .map_err(|(e, _)| ProbeError::Auth(format!("IMAP LOGIN rejected: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{probe, ConnectRequest, NetworkConnector};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Minimal IMAP server: accepts `secret` as the only password.
    async fn fake_imap_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            write.write_all(b"* OK fake IMAP ready\r\n").await.unwrap();
            while let Ok(Some(line)) = lines.next_line().await {
                let mut parts = line.splitn(3, ' ');
                let tag = parts.next().unwrap_or("*").to_string();
                let command = parts.next().unwrap_or("").to_ascii_uppercase();
                let reply = match command.as_str() {
                    "LOGIN" if line.contains("secret") => format!("{tag} OK LOGIN completed\r\n"),
                    "LOGIN" => {
                        format!("{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
                    }
                    "NOOP" => format!("{tag} OK NOOP completed\r\n"),
                    "EXAMINE" if line.contains("INBOX") => format!(
                        "* FLAGS (\\Seen \\Deleted)\r\n* 3 EXISTS\r\n* 0 RECENT\r\n{tag} OK [READ-ONLY] EXAMINE completed\r\n"
                    ),
                    "EXAMINE" => format!("{tag} NO Mailbox does not exist\r\n"),
                    "LOGOUT" => format!("* BYE logging out\r\n{tag} OK LOGOUT completed\r\n"),
                    _ => format!("{tag} BAD unknown command\r\n"),
                };
                write.write_all(reply.as_bytes()).await.unwrap();
                if command == "LOGOUT" || (command == "LOGIN" && !line.contains("secret")) {
                    break;
                }
            }
        });
        port
    }

    fn config(port: u16, password: &str) -> ImapConfig {
        ImapConfig {
            host: "127.0.0.1".into(),
            port,
            security: Security::None,
            auth: Auth::Password {
                username: "alice".into(),
                password: password.into(),
            },
            folder: None,
            accept_invalid_certs: false,
        }
    }

    #[tokio::test]
    async fn test_login_noop_logout() {
        let port = fake_imap_server().await;
        let request = ConnectRequest::Imap(config(port, "secret"));
        probe(&NetworkConnector, &request, Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_examines_folder() {
        let port = fake_imap_server().await;
        let mut inbox = config(port, "secret");
        inbox.folder = Some("INBOX".into());
        probe(&NetworkConnector, &ConnectRequest::Imap(inbox), Duration::from_secs(5))
            .await
            .unwrap();

        let port = fake_imap_server().await;
        let mut missing = config(port, "secret");
        missing.folder = Some("Missing".into());
        let err = probe(&NetworkConnector, &ConnectRequest::Imap(missing), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("EXAMINE Missing failed"), "{err}");
    }

    #[tokio::test]
    async fn test_wrong_password_is_auth_error() {
        let port = fake_imap_server().await;
        let err = ImapConnection::open(&config(port, "wrong"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProbeError::Auth(_)));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = ImapConnection::open(&config(port, "secret"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("TCP connect to 127.0.0.1"));
    }

    #[test]
    fn test_xoauth2_response_is_taken_once() {
        let mut auth = XOAuth2::new("alice@gmail.com", "tok");
        assert_eq!(
            auth.process(b""),
            b"user=alice@gmail.com\x01auth=Bearer tok\x01\x01".to_vec()
        );
        assert!(auth.process(b"{\"status\":\"400\"}").is_empty());
    }
}
