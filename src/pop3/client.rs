//! Just enough POP3 (RFC 1939) to prove an account works: greeting,
//! optional STLS, USER/PASS or AUTH XOAUTH2, NOOP and QUIT.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::types::Pop3Config;
use crate::error::{ProbeError, Result};
use crate::transport::stream::{self, MailStream};
use crate::transport::{Auth, Connection, Security};

/// An authenticated POP3 session in the TRANSACTION state, closed with QUIT.
pub struct Pop3Connection {
    stream: BufReader<MailStream>,
}

impl Pop3Connection {
    pub async fn open(config: &Pop3Config) -> Result<Self> {
        let stream = match config.security {
            Security::StartTls => {
                let tcp = stream::connect_tcp(&config.host, config.port).await?;
                let mut plain = BufReader::new(tcp);
                read_status(&mut plain, "greeting").await?;
                send_command(&mut plain, "STLS", "STLS").await?;
                let tls =
                    stream::upgrade(plain.into_inner(), &config.host, config.accept_invalid_certs)
                        .await?;
                BufReader::new(tls)
            }
            Security::Tls | Security::None => {
                let mut buffered = BufReader::new(
                    stream::connect(
                        &config.host,
                        config.port,
                        config.security == Security::Tls,
                        config.accept_invalid_certs,
                    )
                    .await?,
                );
                read_status(&mut buffered, "greeting").await?;
                buffered
            }
        };

        let mut connection = Self { stream };
        connection.authenticate(&config.auth).await?;
        Ok(connection)
    }

    async fn authenticate(&mut self, auth: &Auth) -> Result<()> {
        let rejected = |e: ProbeError| match e {
            ProbeError::Pop3(detail) => ProbeError::Auth(detail),
            other => other,
        };

        match auth {
            Auth::Password { username, password } => {
                send_command(&mut self.stream, &format!("USER {username}"), "USER")
                    .await
                    .map_err(rejected)?;
                send_command(&mut self.stream, &format!("PASS {password}"), "PASS")
                    .await
                    .map_err(rejected)?;
            }
            Auth::OAuth2 {
                username,
                access_token,
            } => {
                let initial = STANDARD.encode(format!(
                    "user={username}\x01auth=Bearer {access_token}\x01\x01"
                ));
                send_command(&mut self.stream, &format!("AUTH XOAUTH2 {initial}"), "AUTH XOAUTH2")
                    .await
                    .map_err(rejected)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for Pop3Connection {
    async fn verify(&mut self) -> Result<()> {
        send_command(&mut self.stream, "NOOP", "NOOP").await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut stream = self.stream;
        send_command(&mut stream, "QUIT", "QUIT").await?;
        let _ = stream.shutdown().await;
        Ok(())
    }
}

/// Send one command and wait for its single-line status.
///
/// `shown` is what ends up in error messages, so PASS never leaks the password.
async fn send_command<S>(stream: &mut BufReader<S>, line: &str, shown: &str) -> Result<String>
where
    S: tokio::io::AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(format!("{line}\r\n").as_bytes())
        .await
        .map_err(|e| ProbeError::io(format!("failed to send {shown}"), e))?;
    stream
        .flush()
        .await
        .map_err(|e| ProbeError::io(format!("failed to send {shown}"), e))?;
    read_status(stream, shown).await
}

/// Read a `+OK ...` / `-ERR ...` status line.
async fn read_status<S>(stream: &mut BufReader<S>, shown: &str) -> Result<String>
where
    S: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = stream
        .read_line(&mut line)
        .await
        .map_err(|e| ProbeError::io(format!("failed to read {shown} response"), e))?;
    if n == 0 {
        return Err(ProbeError::Pop3(format!(
            "server closed the connection during {shown}"
        )));
    }

    let line = line.trim_end();
    if let Some(rest) = line.strip_prefix("+OK") {
        Ok(rest.trim().to_string())
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        Err(ProbeError::Pop3(format!("{shown} rejected: {}", rest.trim())))
    } else {
        Err(ProbeError::Pop3(format!("unexpected {shown} response: {line}")))
    }
}
