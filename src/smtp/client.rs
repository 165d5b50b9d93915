use async_trait::async_trait;
use lettre::{
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParametersBuilder},
    },
    AsyncSmtpTransport, Tokio1Executor,
};

use super::types::SmtpConfig;
use crate::error::{ProbeError, Result};
use crate::transport::{Auth, Connection, Security};

/// Build an async SMTP transport from the given config.
///
/// No network traffic happens here; lettre connects lazily.
fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
    let builder = match config.security {
        // Implicit TLS (typically port 465)
        Security::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
        // STARTTLS (typically port 587)
        Security::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?,
        // Plain / no encryption (typically port 25)
        Security::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
    };

    let mut builder = builder.port(config.port).timeout(config.timeout);

    // Open relays: no login unless both halves of the credentials are set.
    let (username, secret) = (config.auth.username(), config.auth.secret());
    if !username.is_empty() && !secret.is_empty() {
        let mechanisms = match config.auth {
            Auth::OAuth2 { .. } => vec![Mechanism::Xoauth2],
            Auth::Password { .. } => vec![Mechanism::Plain, Mechanism::Login],
        };
        builder = builder
            .credentials(Credentials::new(username.to_string(), secret.to_string()))
            .authentication(mechanisms);
    }

    if config.accept_invalid_certs && config.security != Security::None {
        let tls_params = TlsParametersBuilder::new(config.host.clone())
            .dangerous_accept_invalid_certs(true)
            .dangerous_accept_invalid_hostnames(true)
            .build()?;
        builder = builder.tls(match config.security {
            Security::Tls => Tls::Wrapper(tls_params),
            _ => Tls::Required(tls_params),
        });
    }

    Ok(builder.build())
}

/// Tell credential rejections (530/534/535) apart from other SMTP failures.
fn classify(error: lettre::transport::smtp::Error) -> ProbeError {
    let refused = error
        .status()
        .map(|code| matches!(code.to_string().as_str(), "530" | "534" | "535"))
        .unwrap_or(false);
    if refused {
        ProbeError::Auth(format!("SMTP server refused the credentials: {error}"))
    } else {
        ProbeError::Smtp(error)
    }
}

/// A configured SMTP transport.
///
/// lettre runs connect, EHLO, STARTTLS, AUTH, NOOP and QUIT as one exchange,
/// so the whole handshake happens in `verify` and `close` has nothing left to do.
pub struct SmtpConnection {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    target: String,
}

impl SmtpConnection {
    pub fn open(config: &SmtpConfig) -> Result<Self> {
        Ok(Self {
            transport: build_transport(config)?,
            target: format!("{}:{}", config.host, config.port),
        })
    }
}

#[async_trait]
impl Connection for SmtpConnection {
    async fn verify(&mut self) -> Result<()> {
        let answered = self.transport.test_connection().await.map_err(classify)?;
        if answered {
            Ok(())
        } else {
            Err(ProbeError::SmtpReply(format!(
                "{} did not answer NOOP",
                self.target
            )))
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
