use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::types::GraphConfig;
use crate::error::{ProbeError, Result};
use crate::transport::Connection;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    code: String,
    message: String,
}

/// Turn an error document into one line of text, falling back to the raw body.
fn describe_oauth_error(body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(OAuthErrorBody { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    }
}

fn describe_graph_error(body: &str) -> String {
    match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(GraphErrorBody { error }) => format!("{}: {}", error.code, error.message),
        Err(_) => body.trim().to_string(),
    }
}

fn profile_url(config: &GraphConfig) -> Result<Url> {
    let mut url = Url::parse(&config.graph_url)?;
    url.path_segments_mut()
        .map_err(|_| ProbeError::Config(format!("invalid Graph URL: {}", config.graph_url)))?
        .pop_if_empty()
        .extend(["users", config.owner.as_str()]);
    Ok(url)
}

/// A Graph session holding a freshly issued app token.
pub struct GraphConnection {
    http: reqwest::Client,
    token: String,
    profile: Url,
}

impl GraphConnection {
    /// Request a client-credentials token. A token proves the app credentials work.
    pub async fn open(config: &GraphConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let profile = profile_url(config)?;

        let token_url = format!(
            "{}/oauth2/v2.0/token",
            config.authority.trim_end_matches('/')
        );
        log::debug!("requesting Office365 token from {token_url}");

        let response = http
            .post(&token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::Auth(format!(
                "Office365 token request rejected ({status}): {}",
                describe_oauth_error(&body)
            )));
        }

        let TokenResponse { access_token } = response.json().await?;
        Ok(Self {
            http,
            token: access_token,
            profile,
        })
    }
}

#[async_trait]
impl Connection for GraphConnection {
    async fn verify(&mut self) -> Result<()> {
        let response = self
            .http
            .get(self.profile.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = format!("{status}: {}", describe_graph_error(&body));
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProbeError::Auth(format!(
                "Office365 connection not authenticated ({detail})"
            ))),
            _ => Err(ProbeError::Office365(detail)),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{probe, ConnectRequest, NetworkConnector};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (key, value) = l.split_once(':')?;
                        if key.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Fake token endpoint plus Graph `/users/{id}`; only `good-secret` gets a token.
    async fn fake_graph() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let first = request.lines().next().unwrap_or("").to_string();
                let (status, body) = if first.starts_with("POST /tenant/oauth2/v2.0/token") {
                    if request.contains("client_secret=good-secret") {
                        ("200 OK", r#"{"access_token":"tok","token_type":"Bearer","expires_in":3599}"#)
                    } else {
                        (
                            "401 Unauthorized",
                            r#"{"error":"invalid_client","error_description":"Invalid client secret provided."}"#,
                        )
                    }
                } else if first.starts_with("GET /v1.0/users/owner") && request.contains("Bearer tok") {
                    ("200 OK", r#"{"id":"1","mail":"owner@example.com"}"#)
                } else {
                    (
                        "404 Not Found",
                        r#"{"error":{"code":"Request_ResourceNotFound","message":"User not found"}}"#,
                    )
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        port
    }

    fn config(port: u16, secret: &str, owner: &str) -> GraphConfig {
        GraphConfig {
            authority: format!("http://127.0.0.1:{port}/tenant"),
            graph_url: format!("http://127.0.0.1:{port}/v1.0"),
            client_id: "app".into(),
            client_secret: secret.into(),
            owner: owner.into(),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn test_token_and_profile() {
        let port = fake_graph().await;
        let request = ConnectRequest::Office365(config(port, "good-secret", "owner@example.com"));
        probe(&NetworkConnector, &request, Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bad_secret_is_auth_error() {
        let port = fake_graph().await;
        let err = GraphConnection::open(&config(port, "bad", "owner@example.com"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProbeError::Auth(_)));
        assert!(err
            .to_string()
            .contains("invalid_client: Invalid client secret provided."));
    }

    #[tokio::test]
    async fn test_unknown_owner() {
        let port = fake_graph().await;
        let request = ConnectRequest::Office365(config(port, "good-secret", "ghost@example.com"));
        let err = probe(&NetworkConnector, &request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Office365 error: 404 Not Found: Request_ResourceNotFound: User not found"
        );
    }

    #[test]
    fn test_profile_url_appends_owner() {
        let mut c = config(1, "s", "owner@example.com");
        c.graph_url = "https://graph.microsoft.com/v1.0/".into();
        assert_eq!(
            profile_url(&c).unwrap().as_str(),
            "https://graph.microsoft.com/v1.0/users/owner@example.com"
        );
    }

    #[test]
    fn test_describe_oauth_error_falls_back_to_body() {
        assert_eq!(describe_oauth_error("  gateway down \n"), "gateway down");
    }
}
