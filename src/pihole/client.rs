use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::api::{ApiOutcome, ApplianceClient, DnsConfig};

const SESSION_HEADER: &str = "X-FTL-SID";

/// HTTP client for the Pi-hole v6 REST API.
pub struct PiholeClient {
    client: Client,
    base: Url,
    sid: Option<String>,
}

impl fmt::Debug for PiholeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiholeClient")
            .field("base", &self.base.as_str())
            .field("sid", &self.sid.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    session: Session,
}

#[derive(Debug, Deserialize)]
struct Session {
    valid: bool,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    config: ConfigSection,
}

#[derive(Debug, Deserialize)]
struct ConfigSection {
    #[serde(default)]
    dns: DnsConfig,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl PiholeClient {
    /// Open a session against the Pi-hole at `url`. An empty password means
    /// the API is unprotected and no login is attempted.
    pub async fn connect(url: &str, password: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(url).with_context(|| format!("Invalid Pi-hole URL: {}", url))?;
        if base.cannot_be_a_base() {
            bail!("Invalid Pi-hole URL: {}", url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let mut pihole = Self {
            client,
            base,
            sid: None,
        };

        if !password.is_empty() {
            pihole.sid = pihole.login(password).await?;
        }

        Ok(pihole)
    }

    async fn login(&self, password: &str) -> Result<Option<String>> {
        let url = self.endpoint(&["api", "auth"])?;
        debug!("Authenticating against {}", url);

        let response = self
            .client
            .post(url)
            .json(&AuthRequest { password })
            .send()
            .await
            .context("Failed to send auth request to Pi-hole")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let auth: AuthResponse = serde_json::from_str(&body)
            .map_err(|_| anyhow!("Pi-hole auth error ({}): {}", status, body))?;

        if !auth.session.valid {
            return Err(anyhow!(
                "Pi-hole authentication failed: {}",
                auth.session.message.unwrap_or_else(|| status.to_string())
            ));
        }

        Ok(auth.session.sid)
    }

    /// End the API session. Pi-hole limits concurrent sessions, so callers
    /// should log out when done.
    pub async fn logout(&self) -> Result<()> {
        if self.sid.is_none() {
            return Ok(());
        }

        let response = self
            .request(Method::DELETE, &["api", "auth"])?
            .send()
            .await
            .context("Failed to send logout request to Pi-hole")?;

        if !response.status().is_success() {
            return Err(anyhow!("Pi-hole logout failed ({})", response.status()));
        }

        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid Pi-hole URL: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<reqwest::RequestBuilder> {
        let url = self.endpoint(segments)?;
        let mut builder = self.client.request(method, url);
        if let Some(sid) = &self.sid {
            builder = builder.header(SESSION_HEADER, sid);
        }
        Ok(builder)
    }

    async fn mutate(&self, method: Method, list: &str, entry: &str) -> Result<ApiOutcome> {
        debug!("{} {} entry {:?}", method, list, entry);

        let response = self
            .request(method, &["api", "config", "dns", list, entry])?
            .send()
            .await
            .with_context(|| format!("Failed to send {} update to Pi-hole", list))?;

        outcome_from_response(response).await
    }
}

async fn outcome_from_response(response: Response) -> Result<ApiOutcome> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read Pi-hole API response")?;

    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(&body) {
        let message = error
            .message
            .or(error.key)
            .unwrap_or_else(|| status.to_string());
        return Ok(ApiOutcome::Failure(message));
    }

    if !status.is_success() {
        return Ok(ApiOutcome::Failure(format!("Pi-hole API error ({})", status)));
    }

    Ok(ApiOutcome::Success)
}

fn host_entry(name: &str, ip: IpAddr) -> String {
    format!("{} {}", ip, name)
}

fn cname_entry(name: &str, target: &str, ttl: u32) -> String {
    format!("{},{},{}", name, target, ttl)
}

#[async_trait]
impl ApplianceClient for PiholeClient {
    async fn get_config(&self) -> Result<DnsConfig> {
        let response = self
            .request(Method::GET, &["api", "config"])?
            .send()
            .await
            .context("Failed to send request to Pi-hole API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Pi-hole API error ({}): {}", status, body));
        }

        let config: ConfigResponse = response
            .json()
            .await
            .context("Failed to parse Pi-hole config response")?;

        Ok(config.config.dns)
    }

    async fn add_host(&self, name: &str, ip: IpAddr) -> Result<ApiOutcome> {
        self.mutate(Method::PUT, "hosts", &host_entry(name, ip)).await
    }

    async fn remove_host(&self, name: &str, ip: IpAddr) -> Result<ApiOutcome> {
        self.mutate(Method::DELETE, "hosts", &host_entry(name, ip)).await
    }

    async fn add_cname(&self, name: &str, target: &str, ttl: u32) -> Result<ApiOutcome> {
        let entry = cname_entry(name, target, ttl);
        self.mutate(Method::PUT, "cnameRecords", &entry).await
    }

    async fn remove_cname(&self, name: &str, target: &str, ttl: u32) -> Result<ApiOutcome> {
        let entry = cname_entry(name, target, ttl);
        self.mutate(Method::DELETE, "cnameRecords", &entry).await
    }
}
