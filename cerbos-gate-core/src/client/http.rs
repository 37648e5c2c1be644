//! Cerbos HTTP API client.
//!
//! Speaks the check API (`POST /api/check/resources`) and the server-info
//! probe (`GET /api/server_info`). The connection target may be a bare
//! `host:port` or a full URL; bare targets get a scheme derived from the
//! TLS mode.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClientError, DecisionClient, DecisionClientFactory, ServerInfo};
use crate::config::TlsVerify;
use crate::principal::Principal;
use crate::resource::Resource;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResourcesRequest<'a> {
    request_id: String,
    principal: &'a Principal,
    resources: Vec<ResourceCheck<'a>>,
}

#[derive(Debug, Serialize)]
struct ResourceCheck<'a> {
    actions: Vec<&'a str>,
    resource: &'a Resource,
}

#[derive(Debug, Deserialize)]
struct CheckResourcesResponse {
    #[serde(default)]
    results: Vec<CheckResult>,
}

#[derive(Debug, Deserialize)]
struct CheckResult {
    #[serde(default)]
    actions: HashMap<String, Effect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum Effect {
    #[serde(rename = "EFFECT_ALLOW")]
    Allow,
    #[serde(rename = "EFFECT_DENY")]
    Deny,
    #[serde(other)]
    Unspecified,
}

/// Decision client backed by the Cerbos HTTP API.
pub struct HttpDecisionClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDecisionClient {
    /// Build a client for the given connection target and TLS mode.
    ///
    /// Fails with [`ClientError::Config`] when a CA bundle path cannot be
    /// read or parsed, and [`ClientError::Transport`] when the HTTP client
    /// itself cannot be constructed.
    pub fn new(host: &str, tls_verify: &TlsVerify) -> Result<Self, ClientError> {
        let base_url = base_url(host, tls_verify);

        let mut builder = reqwest::Client::builder();
        match tls_verify {
            TlsVerify::Flag(true) => {}
            TlsVerify::Flag(false) => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerify::CaCert(path) => {
                let pem = std::fs::read(path)?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|err| {
                    ClientError::Config(format!("invalid CA certificate '{path}': {err}"))
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder.build().map_err(|err| {
            ClientError::Transport(format!("failed to create HTTP client: {err}"))
        })?;

        Ok(Self { base_url, http })
    }

    /// The resolved base URL queries are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DecisionClient for HttpDecisionClient {
    async fn check(
        &self,
        action: &str,
        principal: &Principal,
        resource: &Resource,
    ) -> Result<bool, ClientError> {
        let body = CheckResourcesRequest {
            request_id: Uuid::new_v4().to_string(),
            principal,
            resources: vec![ResourceCheck {
                actions: vec![action],
                resource,
            }],
        };

        let response = self
            .http
            .post(format!("{}/api/check/resources", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(|err| ClientError::Protocol(format!("check request rejected: {err}")))?;

        let parsed: CheckResourcesResponse = response
            .json()
            .await
            .map_err(|err| ClientError::Protocol(format!("malformed check response: {err}")))?;

        let effect = parsed
            .results
            .first()
            .and_then(|result| result.actions.get(action))
            .ok_or_else(|| {
                ClientError::Protocol(format!("check response missing a verdict for '{action}'"))
            })?;

        Ok(*effect == Effect::Allow)
    }

    async fn server_info(&self) -> Result<ServerInfo, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/server_info", self.base_url))
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(|err| {
                ClientError::Protocol(format!("server info request rejected: {err}"))
            })?;

        response.json().await.map_err(|err| {
            ClientError::Protocol(format!("malformed server info response: {err}"))
        })
    }

    async fn close(&self) -> Result<(), ClientError> {
        // reqwest's pooled connections are released when the client drops;
        // there is no explicit shutdown call to make.
        Ok(())
    }
}

/// Derive the base URL from a connection target and TLS mode.
///
/// Targets that already carry a scheme are used as-is (minus any trailing
/// slash). Bare `host:port` targets get `https` whenever verification is
/// requested and `http` otherwise.
fn base_url(host: &str, tls_verify: &TlsVerify) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else if tls_verify.is_enabled() {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    }
}

fn request_error(err: reqwest::Error) -> ClientError {
    if err.is_connect() || err.is_timeout() {
        ClientError::Connection(err.to_string())
    } else {
        ClientError::Transport(err.to_string())
    }
}

/// Factory producing [`HttpDecisionClient`]s for session warm-up.
pub struct HttpClientFactory {
    host: String,
    tls_verify: TlsVerify,
}

impl HttpClientFactory {
    /// Create a factory for the given target and TLS mode.
    pub fn new(host: impl Into<String>, tls_verify: TlsVerify) -> Self {
        Self {
            host: host.into(),
            tls_verify,
        }
    }
}

#[async_trait]
impl DecisionClientFactory for HttpClientFactory {
    async fn connect(&self) -> Result<Arc<dyn DecisionClient>, ClientError> {
        Ok(Arc::new(HttpDecisionClient::new(
            &self.host,
            &self.tls_verify,
        )?))
    }
}
