//! Decision-service client: the outbound PDP contract and its lifecycle.
//!
//! The gate talks to Cerbos through the [`DecisionClient`] trait, so tests
//! and alternate transports can stand in for the real service. Connections
//! are built by a [`DecisionClientFactory`] and cached by a
//! [`DecisionSession`], which performs the lazy, single-flight warm-up.
//!
//! The bundled [`HttpDecisionClient`] speaks the Cerbos HTTP API. Supplying
//! an already-connected client to the gate bypasses construction entirely;
//! the session then never creates or closes it.

mod http;
mod session;

pub use http::{HttpClientFactory, HttpDecisionClient};
pub use session::DecisionSession;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::principal::Principal;
use crate::resource::Resource;

/// Errors from decision-service operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The decision service could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The client could not be constructed from the resolved configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The underlying transport failed mid-request.
    #[error("transport error: {0}")]
    Transport(String),

    /// The decision service answered with something other than a verdict.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// IO error (e.g. reading a CA certificate bundle).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Liveness information reported by the decision service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Server version string.
    pub version: String,
    /// Build commit, when reported.
    #[serde(default)]
    pub commit: Option<String>,
    /// Build date, when reported.
    #[serde(default)]
    pub build_date: Option<String>,
}

/// Wire contract to the policy decision point.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// Issue a single allow/deny query.
    async fn check(
        &self,
        action: &str,
        principal: &Principal,
        resource: &Resource,
    ) -> Result<bool, ClientError>;

    /// Lightweight liveness probe, used during warm-up to fail fast on bad
    /// configuration.
    async fn server_info(&self) -> Result<ServerInfo, ClientError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), ClientError>;
}

/// Constructs decision clients during session warm-up.
///
/// Implement this to plug in an alternate transport (e.g. gRPC) while
/// keeping the session's lazy-connection semantics.
#[async_trait]
pub trait DecisionClientFactory: Send + Sync {
    /// Establish a new connection to the decision service.
    async fn connect(&self) -> Result<Arc<dyn DecisionClient>, ClientError>;
}
