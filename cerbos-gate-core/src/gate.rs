//! The authorization gate: request interception and policy enforcement.
//!
//! [`CerbosGate`] sits between the host framework's dispatch and the
//! downstream tool handler. Tool invocations are checked individually;
//! tool listings are filtered down to the allowed subset. Every check runs
//! resolver -> resource builder -> decision session, and every failure mode
//! maps to the protocol error taxonomy in [`crate::error`].
//!
//! # Example
//!
//! ```ignore
//! use cerbos_gate_core::{AccessToken, BoxError, CerbosGate, Principal};
//!
//! let gate = CerbosGate::builder()
//!     .host("localhost:3592")
//!     .principal_builder(|token: AccessToken| async move {
//!         Ok::<_, BoxError>(token.subject().map(|sub| {
//!             Principal::new(sub).with_roles(token.roles())
//!         }))
//!     })
//!     .build()?;
//!
//! // For each inbound tool call:
//! let result = gate.on_call_tool(&ctx, &request, &handler).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::client::{
    ClientError, DecisionClient, DecisionClientFactory, DecisionSession, HttpClientFactory,
};
use crate::config::{
    self, TlsVerify, CERBOS_HOST_VAR, CERBOS_RESOURCE_KIND_VAR, CERBOS_TLS_VERIFY_VAR,
    DEFAULT_RESOURCE_KIND,
};
use crate::error::{GateError, UnauthorizedKind};
use crate::principal::{AccessToken, Principal, PrincipalBuilder};
use crate::resource::{call_action, list_action, Resource};

/// Per-request context supplied by the host framework.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Opaque request-origin tag (e.g. transport name or client id).
    pub source: String,
    /// Access token for the current request, when authentication produced
    /// one.
    pub token: Option<AccessToken>,
}

impl RequestContext {
    /// Context with the given origin tag and no token.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            token: None,
        }
    }

    /// Attach the authenticated token (builder style).
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }
}

/// A tool invocation to authorize.
#[derive(Debug, Clone)]
pub struct CallToolRequest {
    /// Name of the tool being invoked.
    pub name: String,
    /// Raw call arguments.
    pub arguments: Map<String, Value>,
}

impl CallToolRequest {
    /// Request with the given tool name and no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument (builder style).
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// A tool offered by the downstream handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolEntry {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: Value,
}

impl ToolEntry {
    /// Entry with the given name, an empty description and a permissive
    /// schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: Value::Object(Map::new()),
        }
    }
}

/// The next handler in the interception chain.
///
/// Stands in for the host framework's dispatch: the gate forwards allowed
/// tool calls to it and obtains the unfiltered tool list from it.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute a tool call.
    async fn call_tool(
        &self,
        ctx: &RequestContext,
        request: &CallToolRequest,
    ) -> Result<Value, GateError>;

    /// List the tools this handler serves, unfiltered.
    async fn list_tools(&self, ctx: &RequestContext) -> Result<Vec<ToolEntry>, GateError>;
}

/// Authorizes MCP tool calls against Cerbos policies.
///
/// One gate instance lives per running server. The decision-service
/// connection is established lazily on the first check (or via an explicit
/// [`warm_up`](Self::warm_up)) and shared by all requests afterwards.
pub struct CerbosGate {
    principal_builder: Arc<dyn PrincipalBuilder>,
    resource_kind: String,
    session: DecisionSession,
}

impl std::fmt::Debug for CerbosGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CerbosGate")
            .field("resource_kind", &self.resource_kind)
            .finish_non_exhaustive()
    }
}

impl CerbosGate {
    /// Start building a gate.
    pub fn builder() -> GateBuilder {
        GateBuilder::default()
    }

    /// The resolved resource kind used for every check.
    pub fn resource_kind(&self) -> &str {
        &self.resource_kind
    }

    /// Pre-establish the decision-service connection.
    ///
    /// Optional: the first check performs the same warm-up implicitly.
    /// Failures propagate unwrapped since they indicate infrastructure or
    /// configuration trouble, not an authorization outcome.
    pub async fn warm_up(&self) -> Result<(), ClientError> {
        self.session.warm_up().await
    }

    /// Release the decision-service connection.
    ///
    /// No-op when the client was supplied externally.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.session.close().await
    }

    /// Intercept a tool invocation.
    ///
    /// Resolves the caller's principal, checks `call::<tool>` against the
    /// decision service, and on an allow forwards to `next` exactly once,
    /// returning its result unchanged. Denials and decision-service
    /// failures never reach `next`.
    pub async fn on_call_tool(
        &self,
        ctx: &RequestContext,
        request: &CallToolRequest,
        next: &dyn ToolHandler,
    ) -> Result<Value, GateError> {
        let principal = self.resolve_principal(ctx).await?;

        let action = call_action(&request.name);
        let resource = Resource::for_tool_call(
            &self.resource_kind,
            &request.name,
            request.arguments.clone(),
            &ctx.source,
        );

        if !self.is_allowed(&action, &principal, &resource).await? {
            info!(
                principal = %principal.id,
                action = %action,
                resource = %resource.id,
                "cerbos denied action"
            );
            return Err(GateError::unauthorized(UnauthorizedKind::CerbosDenied));
        }

        debug!(principal = %principal.id, action = %action, "cerbos authorized tool call");
        next.call_tool(ctx, request).await
    }

    /// Intercept a tool listing.
    ///
    /// The listing itself is not gated; only visibility is filtered. Each
    /// candidate gets an independent `list::<tool>` check: denied entries
    /// are dropped silently (the caller simply does not see them), while a
    /// decision-service failure fails the entire listing. Original ordering
    /// is preserved.
    pub async fn on_list_tools(
        &self,
        ctx: &RequestContext,
        next: &dyn ToolHandler,
    ) -> Result<Vec<ToolEntry>, GateError> {
        let tools = next.list_tools(ctx).await?;

        let principal = self.resolve_principal(ctx).await?;

        let mut authorized = Vec::with_capacity(tools.len());
        for tool in tools {
            let action = list_action(&tool.name);
            let resource =
                Resource::for_tool_listing(&self.resource_kind, &tool.name, &ctx.source);

            if self.is_allowed(&action, &principal, &resource).await? {
                authorized.push(tool);
            } else {
                info!(
                    principal = %principal.id,
                    action = %action,
                    resource = %resource.id,
                    "cerbos denied action"
                );
            }
        }

        Ok(authorized)
    }

    /// Query the decision session, translating infrastructure failures into
    /// the `cerbos_error` authorization outcome. Fail-closed: an error is
    /// never an allow.
    async fn is_allowed(
        &self,
        action: &str,
        principal: &Principal,
        resource: &Resource,
    ) -> Result<bool, GateError> {
        match self.session.is_allowed(action, principal, resource).await {
            Ok(granted) => Ok(granted),
            Err(err) => {
                error!(error = %err, action = %action, "cerbos authorization failed");
                Err(GateError::unauthorized(UnauthorizedKind::CerbosError))
            }
        }
    }

    /// Resolve the principal for the current request.
    ///
    /// No token and builder-returned `None` both mean "no principal".
    /// Builder failures are logged for operators but surface to the caller
    /// only as the `principal_builder_error` discriminator. A principal
    /// with an empty id is an integration bug, not a denied user.
    async fn resolve_principal(&self, ctx: &RequestContext) -> Result<Principal, GateError> {
        let Some(token) = ctx.token.clone() else {
            return Err(GateError::unauthorized(UnauthorizedKind::MissingPrincipal));
        };

        let principal = match self.principal_builder.build(token).await {
            Ok(principal) => principal,
            Err(err) => {
                error!(error = %err, "principal builder failed");
                return Err(GateError::unauthorized(
                    UnauthorizedKind::PrincipalBuilderError,
                ));
            }
        };

        match principal {
            Some(principal) if principal.id.is_empty() => Err(GateError::Config(
                "principal builder returned a principal with an empty id".to_string(),
            )),
            Some(principal) => Ok(principal),
            None => Err(GateError::unauthorized(UnauthorizedKind::MissingPrincipal)),
        }
    }
}

/// Builder for [`CerbosGate`].
///
/// Requires a principal builder, plus one of: a connection target (parameter
/// or `CERBOS_HOST`), an externally owned [`DecisionClient`], or a custom
/// [`DecisionClientFactory`].
#[derive(Default)]
pub struct GateBuilder {
    host: Option<String>,
    tls_verify: Option<TlsVerify>,
    resource_kind: Option<String>,
    principal_builder: Option<Arc<dyn PrincipalBuilder>>,
    client: Option<Arc<dyn DecisionClient>>,
    factory: Option<Arc<dyn DecisionClientFactory>>,
}

impl GateBuilder {
    /// Set the Cerbos connection target (`host:port` or a full URL).
    ///
    /// Takes precedence over the `CERBOS_HOST` environment variable.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the TLS verification mode.
    ///
    /// Accepts a `bool` or a [`TlsVerify`]. Takes precedence over the
    /// `CERBOS_TLS_VERIFY` environment variable.
    pub fn tls_verify(mut self, verify: impl Into<TlsVerify>) -> Self {
        self.tls_verify = Some(verify.into());
        self
    }

    /// Verify TLS against the CA bundle at the given path.
    pub fn tls_ca_cert(mut self, path: impl Into<String>) -> Self {
        self.tls_verify = Some(TlsVerify::CaCert(path.into()));
        self
    }

    /// Set the resource kind attached to every check.
    ///
    /// Takes precedence over the `CERBOS_RESOURCE_KIND` environment
    /// variable; defaults to `mcp_server`.
    pub fn resource_kind(mut self, kind: impl Into<String>) -> Self {
        self.resource_kind = Some(kind.into());
        self
    }

    /// Set the principal builder. Required.
    pub fn principal_builder(mut self, builder: impl PrincipalBuilder + 'static) -> Self {
        self.principal_builder = Some(Arc::new(builder));
        self
    }

    /// Use an externally owned decision client.
    ///
    /// The gate will never construct or close it; `close()` becomes a
    /// no-op. No connection target is required in this mode.
    pub fn client(mut self, client: impl DecisionClient + 'static) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Use a custom connection factory (e.g. an alternate transport).
    ///
    /// The gate owns the constructed client; no connection target is
    /// required since the factory embeds its own.
    pub fn connector(mut self, factory: impl DecisionClientFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Validate the configuration and build the gate.
    ///
    /// Fails fast with [`GateError::Config`] when the principal builder is
    /// missing, or when no client, factory or connection target is
    /// resolvable.
    pub fn build(self) -> Result<CerbosGate, GateError> {
        let principal_builder = self
            .principal_builder
            .ok_or_else(|| GateError::Config("principal_builder must be provided".to_string()))?;

        let resource_kind = self
            .resource_kind
            .or_else(|| config::string_from_env(CERBOS_RESOURCE_KIND_VAR))
            .unwrap_or_else(|| DEFAULT_RESOURCE_KIND.to_string());

        let session = if let Some(client) = self.client {
            DecisionSession::external(client)
        } else if let Some(factory) = self.factory {
            DecisionSession::with_factory(factory)
        } else {
            let host = self
                .host
                .or_else(|| config::string_from_env(CERBOS_HOST_VAR))
                .ok_or_else(|| {
                    GateError::Config(
                        "cerbos_host must be provided or CERBOS_HOST environment variable must be set"
                            .to_string(),
                    )
                })?;

            let tls_verify = self
                .tls_verify
                .or_else(|| config::tls_from_env(CERBOS_TLS_VERIFY_VAR))
                .unwrap_or_default();

            DecisionSession::owned(HttpClientFactory::new(host, tls_verify))
        };

        Ok(CerbosGate {
            principal_builder,
            resource_kind,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::BoxError;

    async fn subject_builder(token: AccessToken) -> Result<Option<Principal>, BoxError> {
        Ok(token.subject().map(Principal::new))
    }

    #[test]
    fn test_build_requires_principal_builder() {
        let err = CerbosGate::builder()
            .host("localhost:3592")
            .build()
            .unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("principal_builder"));
    }

    #[test]
    fn test_build_requires_a_connection_target() {
        let err = CerbosGate::builder()
            .principal_builder(subject_builder)
            .build()
            .unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("cerbos_host"));
    }

    #[test]
    fn test_host_parameter_satisfies_target_requirement() {
        let gate = CerbosGate::builder()
            .host("localhost:3592")
            .principal_builder(subject_builder)
            .build()
            .unwrap();

        assert!(gate.session.owns_client());
        assert_eq!(gate.resource_kind(), DEFAULT_RESOURCE_KIND);
    }

    #[test]
    fn test_resource_kind_parameter_wins() {
        let gate = CerbosGate::builder()
            .host("localhost:3592")
            .resource_kind("custom_server")
            .principal_builder(subject_builder)
            .build()
            .unwrap();

        assert_eq!(gate.resource_kind(), "custom_server");
    }

    #[test]
    fn test_request_context_builders() {
        let ctx = RequestContext::new("http")
            .with_token(AccessToken::new().with_claim("sub", "sally"));

        assert_eq!(ctx.source, "http");
        assert_eq!(ctx.token.unwrap().subject(), Some("sally"));
    }

    #[test]
    fn test_call_tool_request_builders() {
        let request = CallToolRequest::new("refund_order").with_argument("order_id", 42);

        assert_eq!(request.name, "refund_order");
        assert_eq!(request.arguments["order_id"], serde_json::json!(42));
    }
}
