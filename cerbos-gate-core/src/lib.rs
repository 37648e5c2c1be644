//! # Cerbos Gate
//!
//! Policy enforcement for MCP tool servers, backed by [Cerbos](https://cerbos.dev).
//!
//! Every inbound request to list or call a tool is checked against a Cerbos
//! policy decision point before it executes. The gate resolves the caller's
//! identity into a policy principal, describes the requested action as a
//! policy resource, queries Cerbos, and enforces the verdict: denied calls
//! fail with a protocol-correct `Unauthorized` error, and denied tools are
//! filtered out of listings without leaking their existence.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cerbos_gate_core::{AccessToken, BoxError, CerbosGate, Principal};
//!
//! let gate = CerbosGate::builder()
//!     .host("localhost:3592")
//!     .principal_builder(|token: AccessToken| async move {
//!         Ok::<_, BoxError>(token.subject().map(|sub| {
//!             Principal::new(sub)
//!                 .with_roles(token.roles())
//!                 .with_attr("department", token.string_claim("department").unwrap_or(""))
//!         }))
//!     })
//!     .build()?;
//!
//! // Wire the gate into the server's dispatch:
//! let result = gate.on_call_tool(&ctx, &request, &tools).await?;
//! let visible = gate.on_list_tools(&ctx, &tools).await?;
//! ```
//!
//! ## Connection lifecycle
//!
//! The connection to Cerbos is established lazily: the first check (or an
//! explicit [`CerbosGate::warm_up`]) constructs the client, probes the
//! server, and caches the connection for all subsequent requests. Concurrent
//! first-requests coordinate so only one connection is ever constructed, and
//! a failed warm-up is never cached - the next request simply retries.
//! Supplying an already-connected [`DecisionClient`] skips construction;
//! the gate then uses it without ever closing it.
//!
//! ## Configuration
//!
//! Builder parameters take precedence over environment variables, which
//! take precedence over defaults:
//!
//! | Parameter | Environment | Default |
//! |---|---|---|
//! | `.host(..)` | `CERBOS_HOST` | required |
//! | `.tls_verify(..)` | `CERBOS_TLS_VERIFY` | `false` |
//! | `.resource_kind(..)` | `CERBOS_RESOURCE_KIND` | `mcp_server` |
//!
//! `CERBOS_TLS_VERIFY` accepts case-insensitive boolean tokens
//! (`1/true/yes/on`, `0/false/no/off`); any other value is treated as a
//! path to a CA certificate bundle.

pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod principal;
pub mod resource;

pub use client::{
    ClientError, DecisionClient, DecisionClientFactory, DecisionSession, HttpClientFactory,
    HttpDecisionClient, ServerInfo,
};
pub use config::{TlsVerify, DEFAULT_RESOURCE_KIND};
pub use error::{ErrorData, GateError, Result, UnauthorizedKind, UNAUTHORIZED_CODE};
pub use gate::{CallToolRequest, CerbosGate, GateBuilder, RequestContext, ToolEntry, ToolHandler};
pub use principal::{AccessToken, BoxError, Principal, PrincipalBuilder};
pub use resource::{call_action, list_action, Resource};
