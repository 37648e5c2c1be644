//! Caller identity: access tokens, principals, and the pluggable builder.
//!
//! The gate has no built-in identity scheme. Deployments supply a
//! [`PrincipalBuilder`] that maps the host framework's access token onto a
//! Cerbos [`Principal`]. Builders may be any async function or a trait
//! implementation; both unify under one async call path.
//!
//! # Example
//!
//! ```rust
//! use cerbos_gate_core::{AccessToken, Principal, PrincipalBuilder};
//!
//! async fn builder(
//!     token: AccessToken,
//! ) -> Result<Option<Principal>, cerbos_gate_core::BoxError> {
//!     let Some(sub) = token.subject() else {
//!         return Ok(None);
//!     };
//!     Ok(Some(
//!         Principal::new(sub)
//!             .with_roles(token.roles())
//!             .with_attr("department", token.string_claim("department").unwrap_or("")),
//!     ))
//! }
//!
//! # tokio_test::block_on(async {
//! let token = AccessToken::new()
//!     .with_claim("sub", "sally")
//!     .with_claim("department", "sales");
//!
//! let principal = builder.build(token).await.unwrap().unwrap();
//! assert_eq!(principal.id, "sally");
//! assert_eq!(principal.attr["department"], "sales");
//! # });
//! ```

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Boxed error type for caller-supplied builder failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque identity artifact produced by the host's authentication layer.
///
/// Carries the decoded claims of the current request's credential. The gate
/// never interprets claims itself; it hands the token to the configured
/// [`PrincipalBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Claim names to values, as decoded by the host's token verifier.
    pub claims: Map<String, Value>,
}

impl AccessToken {
    /// Create an empty token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim (builder style).
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Look up a claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Look up a string-valued claim by name.
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.claim(name).and_then(Value::as_str)
    }

    /// The `sub` claim, when present and a string.
    pub fn subject(&self) -> Option<&str> {
        self.string_claim("sub")
    }

    /// The `roles` claim as a list of strings; empty when absent.
    pub fn roles(&self) -> Vec<String> {
        self.claim("roles")
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Resolved identity for a policy decision.
///
/// Built fresh per request by the configured [`PrincipalBuilder`], never
/// cached across requests. The `id` must be non-empty and stable per caller;
/// the gate rejects empty-id principals as a configuration error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique, stable caller identifier.
    pub id: String,
    /// Roles the caller holds; may be empty.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Free-form attributes (department, region, ...).
    #[serde(default)]
    pub attr: Map<String, Value>,
}

impl Principal {
    /// Create a principal with the given id and no roles or attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            attr: Map::new(),
        }
    }

    /// Replace the role list (builder style).
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single role (builder style).
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Add an attribute (builder style).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attr.insert(name.into(), value.into());
        self
    }
}

/// Maps an access token onto a policy principal.
///
/// Supplied at gate construction; invoked once per request. Return values:
///
/// - `Ok(Some(principal))` - identity resolved, proceed to the decision.
/// - `Ok(None)` - no principal for this token; the request fails with
///   `missing_principal`.
/// - `Err(_)` - the builder itself failed; the request fails with
///   `principal_builder_error` and the cause is logged, not exposed.
///
/// Any `async fn(AccessToken) -> Result<Option<Principal>, BoxError>` (or a
/// closure returning such a future) implements this trait automatically.
#[async_trait]
pub trait PrincipalBuilder: Send + Sync {
    /// Resolve the principal for the given token.
    async fn build(&self, token: AccessToken) -> Result<Option<Principal>, BoxError>;
}

#[async_trait]
impl<F, Fut> PrincipalBuilder for F
where
    F: Fn(AccessToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Principal>, BoxError>> + Send,
{
    async fn build(&self, token: AccessToken) -> Result<Option<Principal>, BoxError> {
        (self)(token).await
    }
}
