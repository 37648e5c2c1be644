//! Error types for the authorization gate.
//!
//! The gate distinguishes four failure families so callers get
//! protocol-correct responses:
//!
//! - [`GateError::Unauthorized`] - an authorization outcome (missing
//!   identity, policy denial, or a decision-service failure). These map to
//!   the JSON-RPC error envelope via [`GateError::error_data`].
//! - [`GateError::Config`] - integration bugs (missing constructor
//!   arguments, malformed principal-builder output). Never retried.
//! - [`GateError::Client`] - `?`-conversion for [`ClientError`] in downstream
//!   handler code. The gate itself surfaces warm-up failures as bare
//!   [`ClientError`] and wraps query failures into
//!   [`GateError::Unauthorized`], so this variant only appears when handler
//!   implementations propagate client errors of their own.
//! - [`GateError::Handler`] - failures from the downstream handler, relayed
//!   unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientError;

/// JSON-RPC error code carried by every authorization failure.
pub const UNAUTHORIZED_CODE: i32 = -32010;

/// Discriminator for the `data` field of the unauthorized error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedKind {
    /// No access token was available, or no principal could be resolved.
    MissingPrincipal,

    /// The caller-supplied principal builder failed. The underlying cause is
    /// logged for operators but never exposed to the caller.
    PrincipalBuilderError,

    /// Cerbos evaluated the request and denied it.
    CerbosDenied,

    /// Cerbos was unreachable or returned a malformed response. Fail-closed:
    /// the absence of a definitive allow never lets a request proceed.
    CerbosError,
}

impl UnauthorizedKind {
    /// Stable wire label for the `data` discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingPrincipal => "missing_principal",
            Self::PrincipalBuilderError => "principal_builder_error",
            Self::CerbosDenied => "cerbos_denied",
            Self::CerbosError => "cerbos_error",
        }
    }
}

impl std::fmt::Display for UnauthorizedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// The request was not authorized. See [`UnauthorizedKind`] for why.
    #[error("Unauthorized ({0})")]
    Unauthorized(UnauthorizedKind),

    /// Integration bug: missing required arguments at construction, or the
    /// principal builder returned a value that violates the principal shape.
    #[error("configuration error: {0}")]
    Config(String),

    /// Decision-service failure propagated by downstream handler code via
    /// `?`. Gate-internal query failures become
    /// [`Unauthorized`](Self::Unauthorized) instead.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Downstream handler failure, relayed unchanged.
    #[error("handler error: {0}")]
    Handler(String),
}

impl GateError {
    /// Shorthand for an unauthorized error of the given kind.
    pub fn unauthorized(kind: UnauthorizedKind) -> Self {
        Self::Unauthorized(kind)
    }

    /// Returns true if this is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// The discriminator for authorization failures, if this is one.
    pub fn unauthorized_kind(&self) -> Option<UnauthorizedKind> {
        match self {
            Self::Unauthorized(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The JSON-RPC error envelope for failures that cross the protocol
    /// boundary.
    ///
    /// Only authorization failures map to an envelope. Configuration errors
    /// abort construction, and warm-up failures propagate unwrapped, so
    /// neither carries one.
    pub fn error_data(&self) -> Option<ErrorData> {
        match self {
            Self::Unauthorized(kind) => Some(ErrorData {
                code: UNAUTHORIZED_CODE,
                message: "Unauthorized".to_string(),
                data: Some(kind.as_str().to_string()),
            }),
            _ => None,
        }
    }
}

/// Wire-level error payload in the shape the MCP protocol expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Numeric error code (always [`UNAUTHORIZED_CODE`] for gate failures).
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable discriminator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_labels() {
        assert_eq!(UnauthorizedKind::MissingPrincipal.as_str(), "missing_principal");
        assert_eq!(
            UnauthorizedKind::PrincipalBuilderError.as_str(),
            "principal_builder_error"
        );
        assert_eq!(UnauthorizedKind::CerbosDenied.as_str(), "cerbos_denied");
        assert_eq!(UnauthorizedKind::CerbosError.as_str(), "cerbos_error");
    }

    #[test]
    fn test_unauthorized_error_data() {
        let err = GateError::unauthorized(UnauthorizedKind::CerbosDenied);
        let data = err.error_data().expect("unauthorized carries an envelope");

        assert_eq!(data.code, UNAUTHORIZED_CODE);
        assert_eq!(data.message, "Unauthorized");
        assert_eq!(data.data.as_deref(), Some("cerbos_denied"));
    }

    #[test]
    fn test_config_error_has_no_envelope() {
        let err = GateError::Config("principal_builder must be provided".into());
        assert!(err.error_data().is_none());
        assert!(err.is_config());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_error_data_serialization() {
        let data = ErrorData {
            code: UNAUTHORIZED_CODE,
            message: "Unauthorized".to_string(),
            data: Some("missing_principal".to_string()),
        };

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": -32010,
                "message": "Unauthorized",
                "data": "missing_principal",
            })
        );
    }

    #[test]
    fn test_client_errors_convert_for_handler_code() {
        fn propagates() -> Result<()> {
            Err(ClientError::Connection("cerbos is unreachable".to_string()))?;
            Ok(())
        }

        let err = propagates().unwrap_err();
        assert!(matches!(err, GateError::Client(_)));
        assert!(!err.is_unauthorized());
        assert!(err.error_data().is_none());
    }

    #[test]
    fn test_unauthorized_kind_accessor() {
        let err = GateError::unauthorized(UnauthorizedKind::MissingPrincipal);
        assert_eq!(err.unauthorized_kind(), Some(UnauthorizedKind::MissingPrincipal));

        let err = GateError::Handler("boom".into());
        assert_eq!(err.unauthorized_kind(), None);
    }
}
