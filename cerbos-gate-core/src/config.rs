//! Configuration resolution: parameter over environment over default.
//!
//! The gate resolves its connection target, TLS verification mode and
//! resource kind once at construction. Explicit builder parameters always
//! win; otherwise the `CERBOS_*` environment variables apply; otherwise the
//! built-in defaults. Resolved configuration is immutable afterwards.

use std::env;

/// Environment variable naming the Cerbos connection target.
pub const CERBOS_HOST_VAR: &str = "CERBOS_HOST";

/// Environment variable controlling TLS verification.
pub const CERBOS_TLS_VERIFY_VAR: &str = "CERBOS_TLS_VERIFY";

/// Environment variable overriding the resource kind.
pub const CERBOS_RESOURCE_KIND_VAR: &str = "CERBOS_RESOURCE_KIND";

/// Resource kind used when neither parameter nor environment supplies one.
pub const DEFAULT_RESOURCE_KIND: &str = "mcp_server";

/// TLS verification mode for the decision-service connection.
///
/// Mirrors the three-way toggle Cerbos SDKs accept: a boolean switch, or a
/// path to a CA certificate bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsVerify {
    /// Verify certificates (`true`) or connect without verification /
    /// over plain HTTP (`false`).
    Flag(bool),
    /// Verify against the CA bundle at this path.
    CaCert(String),
}

impl Default for TlsVerify {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl From<bool> for TlsVerify {
    fn from(verify: bool) -> Self {
        Self::Flag(verify)
    }
}

impl TlsVerify {
    /// Parse an environment value.
    ///
    /// Case-insensitive truthy tokens (`1`, `true`, `yes`, `on`) and falsy
    /// tokens (`0`, `false`, `no`, `off`) become boolean flags; anything
    /// else is treated as a certificate path and passed through unchanged.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Self::Flag(true),
            "0" | "false" | "no" | "off" => Self::Flag(false),
            _ => Self::CaCert(raw.to_string()),
        }
    }

    /// Returns true when any form of certificate verification is requested.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Flag(false))
    }
}

/// TLS mode from the named environment variable, if set.
pub(crate) fn tls_from_env(var: &str) -> Option<TlsVerify> {
    env::var(var).ok().map(|raw| TlsVerify::parse(&raw))
}

/// Non-empty string from the named environment variable, if set.
pub(crate) fn string_from_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_tokens_parse_to_true() {
        for raw in ["1", "true", "True", "TRUE", "yes", "on", "ON"] {
            assert_eq!(TlsVerify::parse(raw), TlsVerify::Flag(true), "raw = {raw}");
        }
    }

    #[test]
    fn test_falsy_tokens_parse_to_false() {
        for raw in ["0", "false", "False", "FALSE", "no", "off", "OFF"] {
            assert_eq!(TlsVerify::parse(raw), TlsVerify::Flag(false), "raw = {raw}");
        }
    }

    #[test]
    fn test_other_values_pass_through_as_cert_paths() {
        assert_eq!(
            TlsVerify::parse("/path/to/cert.pem"),
            TlsVerify::CaCert("/path/to/cert.pem".to_string())
        );
    }

    #[test]
    fn test_default_is_no_verification() {
        assert_eq!(TlsVerify::default(), TlsVerify::Flag(false));
        assert!(!TlsVerify::default().is_enabled());
        assert!(TlsVerify::Flag(true).is_enabled());
        assert!(TlsVerify::CaCert("ca.pem".into()).is_enabled());
    }

    #[test]
    fn test_tls_from_env() {
        // Distinct variable names keep parallel tests from racing on the
        // process environment.
        env::set_var("CERBOS_GATE_TEST_TLS_YES", "yes");
        assert_eq!(
            tls_from_env("CERBOS_GATE_TEST_TLS_YES"),
            Some(TlsVerify::Flag(true))
        );

        env::set_var("CERBOS_GATE_TEST_TLS_OFF", "off");
        assert_eq!(
            tls_from_env("CERBOS_GATE_TEST_TLS_OFF"),
            Some(TlsVerify::Flag(false))
        );

        env::set_var("CERBOS_GATE_TEST_TLS_PATH", "/etc/cerbos/ca.pem");
        assert_eq!(
            tls_from_env("CERBOS_GATE_TEST_TLS_PATH"),
            Some(TlsVerify::CaCert("/etc/cerbos/ca.pem".to_string()))
        );

        assert_eq!(tls_from_env("CERBOS_GATE_TEST_TLS_UNSET"), None);
    }

    #[test]
    fn test_string_from_env_ignores_empty_values() {
        env::set_var("CERBOS_GATE_TEST_HOST", "localhost:3592");
        assert_eq!(
            string_from_env("CERBOS_GATE_TEST_HOST"),
            Some("localhost:3592".to_string())
        );

        env::set_var("CERBOS_GATE_TEST_HOST_EMPTY", "");
        assert_eq!(string_from_env("CERBOS_GATE_TEST_HOST_EMPTY"), None);

        assert_eq!(string_from_env("CERBOS_GATE_TEST_HOST_UNSET"), None);
    }
}
