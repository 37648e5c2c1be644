//! Policy resource descriptions and action namespaces.
//!
//! Pure construction, no I/O. Tool invocations and tool discovery use two
//! disjoint action namespaces (`call::` and `list::`) so identical tool
//! names never collide across the two checks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action string for invoking a tool.
pub fn call_action(tool_name: &str) -> String {
    format!("call::{tool_name}")
}

/// Action string for listing/discovering a tool.
pub fn list_action(tool_name: &str) -> String {
    format!("list::{tool_name}")
}

/// Policy description of an action's target.
///
/// Constructed fresh per checked action and discarded after the decision
/// call. For tool checks the attributes always carry `tool_name`,
/// `arguments` (empty for list checks) and `source` (the host framework's
/// request-origin tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier (the tool name).
    pub id: String,
    /// Configured resource kind classifying everything this gate protects.
    pub kind: String,
    /// Free-form attributes for policy conditions.
    #[serde(default)]
    pub attr: Map<String, Value>,
}

impl Resource {
    /// Create a resource with no attributes.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            attr: Map::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attr.insert(name.into(), value.into());
        self
    }

    /// Resource for a tool-invocation check.
    pub fn for_tool_call(
        kind: &str,
        tool_name: &str,
        arguments: Map<String, Value>,
        source: &str,
    ) -> Self {
        Self::new(tool_name, kind)
            .with_attr("tool_name", tool_name)
            .with_attr("arguments", Value::Object(arguments))
            .with_attr("source", source)
    }

    /// Resource for a per-candidate listing check. Arguments are always an
    /// empty mapping for list operations.
    pub fn for_tool_listing(kind: &str, tool_name: &str, source: &str) -> Self {
        Self::for_tool_call(kind, tool_name, Map::new(), source)
    }
}
