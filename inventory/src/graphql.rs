//! GraphQL documents sent to Infrahub and the response shapes read back.

use crate::error::InventoryError;
use franc_portal_core::inventory::{InventoryKind, OptionFilter, SelectOption};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST body of a GraphQL request
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    /// Query or mutation document
    pub query: String,
}

/// Top-level GraphQL response
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    /// Result data; absent when the whole request failed
    #[serde(default)]
    pub data: Option<Value>,
    /// Errors reported by the server
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// One GraphQL error
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    /// Human-readable message
    pub message: String,
}

impl GraphQlResponse {
    /// The `data` object, or every error message joined.
    ///
    /// # Errors
    ///
    /// [`InventoryError::GraphQl`] when errors were reported,
    /// [`InventoryError::ResponseParseFailed`] when `data` is missing.
    pub fn into_data(self) -> Result<Value, InventoryError> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(InventoryError::GraphQl(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| InventoryError::ResponseParseFailed("response has no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct Connection {
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct Node {
    id: String,
    display_label: Option<String>,
}

/// `query { Kind(filters) { edges { node { id display_label } } } }`
#[must_use]
pub fn options_query(kind: InventoryKind, filters: &[OptionFilter]) -> String {
    let arguments = if filters.is_empty() {
        String::new()
    } else {
        let pairs: Vec<String> = filters
            .iter()
            .map(|f| format!("{}: {}", f.name, string_literal(&f.value)))
            .collect();
        format!("({})", pairs.join(", "))
    };
    format!("query {{ {kind}{arguments} {{ edges {{ node {{ id display_label }} }} }} }}")
}

/// `mutation { BranchCreate(data: {name: "...", sync_with_git: false}) { ok } }`
#[must_use]
pub fn branch_create_mutation(name: &str) -> String {
    format!(
        "mutation {{ BranchCreate(data: {{name: {}, sync_with_git: false}}) {{ ok }} }}",
        string_literal(name)
    )
}

// JSON string escaping is valid GraphQL string escaping.
fn string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

/// Read the options of `kind` out of a query result, keeping server order.
///
/// Nodes without a display label are shown by id.
///
/// # Errors
///
/// [`InventoryError::ResponseParseFailed`] if the result is not a connection.
pub fn parse_options(kind: InventoryKind, data: &Value) -> Result<Vec<SelectOption>, InventoryError> {
    let connection = data
        .get(kind.as_str())
        .ok_or_else(|| InventoryError::ResponseParseFailed(format!("missing field {kind}")))?;
    let connection: Connection = serde_json::from_value(connection.clone())
        .map_err(|e| InventoryError::ResponseParseFailed(e.to_string()))?;

    Ok(connection
        .edges
        .into_iter()
        .map(|Edge { node }| {
            let label = node.display_label.unwrap_or_else(|| node.id.clone());
            SelectOption::new(label, node.id)
        })
        .collect())
}

/// Whether a `BranchCreate` result reports success.
#[must_use]
pub fn branch_created(data: &Value) -> bool {
    data.pointer("/BranchCreate/ok").and_then(Value::as_bool) == Some(true)
}
