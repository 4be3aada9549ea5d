//! Row model for `service_details`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

static NULL: JsonValue = JsonValue::Null;

/// One `service_details` record, every column kept in result-set order.
///
/// Only `category`, `option`, `keyword` and `price` carry meaning here; any other
/// column is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceDetailRow {
    columns: Map<String, JsonValue>,
}

impl ServiceDetailRow {
    pub fn new(columns: Map<String, JsonValue>) -> Self {
        Self { columns }
    }

    /// Column value, `null` when the column is absent
    pub fn get(&self, column: &str) -> &JsonValue {
        self.columns.get(column).unwrap_or(&NULL)
    }

    pub fn category(&self) -> &JsonValue {
        self.get("category")
    }

    pub fn option(&self) -> &JsonValue {
        self.get("option")
    }

    pub fn keyword(&self) -> &JsonValue {
        self.get("keyword")
    }

    pub fn price(&self) -> &JsonValue {
        self.get("price")
    }

    pub fn columns(&self) -> &Map<String, JsonValue> {
        &self.columns
    }
}

impl From<Map<String, JsonValue>> for ServiceDetailRow {
    fn from(columns: Map<String, JsonValue>) -> Self {
        Self::new(columns)
    }
}

/// Render a column value as a JSON object key.
///
/// Strings are used verbatim; anything else uses its JSON text, so `10` becomes
/// `"10"` and `null` becomes `"null"`.
pub fn key_of(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
