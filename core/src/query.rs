//! Queries attached to a `Connection`.
//!
//! The connection never looks inside a query. It only asks for the body to
//! send and the content type to label it with.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ConnectionError;

/// Something that can be sent to the Druid endpoint as a request body.
pub trait Query: fmt::Debug + Send + Sync {
    fn body(&self) -> Result<String, ConnectionError>;

    fn content_type(&self) -> &str {
        "application/json"
    }
}

/// A native Druid query held as JSON, e.g.
/// `{"queryType": "timeseries", "dataSource": "wikipedia", ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonQuery(Value);

impl JsonQuery {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Serialize any typed query description into a `JsonQuery`.
    pub fn from_serializable<T: Serialize>(query: &T) -> Result<Self, ConnectionError> {
        serde_json::to_value(query)
            .map(Self)
            .map_err(|e| ConnectionError::Serialization(e.to_string()))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The `queryType` field, when present.
    pub fn query_type(&self) -> Option<&str> {
        self.0.get("queryType").and_then(Value::as_str)
    }
}

impl From<Value> for JsonQuery {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl Query for JsonQuery {
    fn body(&self) -> Result<String, ConnectionError> {
        serde_json::to_string(&self.0).map_err(|e| ConnectionError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct TimeBoundary {
        query_type: &'static str,
        data_source: &'static str,
    }

    #[test]
    fn typed_queries_serialize_with_druid_field_names() {
        let query = JsonQuery::from_serializable(&TimeBoundary {
            query_type: "timeBoundary",
            data_source: "wikipedia",
        })
        .unwrap();
        assert_eq!(query.query_type(), Some("timeBoundary"));
        assert_eq!(query.value()["dataSource"], "wikipedia");
    }

    #[test]
    fn body_is_the_json_document() {
        let query = JsonQuery::new(json!({"queryType": "timeseries"}));
        let body: Value = serde_json::from_str(&query.body().unwrap()).unwrap();
        assert_eq!(body, json!({"queryType": "timeseries"}));
        assert_eq!(query.content_type(), "application/json");
    }
}
