// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool definition types
//!
//! Builds the JSON Schema objects declared as tool parameters.

use serde_json::Value;

/// Helper to create a tool parameters schema
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    fn property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string property
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "string", "description": description }),
            required,
        )
    }

    /// Add an integer property
    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "integer", "description": description }),
            required,
        )
    }

    /// Add a string property restricted to `values`
    pub fn enumeration(self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    /// Build the schema
    pub fn build(self) -> Value {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": Value::Object(self.properties),
        });
        if !self.required.is_empty() {
            schema["required"] = serde_json::json!(self.required);
        }
        schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder_required_and_optional() {
        let schema = SchemaBuilder::new()
            .string("bill", "Bill number", true)
            .integer("year", "Year filed", false)
            .build();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["bill"]["type"], "string");
        assert_eq!(schema["properties"]["year"]["type"], "integer");
        assert_eq!(schema["required"], serde_json::json!(["bill"]));
    }

    #[test]
    fn test_schema_builder_omits_empty_required() {
        let schema = SchemaBuilder::new().integer("n", "count", false).build();
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn test_schema_builder_enumeration() {
        let schema = SchemaBuilder::new()
            .enumeration("house", "Legislative house", &["lower", "upper"], true)
            .build();
        assert_eq!(schema["properties"]["house"]["enum"][1], "upper");
    }
}
