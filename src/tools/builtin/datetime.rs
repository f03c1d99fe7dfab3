// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Current date and time tool
//!
//! Lets the model resolve relative dates ("last week's session") against the
//! real clock.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use crate::error::{LexiError, Result};
use crate::llm::provider::ToolDefinition;
use crate::tools::{SchemaBuilder, Tool};

/// Tool returning the current time in RFC 3339 plus the weekday
pub struct CurrentDateTimeTool;

impl CurrentDateTimeTool {
    fn render(now: DateTime<Utc>, offset_hours: i64) -> Result<Value> {
        if !(-12..=14).contains(&offset_hours) {
            return Err(LexiError::InvalidInput(format!(
                "offset_hours out of range: {}",
                offset_hours
            )));
        }
        let offset = FixedOffset::east_opt((offset_hours * 3600) as i32).ok_or_else(|| {
            LexiError::InvalidInput(format!("invalid offset: {}", offset_hours))
        })?;
        let local = now.with_timezone(&offset);

        Ok(serde_json::json!({
            "datetime": local.to_rfc3339(),
            "weekday": local.format("%A").to_string(),
            "utc": now.to_rfc3339(),
        }))
    }
}

#[async_trait]
impl Tool for CurrentDateTimeTool {
    fn name(&self) -> &str {
        "current_datetime"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "current_datetime".to_string(),
            description: "Get the current date, time and weekday. Use it to resolve relative dates.".to_string(),
            parameters: SchemaBuilder::new()
                .integer(
                    "offset_hours",
                    "UTC offset in hours for the returned local time (default: 0)",
                    false,
                )
                .build(),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let offset_hours = args["offset_hours"].as_i64().unwrap_or(0);
        Self::render(Utc::now(), offset_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();
        let value = CurrentDateTimeTool::render(now, 0).unwrap();
        assert_eq!(value["datetime"], "2024-03-15T12:30:00+00:00");
        assert_eq!(value["weekday"], "Friday");
    }

    #[test]
    fn test_render_with_offset_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 1, 0, 0).unwrap();
        let value = CurrentDateTimeTool::render(now, -3).unwrap();
        assert_eq!(value["datetime"], "2024-03-14T22:00:00-03:00");
        assert_eq!(value["weekday"], "Thursday");
        assert_eq!(value["utc"], "2024-03-15T01:00:00+00:00");
    }

    #[test]
    fn test_render_rejects_bad_offset() {
        let now = Utc::now();
        assert!(CurrentDateTimeTool::render(now, 99).is_err());
    }

    #[tokio::test]
    async fn test_execute_defaults_to_utc() {
        let value = CurrentDateTimeTool
            .execute(serde_json::json!({}))
            .await
            .unwrap();
        assert!(value["datetime"].as_str().unwrap().ends_with("+00:00"));
    }

    #[test]
    fn test_definition_name_matches() {
        let tool = CurrentDateTimeTool;
        assert_eq!(tool.definition().name, tool.name());
    }
}
