// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::Value;

/// Earlier builds stored the bearer token under `backend.auth_token`.
pub(super) fn migrate_on_load(mut value: Value) -> Value {
    if let Some(backend) = value.get_mut("backend").and_then(Value::as_object_mut) {
        if !backend.contains_key("token") {
            if let Some(token) = backend.remove("auth_token") {
                backend.insert("token".to_string(), token);
            }
        }
    }
    value
}

/// Deep-merge two JSON values.
/// `base` is existing file content, `overlay` is serialized current struct.
/// Overlay values take priority.
pub(super) fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, overlay_val)
                } else {
                    overlay_val
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_base, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_migrate_renames_auth_token() {
        let migrated = migrate_on_load(json!({"backend": {"auth_token": "abc"}}));
        assert_eq!(migrated["backend"]["token"], "abc");
        assert!(migrated["backend"].get("auth_token").is_none());
    }

    #[test]
    fn test_migrate_keeps_existing_token() {
        let migrated = migrate_on_load(json!({"backend": {"auth_token": "old", "token": "new"}}));
        assert_eq!(migrated["backend"]["token"], "new");
    }

    #[test]
    fn test_deep_merge_overlay_wins() {
        let merged = deep_merge(
            json!({"a": {"b": 1, "c": 2}, "d": 3}),
            json!({"a": {"b": 10}}),
        );
        assert_eq!(merged, json!({"a": {"b": 10, "c": 2}, "d": 3}));
    }
}
