//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics (skipped keys, salt fallback).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub file: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    json!({
        "notice": {
            "kind": notice.kind,
            "time": notice.time,
            "cmd": notice.cmd,
            "file": notice.file,
            "message": notice.message,
            "details": Value::Object(notice.details.clone()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json};
    use serde_json::{Map, Value};

    #[test]
    fn notice_json_has_required_fields() {
        let mut details = Map::new();
        details.insert("key".to_string(), Value::from("NONCE_SALT"));

        let notice = Notice {
            kind: "skipped_key".to_string(),
            time: "2026-02-01T00:00:00Z".to_string(),
            cmd: "shuffle-salts".to_string(),
            file: "/srv/www/wp-config.php".to_string(),
            message: "NONCE_SALT is not defined; skipped".to_string(),
            details,
        };

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(obj.get("kind").and_then(|v| v.as_str()), Some("skipped_key"));
        assert_eq!(
            obj.get("time").and_then(|v| v.as_str()),
            Some("2026-02-01T00:00:00Z")
        );
        assert_eq!(obj.get("cmd").and_then(|v| v.as_str()), Some("shuffle-salts"));
        assert_eq!(
            obj.get("file").and_then(|v| v.as_str()),
            Some("/srv/www/wp-config.php")
        );
        assert_eq!(
            obj.get("details")
                .and_then(|v| v.get("key"))
                .and_then(|v| v.as_str()),
            Some("NONCE_SALT")
        );
    }
}
