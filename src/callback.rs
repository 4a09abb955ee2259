//! Lenient reading of pipeline completion callbacks.
//!
//! The pipeline posts whatever keys its last stage produced, so nothing here
//! fails: missing or oddly typed fields fall back to defaults.

use serde_json::Value;

pub const DEFAULT_MESSAGE: &str = "Processing...";
pub const ANONYMOUS: &str = "anonymous";

/// The fields the relay cares about, pulled out of an arbitrary callback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub message: String,
    /// First entry of `convert_uri`, if any.
    pub convert_uri: Option<String>,
    /// First entry of `filename`, if any.
    pub filename: Option<String>,
    /// `user_document.uuid`, or [`ANONYMOUS`] when missing or empty.
    pub recipient: String,
}

impl CallbackPayload {
    pub fn from_value(body: &Value) -> Self {
        let Some(obj) = body.as_object() else {
            return Self {
                message: DEFAULT_MESSAGE.to_string(),
                convert_uri: None,
                filename: None,
                recipient: ANONYMOUS.to_string(),
            };
        };

        // First key containing "message", in document order.
        let message = obj
            .iter()
            .find(|(key, _)| key.contains("message"))
            .map(|(_, value)| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

        let recipient = obj
            .get("user_document")
            .and_then(Value::as_object)
            .and_then(|doc| doc.get("uuid"))
            .and_then(Value::as_str)
            .filter(|uuid| !uuid.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string();

        Self {
            message,
            convert_uri: first_string(obj.get("convert_uri")),
            filename: first_string(obj.get("filename")),
            recipient,
        }
    }
}

fn first_string(value: Option<&Value>) -> Option<String> {
    value?
        .as_array()?
        .first()?
        .as_str()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let payload = CallbackPayload::from_value(&json!({
            "ffmpeg_message": "Converted!",
            "convert_uri": ["http://x/f.png", "http://x/g.png"],
            "filename": ["f.png", "g.png"],
            "user_document": {"uuid": "abc"}
        }));
        assert_eq!(payload.message, "Converted!");
        assert_eq!(payload.convert_uri.as_deref(), Some("http://x/f.png"));
        assert_eq!(payload.filename.as_deref(), Some("f.png"));
        assert_eq!(payload.recipient, "abc");
    }

    #[test]
    fn test_first_message_key_wins_in_document_order() {
        let body: Value = serde_json::from_str(
            r#"{"z_message": "first", "a_message": "second", "message": "third"}"#,
        )
        .unwrap();
        assert_eq!(CallbackPayload::from_value(&body).message, "first");
    }

    #[test]
    fn test_defaults_for_empty_object() {
        let payload = CallbackPayload::from_value(&json!({}));
        assert_eq!(payload.message, DEFAULT_MESSAGE);
        assert_eq!(payload.convert_uri, None);
        assert_eq!(payload.filename, None);
        assert_eq!(payload.recipient, ANONYMOUS);
    }

    #[test]
    fn test_malformed_fields_degrade() {
        let payload = CallbackPayload::from_value(&json!({
            "status_message": 42,
            "convert_uri": "not-a-list",
            "filename": [],
            "user_document": "abc"
        }));
        assert_eq!(payload.message, "42");
        assert_eq!(payload.convert_uri, None);
        assert_eq!(payload.filename, None);
        assert_eq!(payload.recipient, ANONYMOUS);
    }

    #[test]
    fn test_empty_or_null_uuid_is_anonymous() {
        for doc in [json!({"uuid": ""}), json!({"uuid": null})] {
            let payload = CallbackPayload::from_value(&json!({"user_document": doc}));
            assert_eq!(payload.recipient, ANONYMOUS);
        }
    }

    #[test]
    fn test_non_object_body() {
        let payload = CallbackPayload::from_value(&json!(["message"]));
        assert_eq!(payload.message, DEFAULT_MESSAGE);
        assert_eq!(payload.recipient, ANONYMOUS);
    }
}
