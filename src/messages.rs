//! JSON frames pushed to browsers over `/ws`.

use serde::Serialize;

/// One outbound websocket frame.
///
/// Serialized untagged so each variant is the bare object the browser
/// script expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// First frame on every connection: the session id to echo back as `uuid`.
    Hello { uuid: String },
    /// Outcome of an upload relay, broadcast to every session.
    Relay { status: Status, message: String },
    /// Pipeline job notification for one session.
    Job {
        status: Status,
        message: String,
        convert_uri: String,
        filename: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl ServerMessage {
    pub fn hello(uuid: impl Into<String>) -> Self {
        Self::Hello { uuid: uuid.into() }
    }

    pub fn relay(status: Status, message: impl Into<String>) -> Self {
        Self::Relay {
            status,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain strings and enums only, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hello_shape() {
        let value = serde_json::to_value(ServerMessage::hello("abc")).unwrap();
        assert_eq!(value, json!({"uuid": "abc"}));
    }

    #[test]
    fn test_job_shape() {
        let msg = ServerMessage::Job {
            status: Status::Success,
            message: "Done".to_string(),
            convert_uri: String::new(),
            filename: String::new(),
        };
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "message": "Done", "convert_uri": "", "filename": ""})
        );
    }
}
