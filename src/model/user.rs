//! User identity attached to a chat session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::json::JsonValue;

/// User data sent to the widget on authenticate/update calls.
///
/// Serializes to snake_case wire keys (`user_id`, ...). The whole record
/// is re-sent on every call; the page does not receive diffs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Free-form metadata forwarded to the widget verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, JsonValue>>,
}

impl UserData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, JsonValue>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_wire_keys() {
        let user = UserData::new()
            .with_user_id("u-1")
            .with_email("ada@example.com")
            .with_name("Ada");

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["user_id"], "u-1");
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["name"], "Ada");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let json = serde_json::to_string(&UserData::new()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_metadata_round_trip_preserves_types() {
        let mut metadata = HashMap::new();
        metadata.insert("age".to_string(), JsonValue::from(5));
        metadata.insert("active".to_string(), JsonValue::from(true));
        metadata.insert("tag".to_string(), JsonValue::from("vip"));

        let user = UserData::new().with_metadata(metadata);
        let json = serde_json::to_string(&user).unwrap();
        let back: UserData = serde_json::from_str(&json).unwrap();

        let metadata = back.metadata.expect("metadata survives the round trip");
        assert_eq!(metadata["age"], JsonValue::Number(5.0));
        assert_eq!(metadata["active"], JsonValue::Bool(true));
        assert_eq!(metadata["tag"], JsonValue::String("vip".into()));
    }
}
