//! Host message contract
//!
//! The host forwards analyst actions from the details view as JSON tagged by
//! `action`. Observable and tag ids arrive as numbers or strings.

use crate::error::{IntegrationError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Tag suggestions for a search term, `*` for preferred tags only
    SearchTags {
        term: String,
        #[serde(default)]
        exclude: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    AddTag {
        tag: String,
        #[serde(deserialize_with = "id_string")]
        observable_id: String,
        tlp: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteTag {
        #[serde(deserialize_with = "id_string")]
        observable_id: String,
        #[serde(deserialize_with = "id_string")]
        tag_id: String,
    },
    #[serde(rename_all = "camelCase")]
    GetObservable {
        #[serde(deserialize_with = "id_string")]
        observable_id: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateObservable {
        #[serde(deserialize_with = "id_string")]
        observable_id: String,
        update_fields: Value,
    },
    /// Comment on an observed value
    CreateComment {
        value: String,
        comment: String,
        tlp: String,
    },
}

impl Message {
    pub fn from_json(payload: &Value) -> Result<Self> {
        Self::deserialize(payload)
            .map_err(|e| IntegrationError::InvalidInput(format!("invalid message: {}", e)))
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::SearchTags { .. } => "SEARCH_TAGS",
            Self::AddTag { .. } => "ADD_TAG",
            Self::DeleteTag { .. } => "DELETE_TAG",
            Self::GetObservable { .. } => "GET_OBSERVABLE",
            Self::UpdateObservable { .. } => "UPDATE_OBSERVABLE",
            Self::CreateComment { .. } => "CREATE_COMMENT",
        }
    }
}

fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_actions() {
        let msg = Message::from_json(&json!({
            "action": "ADD_TAG",
            "tag": "apt29",
            "observableId": 123456,
            "tlp": "red"
        }))
        .unwrap();
        assert_eq!(
            msg,
            Message::AddTag {
                tag: "apt29".into(),
                observable_id: "123456".into(),
                tlp: "red".into()
            }
        );
        assert_eq!(msg.action(), "ADD_TAG");

        let msg = Message::from_json(&json!({ "action": "SEARCH_TAGS", "term": "*" })).unwrap();
        assert_eq!(
            msg,
            Message::SearchTags {
                term: "*".into(),
                exclude: vec![]
            }
        );

        let msg = Message::from_json(&json!({
            "action": "DELETE_TAG",
            "observableId": "42",
            "tagId": "abc123"
        }))
        .unwrap();
        assert_eq!(msg.action(), "DELETE_TAG");
    }

    #[test]
    fn test_rejects_unknown_action_and_bad_ids() {
        assert!(Message::from_json(&json!({ "action": "DROP_TABLES" })).is_err());
        assert!(Message::from_json(&json!({ "action": "GET_OBSERVABLE", "observableId": "" })).is_err());
        assert!(Message::from_json(&json!({ "action": "GET_OBSERVABLE", "observableId": [1] })).is_err());
    }
}
