use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// `sessions.json`: agent key → metadata, in key order.
pub type SessionIndex = BTreeMap<String, IndexEntry>;

/// One agent entry of the index. Every field is optional; a field holding the wrong JSON type is
/// read as absent.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub session_file: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub aborted_last_run: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub model_provider: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub spawned_by: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub output_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_tokens: Option<u64>,
    /// Epoch milliseconds, integer or float.
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub origin: Option<IndexOrigin>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct IndexOrigin {
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
}

impl IndexEntry {
    pub fn matches_session(&self, agent_key: &str, session_id: &str) -> bool {
        self.session_id.as_deref() == Some(session_id) || agent_key == session_id
    }
}

/// Parses the index text. The top level must be a JSON object; entries that are not objects
/// decode as empty entries.
pub fn parse_session_index(text: &str) -> Result<SessionIndex, serde_json::Error> {
    let raw: BTreeMap<String, Value> = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|(agent_key, value)| {
            let entry = serde_json::from_value::<IndexEntry>(value).unwrap_or_default();
            (agent_key, entry)
        })
        .collect())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
