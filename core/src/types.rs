use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reads an explicit JSON `null` the same way as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response from `GET /health`
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
}

/// Response from `GET /`. The shape is owned by the server.
pub type ApiInfo = Value;

/// Request body for `POST /v1/final-response`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FinalResponseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_query: Option<String>,
}

impl FinalResponseRequest {
    /// Request used by the chat flow: no pre-gathered content, the agent
    /// collects what it needs from the user's query.
    pub fn for_user_query(query: impl Into<String>) -> Self {
        Self {
            content: Some(String::new()),
            user_query: Some(query.into()),
        }
    }
}

/// Response from `POST /v1/final-response`
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct FinalResponseResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request body for `POST /v1/additional-info`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdditionalInfoRequest {
    pub query: String,
}

impl AdditionalInfoRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// Response from `POST /v1/additional-info`
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AdditionalInfoResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body returned by the server alongside a non-2xx status.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// `detail` is a plain string for handler errors and a list of entries for
/// request validation failures.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Entries(Vec<ValidationEntry>),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ValidationEntry {
    #[serde(default)]
    pub msg: String,
}

impl ServerErrorBody {
    /// Flattened, human-readable detail; `None` when the body has none.
    pub fn detail_text(&self) -> Option<String> {
        let text = match self.detail.as_ref()? {
            ErrorDetail::Text(text) => text.clone(),
            ErrorDetail::Entries(entries) => entries
                .iter()
                .map(|e| e.msg.as_str())
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
