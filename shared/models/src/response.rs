use serde::Serialize;
use serde_json::{Map, Value};

/// Uniform response envelope: `{ret: 0|1, msg?, data?, ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T = Value> {
    pub ret: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Endpoint-specific top-level fields such as `domain` or `response`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ret: 0,
            msg: None,
            data: Some(data),
            extra: Map::new(),
        }
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl ApiResponse<Value> {
    /// Success with only a message.
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            ret: 0,
            msg: Some(msg.into()),
            data: None,
            extra: Map::new(),
        }
    }

    /// Success with neither data nor message.
    pub fn empty() -> Self {
        Self {
            ret: 0,
            msg: None,
            data: None,
            extra: Map::new(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ret: 1,
            msg: Some(msg.into()),
            data: None,
            extra: Map::new(),
        }
    }
}
