use serde::{Deserialize, Serialize};

use crate::constants::Method;

/// Error details carried in a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: i32,
    pub message: String,
}

/// Envelope for every JSON request and reply.
///
/// The `payload` field uses `serde_json::value::RawValue` so the transport
/// can route a message by `id` and `method` before the payload type is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl Message {
    /// Creates a new message with the given method and payload.
    pub fn new<T: Serialize>(
        id: impl Into<String>,
        method: Method,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            id: id.into(),
            method,
            payload: raw,
            error: None,
        })
    }

    /// Creates a request with a fresh correlation id.
    pub fn request<T: Serialize>(method: Method, payload: &T) -> Result<Self, serde_json::Error> {
        Message::new(uuid::Uuid::new_v4().to_string(), method, Some(payload))
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Creates an error reply.
    pub fn error(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: Method::Reply,
            payload: None,
            error: Some(RpcErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    /// Creates a successful reply to the request with `id`.
    pub fn reply_to<T: Serialize>(id: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Message::new(id, Method::Reply, Some(payload))
    }

    /// Creates a successful reply to this request.
    pub fn reply<T: Serialize>(&self, payload: &T) -> Result<Self, serde_json::Error> {
        Message::reply_to(&self.id, payload)
    }

    /// Creates an error reply to this request.
    pub fn reply_error(&self, code: i32, message: impl Into<String>) -> Self {
        Message::error(&self.id, code, message)
    }
}
