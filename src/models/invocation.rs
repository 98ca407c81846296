use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::InboundMessage;

/// Name of the Service Bus trigger binding in `function.json`.
pub const TRIGGER_BINDING: &str = "azservicebus";

/// Request body the Functions host sends to a custom handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationRequest {
    #[serde(default)]
    pub data: HashMap<String, Value>,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl InvocationRequest {
    /// The trigger payload as raw message bytes. The host forwards string
    /// bodies as JSON strings; anything else is re-serialized.
    pub fn trigger_message(&self) -> Option<InboundMessage> {
        self.data.get(TRIGGER_BINDING).map(|value| match value {
            Value::String(body) => InboundMessage::from(body.as_str()),
            other => InboundMessage::new(other.to_string()),
        })
    }

    pub fn message_id(&self) -> Option<&str> {
        self.metadata.get("MessageId").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationResponse {
    pub outputs: HashMap<String, Value>,
    pub logs: Vec<String>,
    pub return_value: Option<Value>,
}

impl InvocationResponse {
    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }
}
