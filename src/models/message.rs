use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_json::Value;

/// Raw body delivered by the queue trigger. Read once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    body: Vec<u8>,
}

impl InboundMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }
}

impl From<&str> for InboundMessage {
    fn from(body: &str) -> Self {
        Self::new(body.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductId {
    Text(String),
    Number(serde_json::Number),
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProductId::Text(id) => write!(f, "{}", id),
            ProductId::Number(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub product_id: ProductId,
    pub product_name: Option<String>,
}

/// Why a decoded body did not yield a product update.
#[derive(Debug)]
pub enum Rejection {
    MalformedJson(serde_json::Error),
    NotAnObject,
    MissingProductId,
    UnsupportedProductId(Value),
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Rejection::MalformedJson(e) => write!(f, "message body is not valid JSON: {}", e),
            Rejection::NotAnObject => write!(f, "message body is not a JSON object"),
            Rejection::MissingProductId => write!(f, "no product data"),
            Rejection::UnsupportedProductId(value) => {
                write!(f, "unsupported product_id value: {}", value)
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// JSON truthiness: null, false, zero, and empty strings/arrays/objects are
/// all treated as an absent value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

impl ProductUpdate {
    pub fn parse(text: &str) -> Result<Self, Rejection> {
        let value: Value = serde_json::from_str(text).map_err(Rejection::MalformedJson)?;
        let fields = value.as_object().ok_or(Rejection::NotAnObject)?;

        let product_id = match fields.get("product_id") {
            Some(id) if is_truthy(id) => match id {
                Value::String(s) => ProductId::Text(s.clone()),
                Value::Number(n) => ProductId::Number(n.clone()),
                other => return Err(Rejection::UnsupportedProductId(other.clone())),
            },
            _ => return Err(Rejection::MissingProductId),
        };

        let product_name = fields
            .get("product_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Ok(Self {
            product_id,
            product_name,
        })
    }
}
