use crate::models::message::{ProductId, ProductUpdate};

pub const PRODUCT_UPDATED: &str = "Product updated";

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub product_id: ProductId,
    pub product_name: Option<String>,
}

impl NotificationRequest {
    pub fn subject(&self) -> String {
        format!("Product updates: {}", self.product_id)
    }

    pub fn body(&self) -> String {
        match &self.product_name {
            Some(name) => format!("Product ID {} ({}) was updated.", self.product_id, name),
            None => format!("Product ID {} was updated.", self.product_id),
        }
    }
}

impl From<&ProductUpdate> for NotificationRequest {
    fn from(update: &ProductUpdate) -> Self {
        Self {
            product_id: update.product_id.clone(),
            product_name: update.product_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundConfirmation {
    pub body: String,
}

impl OutboundConfirmation {
    pub fn product_updated() -> Self {
        Self {
            body: PRODUCT_UPDATED.to_string(),
        }
    }
}
