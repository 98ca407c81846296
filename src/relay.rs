use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::models::{
    message::{InboundMessage, ProductUpdate, Rejection},
    notification::{NotificationRequest, OutboundConfirmation},
    outcome::StepOutcome,
};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_notification(&self, request: &NotificationRequest) -> StepOutcome;
}

#[async_trait]
pub trait ConfirmationPublisher: Send + Sync {
    async fn publish_confirmation(&self, confirmation: &OutboundConfirmation) -> StepOutcome;
}

/// What happened during one handled invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayReport {
    Rejected { reason: String },
    Relayed {
        product_id: String,
        email: StepOutcome,
        publish: StepOutcome,
    },
}

pub struct NotificationRelay {
    email: Arc<dyn EmailSender>,
    publisher: Arc<dyn ConfirmationPublisher>,
}

impl NotificationRelay {
    pub fn new(email: Arc<dyn EmailSender>, publisher: Arc<dyn ConfirmationPublisher>) -> Self {
        Self { email, publisher }
    }

    /// Handles one trigger message.
    ///
    /// Bad JSON or a missing `product_id` ends the invocation quietly. The
    /// email step never blocks the publish step. Only a body that is not
    /// UTF-8 or a failed publish is returned as an error.
    pub async fn handle(&self, message: &InboundMessage) -> Result<RelayReport, Error> {
        let body = std::str::from_utf8(message.as_bytes())
            .map_err(|e| anyhow!("Message body is not valid UTF-8: {}", e))?;

        info!(body, "Message received from Service Bus queue");

        let update = match ProductUpdate::parse(body) {
            Ok(update) => update,
            Err(rejection) => {
                match &rejection {
                    Rejection::MalformedJson(_) | Rejection::NotAnObject => {
                        error!(error = %rejection, "Error on Service Bus message")
                    }
                    Rejection::MissingProductId => error!("No product data."),
                    Rejection::UnsupportedProductId(_) => {
                        error!(error = %rejection, "No product data.")
                    }
                }

                return Ok(RelayReport::Rejected {
                    reason: rejection.to_string(),
                });
            }
        };

        info!(product_id = %update.product_id, "Product update received");

        let email = self
            .email
            .send_notification(&NotificationRequest::from(&update))
            .await;

        if !email.is_delivered() {
            warn!(
                outcome = %email,
                "E-mail step did not deliver, publishing confirmation anyway"
            );
        }

        let publish = self
            .publisher
            .publish_confirmation(&OutboundConfirmation::product_updated())
            .await;

        if let StepOutcome::Failed { reason } = &publish {
            return Err(anyhow!("Failed to publish confirmation: {}", reason));
        }

        Ok(RelayReport::Relayed {
            product_id: update.product_id.to_string(),
            email,
            publish,
        })
    }
}
