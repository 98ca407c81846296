use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::{
    config::{Config, EmailSettings},
    models::{
        notification::NotificationRequest, outcome::StepOutcome, sendgrid::MailSendRequest,
    },
    relay::EmailSender,
};

pub struct SendGridClient {
    http_client: Client,
    settings: Option<EmailSettings>,
    missing_settings: Vec<&'static str>,
}

impl SendGridClient {
    pub fn new(settings: EmailSettings) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(api_url = %settings.api_url, "SendGrid client initialized");

        Ok(Self {
            http_client,
            settings: Some(settings),
            missing_settings: Vec::new(),
        })
    }

    /// A client that skips every send, reporting the settings it lacks.
    pub fn unconfigured(missing_settings: Vec<&'static str>) -> Self {
        info!(missing = ?missing_settings, "SendGrid client initialized without credentials");

        Self {
            http_client: Client::new(),
            settings: None,
            missing_settings,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        match config.email_settings() {
            Some(settings) => Self::new(settings),
            None => Ok(Self::unconfigured(config.missing_email_settings())),
        }
    }

    async fn send_once(
        &self,
        settings: &EmailSettings,
        request: &MailSendRequest,
    ) -> Result<u16, Error> {
        let url = format!("{}/v3/mail/send", settings.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&settings.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            Ok(status.as_u16())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "SendGrid returned status {}: {}",
                status.as_u16(),
                error_text
            ))
        }
    }
}

#[async_trait]
impl EmailSender for SendGridClient {
    async fn send_notification(&self, request: &NotificationRequest) -> StepOutcome {
        let Some(settings) = &self.settings else {
            let reason = format!(
                "SendGrid settings not configured: {}",
                self.missing_settings.join(", ")
            );
            error!(missing = ?self.missing_settings, "SendGrid settings not configured");
            return StepOutcome::Skipped { reason };
        };

        let mail = MailSendRequest::plain_text(
            &settings.sender_email,
            &settings.admin_email,
            request.subject(),
            request.body(),
        );

        debug!(product_id = %request.product_id, "Sending e-mail notification");

        match self.send_once(settings, &mail).await {
            Ok(status) => {
                info!(status, product_id = %request.product_id, "E-mail sent");
                StepOutcome::Delivered { status }
            }
            Err(e) => {
                error!(error = %e, product_id = %request.product_id, "Failed to send e-mail");
                StepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
