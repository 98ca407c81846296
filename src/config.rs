use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;
use tracing::warn;

use crate::clients::service_bus::ConnectionString;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_sender_email: Option<String>,
    pub admin_email: Option<String>,
    #[serde(default = "default_sendgrid_api_url")]
    pub sendgrid_api_url: String,

    pub azure_service_bus_connection_string: Option<String>,
    pub queue_name: Option<String>,

    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    #[serde(default = "default_server_port")]
    pub functions_customhandler_port: u16,
}

/// Everything the SendGrid client needs. Only built when all three
/// addresses/keys are present.
#[derive(Clone, Debug)]
pub struct EmailSettings {
    pub api_key: String,
    pub sender_email: String,
    pub admin_email: String,
    pub api_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ServiceBusSettings {
    pub connection_string: String,
    pub queue_name: String,
    pub timeout: Duration,
}

fn default_sendgrid_api_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_server_port() -> u16 {
    3000
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Loads the configuration from the process environment (and `.env` when
    /// present), then validates it. Queue settings are required; email
    /// settings are optional and only produce a warning when incomplete.
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid environmental variable: {}", e))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.http_timeout_seconds == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECONDS must be greater than zero"));
        }

        let service_bus = self.service_bus_settings()?;
        service_bus
            .connection_string
            .parse::<ConnectionString>()
            .map_err(|e| anyhow!("Invalid AZURE_SERVICE_BUS_CONNECTION_STRING: {}", e))?;

        let missing = self.missing_email_settings();
        if !missing.is_empty() {
            warn!(
                missing = ?missing,
                "Email notifications disabled, SendGrid settings incomplete"
            );
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn missing_email_settings(&self) -> Vec<&'static str> {
        [
            ("SENDGRID_API_KEY", &self.sendgrid_api_key),
            ("SENDGRID_SENDER_EMAIL", &self.sendgrid_sender_email),
            ("ADMIN_EMAIL", &self.admin_email),
        ]
        .into_iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn email_settings(&self) -> Option<EmailSettings> {
        Some(EmailSettings {
            api_key: present(&self.sendgrid_api_key)?.to_string(),
            sender_email: present(&self.sendgrid_sender_email)?.to_string(),
            admin_email: present(&self.admin_email)?.to_string(),
            api_url: self.sendgrid_api_url.trim_end_matches('/').to_string(),
            timeout: self.http_timeout(),
        })
    }

    pub fn service_bus_settings(&self) -> Result<ServiceBusSettings, Error> {
        let connection_string = present(&self.azure_service_bus_connection_string)
            .ok_or_else(|| anyhow!("AZURE_SERVICE_BUS_CONNECTION_STRING is not set"))?;
        let queue_name =
            present(&self.queue_name).ok_or_else(|| anyhow!("QUEUE_NAME is not set"))?;

        Ok(ServiceBusSettings {
            connection_string: connection_string.to_string(),
            queue_name: queue_name.to_string(),
            timeout: self.http_timeout(),
        })
    }
}
