use std::{str::FromStr, time::Duration};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, error, info};
use url::{Url, form_urlencoded};
use uuid::Uuid;

use crate::{
    config::{Config, ServiceBusSettings},
    models::{notification::OutboundConfirmation, outcome::StepOutcome},
    relay::ConfirmationPublisher,
};

const SAS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Parsed `Endpoint=...;SharedAccessKeyName=...;SharedAccessKey=...` string.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionString {
    pub endpoint: Url,
    pub key_name: String,
    pub key: String,
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("Malformed connection string segment"))?;

            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().to_string()),
                "sharedaccesskeyname" => key_name = Some(value.trim().to_string()),
                "sharedaccesskey" => key = Some(value.trim().to_string()),
                "usedevelopmentemulator" if value.trim().eq_ignore_ascii_case("true") => {
                    return Err(anyhow!(
                        "UseDevelopmentEmulator is not supported, the emulator has no REST endpoint"
                    ));
                }
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| anyhow!("Connection string has no Endpoint"))?;
        let key_name =
            key_name.ok_or_else(|| anyhow!("Connection string has no SharedAccessKeyName"))?;
        let key = key.ok_or_else(|| anyhow!("Connection string has no SharedAccessKey"))?;

        Ok(Self {
            endpoint: http_endpoint(&endpoint)?,
            key_name,
            key,
        })
    }
}

/// `sb://` endpoints are served over HTTPS; explicit `http(s)://` endpoints
/// are kept as given.
fn http_endpoint(endpoint: &str) -> Result<Url, Error> {
    let parsed = Url::parse(endpoint).map_err(|_| anyhow!("Invalid Service Bus endpoint"))?;

    let scheme = match parsed.scheme() {
        "sb" => "https",
        "http" | "https" => parsed.scheme(),
        other => return Err(anyhow!("Unsupported endpoint scheme: {}", other)),
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Service Bus endpoint has no host"))?;
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

    Url::parse(&format!("{}://{}{}/", scheme, host, port))
        .map_err(|_| anyhow!("Invalid Service Bus endpoint"))
}

fn url_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Builds a `SharedAccessSignature` authorization value for `resource_uri`.
pub fn sas_token(
    resource_uri: &str,
    key_name: &str,
    key: &str,
    expires_at: DateTime<Utc>,
) -> Result<String, Error> {
    let encoded_uri = url_encode(resource_uri);
    let expiry = expires_at.timestamp();
    let string_to_sign = format!("{}\n{}", encoded_uri, expiry);

    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|_| anyhow!("Invalid shared access key"))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
        encoded_uri,
        url_encode(&signature),
        expiry,
        url_encode(key_name)
    ))
}

#[derive(Debug, Clone)]
pub struct ServiceBusMessage {
    pub body: String,
    pub message_id: String,
    pub content_type: String,
}

impl ServiceBusMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            message_id: Uuid::new_v4().to_string(),
            content_type: "text/plain".to_string(),
        }
    }
}

/// A connection to one Service Bus namespace. Released on drop.
pub struct ServiceBusClient {
    http_client: Client,
    connection: ConnectionString,
}

impl ServiceBusClient {
    pub fn from_connection_string(
        connection_string: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let connection = connection_string.parse::<ConnectionString>()?;

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        debug!(endpoint = %connection.endpoint, "Service Bus client opened");

        Ok(Self {
            http_client,
            connection,
        })
    }

    pub fn queue_sender(&self, queue_name: &str) -> QueueSender<'_> {
        debug!(queue = queue_name, "Service Bus sender acquired");

        QueueSender {
            client: self,
            queue_name: queue_name.to_string(),
        }
    }
}

impl Drop for ServiceBusClient {
    fn drop(&mut self) {
        debug!(endpoint = %self.connection.endpoint, "Service Bus client closed");
    }
}

/// Sender bound to a single queue. Cannot outlive its client.
pub struct QueueSender<'a> {
    client: &'a ServiceBusClient,
    queue_name: String,
}

impl QueueSender<'_> {
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub async fn send_message(&self, message: &ServiceBusMessage) -> Result<u16, Error> {
        let connection = &self.client.connection;

        let resource = connection
            .endpoint
            .join(&self.queue_name)
            .map_err(|_| anyhow!("Invalid queue name: {}", self.queue_name))?;
        let url = connection
            .endpoint
            .join(&format!("{}/messages", self.queue_name))
            .map_err(|_| anyhow!("Invalid queue name: {}", self.queue_name))?;

        let expires_at = Utc::now() + chrono::Duration::seconds(SAS_TOKEN_TTL_SECONDS);
        let token = sas_token(
            resource.as_str(),
            &connection.key_name,
            &connection.key,
            expires_at,
        )?;

        let broker_properties = json!({ "MessageId": message.message_id }).to_string();

        let response = self
            .client
            .http_client
            .post(url)
            .header(AUTHORIZATION, token)
            .header(CONTENT_TYPE, &message.content_type)
            .header("BrokerProperties", broker_properties)
            .body(message.body.clone())
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            Ok(status.as_u16())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "Service Bus returned status {}: {}",
                status.as_u16(),
                error_text
            ))
        }
    }
}

impl Drop for QueueSender<'_> {
    fn drop(&mut self) {
        debug!(queue = %self.queue_name, "Service Bus sender released");
    }
}

/// Publishes confirmations over a fresh client and sender per call.
pub struct ServiceBusPublisher {
    settings: ServiceBusSettings,
}

impl ServiceBusPublisher {
    pub fn new(settings: ServiceBusSettings) -> Self {
        info!(queue = %settings.queue_name, "Service Bus publisher initialized");

        Self { settings }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(config.service_bus_settings()?))
    }

    async fn publish_once(&self, confirmation: &OutboundConfirmation) -> Result<u16, Error> {
        let client = ServiceBusClient::from_connection_string(
            &self.settings.connection_string,
            self.settings.timeout,
        )?;
        let sender = client.queue_sender(&self.settings.queue_name);

        sender
            .send_message(&ServiceBusMessage::text(confirmation.body.as_str()))
            .await
    }
}

#[async_trait]
impl ConfirmationPublisher for ServiceBusPublisher {
    async fn publish_confirmation(&self, confirmation: &OutboundConfirmation) -> StepOutcome {
        match self.publish_once(confirmation).await {
            Ok(status) => {
                info!(
                    status,
                    queue = %self.settings.queue_name,
                    "Message sent to Azure Service Bus"
                );
                StepOutcome::Delivered { status }
            }
            Err(e) => {
                error!(
                    error = %e,
                    queue = %self.settings.queue_name,
                    "Failed to send message to Azure Service Bus"
                );
                StepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
