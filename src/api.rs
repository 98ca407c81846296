use std::{collections::HashMap, sync::Arc};

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    clients::{sendgrid::SendGridClient, service_bus::ServiceBusPublisher},
    config::Config,
    models::{
        health::{HealthCheckResponse, ServiceHealth},
        invocation::{InvocationRequest, InvocationResponse, TRIGGER_BINDING},
    },
    relay::{NotificationRelay, RelayReport},
};

/// Function name registered with the Functions host; also the route path.
pub const FUNCTION_NAME: &str = "ProcessProductChanges";

pub struct AppState {
    pub relay: NotificationRelay,
    pub missing_email_settings: Vec<&'static str>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let email = SendGridClient::from_config(config)?;
        let publisher = ServiceBusPublisher::from_config(config)?;

        Ok(Self {
            relay: NotificationRelay::new(Arc::new(email), Arc::new(publisher)),
            missing_email_settings: config.missing_email_settings(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&format!("/{}", FUNCTION_NAME), post(process_product_changes))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(config: Config) -> Result<(), Error> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.functions_customhandler_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, function = FUNCTION_NAME, "Custom handler server started");

    axum::serve(listener, app).await?;

    Ok(())
}

fn summarize(report: &RelayReport) -> String {
    match report {
        RelayReport::Rejected { reason } => format!("Message ignored: {}", reason),
        RelayReport::Relayed {
            product_id,
            email,
            publish,
        } => format!(
            "Product {} relayed; e-mail {}; confirmation {}",
            product_id, email, publish
        ),
    }
}

async fn process_product_changes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvocationRequest>,
) -> impl IntoResponse {
    let Some(message) = request.trigger_message() else {
        error!(binding = TRIGGER_BINDING, "Invocation carries no trigger data");
        let response = InvocationResponse::default()
            .with_log(format!("Missing trigger binding '{}'", TRIGGER_BINDING));
        return (StatusCode::BAD_REQUEST, Json(response));
    };

    let message_id = request.message_id().unwrap_or("unknown");

    match state.relay.handle(&message).await {
        Ok(report) => {
            let summary = summarize(&report);
            info!(message_id, summary = %summary, "Invocation completed");
            (
                StatusCode::OK,
                Json(InvocationResponse::default().with_log(summary)),
            )
        }
        Err(e) => {
            error!(message_id, error = %e, "Invocation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(InvocationResponse::default().with_log(e.to_string())),
            )
        }
    }
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let email_health = if state.missing_email_settings.is_empty() {
        ServiceHealth::healthy()
    } else {
        ServiceHealth::degraded(format!(
            "Missing settings: {}",
            state.missing_email_settings.join(", ")
        ))
    };

    let status = email_health.status.clone();

    let mut checks = HashMap::new();
    checks.insert("email".to_string(), email_health);

    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status,
            timestamp: Utc::now(),
            checks,
        }),
    )
}
