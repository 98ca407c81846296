#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use product_notifier::{
    models::{
        notification::{NotificationRequest, OutboundConfirmation},
        outcome::StepOutcome,
    },
    relay::{ConfirmationPublisher, EmailSender, NotificationRelay},
};

/// Ordered record of collaborator calls shared by the fakes.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct FakeEmail {
    pub calls: CallLog,
    pub requests: Arc<Mutex<Vec<NotificationRequest>>>,
    pub outcome: StepOutcome,
}

#[async_trait]
impl EmailSender for FakeEmail {
    async fn send_notification(&self, request: &NotificationRequest) -> StepOutcome {
        self.calls.lock().unwrap().push("email".to_string());
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.clone()
    }
}

pub struct FakePublisher {
    pub calls: CallLog,
    pub bodies: Arc<Mutex<Vec<String>>>,
    pub outcome: StepOutcome,
}

#[async_trait]
impl ConfirmationPublisher for FakePublisher {
    async fn publish_confirmation(&self, confirmation: &OutboundConfirmation) -> StepOutcome {
        self.calls.lock().unwrap().push("publish".to_string());
        self.bodies.lock().unwrap().push(confirmation.body.clone());
        self.outcome.clone()
    }
}

pub struct Harness {
    pub relay: NotificationRelay,
    pub calls: CallLog,
    pub requests: Arc<Mutex<Vec<NotificationRequest>>>,
    pub bodies: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    pub fn new(email_outcome: StepOutcome, publish_outcome: StepOutcome) -> Self {
        let calls = CallLog::default();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let bodies = Arc::new(Mutex::new(Vec::new()));

        let email = FakeEmail {
            calls: Arc::clone(&calls),
            requests: Arc::clone(&requests),
            outcome: email_outcome,
        };
        let publisher = FakePublisher {
            calls: Arc::clone(&calls),
            bodies: Arc::clone(&bodies),
            outcome: publish_outcome,
        };

        Self {
            relay: NotificationRelay::new(Arc::new(email), Arc::new(publisher)),
            calls,
            requests,
            bodies,
        }
    }

    pub fn healthy() -> Self {
        Self::new(delivered(202), delivered(201))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn delivered(status: u16) -> StepOutcome {
    StepOutcome::Delivered { status }
}

pub fn failed(reason: &str) -> StepOutcome {
    StepOutcome::Failed {
        reason: reason.to_string(),
    }
}

pub fn service_bus_connection_string(endpoint: &str) -> String {
    format!(
        "Endpoint={};SharedAccessKeyName=send-only;SharedAccessKey=c2VjcmV0",
        endpoint
    )
}
