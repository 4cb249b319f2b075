//! Best-effort event publication.
//!
//! Events go out after the owning transaction commits. A missing NATS client
//! or a failed publish never fails the request.

use crate::domain::events::DomainEvent;

#[derive(Clone)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let Some(client) = &self.client else {
            return;
        };
        let subject = event.subject();
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(%err, subject, "failed to serialize event");
                return;
            }
        };
        if let Err(err) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(%err, subject, "failed to publish event");
        }
    }
}
