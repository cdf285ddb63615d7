//! Notification sinks the bot can deliver digests through.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::info;

use slotwatch_core::{NotificationSink, PortError, PresentableDigest, SubscriberId};

/// Writes each digest to the log.
pub(crate) struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        digest: &PresentableDigest,
    ) -> Result<(), PortError> {
        info!(
            %subscriber,
            title = %digest.title,
            count = digest.count,
            "New appointments\n{digest}"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'digest> {
    subscriber: SubscriberId,
    content: String,
    digest: &'digest PresentableDigest,
}

/// POSTs each digest as JSON to a fixed URL.
pub(crate) struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub(crate) fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        digest: &PresentableDigest,
    ) -> Result<(), PortError> {
        let payload = WebhookPayload {
            subscriber,
            content: digest.to_markdown(),
            digest,
        };

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|err| PortError::Delivery(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use slotwatch_core::DigestEntry;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn digest() -> PresentableDigest {
        PresentableDigest {
            title: "REAL ID @ OAKLAND".to_owned(),
            count: 1,
            entries: vec![DigestEntry {
                date: "2024-01-02".to_owned(),
                time: "09:25AM".to_owned(),
                url: "https://telegov.njportal.com/njmvc/AppointmentWizard/12/141/2024-01-02/925"
                    .to_owned(),
                earliest: true,
            }],
            footer: "NJ MVC Appointment Bot".to_owned(),
            generated_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[tokio::test]
    async fn webhook_posts_digest_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({
                "subscriber": 42,
                "digest": { "title": "REAL ID @ OAKLAND", "count": 1 }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = WebhookSink::new(Client::new(), format!("{}/hook", server.uri()));
        let result = sink.deliver(SubscriberId(42), &digest()).await;

        assert!(result.is_ok(), "delivery accepted: {result:?}");
    }

    #[tokio::test]
    async fn webhook_rejection_is_a_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let sink = WebhookSink::new(Client::new(), server.uri());
        let result = sink.deliver(SubscriberId(42), &digest()).await;

        assert!(matches!(result, Err(PortError::Delivery(_))), "forbidden maps to delivery error");
    }

    #[tokio::test]
    async fn log_sink_always_succeeds() {
        let result = LogSink.deliver(SubscriberId(1), &digest()).await;
        assert!(result.is_ok(), "log sink never fails");
    }
}
