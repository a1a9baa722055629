//! Transactional-email client.
//!
//! Payment decisions trigger a notification email through an external mail
//! API. Delivery is best-effort: handlers send after the store commit and
//! only log failures, so a mail outage can never block or roll back a
//! payment decision.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use kurspay_core::Transaction;

/// Error type for mailer operations.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mail API returned an error.
    #[error("mail API error: {status} - {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// Outgoing message payload.
#[derive(Debug, Serialize)]
struct Message<'a> {
    to: &'a str,
    template: &'a str,
    variables: serde_json::Value,
}

/// Transactional-email API client.
#[derive(Debug, Clone)]
pub struct Mailer {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Mailer {
    /// Create a new mailer client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Notify the purchaser that their payment was confirmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses it.
    pub async fn send_payment_confirmed(
        &self,
        to: &str,
        transaction: &Transaction,
    ) -> Result<(), MailerError> {
        self.send(Message {
            to,
            template: "payment_confirmed",
            variables: serde_json::json!({
                "transaction_id": transaction.id.to_string(),
                "course_id": transaction.course_id.to_string(),
            }),
        })
        .await
    }

    /// Notify the purchaser that their payment was rejected, with the reason.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses it.
    pub async fn send_payment_rejected(
        &self,
        to: &str,
        transaction: &Transaction,
        reason: &str,
    ) -> Result<(), MailerError> {
        self.send(Message {
            to,
            template: "payment_rejected",
            variables: serde_json::json!({
                "transaction_id": transaction.id.to_string(),
                "course_id": transaction.course_id.to_string(),
                "reason": reason,
            }),
        })
        .await
    }

    async fn send(&self, message: Message<'_>) -> Result<(), MailerError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
