use serde::Serialize;
use serde_json::Value;

use crate::config::EmailJsConfig;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: Value,
}

#[derive(Debug, Clone, Copy)]
pub enum Template {
    BookingReceived,
    ContactMessage,
}

/// Transactional email through the EmailJS REST API.
#[derive(Clone)]
pub struct Mailer {
    config: Option<EmailJsConfig>,
    http_client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: Option<EmailJsConfig>) -> Self {
        Mailer { config, http_client: reqwest::Client::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    pub async fn send(&self, template: Template, params: Value) -> anyhow::Result<()> {
        let Some(config) = &self.config else {
            tracing::debug!(?template, "email is not configured, skipping");
            return Ok(());
        };

        let template_id = match template {
            Template::BookingReceived => &config.booking_template,
            Template::ContactMessage => &config.contact_template,
        };

        self.http_client
            .post(EMAILJS_SEND_URL)
            .json(&EmailJsRequest {
                service_id: &config.service_id,
                template_id,
                user_id: &config.public_key,
                template_params: params,
            })
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(?template, "email sent");
        Ok(())
    }

    /// Sends in the background; a failed email never fails the page.
    pub fn send_later(&self, template: Template, params: Value) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(template, params).await {
                tracing::warn!(?template, "email failed: {e:#}");
            }
        });
    }
}
