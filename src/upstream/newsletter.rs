//! Newsletter signups through a ConvertKit-compatible ESP.
//!
//! Signups are POSTs and are sent exactly once; a duplicate subscriber
//! created by a blind retry is worse than a failed request the visitor can
//! resubmit.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::NewsletterConfig;
use crate::observability::metrics;
use crate::upstream::{base_url, UpstreamError};

const PROVIDER: &str = "newsletter";

/// A sanitized signup ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signup {
    pub email: String,
    pub first_name: Option<String>,
    pub tags: Vec<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    Subscribed,
    AlreadySubscribed,
}

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    api_key: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<SignupFields<'a>>,
}

fn no_tags(tags: &&[String]) -> bool {
    tags.is_empty()
}

#[derive(Serialize)]
struct SignupFields<'a> {
    source: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct EspReply {
    message: Option<String>,
    error: Option<String>,
}

impl EspReply {
    fn says_already_subscribed(&self) -> bool {
        [&self.message, &self.error]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains("already subscribed"))
    }
}

pub struct NewsletterClient {
    client: reqwest::Client,
    base: Url,
    api_key: String,
    form_id: String,
}

impl NewsletterClient {
    pub fn new(client: reqwest::Client, config: &NewsletterConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client,
            base: base_url(&config.base_url)?,
            api_key: config.api_key.clone(),
            form_id: config.form_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.form_id.is_empty()
    }

    fn subscribe_url(&self) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["forms", self.form_id.as_str(), "subscribe"]);
        Ok(url)
    }

    /// Add a subscriber to the configured form.
    pub async fn subscribe(&self, signup: &Signup) -> Result<SignupOutcome, UpstreamError> {
        if !self.is_configured() {
            return Err(UpstreamError::NotConfigured(PROVIDER));
        }

        let body = SubscribeRequest {
            api_key: &self.api_key,
            email: &signup.email,
            first_name: signup.first_name.as_deref(),
            tags: &signup.tags,
            fields: signup.source.as_deref().map(|source| SignupFields { source }),
        };

        let result = async {
            let response = self.client.post(self.subscribe_url()?).json(&body).send().await?;
            let status = response.status();
            let reply: EspReply = response.json().await.unwrap_or_default();

            if status.as_u16() == 409 || reply.says_already_subscribed() {
                Ok(SignupOutcome::AlreadySubscribed)
            } else if status.is_success() {
                Ok(SignupOutcome::Subscribed)
            } else {
                tracing::warn!(
                    status = status.as_u16(),
                    reply = ?reply.message.or(reply.error),
                    "ESP rejected signup"
                );
                Err(UpstreamError::Status(status.as_u16()))
            }
        }
        .await;

        metrics::record_upstream(PROVIDER, if result.is_ok() { "ok" } else { "error" });
        result
    }
}
