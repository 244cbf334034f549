//! WhatsApp channel — Twilio webhook in, TwiML reply out.
//!
//! Twilio posts inbound messages as form data (`From`, `Body`,
//! `NumMedia`, `MediaUrl0`) and expects a TwiML XML body in response.
//! Media URLs are fetched back from Twilio with basic auth.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Form, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::coach::{CoachAgent, IncomingTurn};
use crate::error::LlmError;
use crate::llm::{ImageAttachment, MediaFetcher};

/// Shared router state.
#[derive(Clone)]
struct AppState {
    agent: Arc<CoachAgent>,
}

/// Build the Axum router for the webhook and admin routes.
pub fn whatsapp_routes(agent: Arc<CoachAgent>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/", get(home))
        .route("/reset/{phone}", get(reset_user))
        .with_state(AppState { agent })
}

/// Inbound Twilio webhook form. All values arrive as strings.
#[derive(Debug, Deserialize)]
struct WebhookForm {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "NumMedia", default)]
    num_media: String,
    #[serde(rename = "MediaUrl0", default)]
    media_url0: String,
}

async fn webhook(State(state): State<AppState>, Form(form): Form<WebhookForm>) -> impl IntoResponse {
    let sender_id = if form.from.is_empty() {
        "default_user".to_string()
    } else {
        form.from
    };

    let turn = IncomingTurn {
        sender_id,
        text: form.body,
        image_url: media_url(&form.num_media, &form.media_url0),
    };

    match state.agent.handle_turn(turn).await {
        Ok(reply) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            twiml_message(&reply),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Webhook turn failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn home() -> &'static str {
    "🥗 Diet Coach Bot — Coach Mika est en ligne ! Connectez-vous via WhatsApp."
}

async fn reset_user(State(state): State<AppState>, Path(phone): Path<String>) -> impl IntoResponse {
    match state.agent.reset_user(&phone).await {
        Ok(true) => format!("Utilisateur {phone} réinitialisé."),
        Ok(false) => format!("Utilisateur {phone} introuvable."),
        Err(e) => {
            tracing::error!(error = %e, user = %phone, "Reset failed");
            format!("Échec de la réinitialisation de {phone}.")
        }
    }
}

/// The media URL counts only when Twilio reports at least one attachment.
fn media_url(num_media: &str, media_url0: &str) -> Option<String> {
    let count: usize = num_media.trim().parse().unwrap_or(0);
    if count > 0 && !media_url0.is_empty() {
        Some(media_url0.to_string())
    } else {
        None
    }
}

/// Render a reply as a TwiML message response.
fn twiml_message(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(text)
    )
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Fetches Twilio-hosted media with account basic auth.
pub struct TwilioMediaFetcher {
    client: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
}

impl TwilioMediaFetcher {
    pub fn new(account_sid: String, auth_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid,
            auth_token,
        }
    }
}

#[async_trait]
impl MediaFetcher for TwilioMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<ImageAttachment, LlmError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .send()
            .await
            .map_err(|e| LlmError::ImageFetch {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LlmError::ImageFetch {
                reason: format!("HTTP {} for {url}", response.status()),
            });
        }

        let media_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| LlmError::ImageFetch {
                reason: e.to_string(),
            })?
            .to_vec();

        Ok(ImageAttachment { media_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twiml_wraps_and_escapes_reply() {
        let xml = twiml_message("Objectif < 2000 kcal & on y va !");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Response><Message>"));
        assert!(xml.contains("Objectif &lt; 2000 kcal &amp; on y va !"));
        assert!(xml.ends_with("</Message></Response>"));
    }

    #[test]
    fn media_url_requires_positive_count() {
        assert_eq!(
            media_url("1", "https://api.twilio.com/media/abc"),
            Some("https://api.twilio.com/media/abc".to_string())
        );
        assert_eq!(media_url("0", "https://api.twilio.com/media/abc"), None);
        assert_eq!(media_url("", "https://api.twilio.com/media/abc"), None);
        assert_eq!(media_url("not-a-number", "https://x"), None);
        assert_eq!(media_url("2", ""), None);
    }
}
