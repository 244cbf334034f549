//! Messaging channels. WhatsApp (via the Twilio webhook) is the only one.

pub mod whatsapp;

pub use whatsapp::{TwilioMediaFetcher, whatsapp_routes};
