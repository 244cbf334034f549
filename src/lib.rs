//! Coach Mika — WhatsApp nutrition coach over an LLM completion service.

pub mod channels;
pub mod coach;
pub mod config;
pub mod error;
pub mod llm;
pub mod store;
