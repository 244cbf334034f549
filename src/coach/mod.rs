//! Core coaching protocol: per-user state, persona prompts, directive
//! extraction, and the turn orchestrator.

pub mod directives;
pub mod model;
pub mod orchestrator;
pub mod prompts;

pub use model::{DayLog, MealEntry, UserProfile};
pub use orchestrator::{CoachAgent, IncomingTurn};
