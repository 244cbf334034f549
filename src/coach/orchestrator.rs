//! Turn orchestrator — drives one inbound message end to end.
//!
//! Load state → build prompt → completion call → directive extraction →
//! state mutation → persist → reply. Turns for the same user are
//! serialized behind a per-user async lock; turns for different users run
//! in parallel. The profile is persisted exactly once per turn, after all
//! mutations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::coach::directives::{extract_meal, extract_setup};
use crate::coach::prompts::build_system_prompt;
use crate::error::{Error, LlmError};
use crate::llm::{ChatMessage, CompletionProvider, MediaFetcher};
use crate::store::ProfileStore;

/// Substituted for an empty inbound message body.
pub const FALLBACK_GREETING: &str = "Bonjour !";

/// One inbound message from the messaging channel.
#[derive(Debug, Clone)]
pub struct IncomingTurn {
    /// Opaque user key (the phone identifier).
    pub sender_id: String,
    /// Message text; may be empty (photo-only messages).
    pub text: String,
    /// Media URL to resolve and attach, if the message carried an image.
    pub image_url: Option<String>,
}

/// The coaching agent: owns the collaborators and the per-user locks.
pub struct CoachAgent {
    store: Arc<dyn ProfileStore>,
    llm: Arc<dyn CompletionProvider>,
    media: Option<Arc<dyn MediaFetcher>>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CoachAgent {
    pub fn new(store: Arc<dyn ProfileStore>, llm: Arc<dyn CompletionProvider>) -> Self {
        Self {
            store,
            llm,
            media: None,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a media fetcher so image messages can be resolved.
    pub fn with_media(mut self, media: Arc<dyn MediaFetcher>) -> Self {
        self.media = Some(media);
        self
    }

    /// Handle one turn using the local calendar date.
    pub async fn handle_turn(&self, turn: IncomingTurn) -> Result<String, Error> {
        let today = today_key();
        self.handle_turn_at(turn, &today).await
    }

    /// Handle one turn for an explicit date key (`YYYY-MM-DD`).
    pub async fn handle_turn_at(&self, turn: IncomingTurn, today: &str) -> Result<String, Error> {
        let lock = self.user_lock(&turn.sender_id).await;
        let _guard = lock.lock().await;

        let mut profile = self
            .store
            .load(&turn.sender_id)
            .await?
            .unwrap_or_default();
        profile.ensure_day(today);

        // The prompt reflects pre-turn state, like the transcript it frames.
        let system = build_system_prompt(&profile, today);

        let body = turn.text.trim();
        let content = if body.is_empty() {
            FALLBACK_GREETING
        } else {
            body
        };
        profile.push_message(ChatMessage::user(content));

        let raw = match self
            .complete_turn(&profile.conversation, &system, turn.image_url.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(user = %turn.sender_id, error = %e, "Completion failed, sending apology");
                // Discard the unanswered user entry so the persisted
                // transcript never carries an orphaned user turn.
                profile.pop_unanswered_user_message();
                self.store.save(&turn.sender_id, &profile).await?;
                return Ok(apology_reply(&e));
            }
        };

        let mut reply = raw;

        if !profile.setup_done {
            let (payload, display) = extract_setup(&reply);
            if let Some(setup) = payload {
                profile.apply_setup(
                    setup.calories,
                    setup.protein,
                    setup.carbs,
                    setup.fat,
                    &setup.first_name,
                );
                tracing::info!(
                    user = %turn.sender_id,
                    calories = setup.calories,
                    "Profile setup completed"
                );
            }
            reply = display;
        }

        let (payload, display) = extract_meal(&reply);
        if let Some(meal) = payload {
            tracing::info!(
                user = %turn.sender_id,
                meal = %meal.name,
                calories = meal.calories,
                "Meal logged"
            );
            profile.apply_meal(today, meal.into());
        }
        reply = display;

        profile.push_message(ChatMessage::assistant(&reply));
        self.store.save(&turn.sender_id, &profile).await?;

        Ok(reply)
    }

    /// Delete a user's profile so the next turn restarts onboarding.
    /// Idempotent; returns whether a profile existed.
    pub async fn reset_user(&self, user_id: &str) -> Result<bool, Error> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        Ok(self.store.delete(user_id).await?)
    }

    async fn complete_turn(
        &self,
        transcript: &[ChatMessage],
        system: &str,
        image_url: Option<&str>,
    ) -> Result<String, LlmError> {
        match image_url {
            Some(url) => {
                let fetcher = self.media.as_ref().ok_or_else(|| LlmError::ImageFetch {
                    reason: "no media fetcher configured".to_string(),
                })?;
                let image = fetcher.fetch(url).await?;
                self.llm.complete_with_image(transcript, system, &image).await
            }
            None => self.llm.complete(transcript, system).await,
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Today's calendar-date key in local time, `YYYY-MM-DD`.
pub fn today_key() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Fixed user-safe apology carrying a truncated diagnostic tail.
fn apology_reply(error: &LlmError) -> String {
    let detail: String = error.to_string().chars().take(100).collect();
    format!("Désolé, j'ai eu un petit souci technique 😅 Peux-tu réessayer ? (Erreur: {detail})")
}
