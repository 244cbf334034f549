//! Per-user nutrition profile and daily meal log.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, Role};

/// The transcript keeps only this many most-recent entries.
pub const MAX_CONVERSATION_LEN: usize = 20;

/// One logged meal. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealEntry {
    pub name: String,
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

/// Per-day accumulator of consumed macros and logged meals.
///
/// Lazily created on first access each date; totals only ever grow, and
/// only through [`UserProfile::apply_meal`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLog {
    pub calories_consumed: i64,
    pub protein_consumed: i64,
    pub carbs_consumed: i64,
    pub fat_consumed: i64,
    pub meals: Vec<MealEntry>,
}

/// Everything persisted for one user, keyed by their phone identifier.
///
/// Stored as a whole JSON object; the store never writes partial fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub setup_done: bool,
    #[serde(default)]
    pub first_name: String,
    pub calories_target: i64,
    pub protein_target: i64,
    pub carbs_target: i64,
    pub fat_target: i64,
    /// Literal transcript replayed to the completion service, capped at
    /// the [`MAX_CONVERSATION_LEN`] most-recent entries.
    #[serde(default)]
    pub conversation: Vec<ChatMessage>,
    /// Keyed by `YYYY-MM-DD`. Never pruned — unbounded growth is an
    /// accepted limitation of the design.
    #[serde(default)]
    pub days: BTreeMap<String, DayLog>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            setup_done: false,
            first_name: String::new(),
            calories_target: 0,
            protein_target: 0,
            carbs_target: 0,
            fat_target: 0,
            conversation: Vec::new(),
            days: BTreeMap::new(),
        }
    }
}

impl UserProfile {
    /// Get today's log, creating an empty one on first access.
    ///
    /// Idempotent: calling it again the same day never resets totals.
    pub fn ensure_day(&mut self, today: &str) -> &mut DayLog {
        self.days.entry(today.to_string()).or_default()
    }

    /// Append a transcript entry and truncate to the most-recent cap.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.conversation.push(message);
        if self.conversation.len() > MAX_CONVERSATION_LEN {
            let excess = self.conversation.len() - MAX_CONVERSATION_LEN;
            self.conversation.drain(..excess);
        }
    }

    /// Drop the most recent transcript entry if it is an unanswered user
    /// turn. Used when the completion call fails, so the persisted
    /// conversation never carries a user message with no reply.
    pub fn pop_unanswered_user_message(&mut self) {
        if self
            .conversation
            .last()
            .is_some_and(|m| m.role == Role::User)
        {
            self.conversation.pop();
        }
    }

    /// Write the four macro targets and optional first name, and mark
    /// setup done. Returns false (no-op) if setup was already done.
    pub fn apply_setup(
        &mut self,
        calories: i64,
        protein: i64,
        carbs: i64,
        fat: i64,
        first_name: &str,
    ) -> bool {
        if self.setup_done {
            return false;
        }
        self.setup_done = true;
        self.calories_target = calories;
        self.protein_target = protein;
        self.carbs_target = carbs;
        self.fat_target = fat;
        self.first_name = first_name.to_string();
        true
    }

    /// Append a meal to today's log and bump the four running totals.
    /// Always the current date, never retroactive.
    pub fn apply_meal(&mut self, today: &str, meal: MealEntry) {
        let day = self.ensure_day(today);
        day.calories_consumed += meal.calories;
        day.protein_consumed += meal.protein;
        day.carbs_consumed += meal.carbs;
        day.fat_consumed += meal.fat;
        day.meals.push(meal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(name: &str, calories: i64) -> MealEntry {
        MealEntry {
            name: name.to_string(),
            calories,
            protein: 10,
            carbs: 20,
            fat: 5,
        }
    }

    #[test]
    fn ensure_day_is_idempotent() {
        let mut profile = UserProfile::default();
        profile.apply_meal("2026-08-30", meal("Salade", 500));
        profile.ensure_day("2026-08-30");
        profile.ensure_day("2026-08-30");
        let day = &profile.days["2026-08-30"];
        assert_eq!(day.calories_consumed, 500);
        assert_eq!(day.meals.len(), 1);
    }

    #[test]
    fn meals_accumulate_monotonically_in_order() {
        let mut profile = UserProfile::default();
        profile.apply_meal("2026-08-30", meal("Poulet riz", 300));
        assert_eq!(profile.days["2026-08-30"].calories_consumed, 300);

        profile.apply_meal("2026-08-30", meal("Yaourt", 200));
        let day = &profile.days["2026-08-30"];
        assert_eq!(day.calories_consumed, 500);
        assert_eq!(day.protein_consumed, 20);
        assert_eq!(day.meals.len(), 2);
        assert_eq!(day.meals[0].name, "Poulet riz");
        assert_eq!(day.meals[1].name, "Yaourt");
    }

    #[test]
    fn meals_land_on_their_own_date() {
        let mut profile = UserProfile::default();
        profile.apply_meal("2026-08-29", meal("Dîner", 600));
        profile.apply_meal("2026-08-30", meal("Petit-déj", 400));
        assert_eq!(profile.days["2026-08-29"].calories_consumed, 600);
        assert_eq!(profile.days["2026-08-30"].calories_consumed, 400);
    }

    #[test]
    fn conversation_caps_at_twenty_dropping_oldest() {
        let mut profile = UserProfile::default();
        for i in 0..MAX_CONVERSATION_LEN {
            profile.push_message(ChatMessage::user(format!("msg {i}")));
        }
        assert_eq!(profile.conversation.len(), MAX_CONVERSATION_LEN);

        profile.push_message(ChatMessage::user("msg 20"));
        assert_eq!(profile.conversation.len(), MAX_CONVERSATION_LEN);
        // Entries 1..=19 of the original remain, plus the new one, in order
        assert_eq!(profile.conversation[0].content, "msg 1");
        assert_eq!(profile.conversation[18].content, "msg 19");
        assert_eq!(profile.conversation[19].content, "msg 20");
    }

    #[test]
    fn setup_applies_once() {
        let mut profile = UserProfile::default();
        assert!(profile.apply_setup(1800, 120, 200, 60, "Lea"));
        assert!(profile.setup_done);
        assert_eq!(profile.calories_target, 1800);
        assert_eq!(profile.first_name, "Lea");

        // Second application is a no-op
        assert!(!profile.apply_setup(2500, 180, 250, 90, "Max"));
        assert_eq!(profile.calories_target, 1800);
        assert_eq!(profile.first_name, "Lea");
    }

    #[test]
    fn pop_unanswered_only_removes_trailing_user_turn() {
        let mut profile = UserProfile::default();
        profile.push_message(ChatMessage::user("Salut"));
        profile.push_message(ChatMessage::assistant("Bonjour !"));
        profile.pop_unanswered_user_message();
        assert_eq!(profile.conversation.len(), 2);

        profile.push_message(ChatMessage::user("orphan"));
        profile.pop_unanswered_user_message();
        assert_eq!(profile.conversation.len(), 2);
        assert_eq!(profile.conversation[1].content, "Bonjour !");
    }

    #[test]
    fn profile_serde_roundtrip() {
        let mut profile = UserProfile::default();
        profile.apply_setup(2000, 150, 200, 70, "Lea");
        profile.push_message(ChatMessage::user("Salut"));
        profile.push_message(ChatMessage::assistant("Bonjour Lea !"));
        profile.apply_meal("2026-08-30", meal("Salade", 450));

        let json = serde_json::to_string(&profile).unwrap();
        let parsed: UserProfile = serde_json::from_str(&json).unwrap();

        assert!(parsed.setup_done);
        assert_eq!(parsed.first_name, "Lea");
        assert_eq!(parsed.conversation.len(), 2);
        assert_eq!(parsed.days["2026-08-30"].meals[0].name, "Salade");
    }

    #[test]
    fn legacy_profile_json_still_loads() {
        // Shape written by earlier flat-file deployments
        let json = r#"{
            "setup_done": true,
            "first_name": "Max",
            "calories_target": 2200,
            "protein_target": 160,
            "carbs_target": 220,
            "fat_target": 80,
            "conversation": [{"role": "user", "content": "Salut"}],
            "days": {"2026-08-29": {
                "calories_consumed": 650,
                "protein_consumed": 40,
                "carbs_consumed": 60,
                "fat_consumed": 20,
                "meals": [{"name": "Poulet riz", "calories": 650, "protein": 40, "carbs": 60, "fat": 20}]
            }}
        }"#;
        let parsed: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.calories_target, 2200);
        assert_eq!(parsed.conversation[0].role, Role::User);
        assert_eq!(parsed.days["2026-08-29"].meals.len(), 1);
    }
}
