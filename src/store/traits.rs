//! Storage-agnostic persistence interface.
//!
//! The core reads and writes whole profile objects per user key; it never
//! assumes partial-field updates are safe. Serializing access per user is
//! the orchestrator's job, not the store's.

use async_trait::async_trait;

use crate::coach::model::UserProfile;
use crate::error::StorageError;

/// Whole-object profile storage keyed by an opaque user identifier.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a user's profile, or `None` if they have never been seen.
    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, StorageError>;

    /// Overwrite a user's profile with the given object.
    async fn save(&self, user_id: &str, profile: &UserProfile) -> Result<(), StorageError>;

    /// Delete a user's profile. Returns whether a profile existed.
    /// Deleting an absent user is not an error.
    async fn delete(&self, user_id: &str) -> Result<bool, StorageError>;
}
