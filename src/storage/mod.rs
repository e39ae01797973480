pub mod sqlite;

use crate::model::{ProductObservation, StorageError};

pub use sqlite::{SessionMode, SqliteStorage};

/// What the bot needs from persistence. Each call is its own transaction.
pub trait ObservationStore {
    fn exists(&self, submission_id: &str) -> Result<bool, StorageError>;

    /// Fails with `StorageError::Duplicate` if the submission is already recorded.
    fn insert(&self, obs: &ProductObservation) -> Result<(), StorageError>;
}
