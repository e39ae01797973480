pub mod reddit;

use crate::model::{FeedError, Submission};

pub use reddit::RedditFeed;

/// The submission stream plus the one write the bot makes back to it.
#[async_trait::async_trait]
pub trait FeedSource: Send {
    /// Waits for the next unseen submission. `None` means the stream ended.
    async fn next_submission(&mut self) -> Result<Option<Submission>, FeedError>;

    /// Posts `text` as a reply. Rate limiting surfaces as `FeedError::RateLimited`.
    async fn reply(&mut self, submission: &Submission, text: &str) -> Result<(), FeedError>;
}
