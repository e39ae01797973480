// Orchestration: one submission at a time through dispatch, extract, reply, record
use crate::config::BotConfig;
use crate::feed::FeedSource;
use crate::model::{BotError, FeedError, ProductObservation, Submission};
use crate::storage::ObservationStore;
use crate::stores::StoreRegistry;
use crate::supervisor::RunLoop;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SeenThisSession,
    AlreadyRecorded,
    NoAdapter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Recorded { replied: bool },
}

const MAX_RATE_LIMIT_WAIT_MINUTES: u64 = 60;

/// Minutes to wait before retrying a rate-limited reply.
///
/// "...try again in 7 minutes." waits 8; anything mentioning seconds, or with
/// no number at all, waits 1. Never more than an hour.
pub fn rate_limit_wait(message: &str) -> Duration {
    let minutes = if message.contains("seconds") {
        1
    } else {
        message
            .split_whitespace()
            .find_map(|token| token.parse::<u64>().ok())
            .map(|n| n.saturating_add(1).min(MAX_RATE_LIMIT_WAIT_MINUTES))
            .unwrap_or(1)
    };
    Duration::from_secs(minutes * 60)
}

pub struct Bot<F, S> {
    feed: F,
    store: S,
    registry: StoreRegistry,
    config: BotConfig,
    /// Submissions handed to an adapter since the process started.
    seen_this_session: HashSet<String>,
}

impl<F: FeedSource, S: ObservationStore> Bot<F, S> {
    pub fn new(feed: F, store: S, registry: StoreRegistry, config: BotConfig) -> Self {
        Self {
            feed,
            store,
            registry,
            config,
            seen_this_session: HashSet::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Streams submissions until the feed ends or something fails.
    pub async fn run(&mut self) -> Result<(), BotError> {
        info!("streaming...");
        while let Some(submission) = self.feed.next_submission().await? {
            info!("found {}: {}", submission.id, submission.title);
            if let Outcome::Recorded { .. } = self.process_submission(&submission).await? {
                sleep(self.config.pause()).await;
            }
            info!("waiting for next submission...");
        }
        info!("feed ended");
        Ok(())
    }

    pub async fn process_submission(&mut self, submission: &Submission) -> Result<Outcome, BotError> {
        if self.seen_this_session.contains(&submission.id) {
            info!("{} already handled this session", submission.id);
            return Ok(Outcome::Skipped(SkipReason::SeenThisSession));
        }

        if self.store.exists(&submission.id)? {
            info!("post already replied to");
            return Ok(Outcome::Skipped(SkipReason::AlreadyRecorded));
        }

        let Some((site_name, adapter)) = self.registry.resolve(&submission.url) else {
            return Ok(Outcome::Skipped(SkipReason::NoAdapter));
        };
        let site_name = site_name.to_string();

        // Marked before extraction so a poisoned page can't crash-loop the supervisor.
        self.seen_this_session.insert(submission.id.clone());

        info!("gathering data...");
        let output = adapter.run(&submission.url).await?;

        let replied = match &output.markdown {
            Some(markdown) => self.reply_with_retry(submission, markdown).await,
            None => {
                info!("skipping reply, no comment body");
                false
            }
        };

        let observation = ProductObservation::new(submission, output.details, &site_name);
        self.store.insert(&observation)?;

        Ok(Outcome::Recorded { replied })
    }

    /// Retries only on rate limiting, at most `max_reply_retries` times.
    /// Any other failure is logged and the reply is given up.
    async fn reply_with_retry(&mut self, submission: &Submission, markdown: &str) -> bool {
        let mut retries = 0;
        loop {
            match self.feed.reply(submission, markdown).await {
                Ok(()) => return true,
                Err(FeedError::RateLimited { message }) if retries < self.config.max_reply_retries => {
                    retries += 1;
                    let wait = rate_limit_wait(&message);
                    warn!(
                        "Rate limited ({}), waiting {} mins before retry {}",
                        message,
                        wait.as_secs() / 60,
                        retries
                    );
                    sleep(wait).await;
                }
                Err(e) => {
                    error!("Reply to {} failed: {}", submission.id, e);
                    return false;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl<F, S> RunLoop for Bot<F, S>
where
    F: FeedSource,
    S: ObservationStore + Send,
{
    async fn run(&mut self) -> Result<(), BotError> {
        Bot::run(self).await
    }
}
