// Reddit feed: OAuth password grant, polling /new, posting comments
use crate::config::FeedConfig;
use crate::feed::FeedSource;
use crate::model::{FeedError, Submission};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How many submission ids are remembered to suppress re-delivery.
const SEEN_WINDOW: usize = 1000;
/// Refresh the token this long before Reddit says it expires.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: Link,
}

#[derive(Debug, Deserialize)]
struct Link {
    id: String,
    title: String,
    url: String,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentJson,
}

#[derive(Debug, Deserialize)]
struct CommentJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditFeed {
    client: Client,
    config: FeedConfig,
    subreddit: String,
    token: Option<AccessToken>,
    buffer: VecDeque<Submission>,
    seen: HashSet<String>,
    seen_order: VecDeque<String>,
}

impl RedditFeed {
    pub fn new(config: FeedConfig, subreddit: &str) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()?;

        info!("initializing on {}...", subreddit);
        Ok(Self {
            client,
            config,
            subreddit: subreddit.to_string(),
            token: None,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            seen_order: VecDeque::new(),
        })
    }

    async fn access_token(&mut self) -> Result<String, FeedError> {
        if let Some(token) = &self.token {
            if Instant::now() + TOKEN_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting access token");
        let url = format!("{}/api/v1/access_token", self.config.auth_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FeedError::Unreachable(format!("token endpoint returned {}", status)));
        }
        if !status.is_success() {
            return Err(FeedError::Auth(format!("token endpoint returned {}", status)));
        }

        let body: TokenResponse = serde_json::from_str(&response.text().await?)?;
        let value = match (body.access_token, body.error) {
            (Some(token), None) => token,
            (_, Some(error)) => return Err(FeedError::Auth(error)),
            (None, None) => return Err(FeedError::Auth("no access token in response".into())),
        };

        let expires_at = Instant::now() + Duration::from_secs(body.expires_in.unwrap_or(3600));
        self.token = Some(AccessToken { value: value.clone(), expires_at });
        Ok(value)
    }

    fn remember(&mut self, id: &str) -> bool {
        if !self.seen.insert(id.to_string()) {
            return false;
        }
        self.seen_order.push_back(id.to_string());
        if self.seen_order.len() > SEEN_WINDOW {
            if let Some(old) = self.seen_order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }

    /// Fetches the newest submissions and queues the unseen ones, oldest first.
    async fn poll(&mut self) -> Result<(), FeedError> {
        let token = self.access_token().await?;
        let url = format!("{}/r/{}/new", self.config.api_url, self.subreddit);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", self.config.listing_limit.to_string()), ("raw_json", "1".into())])
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FeedError::Unreachable(format!("listing returned {}", status)));
        }
        if status == StatusCode::UNAUTHORIZED {
            self.token = None;
            return Err(FeedError::Auth("listing rejected the access token".into()));
        }
        if !status.is_success() {
            return Err(FeedError::Api(format!("listing returned {}", status)));
        }

        let listing: Listing = serde_json::from_str(&response.text().await?)?;
        for thing in listing.data.children.into_iter().rev() {
            let link = thing.data;
            if !self.remember(&link.id) {
                continue;
            }
            let created_at = DateTime::<Utc>::from_timestamp(link.created_utc as i64, 0)
                .unwrap_or_else(Utc::now);
            self.buffer.push_back(Submission {
                id: link.id,
                title: link.title,
                url: link.url,
                created_at,
            });
        }
        Ok(())
    }
}

/// First entry of Reddit's `json.errors`, as `(code, message)`.
fn first_error(errors: &[Vec<serde_json::Value>]) -> Option<(String, String)> {
    let entry = errors.first()?;
    let field = |i: usize| {
        entry
            .get(i)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    Some((field(0), field(1)))
}

#[async_trait::async_trait]
impl FeedSource for RedditFeed {
    async fn next_submission(&mut self) -> Result<Option<Submission>, FeedError> {
        loop {
            if let Some(submission) = self.buffer.pop_front() {
                return Ok(Some(submission));
            }
            self.poll().await?;
            if self.buffer.is_empty() {
                sleep(Duration::from_secs(self.config.poll_interval_seconds)).await;
            }
        }
    }

    async fn reply(&mut self, submission: &Submission, text: &str) -> Result<(), FeedError> {
        info!("attempting reply...");
        let token = self.access_token().await?;
        let url = format!("{}/api/comment", self.config.api_url);
        let thing_id = format!("t3_{}", submission.id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .form(&[("api_type", "json"), ("thing_id", thing_id.as_str()), ("text", text)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited {
                message: "you are doing that too much. try again in a few seconds.".into(),
            });
        }
        if status.is_server_error() {
            return Err(FeedError::Unreachable(format!("comment returned {}", status)));
        }
        if !status.is_success() {
            warn!("Comment rejected [{}]: {}", status, body);
            return Err(FeedError::Api(format!("comment returned {}", status)));
        }

        let parsed: CommentResponse = serde_json::from_str(&body)?;
        match first_error(&parsed.json.errors) {
            Some((code, message)) if code == "RATELIMIT" => Err(FeedError::RateLimited { message }),
            Some((code, message)) => Err(FeedError::Api(format!("{}: {}", code, message))),
            None => {
                info!("replied");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_error_reads_code_and_message() {
        let errors = vec![vec![
            json!("RATELIMIT"),
            json!("you are doing that too much. try again in 7 minutes."),
            json!("ratelimit"),
        ]];
        assert_eq!(
            first_error(&errors),
            Some(("RATELIMIT".into(), "you are doing that too much. try again in 7 minutes.".into()))
        );
        assert_eq!(first_error(&[]), None);
    }

    #[test]
    fn seen_window_is_bounded() {
        let config: FeedConfig = serde_json::from_value(json!({
            "client_id": "id", "client_secret": "s", "username": "u", "password": "p"
        }))
        .unwrap();
        let mut feed = RedditFeed::new(config, "buildapcsales").unwrap();
        assert!(feed.remember("a"));
        assert!(!feed.remember("a"));
        for i in 0..SEEN_WINDOW {
            feed.remember(&format!("id{i}"));
        }
        assert_eq!(feed.seen.len(), SEEN_WINDOW);
        assert!(feed.remember("a"));
    }
}
