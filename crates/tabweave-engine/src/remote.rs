//! REST client for the remote queue: pull pending pipelines, confirm
//! ownership, persist run history, and save recorded selectors.

use async_trait::async_trait;
use tabweave_common::protocol::{Pipeline, SequenceResult};
use tabweave_common::selector::Selector;
use thiserror::Error;
use tracing::debug;
use url::Url;

const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("invalid server url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// The queue operations the run loop depends on.
#[async_trait]
pub trait RunQueue: Send + Sync {
    /// The next pending pipeline, or `None` when the queue is empty or
    /// unreachable.
    async fn fetch_next(&self) -> Result<Option<Pipeline>, QueueError>;

    /// Ask the server to confirm this instance owns the claimed pipeline.
    async fn confirm(&self, id: &str) -> Result<bool, QueueError>;

    /// Persist a completed run.
    async fn save_result(&self, result: &SequenceResult) -> Result<(), QueueError>;
}

pub struct RemoteQueue {
    base: Url,
    client: reqwest::Client,
}

impl RemoteQueue {
    pub fn new(mut base: Url) -> Self {
        // Joining relative paths needs a trailing slash on the base.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            base,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_str(base: &str) -> Result<Self, QueueError> {
        Ok(Self::new(Url::parse(base)?))
    }

    fn endpoint(&self, path: &str) -> Result<Url, QueueError> {
        Ok(self.base.join(path)?)
    }

    /// Every pipeline currently queued, pending or not.
    pub async fn fetch_all(&self) -> Result<Vec<Pipeline>, QueueError> {
        let endpoint = self.endpoint("execution/queue/all")?;
        let response = self.client.get(endpoint.clone()).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Announce this extension instance to the server.
    pub async fn register(&self, instance_id: &str) -> Result<(), QueueError> {
        let endpoint = self.endpoint(&format!("register/{instance_id}"))?;
        let response = self.client.put(endpoint.clone()).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Persist a recorded selector; a blank id becomes the nil id so the
    /// server assigns a fresh one.
    pub async fn save_selector(&self, selector: &Selector) -> Result<(), QueueError> {
        let mut body = selector.clone();
        if body.id.is_empty() {
            body.id = NIL_ID.to_string();
        }
        let endpoint = self.endpoint("selectors")?;
        let response = self.client.put(endpoint.clone()).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RunQueue for RemoteQueue {
    async fn fetch_next(&self) -> Result<Option<Pipeline>, QueueError> {
        let endpoint = self.endpoint("execution/queue/first")?;
        let response = self.client.get(endpoint).send().await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "run queue has nothing for us");
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    async fn confirm(&self, id: &str) -> Result<bool, QueueError> {
        let endpoint = self.endpoint(&format!("execution/queue/confirmation/{id}"))?;
        let response = self.client.get(endpoint).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let echoed: String = response.json().await?;
        Ok(echoed == id)
    }

    async fn save_result(&self, result: &SequenceResult) -> Result<(), QueueError> {
        let endpoint = self.endpoint("history/")?;
        let response = self
            .client
            .put(endpoint.clone())
            .json(result)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QueueError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
