//! Clients for the two off-chain collaborators of the tip jar: the tip
//! ledger, which records metadata about on-chain tips, and the content
//! store that serves the posts being tipped.

mod config;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json as json;
use tipjar_types::{Post, PostDraft, TipRecord};
use tracing::{debug, warn};

pub use config::{Config, ConfigBuilder};
pub use reqwest::StatusCode;

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Append-only record of tips.
#[async_trait]
pub trait TipLedger: Send + Sync {
    /// Store a record, returning it as stored (with id and creation time).
    async fn append(&self, tip: &TipRecord) -> Result<TipRecord, LedgerError>;

    /// Tips for one post, newest first.
    async fn list_by_post(&self, post_id: &str) -> Result<Vec<TipRecord>, LedgerError>;

    /// All tips, newest first.
    async fn list_all(&self) -> Result<Vec<TipRecord>, LedgerError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Published posts, newest first.
    async fn list_published(&self) -> Result<Vec<Post>, LedgerError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, LedgerError>;

    /// Fails with [`LedgerError::SlugTaken`] if the slug is in use.
    async fn create(&self, draft: &PostDraft) -> Result<Post, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("slug {0:?} is already taken")]
    SlugTaken(String),

    #[error("api status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] json::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
}

/// Error body the API sends along with a failure status.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the tip ledger and the content store.
#[derive(Debug, Clone)]
pub struct Client {
    config: Config,
    client: reqwest::Client,
}

impl Client {
    pub fn new(c: Config) -> Result<Self, LedgerError> {
        let r = reqwest::Client::builder()
            .https_only(c.https_only)
            .timeout(c.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            config: c,
            client: r,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn url(&self, path: &str) -> Result<Url, LedgerError> {
        Ok(self.config.base_url.join(path)?)
    }

    async fn get<A>(&self, url: Url) -> Result<A, LedgerError>
    where
        A: DeserializeOwned,
    {
        debug!(node = %self.config.label, %url, "get");
        let res = self.client.get(url).send().await?;
        decode(check(res).await?).await
    }

    async fn post<A, B>(&self, url: Url, a: &A) -> Result<B, LedgerError>
    where
        A: Serialize,
        B: DeserializeOwned,
    {
        debug!(node = %self.config.label, %url, "post");
        let res = self.client.post(url).json(a).send().await?;
        decode(check(res).await?).await
    }
}

/// Turn a failure status into an error, keeping the API's message.
async fn check(res: Response) -> Result<Response, LedgerError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    let message = match json::from_str::<ErrorBody>(&text) {
        Ok(b) => b.error,
        Err(_) => text,
    };
    Err(LedgerError::Status { status, message })
}

async fn decode<A: DeserializeOwned>(res: Response) -> Result<A, LedgerError> {
    let bytes = res.bytes().await?;
    Ok(json::from_slice(&bytes)?)
}

#[async_trait]
impl TipLedger for Client {
    async fn append(&self, tip: &TipRecord) -> Result<TipRecord, LedgerError> {
        let missing = tip.missing_fields();
        if !missing.is_empty() {
            return Err(LedgerError::MissingFields(missing));
        }
        let url = self.url("tips")?;
        match self.post(url.clone(), tip).await {
            Ok(t) => Ok(t),
            Err(err) => {
                warn!(node = %self.config.label, %url, %err, tx = %tip.transaction_hash, "failed to record tip");
                Err(err)
            }
        }
    }

    async fn list_by_post(&self, post_id: &str) -> Result<Vec<TipRecord>, LedgerError> {
        let mut url = self.url("tips")?;
        url.query_pairs_mut().append_pair("postId", post_id);
        self.get(url).await
    }

    async fn list_all(&self) -> Result<Vec<TipRecord>, LedgerError> {
        let url = self.url("tips")?;
        self.get(url).await
    }
}

#[async_trait]
impl ContentStore for Client {
    async fn list_published(&self) -> Result<Vec<Post>, LedgerError> {
        let url = self.url("posts")?;
        let posts: Vec<Post> = self.get(url).await?;
        Ok(posts.into_iter().filter(|p| p.is_published).collect())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, LedgerError> {
        let mut url = self.url("posts/")?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(slug);
        match self.get(url).await {
            Ok(p) => Ok(Some(p)),
            Err(LedgerError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create(&self, draft: &PostDraft) -> Result<Post, LedgerError> {
        let url = self.url("posts")?;
        match self.post(url, draft).await {
            Err(LedgerError::Status {
                status: StatusCode::CONFLICT,
                ..
            }) => Err(LedgerError::SlugTaken(draft.slug.clone())),
            other => other,
        }
    }
}
