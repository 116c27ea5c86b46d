use std::time::Duration;

use bon::Builder;
use url::{ParseError, Url};

#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Log label.
    #[builder(default = String::from("ledger"), into)]
    pub(crate) label: String,

    /// API base URL, e.g. `http://localhost:3000/api/`.
    ///
    /// Paths are joined relative to it, so it should end with a slash.
    #[builder(with = |s: &str| -> Result<_, ParseError> { Url::parse(s) })]
    pub(crate) base_url: Url,

    /// Per-request timeout.
    #[builder(default = Duration::from_secs(30))]
    pub(crate) timeout: Duration,

    #[builder(default = false)]
    pub(crate) https_only: bool,
}

impl Config {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
