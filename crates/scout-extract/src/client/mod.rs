//! HTTP client for the extraction service that browses feeds and renders
//! profile pages into JSON.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Response};
use serde::Deserialize;
use scout_core::{Platform, ProfileRecord};

use crate::error::ExtractError;
use crate::normalize::normalize_profile;
use crate::types::{FeedPage, RawProfile};

/// Handles keep `.`, `_` and `-` literal so paths stay readable in logs.
const HANDLE_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-');

/// Fallback when a 429 carries no parseable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for the extraction service.
///
/// Maps 429 to [`ExtractError::RateLimited`], 404 to
/// [`ExtractError::NotFound`], 401/403 to [`ExtractError::Private`], and any
/// other non-2xx status to [`ExtractError::UnexpectedStatus`]. The client
/// never retries; callers decide using [`ExtractError::is_transient`].
pub struct ExtractClient {
    client: Client,
    base_url: String,
    keep_raw: bool,
}

impl ExtractClient {
    /// Creates a client with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL, or [`ExtractError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ExtractError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| ExtractError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            keep_raw: false,
        })
    }

    /// Attach the unmodified JSON payload to every fetched [`ProfileRecord`].
    #[must_use]
    pub fn with_raw_payloads(mut self, keep_raw: bool) -> Self {
        self.keep_raw = keep_raw;
        self
    }

    /// Fetches one page of the browse feed for `platform`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::RateLimited`] on HTTP 429.
    /// - [`ExtractError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ExtractError::Http`] on network or timeout failure.
    /// - [`ExtractError::Deserialize`] if the body is not a feed page.
    pub async fn fetch_feed_page(
        &self,
        platform: Platform,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<FeedPage, ExtractError> {
        let mut url = self.endpoint(&format!("feed/{}", platform.as_str()))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", cursor);
        }
        let url = url.to_string();

        tracing::debug!(%platform, url = %url, "fetching feed page");
        let response = self.get(&url).await?;
        let body = response.text().await?;
        serde_json::from_str::<FeedPage>(&body).map_err(|e| ExtractError::Deserialize {
            context: format!("{platform} feed page"),
            source: e,
        })
    }

    /// Fetches and normalizes one profile.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NotFound`] / [`ExtractError::Private`] for missing
    ///   or inaccessible profiles.
    /// - [`ExtractError::RateLimited`], [`ExtractError::UnexpectedStatus`],
    ///   [`ExtractError::Http`] as for [`Self::fetch_feed_page`].
    /// - [`ExtractError::Deserialize`] or [`ExtractError::Normalization`] if
    ///   the payload cannot be turned into a record.
    pub async fn fetch_profile(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<ProfileRecord, ExtractError> {
        let segment = utf8_percent_encode(handle.trim_start_matches('@'), HANDLE_SEGMENT);
        let url = self
            .endpoint(&format!("profiles/{}/{segment}", platform.as_str()))?
            .to_string();

        tracing::debug!(%platform, handle, url = %url, "fetching profile");
        let response = self.get(&url).await?;
        let body = response.text().await?;

        let context = || format!("{platform} profile {handle}");
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
                context: context(),
                source: e,
            })?;
        let raw = RawProfile::deserialize(&value).map_err(|e| ExtractError::Deserialize {
            context: context(),
            source: e,
        })?;

        let payload = self.keep_raw.then_some(value);
        normalize_profile(platform, handle, raw, payload)
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, ExtractError> {
        let joined = format!("{}/{path}", self.base_url);
        reqwest::Url::parse(&joined).map_err(|e| ExtractError::InvalidBaseUrl {
            base_url: self.base_url.clone(),
            reason: format!("cannot build \"{joined}\": {e}"),
        })
    }

    async fn get(&self, url: &str) -> Result<Response, ExtractError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        check_status(response, url)
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, ExtractError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(ExtractError::RateLimited { retry_after_secs });
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ExtractError::NotFound {
            url: url.to_owned(),
        });
    }

    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ExtractError::Private {
            url: url.to_owned(),
        });
    }

    if !status.is_success() {
        return Err(ExtractError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    Ok(response)
}
