//! Browse and fetch collaborators backed by the extraction service client.

use std::sync::Arc;

use async_trait::async_trait;
use scout_core::{Candidate, ProfileRecord};
use scout_extract::{candidate_from_feed_item, ExtractClient};

use crate::error::SourceError;
use crate::traits::{BrowseBatch, BrowseSession, BrowseSource, ProfileFetcher};

pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Clone)]
pub struct ExtractBrowseSource {
    client: Arc<ExtractClient>,
    page_size: u32,
}

impl ExtractBrowseSource {
    #[must_use]
    pub fn new(client: Arc<ExtractClient>) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl BrowseSource for ExtractBrowseSource {
    async fn next_batch(&self, session: &mut BrowseSession) -> Result<BrowseBatch, SourceError> {
        if session.exhausted {
            return Ok(BrowseBatch::EndOfFeed);
        }

        let page = self
            .client
            .fetch_feed_page(session.platform, session.cursor.as_deref(), self.page_size)
            .await?;

        session.cursor = page.next_cursor;
        if page.end_of_feed || session.cursor.is_none() {
            session.exhausted = true;
        }

        let candidates: Vec<Candidate> = page
            .items
            .iter()
            .filter_map(|item| candidate_from_feed_item(session.platform, item))
            .collect();

        if candidates.is_empty() && session.exhausted {
            return Ok(BrowseBatch::EndOfFeed);
        }
        Ok(BrowseBatch::Candidates(candidates))
    }
}

#[derive(Clone)]
pub struct ExtractProfileFetcher {
    client: Arc<ExtractClient>,
}

impl ExtractProfileFetcher {
    #[must_use]
    pub fn new(client: Arc<ExtractClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileFetcher for ExtractProfileFetcher {
    async fn fetch_profile(&self, candidate: &Candidate) -> Result<ProfileRecord, SourceError> {
        let mut record = self
            .client
            .fetch_profile(candidate.platform, &candidate.handle)
            .await?;
        // The discovered URL is the dedup key; keep persisted rows on it.
        record.profile_url.clone_from(&candidate.profile_url);
        Ok(record)
    }
}
