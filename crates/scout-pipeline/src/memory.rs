//! In-process [`CreatorStore`] used by dry runs and tests.
//!
//! Merge rules mirror the Postgres upsert: a `None` field never erases a
//! stored value, and an empty post list keeps the stored list.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use scout_core::{Candidate, ProfileRecord};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::traits::{CreatorStore, UpsertStatus};
use crate::types::CycleStats;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ProfileRecord>>,
    discovered: Mutex<Vec<Candidate>>,
    cycles: Mutex<Vec<CycleStats>>,
    fail_lookups: AtomicBool,
    fail_upserts: AtomicBool,
    lookup_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing merge rules.
    pub async fn seed(&self, record: ProfileRecord) {
        self.records
            .lock()
            .await
            .insert(record.profile_url.clone(), record);
    }

    /// Make `existing_keys` fail until switched off.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make `upsert` fail until switched off.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, profile_url: &str) -> Option<ProfileRecord> {
        self.records.lock().await.get(profile_url).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Every stored record, ordered by profile URL.
    pub async fn records(&self) -> Vec<ProfileRecord> {
        let mut all: Vec<ProfileRecord> = self.records.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.profile_url.cmp(&b.profile_url));
        all
    }

    pub async fn discovered(&self) -> Vec<Candidate> {
        self.discovered.lock().await.clone()
    }

    pub async fn cycles(&self) -> Vec<CycleStats> {
        self.cycles.lock().await.clone()
    }
}

fn merge(stored: &mut ProfileRecord, incoming: &ProfileRecord) {
    fn keep<T: Clone>(slot: &mut Option<T>, incoming: Option<&T>) {
        if let Some(value) = incoming {
            *slot = Some(value.clone());
        }
    }

    stored.source = incoming.source;
    keep(&mut stored.handle, incoming.handle.as_ref());
    keep(&mut stored.display_name, incoming.display_name.as_ref());
    keep(&mut stored.bio, incoming.bio.as_ref());
    keep(&mut stored.niche, incoming.niche.as_ref());
    keep(
        &mut stored.public_contact_email,
        incoming.public_contact_email.as_ref(),
    );
    keep(&mut stored.location, incoming.location.as_ref());
    keep(&mut stored.follower_count, incoming.follower_count.as_ref());
    keep(&mut stored.following_count, incoming.following_count.as_ref());
    keep(&mut stored.post_count, incoming.post_count.as_ref());
    keep(&mut stored.engagement_rate, incoming.engagement_rate.as_ref());
    keep(&mut stored.avatar_url, incoming.avatar_url.as_ref());
    keep(&mut stored.raw, incoming.raw.as_ref());
    if !incoming.top_posts.is_empty() {
        stored.top_posts.clone_from(&incoming.top_posts);
    }
    if !incoming.recent_posts_sample.is_empty() {
        stored
            .recent_posts_sample
            .clone_from(&incoming.recent_posts_sample);
    }
    stored.scraped_at = incoming.scraped_at;
}

#[async_trait]
impl CreatorStore for MemoryStore {
    async fn existing_keys(&self, profile_urls: &[String]) -> Result<HashSet<String>, StoreError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("lookup disabled".to_string()));
        }
        let records = self.records.lock().await;
        Ok(profile_urls
            .iter()
            .filter(|url| records.contains_key(url.as_str()))
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<UpsertStatus, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("upsert disabled".to_string()));
        }
        let mut records = self.records.lock().await;
        match records.get_mut(&record.profile_url) {
            Some(stored) => {
                merge(stored, record);
                Ok(UpsertStatus::Updated)
            }
            None => {
                records.insert(record.profile_url.clone(), record.clone());
                Ok(UpsertStatus::Inserted)
            }
        }
    }

    async fn record_discovered(&self, candidates: &[Candidate]) -> Result<(), StoreError> {
        self.discovered.lock().await.extend_from_slice(candidates);
        Ok(())
    }

    async fn record_cycle(&self, stats: &CycleStats) -> Result<(), StoreError> {
        self.cycles.lock().await.push(stats.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scout_core::{Platform, Post};

    use super::*;

    const URL: &str = "https://www.instagram.com/fit.jane/";

    #[tokio::test]
    async fn none_fields_do_not_erase_stored_values() {
        let store = MemoryStore::new();
        let mut first = ProfileRecord::new(Platform::Instagram, URL);
        first.bio = Some("gym".to_string());
        first.follower_count = Some(5_000);
        first.top_posts = vec![Post {
            url: "https://www.instagram.com/p/1/".to_string(),
            timestamp: None,
            views: None,
            likes: Some(10),
            comments: Some(1),
            caption: None,
            engagement_rate: None,
        }];
        assert_eq!(store.upsert(&first).await.unwrap(), UpsertStatus::Inserted);

        let mut second = ProfileRecord::new(Platform::Instagram, URL);
        second.follower_count = Some(6_000);
        assert_eq!(store.upsert(&second).await.unwrap(), UpsertStatus::Updated);

        let stored = store.get(URL).await.unwrap();
        assert_eq!(stored.bio.as_deref(), Some("gym"));
        assert_eq!(stored.follower_count, Some(6_000));
        assert_eq!(stored.top_posts.len(), 1);
        assert_eq!(stored.scraped_at, second.scraped_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn failure_toggles_surface_as_unavailable() {
        let store = MemoryStore::new();
        store.fail_upserts(true);
        let err = store
            .upsert(&ProfileRecord::new(Platform::Instagram, URL))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.is_empty().await);
        assert_eq!(store.upsert_calls(), 1);
    }
}
