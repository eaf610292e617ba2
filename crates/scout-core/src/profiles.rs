//! Candidate and profile records exchanged between discovery, fetch, and storage.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::niches::Niche;
use crate::CoreError;

/// Upper bound on the length of `top_posts` and `recent_posts_sample`.
pub const MAX_POSTS_PER_LIST: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Linkedin,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Instagram, Platform::Linkedin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
        }
    }

    /// Canonical profile URL for a handle on this platform.
    #[must_use]
    pub fn profile_url(self, handle: &str) -> String {
        let handle = handle.trim().trim_start_matches('@');
        match self {
            Platform::Instagram => format!("https://www.instagram.com/{handle}/"),
            Platform::Linkedin => format!("https://www.linkedin.com/in/{handle}/"),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "linkedin" => Ok(Platform::Linkedin),
            _ => Err(CoreError::UnknownPlatform(s.to_string())),
        }
    }
}

/// A discovered but not yet fetched profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub handle: String,
    pub platform: Platform,
    /// Natural key shared with the persisted creator row.
    pub profile_url: String,
    pub follower_hint: Option<i64>,
    pub niche_hint: Option<Niche>,
    pub discovered_at: DateTime<Utc>,
}

impl Candidate {
    /// Build a candidate whose profile URL is derived from the handle.
    #[must_use]
    pub fn new(platform: Platform, handle: &str) -> Self {
        let handle = handle.trim().trim_start_matches('@').to_string();
        Self {
            profile_url: platform.profile_url(&handle),
            handle,
            platform,
            follower_hint: None,
            niche_hint: None,
            discovered_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_follower_hint(mut self, followers: i64) -> Self {
        self.follower_hint = Some(followers);
        self
    }

    #[must_use]
    pub fn with_niche_hint(mut self, niche: Niche) -> Self {
        self.niche_hint = Some(niche);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub url: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub caption: Option<String>,
    /// `(likes + comments) / followers`, clamped to `[0, 1]`.
    pub engagement_rate: Option<f64>,
}

impl Post {
    /// Likes plus comments, treating missing counts as zero.
    #[must_use]
    pub fn interactions(&self) -> i64 {
        self.likes
            .unwrap_or(0)
            .saturating_add(self.comments.unwrap_or(0))
    }
}

/// A normalized creator profile. `profile_url` is the sole natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub source: Platform,
    pub profile_url: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub niche: Option<Niche>,
    pub public_contact_email: Option<String>,
    pub location: Option<String>,
    pub follower_count: Option<i64>,
    pub following_count: Option<i64>,
    pub post_count: Option<i64>,
    pub engagement_rate: Option<f64>,
    /// Highest-engagement posts first.
    pub top_posts: Vec<Post>,
    /// Newest posts first.
    pub recent_posts_sample: Vec<Post>,
    pub avatar_url: Option<String>,
    pub raw: Option<serde_json::Value>,
    pub scraped_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// An otherwise empty record for `profile_url`, stamped now.
    #[must_use]
    pub fn new(source: Platform, profile_url: impl Into<String>) -> Self {
        Self {
            source,
            profile_url: profile_url.into(),
            handle: None,
            display_name: None,
            bio: None,
            niche: None,
            public_contact_email: None,
            location: None,
            follower_count: None,
            following_count: None,
            post_count: None,
            engagement_rate: None,
            top_posts: Vec::new(),
            recent_posts_sample: Vec::new(),
            avatar_url: None,
            raw: None,
            scraped_at: Utc::now(),
        }
    }

    /// Bio plus every known caption, newline-joined, for classification.
    #[must_use]
    pub fn classifier_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(bio) = self.bio.as_deref() {
            parts.push(bio);
        }
        for post in self.top_posts.iter().chain(&self.recent_posts_sample) {
            if let Some(caption) = post.caption.as_deref() {
                parts.push(caption);
            }
        }
        parts.join("\n")
    }
}

/// Engagement of a single post relative to the audience size.
///
/// Returns `None` when `followers` is missing or not positive.
#[must_use]
pub fn post_engagement_rate(post: &Post, followers: Option<i64>) -> Option<f64> {
    let followers = followers.filter(|f| *f > 0)?;
    #[allow(clippy::cast_precision_loss)]
    let rate = post.interactions() as f64 / followers as f64;
    Some(rate.clamp(0.0, 1.0))
}

/// Average engagement across `posts`: total interactions over
/// `followers × posts`, clamped to `[0, 1]`.
#[must_use]
pub fn engagement_rate_for(posts: &[Post], followers: Option<i64>) -> Option<f64> {
    let followers = followers.filter(|f| *f > 0)?;
    if posts.is_empty() {
        return None;
    }
    let total: i64 = posts.iter().map(Post::interactions).sum();
    #[allow(clippy::cast_precision_loss)]
    let rate = total as f64 / (followers as f64 * posts.len() as f64);
    Some(rate.clamp(0.0, 1.0))
}
