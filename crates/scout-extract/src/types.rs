//! Wire types for the extraction service.
//!
//! Counts arrive either as JSON numbers or as the abbreviated strings shown on
//! profile pages (`"12.5K"`), so every count field goes through [`CountValue`].
//! Unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::parse::parse_human_number;

/// A count that may be numeric or a human-formatted string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CountValue {
    /// Non-negative integer value, if one can be recovered.
    #[must_use]
    pub fn to_count(&self) -> Option<i64> {
        let value = match self {
            CountValue::Int(n) => Some(*n),
            #[allow(clippy::cast_possible_truncation)]
            CountValue::Float(f) if f.is_finite() => Some(f.round() as i64),
            CountValue::Float(_) => None,
            CountValue::Text(s) => parse_human_number(s),
        };
        value.filter(|n| *n >= 0)
    }
}

pub(crate) fn count(value: Option<&CountValue>) -> Option<i64> {
    value.and_then(CountValue::to_count)
}

/// Response from `GET /feed/{platform}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub items: Vec<FeedItem>,
    /// Opaque cursor for the next page; absent on the last page.
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub end_of_feed: bool,
}

/// One creator surfaced while browsing. At least one of `handle` and
/// `profile_url` must be usable for the item to become a candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub follower_count: Option<CountValue>,
    /// Free-form label; only values naming a known niche become hints.
    #[serde(default)]
    pub niche: Option<String>,
}

/// Response from `GET /profiles/{platform}/{handle}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub followers_count: Option<CountValue>,
    #[serde(default)]
    pub follows_count: Option<CountValue>,
    #[serde(default)]
    pub media_count: Option<CountValue>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub business_email: Option<String>,
    /// Pre-computed by the service for some platforms.
    #[serde(default)]
    pub engagement_rate: Option<f64>,
    #[serde(default)]
    pub posts: Vec<RawPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    #[serde(default, alias = "permalink")]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, alias = "video_view_count")]
    pub view_count: Option<CountValue>,
    #[serde(default)]
    pub like_count: Option<CountValue>,
    #[serde(default, alias = "comments_count")]
    pub comment_count: Option<CountValue>,
    #[serde(default)]
    pub caption: Option<String>,
}
