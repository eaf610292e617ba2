//! Conversion from extraction-service payloads to domain types.

use std::cmp::Ordering;

use chrono::Utc;
use scout_core::{
    engagement_rate_for, post_engagement_rate, Candidate, Niche, Platform, Post, ProfileRecord,
};

use crate::error::ExtractError;
use crate::parse::{extract_email, parse_handle};
use crate::types::{count, FeedItem, RawPost, RawProfile};

/// Posts kept in `top_posts`, ranked by per-post engagement.
pub const TOP_POSTS: usize = 3;
/// Posts kept in `recent_posts_sample`, newest first.
pub const RECENT_POSTS: usize = 5;

/// Turns a feed item into a candidate, or `None` when no usable handle can be
/// recovered from either the `handle` or `profile_url` field.
#[must_use]
pub fn candidate_from_feed_item(platform: Platform, item: &FeedItem) -> Option<Candidate> {
    let handle = item
        .handle
        .as_deref()
        .and_then(|h| parse_handle(platform, h))
        .or_else(|| {
            item.profile_url
                .as_deref()
                .and_then(|u| parse_handle(platform, u))
        })?;

    let mut candidate = Candidate::new(platform, &handle);
    candidate.follower_hint = count(item.follower_count.as_ref());
    candidate.niche_hint = item
        .niche
        .as_deref()
        .and_then(|n| n.parse::<Niche>().ok())
        .filter(|n| n.is_known());
    Some(candidate)
}

/// Normalizes a raw profile payload fetched for `requested_handle`.
///
/// `raw_payload` is attached verbatim when provided.
///
/// # Errors
///
/// Returns [`ExtractError::Normalization`] when neither the payload nor the
/// request yields a usable handle.
pub fn normalize_profile(
    platform: Platform,
    requested_handle: &str,
    raw: RawProfile,
    raw_payload: Option<serde_json::Value>,
) -> Result<ProfileRecord, ExtractError> {
    let handle = raw
        .username
        .as_deref()
        .and_then(|u| parse_handle(platform, u))
        .or_else(|| parse_handle(platform, requested_handle))
        .ok_or_else(|| ExtractError::Normalization {
            profile: requested_handle.to_string(),
            reason: "no usable handle in payload or request".to_string(),
        })?;

    let profile_url = non_empty(raw.profile_url).unwrap_or_else(|| platform.profile_url(&handle));
    let follower_count = count(raw.followers_count.as_ref());
    let posts: Vec<Post> = raw
        .posts
        .iter()
        .filter_map(|p| convert_post(p, follower_count))
        .collect();

    let bio = non_empty(raw.biography);
    let public_contact_email =
        non_empty(raw.business_email).or_else(|| bio.as_deref().and_then(extract_email));
    let engagement_rate = raw
        .engagement_rate
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, 1.0))
        .or_else(|| engagement_rate_for(&posts, follower_count));

    let mut record = ProfileRecord::new(platform, profile_url);
    record.handle = Some(handle);
    record.display_name = non_empty(raw.full_name);
    record.bio = bio;
    record.public_contact_email = public_contact_email;
    record.location = non_empty(raw.location);
    record.follower_count = follower_count;
    record.following_count = count(raw.follows_count.as_ref());
    record.post_count = count(raw.media_count.as_ref());
    record.engagement_rate = engagement_rate;
    record.top_posts = top_posts(&posts, TOP_POSTS);
    record.recent_posts_sample = recent_posts(&posts, RECENT_POSTS);
    record.avatar_url = non_empty(raw.profile_picture_url);
    record.raw = raw_payload;
    record.scraped_at = Utc::now();
    Ok(record)
}

fn convert_post(raw: &RawPost, followers: Option<i64>) -> Option<Post> {
    let url = raw.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
    let mut post = Post {
        url: url.to_string(),
        timestamp: raw.timestamp,
        views: count(raw.view_count.as_ref()),
        likes: count(raw.like_count.as_ref()),
        comments: count(raw.comment_count.as_ref()),
        caption: raw.caption.clone().filter(|c| !c.trim().is_empty()),
        engagement_rate: None,
    };
    post.engagement_rate = post_engagement_rate(&post, followers);
    Some(post)
}

/// Highest engagement first; falls back to raw interactions when the
/// follower count is unknown. Ties keep payload order.
#[must_use]
pub fn top_posts(posts: &[Post], n: usize) -> Vec<Post> {
    let mut ranked = posts.to_vec();
    ranked.sort_by(|a, b| {
        let by_rate = b
            .engagement_rate
            .unwrap_or(0.0)
            .partial_cmp(&a.engagement_rate.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal);
        by_rate.then_with(|| b.interactions().cmp(&a.interactions()))
    });
    ranked.truncate(n);
    ranked
}

/// Newest first; posts without a timestamp sort last.
#[must_use]
pub fn recent_posts(posts: &[Post], n: usize) -> Vec<Post> {
    let mut ordered = posts.to_vec();
    ordered.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ordered.truncate(n);
    ordered
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
