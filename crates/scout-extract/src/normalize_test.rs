use chrono::{TimeZone, Utc};
use serde_json::json;

use super::*;

fn raw_from(value: serde_json::Value) -> RawProfile {
    serde_json::from_value(value).expect("fixture should deserialize")
}

fn post_fixture(id: u32, likes: i64, comments: i64, day: u32) -> serde_json::Value {
    json!({
        "url": format!("https://www.instagram.com/p/{id}/"),
        "timestamp": Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap().to_rfc3339(),
        "like_count": likes,
        "comment_count": comments,
        "caption": format!("post {id}"),
    })
}

#[test]
fn candidate_from_handle_and_hints() {
    let item: FeedItem = serde_json::from_value(json!({
        "handle": "@fit.jane",
        "follower_count": "12.5K",
        "niche": "Fitness"
    }))
    .unwrap();
    let c = candidate_from_feed_item(Platform::Instagram, &item).unwrap();
    assert_eq!(c.handle, "fit.jane");
    assert_eq!(c.profile_url, "https://www.instagram.com/fit.jane/");
    assert_eq!(c.follower_hint, Some(12_500));
    assert_eq!(c.niche_hint, Some(Niche::Fitness));
}

#[test]
fn candidate_falls_back_to_profile_url() {
    let item: FeedItem = serde_json::from_value(json!({
        "profile_url": "https://www.linkedin.com/in/jane-doe/",
        "niche": "astrology"
    }))
    .unwrap();
    let c = candidate_from_feed_item(Platform::Linkedin, &item).unwrap();
    assert_eq!(c.handle, "jane-doe");
    assert!(c.niche_hint.is_none(), "unknown labels are not hints");
    assert!(c.follower_hint.is_none());
}

#[test]
fn candidate_without_any_handle_is_dropped() {
    let item: FeedItem = serde_json::from_value(json!({"follower_count": 10})).unwrap();
    assert!(candidate_from_feed_item(Platform::Instagram, &item).is_none());
}

#[test]
fn normalize_full_profile() {
    let raw = raw_from(json!({
        "username": "fit.jane",
        "full_name": "  Jane Doe ",
        "biography": "Coach. Bookings: jane@example.com",
        "followers_count": "1K",
        "follows_count": 200,
        "media_count": "1,204",
        "profile_picture_url": "https://cdn.example.com/a.jpg",
        "posts": [
            post_fixture(1, 10, 0, 1),
            post_fixture(2, 90, 10, 2),
            post_fixture(3, 40, 0, 3),
            post_fixture(4, 50, 0, 4),
            post_fixture(5, 5, 0, 5),
            post_fixture(6, 1, 0, 6),
        ]
    }));

    let record = normalize_profile(Platform::Instagram, "fit.jane", raw, None).unwrap();

    assert_eq!(record.profile_url, "https://www.instagram.com/fit.jane/");
    assert_eq!(record.display_name.as_deref(), Some("Jane Doe"));
    assert_eq!(record.public_contact_email.as_deref(), Some("jane@example.com"));
    assert_eq!(record.follower_count, Some(1_000));
    assert_eq!(record.following_count, Some(200));
    assert_eq!(record.post_count, Some(1_204));

    let top: Vec<&str> = record.top_posts.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        top,
        vec![
            "https://www.instagram.com/p/2/",
            "https://www.instagram.com/p/4/",
            "https://www.instagram.com/p/3/",
        ]
    );
    assert!((record.top_posts[0].engagement_rate.unwrap() - 0.1).abs() < 1e-9);

    assert_eq!(record.recent_posts_sample.len(), RECENT_POSTS);
    assert_eq!(
        record.recent_posts_sample[0].url,
        "https://www.instagram.com/p/6/"
    );

    // (10 + 100 + 40 + 50 + 5 + 1) / (1000 * 6)
    let expected = 206.0 / 6000.0;
    assert!((record.engagement_rate.unwrap() - expected).abs() < 1e-9);
    assert!(record.raw.is_none());
}

#[test]
fn explicit_business_email_wins_over_bio() {
    let raw = raw_from(json!({
        "username": "chef",
        "biography": "bio@example.com",
        "business_email": "biz@example.com"
    }));
    let record = normalize_profile(Platform::Instagram, "chef", raw, None).unwrap();
    assert_eq!(record.public_contact_email.as_deref(), Some("biz@example.com"));
}

#[test]
fn service_engagement_rate_is_clamped() {
    let raw = raw_from(json!({"username": "x", "engagement_rate": 3.5}));
    let record = normalize_profile(Platform::Instagram, "x", raw, None).unwrap();
    assert_eq!(record.engagement_rate, Some(1.0));
}

#[test]
fn posts_without_url_are_skipped() {
    let raw = raw_from(json!({
        "username": "x",
        "posts": [{"like_count": 3}, {"url": "  "}, {"url": "https://www.instagram.com/p/ok/"}]
    }));
    let record = normalize_profile(Platform::Instagram, "x", raw, None).unwrap();
    assert_eq!(record.top_posts.len(), 1);
    assert_eq!(record.top_posts[0].engagement_rate, None);
}

#[test]
fn missing_handle_everywhere_is_an_error() {
    let raw = raw_from(json!({}));
    let err = normalize_profile(Platform::Instagram, "not a handle!", raw, None).unwrap_err();
    assert!(matches!(err, ExtractError::Normalization { .. }));
}

#[test]
fn raw_payload_is_attached_when_given() {
    let payload = json!({"username": "kept"});
    let raw = raw_from(payload.clone());
    let record = normalize_profile(Platform::Instagram, "kept", raw, Some(payload.clone())).unwrap();
    assert_eq!(record.raw, Some(payload));
}

#[test]
fn recent_posts_put_undated_last() {
    let dated = Post {
        url: "a".to_string(),
        timestamp: Some(Utc::now()),
        views: None,
        likes: None,
        comments: None,
        caption: None,
        engagement_rate: None,
    };
    let undated = Post {
        url: "b".to_string(),
        timestamp: None,
        ..dated.clone()
    };
    let ordered = recent_posts(&[undated, dated], 5);
    assert_eq!(ordered[0].url, "a");
    assert_eq!(ordered[1].url, "b");
}
