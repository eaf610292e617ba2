pub mod client;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod types;

pub use client::ExtractClient;
pub use error::ExtractError;
pub use normalize::{candidate_from_feed_item, normalize_profile};
pub use parse::{extract_email, is_valid_email, parse_handle, parse_human_number};
pub use types::{CountValue, FeedItem, FeedPage, RawPost, RawProfile};
