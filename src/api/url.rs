//! Subscription URL resolution
//!
//! Incognito subscriptions are requested by pasting a YouTube URL. Only a
//! handful of URL shapes identify a subscribable resource:
//!
//! ```text
//! https://www.youtube.com/channel/<channel id>
//! https://www.youtube.com/user/<user name>
//! https://www.youtube.com/playlist?list=<playlist id>
//! https://www.youtube.com/watch?v=...&list=<playlist id>
//! ```
//!
//! Everything else is a validation error. A user URL still needs a remote
//! lookup to find the channel id, so resolution stays two-phase: parse here,
//! resolve names through the API client.

use url::Url;

use super::error::ApiError;

/// A parsed subscribable YouTube URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionUrl {
    /// `/channel/<id>` — directly subscribable.
    Channel(String),
    /// `/user/<name>` — needs an API lookup to find the channel.
    User(String),
    /// `/playlist?list=<id>` or `/watch?list=<id>`.
    Playlist(String),
}

impl SubscriptionUrl {
    /// Parses a raw URL string into a subscribable resource reference.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let url = Url::parse(raw).map_err(|error| ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: error.to_string(),
        })?;

        if url.scheme() != "https" {
            return Err(Self::invalid(raw, "not an https URL"));
        }
        match url.host_str() {
            Some("www.youtube.com") | Some("youtube.com") | Some("m.youtube.com") => {}
            _ => return Err(Self::invalid(raw, "not a YouTube host")),
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["channel", id] => Ok(SubscriptionUrl::Channel((*id).to_string())),
            ["user", name] | ["c", name] => Ok(SubscriptionUrl::User((*name).to_string())),
            ["playlist"] | ["watch"] => {
                let list = url
                    .query_pairs()
                    .find(|(key, _)| key == "list")
                    .map(|(_, value)| value.into_owned());
                match list {
                    Some(id) if !id.is_empty() => Ok(SubscriptionUrl::Playlist(id)),
                    _ => Err(Self::invalid(raw, "missing list parameter")),
                }
            }
            _ => Err(Self::invalid(raw, "not a channel, user or playlist URL")),
        }
    }

    fn invalid(url: &str, reason: &str) -> ApiError {
        ApiError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
