//! Video storage reconciliation
//!
//! Maintains the cached `enabled` flag on videos and the membership-list
//! cascades. Enabling a resource short-circuits every touched video to
//! enabled; disabling recomputes each video against the full enabled sets,
//! since another reference may still keep it on. Removing a resource walks
//! every entity listing it and deletes those whose membership becomes empty.

use std::collections::HashSet;

use crate::graph::db::Transaction;
use crate::graph::model::{Membership, Subscription, Video};

/// Whether a video should be listed, given the currently enabled accounts
/// and incognito subscriptions.
pub(crate) fn compute_enabled(
    video: &Video,
    enabled_accounts: &HashSet<String>,
    enabled_subscriptions: &HashSet<u64>,
) -> bool {
    video
        .account_ids
        .iter()
        .any(|id| enabled_accounts.contains(id))
        || video
            .incognito_subscription_ids
            .iter()
            .any(|id| enabled_subscriptions.contains(id))
}

/// Refreshes the cached flag on every video referencing an account whose
/// enabled state just changed. The account row must already carry its new
/// state when disabling.
pub fn refresh_account_videos(txn: &mut Transaction<'_>, account_id: &str, enabled: bool) {
    let videos = txn.videos_by_account(account_id);
    refresh(txn, videos, enabled);
}

/// As [`refresh_account_videos`], for an incognito subscription.
pub fn refresh_subscription_videos(
    txn: &mut Transaction<'_>,
    subscription_id: u64,
    enabled: bool,
) {
    let videos = txn.videos_by_incognito_subscription(subscription_id);
    refresh(txn, videos, enabled);
}

fn refresh(txn: &mut Transaction<'_>, videos: Vec<Video>, enabled: bool) {
    if enabled {
        for mut video in videos {
            if !video.enabled {
                video.enabled = true;
                txn.persist_video(video);
            }
        }
        return;
    }

    let enabled_accounts = txn.enabled_account_ids();
    let enabled_subscriptions = txn.enabled_incognito_subscription_ids();
    for mut video in videos {
        let now = compute_enabled(&video, &enabled_accounts, &enabled_subscriptions);
        if video.enabled != now {
            video.enabled = now;
            txn.persist_video(video);
        }
    }
}

/// Full cascade for a removed account: deletes the account row and its
/// subscription rows, strips the account from every membership list and
/// deletes entities left without any reference.
pub fn remove_account_cascade(txn: &mut Transaction<'_>, account_id: &str) {
    txn.remove_account(account_id);
    for subscription in txn.subscriptions_by_account(account_id) {
        txn.remove_subscription(subscription.id);
    }

    let enabled_accounts = txn.enabled_account_ids();
    let enabled_subscriptions = txn.enabled_incognito_subscription_ids();

    for mut channel in txn.channels() {
        if channel.remove_account(account_id) {
            if channel.is_orphaned() {
                txn.remove_channel(&channel.id);
            } else {
                txn.persist_channel(channel);
            }
        }
    }
    for mut playlist in txn.playlists() {
        if playlist.remove_account(account_id) {
            if playlist.is_orphaned() {
                txn.remove_playlist(&playlist.id);
            } else {
                txn.persist_playlist(playlist);
            }
        }
    }
    for mut video in txn.videos() {
        if video.remove_account(account_id) {
            if video.is_orphaned() {
                txn.remove_video(&video.id);
            } else {
                video.enabled =
                    compute_enabled(&video, &enabled_accounts, &enabled_subscriptions);
                txn.persist_video(video);
            }
        }
    }
}

/// Full cascade for a removed incognito subscription.
pub fn remove_subscription_cascade(txn: &mut Transaction<'_>, subscription: &Subscription) {
    txn.remove_subscription(subscription.id);

    let enabled_accounts = txn.enabled_account_ids();
    let enabled_subscriptions = txn.enabled_incognito_subscription_ids();

    for mut channel in txn.channels() {
        if channel.remove_incognito_subscription(subscription.id) {
            if channel.is_orphaned() {
                txn.remove_channel(&channel.id);
            } else {
                txn.persist_channel(channel);
            }
        }
    }
    for mut playlist in txn.playlists() {
        if playlist.remove_incognito_subscription(subscription.id) {
            if playlist.is_orphaned() {
                txn.remove_playlist(&playlist.id);
            } else {
                txn.persist_playlist(playlist);
            }
        }
    }
    for mut video in txn.videos() {
        if video.remove_incognito_subscription(subscription.id) {
            if video.is_orphaned() {
                txn.remove_video(&video.id);
            } else {
                video.enabled =
                    compute_enabled(&video, &enabled_accounts, &enabled_subscriptions);
                txn.persist_video(video);
            }
        }
    }
}

/// Cascade for one account losing one subscription: the account leaves the
/// membership lists of that subscription's channel, uploads playlist and
/// the channel's videos only.
pub fn remove_account_subscription_cascade(
    txn: &mut Transaction<'_>,
    subscription: &Subscription,
    account_id: &str,
) {
    txn.remove_subscription(subscription.id);

    let enabled_accounts = txn.enabled_account_ids();
    let enabled_subscriptions = txn.enabled_incognito_subscription_ids();

    if let Some(channel_id) = subscription.channel_id.as_deref() {
        if let Some(mut channel) = txn.find_channel(channel_id) {
            if channel.remove_account(account_id) {
                if channel.is_orphaned() {
                    txn.remove_channel(&channel.id);
                } else {
                    txn.persist_channel(channel);
                }
            }
        }
        for mut video in txn.videos_by_channel(channel_id) {
            if video.remove_account(account_id) {
                if video.is_orphaned() {
                    txn.remove_video(&video.id);
                } else {
                    video.enabled =
                        compute_enabled(&video, &enabled_accounts, &enabled_subscriptions);
                    txn.persist_video(video);
                }
            }
        }
    }
    if let Some(playlist_id) = subscription.playlist_id.as_deref() {
        if let Some(mut playlist) = txn.find_playlist(playlist_id) {
            if playlist.remove_account(account_id) {
                if playlist.is_orphaned() {
                    txn.remove_playlist(&playlist.id);
                } else {
                    txn.persist_playlist(playlist);
                }
            }
        }
    }
}
