//! Layered policy resolution.
//!
//! Picks the level-scoped rules for a user's level, then merges the channel
//! override on top, field by field.

use crate::database::models::{CensorPolicy, GuildPolicy, SpamPolicy};

/// Effective rules for one (guild, channel, level).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPolicy {
    pub censor: CensorPolicy,
    pub spam: SpamPolicy,
}

/// Resolve the effective policy.
///
/// Returns `None` when the guild has no level-scoped rules at all: automod
/// is disabled for it.
pub fn resolve(policy: &GuildPolicy, channel_id: &str, user_level: i64) -> Option<ResolvedPolicy> {
    if !policy.automod_enabled() {
        return None;
    }

    let censor_level = policy
        .censor_levels
        .closest(user_level)
        .map(|(_, p)| p.clone())
        .unwrap_or_default();
    let spam_level = policy
        .spam_levels
        .closest(user_level)
        .map(|(_, p)| p.clone())
        .unwrap_or_default();

    let censor = match policy.censor_channels.get(channel_id) {
        Some(channel) => merge_censor(&censor_level, channel),
        None => censor_level,
    };
    let spam = match policy.spam_channels.get(channel_id) {
        Some(channel) => merge_spam(&spam_level, channel),
        None => spam_level,
    };

    Some(ResolvedPolicy { censor, spam })
}

fn inherit<T: Clone>(channel: &Option<T>, level: &Option<T>) -> Option<T> {
    channel.clone().or_else(|| level.clone())
}

/// Channel booleans are authoritative; unset options inherit. Lists are
/// replaced wholesale, never merged element-wise.
pub fn merge_censor(level: &CensorPolicy, channel: &CensorPolicy) -> CensorPolicy {
    CensorPolicy {
        filter_invites: channel.filter_invites,
        invite_whitelist: inherit(&channel.invite_whitelist, &level.invite_whitelist),
        invite_blacklist: inherit(&channel.invite_blacklist, &level.invite_blacklist),

        filter_domains: channel.filter_domains,
        domain_whitelist: inherit(&channel.domain_whitelist, &level.domain_whitelist),
        domain_blacklist: inherit(&channel.domain_blacklist, &level.domain_blacklist),

        filter_strings: channel.filter_strings,
        blocked_strings: inherit(&channel.blocked_strings, &level.blocked_strings),
        blocked_substrings: inherit(&channel.blocked_substrings, &level.blocked_substrings),

        filter_ips: channel.filter_ips,
        filter_zalgo: channel.filter_zalgo,
        filter_non_english: channel.filter_non_english,
        filter_unicode: channel.filter_unicode,

        filter_regex: channel.filter_regex,
        regex: inherit(&channel.regex, &level.regex),

        filter_untrustworthy: channel.filter_untrustworthy,
    }
}

pub fn merge_spam(level: &SpamPolicy, channel: &SpamPolicy) -> SpamPolicy {
    SpamPolicy {
        max_messages: channel.max_messages.or(level.max_messages),
        max_messages_interval: channel.max_messages_interval.or(level.max_messages_interval),
        reset_on_continued_spam: channel.reset_on_continued_spam,
        max_mentions: channel.max_mentions.or(level.max_mentions),
        max_role_mentions: channel.max_role_mentions.or(level.max_role_mentions),
        max_links: channel.max_links.or(level.max_links),
        max_attachments: channel.max_attachments.or(level.max_attachments),
        max_emojis: channel.max_emojis.or(level.max_emojis),
        max_newlines: channel.max_newlines.or(level.max_newlines),
        max_uppercase_percent: channel.max_uppercase_percent.or(level.max_uppercase_percent),
        min_uppercase_length: channel.min_uppercase_length.or(level.min_uppercase_length),
        max_characters: channel.max_characters.or(level.max_characters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GuildPolicy {
        let mut policy = GuildPolicy::new("g");
        policy.censor_levels.insert(
            0,
            CensorPolicy {
                filter_invites: true,
                invite_blacklist: Some(vec!["discord.gg/bad".to_string()]),
                filter_ips: true,
                ..Default::default()
            },
        );
        policy.censor_levels.insert(
            50,
            CensorPolicy {
                filter_ips: true,
                ..Default::default()
            },
        );
        policy.spam_levels.insert(
            10,
            SpamPolicy {
                max_mentions: Some(5),
                max_links: Some(3),
                ..Default::default()
            },
        );
        policy
    }

    #[test]
    fn test_disabled_without_levels() {
        let mut policy = GuildPolicy::new("g");
        policy.censor_channels.insert("c".to_string(), CensorPolicy::default());
        assert_eq!(resolve(&policy, "c", 0), None);
    }

    #[test]
    fn test_level_selection() {
        let policy = policy();

        let low = resolve(&policy, "c", 10).unwrap();
        assert!(low.censor.filter_invites);

        let high = resolve(&policy, "c", 70).unwrap();
        assert!(!high.censor.filter_invites);
        assert!(high.censor.filter_ips);

        // Below the smallest spam level: falls back to it rather than nothing.
        let below = resolve(&policy, "c", 0).unwrap();
        assert_eq!(below.spam.max_mentions, Some(5));
    }

    #[test]
    fn test_channel_override_merges_fields() {
        let mut policy = policy();
        policy.censor_channels.insert(
            "memes".to_string(),
            CensorPolicy {
                filter_invites: true,
                ..Default::default()
            },
        );
        policy.spam_channels.insert(
            "memes".to_string(),
            SpamPolicy {
                max_links: Some(0),
                max_newlines: Some(4),
                ..Default::default()
            },
        );

        let resolved = resolve(&policy, "memes", 10).unwrap();

        // Unset list inherits, explicit false boolean wins.
        assert_eq!(
            resolved.censor.invite_blacklist,
            Some(vec!["discord.gg/bad".to_string()])
        );
        assert!(!resolved.censor.filter_ips);

        assert_eq!(resolved.spam.max_mentions, Some(5));
        assert_eq!(resolved.spam.max_links, Some(0));
        assert_eq!(resolved.spam.max_newlines, Some(4));
    }

    #[test]
    fn test_list_override_replaces_wholesale() {
        let level = CensorPolicy {
            domain_blacklist: Some(vec!["a.com".to_string(), "b.com".to_string()]),
            ..Default::default()
        };
        let channel = CensorPolicy {
            domain_blacklist: Some(vec!["c.com".to_string()]),
            ..Default::default()
        };

        let merged = merge_censor(&level, &channel);
        assert_eq!(merged.domain_blacklist, Some(vec!["c.com".to_string()]));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let policy = policy();
        assert_eq!(resolve(&policy, "c", 12), resolve(&policy, "c", 12));
    }
}
