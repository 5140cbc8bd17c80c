//! Content (censorship) checks.
//!
//! Every check returns `Some(evidence)` when the message violates the rule
//! and `None` when it passes. None of them touch shared state.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::extract::{
    canonical_invite, extract_hosts, extract_invites, extract_ipv4, host_matches, is_public_ipv4,
};
use crate::cache::{CacheConfig, TypedCache};

static ZALGO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Mn}\p{Me}]").expect("zalgo pattern is valid"));

/// Apply whitelist or blacklist semantics to extracted items.
///
/// - whitelist set: every item must match an entry
/// - otherwise: no item may match a blacklist entry, so an empty
///   blacklist blocks nothing
fn check_lists<F>(items: &[String], whitelist: &[String], blacklist: &[String], matches: F) -> Option<String>
where
    F: Fn(&str, &str) -> bool,
{
    if !whitelist.is_empty() {
        return items
            .iter()
            .find(|item| !whitelist.iter().any(|entry| matches(item.as_str(), entry.as_str())))
            .cloned();
    }

    items
        .iter()
        .find(|item| blacklist.iter().any(|entry| matches(item.as_str(), entry.as_str())))
        .cloned()
}

/// Invite filter over extracted `discord.gg/<code>` invites.
pub fn check_invites(content: &str, whitelist: &[String], blacklist: &[String]) -> Option<String> {
    let invites = extract_invites(content);
    if invites.is_empty() {
        return None;
    }

    check_lists(&invites, whitelist, blacklist, |invite, entry| {
        invite == canonical_invite(entry)
    })
}

/// Domain filter over bare host names.
pub fn check_domains(content: &str, whitelist: &[String], blacklist: &[String]) -> Option<String> {
    let hosts = extract_hosts(content);
    if hosts.is_empty() {
        return None;
    }

    check_lists(&hosts, whitelist, blacklist, host_matches)
}

/// Whole-word match. Words are whitespace separated with surrounding
/// punctuation trimmed.
pub fn check_strings(content_lower: &str, blocked: &[String]) -> Option<String> {
    let blocked: Vec<String> = blocked
        .iter()
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty())
        .collect();
    if blocked.is_empty() {
        return None;
    }

    content_lower
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()))
        .find(|word| blocked.iter().any(|b| b.as_str() == *word))
        .map(str::to_string)
}

/// Substring match anywhere in the content or in any attachment filename.
pub fn check_substrings(content_lower: &str, filenames: &[String], blocked: &[String]) -> Option<String> {
    let filenames: Vec<String> = filenames.iter().map(|f| f.to_lowercase()).collect();

    blocked
        .iter()
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty())
        .find(|b| content_lower.contains(b.as_str()) || filenames.iter().any(|f| f.contains(b.as_str())))
}

/// Fails on the first public IPv4 address.
pub fn check_ips(content: &str) -> Option<String> {
    extract_ipv4(content)
        .into_iter()
        .find(is_public_ipv4)
        .map(|ip| ip.to_string())
}

/// Fails on any combining mark (Mn or Me).
pub fn check_zalgo(content: &str) -> Option<String> {
    ZALGO_RE
        .find(content)
        .and_then(|m| m.as_str().chars().next())
        .map(codepoint)
}

/// Fails on any character outside printable ASCII. Line breaks and tabs
/// are allowed.
pub fn check_non_english(content: &str) -> Option<String> {
    content
        .chars()
        .find(|c| !matches!(c, ' '..='~' | '\n' | '\r' | '\t'))
        .map(codepoint)
}

/// Fails on characters from abusable symbol blocks.
pub fn check_obnoxious_unicode(content: &str) -> Option<String> {
    content.chars().find(|c| is_obnoxious(*c)).map(codepoint)
}

fn is_obnoxious(c: char) -> bool {
    let in_blocks = matches!(c,
        '\u{2300}'..='\u{23FF}'     // miscellaneous technical
        | '\u{2400}'..='\u{243F}'   // control pictures
        | '\u{2460}'..='\u{24FF}'   // enclosed alphanumerics
        | '\u{1D400}'..='\u{1D7FF}' // mathematical alphanumeric symbols
        | '\u{1F100}'..='\u{1F1FF}' // enclosed alphanumeric supplement
    );

    in_blocks && !is_emoji_carve_out(c)
}

/// Symbols inside the blocked ranges that render as ordinary emoji.
fn is_emoji_carve_out(c: char) -> bool {
    matches!(c,
        '\u{231A}' | '\u{231B}'         // watch, hourglass
        | '\u{2328}'                    // keyboard
        | '\u{23CF}'                    // eject
        | '\u{23E9}'..='\u{23F3}'       // media controls, alarm clock, timer
        | '\u{23F8}'..='\u{23FA}'
        | '\u{24C2}'                    // circled M
        | '\u{1F170}' | '\u{1F171}' | '\u{1F17E}' | '\u{1F17F}' // A, B, O, P buttons
        | '\u{1F18E}'                   // AB button
        | '\u{1F191}'..='\u{1F19A}'     // CL .. VS buttons
        | '\u{1F1E6}'..='\u{1F1FF}'     // regional indicators (flags)
    )
}

fn codepoint(c: char) -> String {
    format!("U+{:04X}", c as u32)
}

/// Guild regexes compiled once and remembered, including failures.
///
/// An invalid pattern is logged the first time it is seen and then treated
/// as "no match" for as long as it stays cached.
#[derive(Clone, Debug)]
pub struct RegexCache {
    compiled: TypedCache<String, Option<Arc<Regex>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self {
            compiled: TypedCache::new("compiled_patterns", CacheConfig::compiled_patterns()),
        }
    }

    pub fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        self.compiled
            .get_or_insert_with(pattern.to_string(), || match Regex::new(pattern) {
                Ok(re) => Some(Arc::new(re)),
                Err(e) => {
                    warn!("Invalid automod regex {:?}: {}", pattern, e);
                    None
                }
            })
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Guild-supplied regex; invalid patterns never match.
pub fn check_regex(content: &str, pattern: &str, cache: &RegexCache) -> Option<String> {
    if pattern.trim().is_empty() {
        return None;
    }

    let re = cache.get(pattern)?;
    re.find(content).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_invite_blacklist() {
        let blacklist = list(&["discord.gg/evilinvite"]);
        assert_eq!(
            check_invites("join my server discord.gg/evilinvite", &[], &blacklist),
            Some("discord.gg/evilinvite".to_string())
        );
        assert_eq!(check_invites("discord.gg/fine", &[], &blacklist), None);
    }

    #[test]
    fn test_invite_whitelist_requires_every_code() {
        let whitelist = list(&["ourserver", "https://discord.gg/partner"]);
        assert_eq!(check_invites("discord.gg/ourserver discord.gg/partner", &whitelist, &[]), None);
        assert_eq!(
            check_invites("discord.gg/ourserver discord.gg/other", &whitelist, &[]),
            Some("discord.gg/other".to_string())
        );
    }

    #[test]
    fn test_empty_lists_block_nothing() {
        assert_eq!(check_invites("join discord.gg/friendly", &[], &[]), None);
        assert_eq!(check_domains("read the docs at rust-lang.org or notes.txt", &[], &[]), None);
    }

    #[test]
    fn test_domain_lists() {
        let blacklist = list(&["evil.com"]);
        assert_eq!(
            check_domains("go to https://www.evil.com/login", &[], &blacklist),
            Some("www.evil.com".to_string())
        );

        let whitelist = list(&["youtube.com"]);
        assert_eq!(check_domains("https://youtube.com/watch?v=1", &whitelist, &[]), None);
        assert_eq!(
            check_domains("https://youtube.com and bit.ly/x", &whitelist, &[]),
            Some("bit.ly".to_string())
        );
    }

    #[test]
    fn test_strings_match_whole_words() {
        let blocked = list(&["Bad"]);
        assert_eq!(check_strings("this is bad!", &blocked), Some("bad".to_string()));
        assert_eq!(check_strings("badminton is fun", &blocked), None);
    }

    #[test]
    fn test_substrings_include_filenames() {
        let blocked = list(&["bad"]);
        assert_eq!(check_substrings("badminton", &[], &blocked), Some("bad".to_string()));
        assert_eq!(
            check_substrings("look at this", &list(&["TOTALLY_BAD.png"]), &blocked),
            Some("bad".to_string())
        );
        assert_eq!(check_substrings("fine", &list(&["ok.png"]), &blocked), None);
    }

    #[test]
    fn test_ips() {
        assert_eq!(check_ips("contact me at 10.0.0.5"), None);
        assert_eq!(check_ips("contact me at 8.8.8.8"), Some("8.8.8.8".to_string()));
        assert_eq!(check_ips("version 999.1.2.3"), None);
    }

    #[test]
    fn test_zalgo() {
        assert!(check_zalgo("h\u{0336}e\u{0337}llo").is_some());
        assert_eq!(check_zalgo("hello"), None);
    }

    #[test]
    fn test_non_english() {
        assert_eq!(check_non_english("plain text\nsecond line"), None);
        assert_eq!(check_non_english("héllo"), Some("U+00E9".to_string()));
    }

    #[test]
    fn test_obnoxious_unicode() {
        assert_eq!(check_obnoxious_unicode("𝐛𝐨𝐥𝐝"), Some("U+1D41B".to_string()));
        assert!(check_obnoxious_unicode("ⓗⓔⓛⓛⓞ").is_some());
        assert_eq!(check_obnoxious_unicode("⌚ time"), None);
        assert_eq!(check_obnoxious_unicode("🇺🇸 flag"), None);
    }

    #[test]
    fn test_regex_invalid_pattern_never_matches() {
        let cache = RegexCache::new();
        assert_eq!(check_regex("anything (", "(", &cache), None);
        assert_eq!(check_regex("free nitro here", r"free\s+nitro", &cache), Some("free nitro".to_string()));
        assert_eq!(check_regex("text", "", &cache), None);
    }
}
