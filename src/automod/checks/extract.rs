//! Token extraction shared by censor and spam checks.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static INVITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:discord(?:app)?\.com/invite|discord\.(?:gg|io|me|li))/([a-z0-9-]+)")
        .expect("invite pattern is valid")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://)?(?:[a-z0-9._~%+-]+(?::[^\s@/]*)?@)?(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}\b(?::\d{1,5})?(?:[/?#][^\s<>]*)?",
    )
    .expect("url pattern is valid")
});

static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\.(\d+)\.(\d+)\.(\d+)\b").expect("ipv4 pattern is valid"));

static CUSTOM_EMOJI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a?:[A-Za-z0-9_~]+:\d+>").expect("emoji pattern is valid"));

/// Invite links, canonicalised to `discord.gg/<code>` in lower case.
pub fn extract_invites(content: &str) -> Vec<String> {
    INVITE_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|code| format!("discord.gg/{}", code.as_str().to_lowercase()))
        .collect()
}

/// Canonicalise a configured invite entry: a full invite link or a bare code.
pub fn canonical_invite(entry: &str) -> String {
    let entry = entry.trim();
    extract_invites(entry)
        .into_iter()
        .next()
        .unwrap_or_else(|| format!("discord.gg/{}", entry.to_lowercase()))
}

/// Raw URL-looking spans, with or without scheme.
pub fn extract_urls(content: &str) -> Vec<&str> {
    URL_RE.find_iter(content).map(|m| m.as_str()).collect()
}

/// Bare host names of every URL in the content (scheme, userinfo, port and
/// path stripped, lower case).
pub fn extract_hosts(content: &str) -> Vec<String> {
    extract_urls(content)
        .into_iter()
        .filter_map(host_of)
        .collect()
}

fn host_of(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        lower
    } else {
        format!("http://{}", lower)
    };

    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Whether `host` equals `domain` or is a subdomain of it.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches("*.").trim_end_matches('.').to_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Dotted-quad candidates that parse as valid IPv4 addresses. Candidates with
/// an octet above 255 are dropped.
pub fn extract_ipv4(content: &str) -> Vec<Ipv4Addr> {
    IPV4_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let mut octets = [0u8; 4];
            for (i, octet) in octets.iter_mut().enumerate() {
                *octet = caps.get(i + 1)?.as_str().parse::<u8>().ok()?;
            }
            Some(Ipv4Addr::from(octets))
        })
        .collect()
}

/// Public unicast address (not private, loopback, link-local, multicast,
/// broadcast, documentation or unspecified).
pub fn is_public_ipv4(ip: &Ipv4Addr) -> bool {
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_unspecified()
        // 100.64.0.0/10 shared address space
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xC0) == 64)
        || ip.octets()[0] == 0)
}

/// Count custom (`<:name:id>`) and curated Unicode emojis.
pub fn count_emojis(content: &str) -> u64 {
    let custom = CUSTOM_EMOJI_RE.find_iter(content).count() as u64;
    let stripped = CUSTOM_EMOJI_RE.replace_all(content, "");

    let mut unicode = 0u64;
    let mut regional = 0u64;
    for c in stripped.chars() {
        if is_regional_indicator(c) {
            regional += 1;
        } else if is_emoji(c) {
            unicode += 1;
        }
    }

    // A flag is a pair of regional indicators.
    custom + unicode + regional.div_ceil(2)
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_emoji(c: char) -> bool {
    matches!(c,
        '\u{1F300}'..='\u{1F5FF}'   // misc symbols and pictographs
        | '\u{1F600}'..='\u{1F64F}' // emoticons
        | '\u{1F680}'..='\u{1F6FF}' // transport and map
        | '\u{1F900}'..='\u{1F9FF}' // supplemental symbols and pictographs
        | '\u{1FA70}'..='\u{1FAFF}' // symbols and pictographs extended-a
        | '\u{2600}'..='\u{26FF}'   // misc symbols
        | '\u{2700}'..='\u{27BF}'   // dingbats
    )
}
