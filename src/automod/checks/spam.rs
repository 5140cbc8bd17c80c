//! Behavioral (spam) checks over already-fetched message fields.
//!
//! A limit of 0 means unlimited: the check passes without counting.
//! Evidence is `"<count>/<limit>"`.

use super::extract::{count_emojis, extract_urls};

fn over_limit(count: u64, limit: u64) -> Option<String> {
    if limit > 0 && count > limit {
        Some(format!("{}/{}", count, limit))
    } else {
        None
    }
}

pub fn check_newlines(content: &str, limit: u64) -> Option<String> {
    if limit == 0 {
        return None;
    }
    over_limit(content.matches('\n').count() as u64, limit)
}

pub fn check_mentions(mentions: &[String], limit: u64) -> Option<String> {
    over_limit(mentions.len() as u64, limit)
}

pub fn check_role_mentions(role_mentions: &[String], limit: u64) -> Option<String> {
    over_limit(role_mentions.len() as u64, limit)
}

pub fn check_links(content: &str, limit: u64) -> Option<String> {
    if limit == 0 {
        return None;
    }
    over_limit(extract_urls(content).len() as u64, limit)
}

pub fn check_emojis(content: &str, limit: u64) -> Option<String> {
    if limit == 0 {
        return None;
    }
    over_limit(count_emojis(content), limit)
}

pub fn check_attachments(attachments: usize, limit: u64) -> Option<String> {
    over_limit(attachments as u64, limit)
}

pub fn check_characters(content: &str, limit: u64) -> Option<String> {
    if limit == 0 {
        return None;
    }
    over_limit(content.chars().count() as u64, limit)
}

/// Uppercase share of letters, skipped for messages with fewer than
/// `min_length` letters.
pub fn check_uppercase(content: &str, max_percent: u64, min_length: u64) -> Option<String> {
    if max_percent == 0 {
        return None;
    }

    let (letters, upper) = content
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0u64, 0u64), |(letters, upper), c| {
            (letters + 1, upper + u64::from(c.is_uppercase()))
        });

    if letters == 0 || letters < min_length {
        return None;
    }

    let percent = upper * 100 / letters;
    if percent > max_percent {
        Some(format!("{}%/{}%", percent, max_percent))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let long = "a\n".repeat(500);
        assert_eq!(check_newlines(&long, 0), None);
        assert_eq!(check_mentions(&ids(100), 0), None);
        assert_eq!(check_characters(&long, 0), None);
        assert_eq!(check_uppercase("AAAAAAAAAA", 0, 0), None);
    }

    #[test]
    fn test_counts_against_limit() {
        assert_eq!(check_newlines("a\nb\nc", 2), None);
        assert_eq!(check_newlines("a\nb\nc\nd", 2), Some("3/2".to_string()));
        assert_eq!(check_mentions(&ids(6), 5), Some("6/5".to_string()));
        assert_eq!(check_role_mentions(&ids(1), 1), None);
        assert_eq!(check_attachments(4, 3), Some("4/3".to_string()));
        assert_eq!(check_characters("héllo", 4), Some("5/4".to_string()));
    }

    #[test]
    fn test_links_and_emojis() {
        assert_eq!(check_links("a.com b.com c.com", 2), Some("3/2".to_string()));
        assert_eq!(check_links("just text", 1), None);
        assert_eq!(check_emojis("😀😀😀", 2), Some("3/2".to_string()));
    }

    #[test]
    fn test_uppercase_with_floor() {
        assert_eq!(check_uppercase("OK", 50, 5), None);
        assert_eq!(check_uppercase("HELLO THERE", 70, 5), Some("100%/70%".to_string()));
        assert_eq!(check_uppercase("Hello There", 70, 5), None);
        assert_eq!(check_uppercase("1234 !!!", 10, 0), None);
    }
}
