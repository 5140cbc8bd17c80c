//! Curated known-bad content entries.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How an entry's `content` is matched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Case-insensitive equality with a fragment.
    #[default]
    Exact,
    /// Regex searched within a fragment.
    Regex,
}

/// One curated entry (scam domain, known phishing text, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UntrustworthyEntry {
    pub content: String,
    #[serde(default)]
    pub kind: MatchKind,
    /// Short category shown in audit logs ("phishing", "scam", ...).
    #[serde(default)]
    pub category: String,
}

impl UntrustworthyEntry {
    pub fn exact(content: &str, category: &str) -> Self {
        Self {
            content: content.to_string(),
            kind: MatchKind::Exact,
            category: category.to_string(),
        }
    }

    pub fn regex(pattern: &str, category: &str) -> Self {
        Self {
            content: pattern.to_string(),
            kind: MatchKind::Regex,
            category: category.to_string(),
        }
    }
}

/// Entries compiled for matching.
///
/// Exact entries are indexed by their lower-cased content. Regex entries
/// that fail to compile are logged and skipped.
#[derive(Debug, Default)]
pub struct UntrustworthySet {
    exact: HashMap<String, UntrustworthyEntry>,
    patterns: Vec<(Regex, UntrustworthyEntry)>,
}

impl UntrustworthySet {
    pub fn build(entries: impl IntoIterator<Item = UntrustworthyEntry>) -> Self {
        let mut set = Self::default();
        for entry in entries {
            match entry.kind {
                MatchKind::Exact => {
                    set.exact.insert(entry.content.trim().to_lowercase(), entry);
                }
                MatchKind::Regex => match Regex::new(&entry.content) {
                    Ok(re) => set.patterns.push((re, entry)),
                    Err(e) => warn!("Skipping invalid untrustworthy pattern {:?}: {}", entry.content, e),
                },
            }
        }
        set
    }

    pub fn find(&self, fragment: &str) -> Option<&UntrustworthyEntry> {
        let fragment = fragment.trim().to_lowercase();
        self.exact.get(&fragment).or_else(|| {
            self.patterns
                .iter()
                .find(|(re, _)| re.is_match(&fragment))
                .map(|(_, entry)| entry)
        })
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_regex_matching() {
        let set = UntrustworthySet::build(vec![
            UntrustworthyEntry::exact("Steamcommunlty.com", "phishing"),
            UntrustworthyEntry::regex(r"free\s+nitro", "scam"),
            UntrustworthyEntry::regex("([broken", "scam"),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.find("steamcommunlty.com").unwrap().category, "phishing");
        assert_eq!(set.find("get FREE   nitro now").unwrap().category, "scam");
        assert!(set.find("steamcommunity.com").is_none());
    }
}
