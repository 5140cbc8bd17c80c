//! Content normalization applied before the censor checks.

/// Normalized view of a message's text.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContent {
    /// Content with exotic spaces replaced and invisible characters removed.
    pub text: String,
    /// Lower-cased `text`, for case-insensitive matching.
    pub lower: String,
}

impl NormalizedContent {
    pub fn new(raw: &str) -> Self {
        let text = normalize_spaces(raw);
        let lower = text.to_lowercase();
        Self { text, lower }
    }
}

/// Replace non-standard Unicode spaces with an ASCII space and drop
/// zero-width characters, so `"disc\u{200B}ord.gg"` matches like
/// `"discord.gg"`.
pub fn normalize_spaces(input: &str) -> String {
    input
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if is_exotic_space(c) { ' ' } else { c })
        .collect()
}

fn is_exotic_space(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{2028}' | '\u{2029}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{180E}')
}
