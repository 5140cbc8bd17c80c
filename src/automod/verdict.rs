//! Verdicts and the rules that produce them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule family, first segment of a reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Censor,
    Spam,
}

/// Every check the pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    Invite,
    Domain,
    String,
    Substring,
    Ip,
    Zalgo,
    NonEnglish,
    ObnoxiousUnicode,
    Regex,
    Untrustworthy,
    MaxMessages,
    MaxNewlines,
    MaxMentions,
    MaxRoleMentions,
    MaxLinks,
    MaxUppercase,
    MaxEmojis,
    MaxAttachments,
    MaxCharacters,
}

impl Rule {
    pub fn category(self) -> Category {
        match self {
            Self::Invite
            | Self::Domain
            | Self::String
            | Self::Substring
            | Self::Ip
            | Self::Zalgo
            | Self::NonEnglish
            | Self::ObnoxiousUnicode
            | Self::Regex
            | Self::Untrustworthy => Category::Censor,
            _ => Category::Spam,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Invite => "Invite",
            Self::Domain => "Domain",
            Self::String => "String",
            Self::Substring => "Substring",
            Self::Ip => "IP",
            Self::Zalgo => "Zalgo",
            Self::NonEnglish => "NonEnglish",
            Self::ObnoxiousUnicode => "ObnoxiousUnicode",
            Self::Regex => "Regex",
            Self::Untrustworthy => "Untrustworthy",
            Self::MaxMessages => "MaxMessages",
            Self::MaxNewlines => "MaxNewlines",
            Self::MaxMentions => "MaxMentions",
            Self::MaxRoleMentions => "MaxRoleMentions",
            Self::MaxLinks => "MaxLinks",
            Self::MaxUppercase => "MaxUppercase",
            Self::MaxEmojis => "MaxEmojis",
            Self::MaxAttachments => "MaxAttachments",
            Self::MaxCharacters => "MaxCharacters",
        }
    }

    /// Message-rate violations are subject to strike cushioning.
    pub fn is_message_rate(self) -> bool {
        matches!(self, Self::MaxMessages)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Censor => f.write_str("Censor"),
            Self::Spam => f.write_str("Spam"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.category(), self.name())
    }
}

/// Outcome of evaluating one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    /// Rule that fired, if any.
    pub rule: Option<Rule>,
    /// `"<Category>-><Rule>: <evidence>"`, empty on pass.
    pub reason_code: String,
    pub weight: i64,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            ok: true,
            rule: None,
            reason_code: String::new(),
            weight: 0,
        }
    }

    pub fn fail(rule: Rule, evidence: &str) -> Self {
        let reason_code = if evidence.is_empty() {
            rule.to_string()
        } else {
            format!("{}: {}", rule, evidence)
        };

        Self {
            ok: false,
            rule: Some(rule),
            reason_code,
            weight: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_code_format() {
        let verdict = Verdict::fail(Rule::Invite, "discord.gg/abc");
        assert!(!verdict.ok);
        assert_eq!(verdict.weight, 1);
        assert_eq!(verdict.reason_code, "Censor->Invite: discord.gg/abc");

        assert_eq!(Verdict::fail(Rule::Zalgo, "").reason_code, "Censor->Zalgo");
        assert_eq!(Rule::MaxMentions.to_string(), "Spam->MaxMentions");
    }

    #[test]
    fn test_pass() {
        let verdict = Verdict::pass();
        assert!(verdict.ok);
        assert!(verdict.rule.is_none());
    }
}
