//! Evaluation pipeline.
//!
//! Runs the resolved censor and spam checks against one message in a fixed
//! order and stops at the first failure.
//!
//! The message-rate counter is the only shared state touched here. It is
//! incremented for every evaluated message, before any other check runs, so
//! the count does not depend on whether an earlier check already failed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::checks::{RegexCache, censor, extract, spam};
use super::normalize::NormalizedContent;
use super::ratelimit::{RateCheck, RateLimiter};
use super::resolver::{ResolvedPolicy, resolve};
use super::verdict::{Rule, Verdict};
use crate::database::models::{CensorPolicy, GuildPolicy, SpamPolicy};
use crate::message::IncomingMessage;
use crate::permissions::user_level;
use crate::stores::{UntrustworthyContentStore, with_deadline};

pub const MESSAGES_NAMESPACE: &str = "messages";

/// Window used when a guild sets `max_messages` without an interval.
const DEFAULT_MESSAGE_INTERVAL: Duration = Duration::from_secs(5);

/// Fragments shorter than this are not looked up as untrustworthy content.
const MIN_FRAGMENT_LEN: usize = 4;

/// Content checks, in reporting priority. Untrustworthy content is looked up
/// after these.
const CENSOR_ORDER: [Rule; 9] = [
    Rule::Invite,
    Rule::Domain,
    Rule::String,
    Rule::Substring,
    Rule::Ip,
    Rule::Zalgo,
    Rule::NonEnglish,
    Rule::ObnoxiousUnicode,
    Rule::Regex,
];

const SPAM_ORDER: [Rule; 9] = [
    Rule::MaxMessages,
    Rule::MaxNewlines,
    Rule::MaxMentions,
    Rule::MaxRoleMentions,
    Rule::MaxLinks,
    Rule::MaxUppercase,
    Rule::MaxEmojis,
    Rule::MaxAttachments,
    Rule::MaxCharacters,
];

/// Everything a check may read about the message.
struct CheckInput<'a> {
    message: &'a IncomingMessage,
    content: NormalizedContent,
    filenames: Vec<String>,
}

#[derive(Clone)]
pub struct Evaluator {
    limiter: RateLimiter,
    regexes: RegexCache,
    untrustworthy: Option<Arc<dyn UntrustworthyContentStore>>,
    timeout: Duration,
}

impl Evaluator {
    pub fn new(limiter: RateLimiter, timeout: Duration) -> Self {
        Self {
            limiter,
            regexes: RegexCache::new(),
            untrustworthy: None,
            timeout,
        }
    }

    #[must_use]
    pub fn with_untrustworthy(mut self, store: Arc<dyn UntrustworthyContentStore>) -> Self {
        self.untrustworthy = Some(store);
        self
    }

    /// Evaluate a message against its guild's policy.
    pub async fn evaluate(&self, message: &IncomingMessage, policy: &GuildPolicy) -> Verdict {
        self.evaluate_with(message, policy, &mut |_| {}).await
    }

    /// Like [`evaluate`](Self::evaluate), calling `on_check` for every check
    /// that actually runs.
    pub async fn evaluate_with(
        &self,
        message: &IncomingMessage,
        policy: &GuildPolicy,
        on_check: &mut (dyn FnMut(Rule) + Send),
    ) -> Verdict {
        if !policy.automod_enabled() {
            return Verdict::pass();
        }

        let level = user_level(&policy.levels, &message.author);
        if policy.staff_bypass && level >= policy.staff_level {
            debug!("User {} is staff (level {}), bypassing automod", message.author.id, level);
            return Verdict::pass();
        }

        let Some(resolved) = resolve(policy, &message.channel_id, level) else {
            return Verdict::pass();
        };

        let rate = self.count_message(message, &resolved.spam).await;

        let input = CheckInput {
            message,
            content: NormalizedContent::new(&message.content),
            filenames: message.attachments.iter().map(|a| a.filename.clone()).collect(),
        };

        if let Some(verdict) = self.run_censor(&input, &resolved.censor, on_check) {
            return verdict;
        }

        if resolved.censor.filter_untrustworthy {
            on_check(Rule::Untrustworthy);
            if let Some(evidence) = self.lookup_untrustworthy(&input).await {
                return Verdict::fail(Rule::Untrustworthy, &evidence);
            }
        }

        let verdict = run_spam(&input, &resolved, rate.as_ref(), on_check);
        if verdict.rule == Some(Rule::MaxMessages) {
            if let Err(e) = self
                .limiter
                .clear(MESSAGES_NAMESPACE, &message.guild_id, &message.author.id)
                .await
            {
                warn!("Failed to clear message counter for {}: {}", message.author.id, e);
            }
        }

        verdict
    }

    /// Count this message towards the author's message rate.
    async fn count_message(&self, message: &IncomingMessage, spam: &SpamPolicy) -> Option<RateCheck> {
        let limit = spam.max_messages.unwrap_or(0);
        if limit == 0 {
            return None;
        }

        let window = match spam.max_messages_interval {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_MESSAGE_INTERVAL,
        };

        let check = self
            .limiter
            .check_and_increment(
                MESSAGES_NAMESPACE,
                &message.guild_id,
                &message.author.id,
                limit,
                window,
                spam.reset_on_continued_spam,
            )
            .await;

        Some(check)
    }

    fn run_censor(
        &self,
        input: &CheckInput<'_>,
        censor: &CensorPolicy,
        on_check: &mut (dyn FnMut(Rule) + Send),
    ) -> Option<Verdict> {
        for rule in CENSOR_ORDER {
            if !censor_enabled(rule, censor) {
                continue;
            }
            on_check(rule);
            if let Some(evidence) = self.censor_check(rule, input, censor) {
                return Some(Verdict::fail(rule, &evidence));
            }
        }
        None
    }

    fn censor_check(&self, rule: Rule, input: &CheckInput<'_>, censor: &CensorPolicy) -> Option<String> {
        let text = input.content.text.as_str();
        let lower = input.content.lower.as_str();

        match rule {
            Rule::Invite => censor::check_invites(
                text,
                list(&censor.invite_whitelist),
                list(&censor.invite_blacklist),
            ),
            Rule::Domain => censor::check_domains(
                text,
                list(&censor.domain_whitelist),
                list(&censor.domain_blacklist),
            ),
            Rule::String => censor::check_strings(lower, list(&censor.blocked_strings)),
            Rule::Substring => {
                censor::check_substrings(lower, &input.filenames, list(&censor.blocked_substrings))
            }
            Rule::Ip => censor::check_ips(text),
            Rule::Zalgo => censor::check_zalgo(&input.message.content),
            Rule::NonEnglish => censor::check_non_english(text),
            Rule::ObnoxiousUnicode => censor::check_obnoxious_unicode(text),
            Rule::Regex => censor
                .regex
                .as_deref()
                .and_then(|pattern| censor::check_regex(text, pattern, &self.regexes)),
            _ => None,
        }
    }

    /// Look up the whole message, its hosts and its words. Store errors and
    /// timeouts count as "not found".
    async fn lookup_untrustworthy(&self, input: &CheckInput<'_>) -> Option<String> {
        let store = self.untrustworthy.as_ref()?;

        let mut seen = HashSet::new();
        let fragments = std::iter::once(input.content.lower.trim().to_string())
            .chain(extract::extract_hosts(&input.content.lower))
            .chain(input.content.lower.split_whitespace().map(str::to_string))
            .filter(|f| f.chars().count() >= MIN_FRAGMENT_LEN)
            .filter(|f| seen.insert(f.clone()))
            .collect::<Vec<_>>();

        for fragment in fragments {
            match with_deadline(self.timeout, store.lookup(&fragment)).await {
                Ok(Some(entry)) => {
                    let category = if entry.category.is_empty() {
                        "flagged".to_string()
                    } else {
                        entry.category
                    };
                    return Some(format!("{} ({})", fragment, category));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Untrustworthy content lookup failed: {}", e);
                    return None;
                }
            }
        }

        None
    }
}

fn list(values: &Option<Vec<String>>) -> &[String] {
    values.as_deref().unwrap_or(&[])
}

fn censor_enabled(rule: Rule, censor: &CensorPolicy) -> bool {
    match rule {
        Rule::Invite => censor.filter_invites,
        Rule::Domain => censor.filter_domains,
        Rule::String => censor.filter_strings && !list(&censor.blocked_strings).is_empty(),
        Rule::Substring => censor.filter_strings && !list(&censor.blocked_substrings).is_empty(),
        Rule::Ip => censor.filter_ips,
        Rule::Zalgo => censor.filter_zalgo,
        Rule::NonEnglish => censor.filter_non_english,
        Rule::ObnoxiousUnicode => censor.filter_unicode,
        Rule::Regex => censor.filter_regex && censor.regex.as_deref().is_some_and(|p| !p.trim().is_empty()),
        _ => false,
    }
}

fn spam_limit(rule: Rule, spam: &SpamPolicy) -> u64 {
    let limit = match rule {
        Rule::MaxMessages => spam.max_messages,
        Rule::MaxNewlines => spam.max_newlines,
        Rule::MaxMentions => spam.max_mentions,
        Rule::MaxRoleMentions => spam.max_role_mentions,
        Rule::MaxLinks => spam.max_links,
        Rule::MaxUppercase => spam.max_uppercase_percent,
        Rule::MaxEmojis => spam.max_emojis,
        Rule::MaxAttachments => spam.max_attachments,
        Rule::MaxCharacters => spam.max_characters,
        _ => None,
    };
    limit.unwrap_or(0)
}

fn run_spam(
    input: &CheckInput<'_>,
    resolved: &ResolvedPolicy,
    rate: Option<&RateCheck>,
    on_check: &mut (dyn FnMut(Rule) + Send),
) -> Verdict {
    let spam = &resolved.spam;
    let message = input.message;
    let text = input.content.text.as_str();

    for rule in SPAM_ORDER {
        let limit = spam_limit(rule, spam);
        if limit == 0 {
            continue;
        }
        on_check(rule);

        let evidence = match rule {
            Rule::MaxMessages => rate
                .filter(|check| !check.ok)
                .map(|check| format!("{}/{}", check.count, limit)),
            Rule::MaxNewlines => spam::check_newlines(text, limit),
            Rule::MaxMentions => spam::check_mentions(&message.mentions, limit),
            Rule::MaxRoleMentions => spam::check_role_mentions(&message.role_mentions, limit),
            Rule::MaxLinks => spam::check_links(text, limit),
            Rule::MaxUppercase => {
                spam::check_uppercase(text, limit, spam.min_uppercase_length.unwrap_or(0))
            }
            Rule::MaxEmojis => spam::check_emojis(text, limit),
            Rule::MaxAttachments => spam::check_attachments(message.attachments.len(), limit),
            Rule::MaxCharacters => spam::check_characters(text, limit),
            _ => None,
        };

        if let Some(evidence) = evidence {
            return Verdict::fail(rule, &evidence);
        }
    }

    Verdict::pass()
}
