//! Level resolution.

use std::collections::HashSet;
use std::sync::Arc;

use crate::database::models::LevelConfig;
use crate::message::Author;

/// Resolve a member's level.
///
/// An explicit per-user level wins; otherwise the highest level among the
/// member's roles; otherwise the guild default.
pub fn user_level(levels: &LevelConfig, author: &Author) -> i64 {
    if let Some(level) = levels.users.get(&author.id) {
        return *level;
    }

    author
        .roles
        .iter()
        .filter_map(|role| levels.roles.get(role))
        .copied()
        .max()
        .unwrap_or(levels.default)
}

/// Bot owners (from `OWNER_IDS`). They bypass every automod check.
#[derive(Debug, Clone, Default)]
pub struct Owners {
    ids: Arc<HashSet<String>>,
}

impl Owners {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: Arc::new(ids.into_iter().collect()),
        }
    }

    #[inline]
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }
}
