//! In-memory collaborator doubles for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::MemoryCounterStore;
use crate::database::models::{GuildPolicy, StrikeRecord, UntrustworthyEntry, UntrustworthySet};
use crate::error::{GatewayError, StoreError};
use crate::gateway::{ChatGateway, Member};
use crate::stores::{CacheStore, PolicyStore, StrikeStore, UntrustworthyContentStore};

/// Cache that is always down.
pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<i64>, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: i64, _ttl: Option<Duration>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    async fn del(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }
}

/// In-memory counters whose first `failures` expire calls error out.
pub struct FlakyExpireCache {
    inner: MemoryCounterStore,
    failures: AtomicUsize,
}

impl FlakyExpireCache {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryCounterStore::new(),
            failures: AtomicUsize::new(failures),
        }
    }

    pub fn inner(&self) -> &MemoryCounterStore {
        &self.inner
    }
}

#[async_trait]
impl CacheStore for FlakyExpireCache {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.inner.incr(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("expire dropped".to_string()));
        }
        self.inner.expire(key, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.inner.del(key).await
    }
}

#[derive(Default)]
pub struct MemoryStrikeStore {
    records: Mutex<Vec<StrikeRecord>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStrikeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    pub fn records(&self) -> Vec<StrikeRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl StrikeStore for MemoryStrikeStore {
    async fn add_strike(&self, record: &StrikeRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("strike store offline".to_string()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn get_strikes_for_user(&self, guild_id: &str, user_id: &str) -> Result<Vec<StrikeRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("strike store offline".to_string()));
        }
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.guild_id == guild_id && r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_strikes_of_type(&self, guild_id: &str, user_id: &str, issuer: &str) -> Result<u64, StoreError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| !(r.guild_id == guild_id && r.user_id == user_id && r.issuer == issuer));
        Ok((before - records.len()) as u64)
    }
}

/// Gateway that records every call as `"<op>:<guild>:<user>[:<role>]"`.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<String>>,
    members: Mutex<HashMap<String, Member>>,
    banned: Mutex<HashSet<String>>,
    forbidden: Mutex<HashSet<String>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, user_id: &str, roles: &[&str]) {
        self.members.lock().insert(
            user_id.to_string(),
            Member {
                user_id: user_id.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
    }

    pub fn mark_banned(&self, user_id: &str) {
        self.banned.lock().insert(user_id.to_string());
    }

    /// Make every actuation against `user_id` fail with `Forbidden`.
    pub fn forbid(&self, user_id: &str) {
        self.forbidden.lock().insert(user_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn check_forbidden(&self, user_id: &str) -> Result<(), GatewayError> {
        if self.forbidden.lock().contains(user_id) {
            return Err(GatewayError::Forbidden(format!("cannot act on {}", user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), GatewayError> {
        self.calls.lock().push(format!("delete:{}:{}", channel_id, message_id));
        Ok(())
    }

    async fn add_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), GatewayError> {
        self.check_forbidden(user_id)?;
        self.calls.lock().push(format!("add_role:{}:{}:{}", guild_id, user_id, role_id));
        if let Some(member) = self.members.lock().get_mut(user_id) {
            member.roles.push(role_id.to_string());
        }
        Ok(())
    }

    async fn remove_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), GatewayError> {
        self.check_forbidden(user_id)?;
        self.calls.lock().push(format!("remove_role:{}:{}:{}", guild_id, user_id, role_id));
        if let Some(member) = self.members.lock().get_mut(user_id) {
            member.roles.retain(|r| r != role_id);
        }
        Ok(())
    }

    async fn ban(&self, guild_id: &str, user_id: &str, _reason: &str, _purge_window: Duration) -> Result<(), GatewayError> {
        self.check_forbidden(user_id)?;
        if !self.banned.lock().insert(user_id.to_string()) {
            return Err(GatewayError::AlreadyApplied);
        }
        self.calls.lock().push(format!("ban:{}:{}", guild_id, user_id));
        Ok(())
    }

    async fn unban(&self, guild_id: &str, user_id: &str, _reason: &str) -> Result<(), GatewayError> {
        if !self.banned.lock().remove(user_id) {
            return Err(GatewayError::NotFound(format!("ban for {}", user_id)));
        }
        self.calls.lock().push(format!("unban:{}:{}", guild_id, user_id));
        Ok(())
    }

    async fn fetch_member(&self, _guild_id: &str, user_id: &str) -> Result<Option<Member>, GatewayError> {
        Ok(self.members.lock().get(user_id).cloned())
    }

    async fn send_direct_message(&self, user_id: &str, _content: &str) -> Result<(), GatewayError> {
        self.calls.lock().push(format!("dm:{}", user_id));
        Ok(())
    }
}

pub struct StaticUntrustworthy {
    set: UntrustworthySet,
}

impl StaticUntrustworthy {
    pub fn new(entries: Vec<UntrustworthyEntry>) -> Self {
        Self {
            set: UntrustworthySet::build(entries),
        }
    }
}

#[async_trait]
impl UntrustworthyContentStore for StaticUntrustworthy {
    async fn lookup(&self, fragment: &str) -> Result<Option<UntrustworthyEntry>, StoreError> {
        Ok(self.set.find(fragment).cloned())
    }
}

/// Policy store over a fixed map; unknown guilds get a disabled policy.
#[derive(Default)]
pub struct StaticPolicies {
    policies: Mutex<HashMap<String, GuildPolicy>>,
    unavailable: AtomicBool,
}

impl StaticPolicies {
    pub fn new(policies: impl IntoIterator<Item = GuildPolicy>) -> Self {
        Self {
            policies: Mutex::new(policies.into_iter().map(|p| (p.guild_id.clone(), p)).collect()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn unavailable() -> Self {
        let store = Self::default();
        store.unavailable.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl PolicyStore for StaticPolicies {
    async fn get_policy(&self, guild_id: &str) -> Result<GuildPolicy, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("policy store offline".to_string()));
        }
        Ok(self
            .policies
            .lock()
            .get(guild_id)
            .cloned()
            .unwrap_or_else(|| GuildPolicy::new(guild_id)))
    }
}
