use crate::{
    error::GateError,
    models::{Subscription, SubscriptionStatus},
};
use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence for subscriptions.
///
/// `create_or_extend_subscription` is idempotent per payment reference: a
/// reference that already paid for a period returns the current subscription
/// without extending it again.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn create_or_extend_subscription(
        &self,
        user_id: i64,
        reference: &str,
        days: u32,
    ) -> Result<Subscription, GateError>;

    async fn cancel_subscription(&self, user_id: i64) -> Result<Option<Subscription>, GateError>;

    async fn get_active_subscription(&self, user_id: i64)
        -> Result<Option<Subscription>, GateError>;

    async fn ping(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct MemoryState {
    subscriptions: HashMap<i64, Subscription>,
    used_references: HashSet<String>,
}

/// Process-local store, used when Redis is not configured and in tests.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn create_or_extend_subscription(
        &self,
        user_id: i64,
        reference: &str,
        days: u32,
    ) -> Result<Subscription, GateError> {
        let mut state = self.state.write().await;

        if state.used_references.contains(reference) {
            tracing::warn!("Reference {} already activated, not extending", reference);
            return state
                .subscriptions
                .get(&user_id)
                .cloned()
                .ok_or_else(|| GateError::Store(format!("reference {} belongs to another user", reference)));
        }

        let updated = Subscription::create_or_extend(
            state.subscriptions.get(&user_id),
            user_id,
            reference,
            days,
            Utc::now(),
        );
        state.used_references.insert(reference.to_string());
        state.subscriptions.insert(user_id, updated.clone());
        Ok(updated)
    }

    async fn cancel_subscription(&self, user_id: i64) -> Result<Option<Subscription>, GateError> {
        let mut state = self.state.write().await;
        Ok(state.subscriptions.get_mut(&user_id).map(|sub| {
            sub.status = SubscriptionStatus::Cancelled;
            sub.clone()
        }))
    }

    async fn get_active_subscription(
        &self,
        user_id: i64,
    ) -> Result<Option<Subscription>, GateError> {
        let state = self.state.read().await;
        let now = Utc::now();
        Ok(state
            .subscriptions
            .get(&user_id)
            .filter(|sub| sub.is_active_at(now))
            .cloned())
    }
}

/// Redis-backed store. Subscriptions are JSON values under
/// `subscription:{user_id}`; each paid reference is claimed once with `SET NX`
/// under `subscription:ref:{reference}`.
pub struct RedisSubscriptionStore {
    redis: redis::aio::ConnectionManager,
}

impl RedisSubscriptionStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = client.get_connection_manager().await?;
        tracing::info!("Redis connected successfully");
        Ok(Self { redis })
    }

    fn subscription_key(user_id: i64) -> String {
        format!("subscription:{}", user_id)
    }

    fn reference_key(reference: &str) -> String {
        format!("subscription:ref:{}", reference)
    }

    async fn load(&self, user_id: i64) -> Result<Option<Subscription>, GateError> {
        let mut redis = self.redis.clone();
        let raw: Option<String> = redis.get(Self::subscription_key(user_id)).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    /// Gives a reference back so a later check can retry the activation.
    async fn release_claim(&self, reference: &str) {
        let mut redis = self.redis.clone();
        if let Err(e) = redis.del::<_, ()>(Self::reference_key(reference)).await {
            tracing::error!(
                reference = reference,
                error = %e,
                "Failed to release reference claim, activation for it will not be retried"
            );
        }
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), GateError> {
        let mut redis = self.redis.clone();
        let json = serde_json::to_string(subscription)?;
        redis
            .set::<_, _, ()>(Self::subscription_key(subscription.user_id), json)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for RedisSubscriptionStore {
    async fn create_or_extend_subscription(
        &self,
        user_id: i64,
        reference: &str,
        days: u32,
    ) -> Result<Subscription, GateError> {
        // Read first: a failed read must not leave the reference claimed
        let current = self.load(user_id).await?;

        let mut redis = self.redis.clone();
        let claimed: bool = redis.set_nx(Self::reference_key(reference), user_id).await?;
        if !claimed {
            tracing::warn!("Reference {} already activated, not extending", reference);
            return current.ok_or_else(|| {
                GateError::Store(format!("reference {} belongs to another user", reference))
            });
        }

        let updated =
            Subscription::create_or_extend(current.as_ref(), user_id, reference, days, Utc::now());
        if let Err(e) = self.save(&updated).await {
            self.release_claim(reference).await;
            return Err(e);
        }
        Ok(updated)
    }

    async fn cancel_subscription(&self, user_id: i64) -> Result<Option<Subscription>, GateError> {
        let Some(mut sub) = self.load(user_id).await? else {
            return Ok(None);
        };
        sub.status = SubscriptionStatus::Cancelled;
        self.save(&sub).await?;
        Ok(Some(sub))
    }

    async fn get_active_subscription(
        &self,
        user_id: i64,
    ) -> Result<Option<Subscription>, GateError> {
        let now = Utc::now();
        Ok(self.load(user_id).await?.filter(|sub| sub.is_active_at(now)))
    }

    async fn ping(&self) -> bool {
        let mut redis = self.redis.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut redis)
            .await
            .is_ok()
    }
}
