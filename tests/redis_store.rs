//! Runs against a live Redis. Start one and run with
//! `REDIS_URL=redis://127.0.0.1/ cargo test --test redis_store -- --ignored`.

use chrono::Duration;
use redis::AsyncCommands;
use sub_gate::{
    error::GateError,
    services::{RedisSubscriptionStore, SubscriptionStore},
};
use uuid::Uuid;

struct Fixture {
    store: RedisSubscriptionStore,
    raw: redis::aio::ConnectionManager,
    user_id: i64,
    reference: String,
}

impl Fixture {
    fn subscription_key(&self) -> String {
        format!("subscription:{}", self.user_id)
    }

    fn reference_key(&self) -> String {
        format!("subscription:ref:{}", self.reference)
    }

    async fn cleanup(mut self) {
        let keys = [self.subscription_key(), self.reference_key()];
        let _: () = self.raw.del(&keys[..]).await.unwrap();
    }
}

async fn fixture() -> Option<Fixture> {
    let url = std::env::var("REDIS_URL").ok()?;
    let store = RedisSubscriptionStore::connect(&url).await.unwrap();
    let raw = redis::Client::open(url.as_str())
        .unwrap()
        .get_connection_manager()
        .await
        .unwrap();

    // Keep runs apart from each other and from real data
    let id = Uuid::new_v4();
    let user_id = -i64::from(id.as_fields().0) - 1;

    Some(Fixture {
        store,
        raw,
        user_id,
        reference: format!("test-{}", id.simple()),
    })
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn reference_activates_once() {
    let Some(fx) = fixture().await else { return };

    let first = fx
        .store
        .create_or_extend_subscription(fx.user_id, &fx.reference, 30)
        .await
        .unwrap();
    let again = fx
        .store
        .create_or_extend_subscription(fx.user_id, &fx.reference, 30)
        .await
        .unwrap();

    assert_eq!(first, again);
    assert_eq!(first.expires_at - first.started_at, Duration::days(30));
    assert_eq!(
        fx.store.get_active_subscription(fx.user_id).await.unwrap(),
        Some(first)
    );

    fx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn unreadable_row_leaves_reference_unclaimed() {
    let Some(mut fx) = fixture().await else { return };

    let _: () = fx.raw.set(fx.subscription_key(), "not json").await.unwrap();

    let err = fx
        .store
        .create_or_extend_subscription(fx.user_id, &fx.reference, 30)
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Store(_)));

    let claimed: bool = fx.raw.exists(fx.reference_key()).await.unwrap();
    assert!(!claimed);

    // Once the row is repaired the same reference still activates
    let _: () = fx.raw.del(fx.subscription_key()).await.unwrap();
    let sub = fx
        .store
        .create_or_extend_subscription(fx.user_id, &fx.reference, 30)
        .await
        .unwrap();
    assert_eq!(sub.payment_reference, fx.reference);

    fx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn cancel_keeps_row_but_deactivates() {
    let Some(fx) = fixture().await else { return };

    fx.store
        .create_or_extend_subscription(fx.user_id, &fx.reference, 30)
        .await
        .unwrap();
    let cancelled = fx.store.cancel_subscription(fx.user_id).await.unwrap();

    assert!(cancelled.is_some());
    assert!(fx
        .store
        .get_active_subscription(fx.user_id)
        .await
        .unwrap()
        .is_none());
    assert!(fx.store.ping().await);

    fx.cleanup().await;
}
