use crate::models::PaymentIntent;
use chrono::Utc;
use moka::future::Cache;
use uuid::Uuid;

/// Maximum outstanding intents kept per user; older ones are evicted first.
pub const MAX_PENDING_INTENTS: usize = 3;

/// Per-user store of outstanding payment intents.
///
/// Each user's set is kept oldest-first inside a moka entry. All mutations go
/// through moka's per-key compute API so concurrent purchases by one user are
/// applied one after another. Intents never expire by age; only capacity
/// eviction removes an unmatched intent.
pub struct PaymentIntentRegistry {
    intents: Cache<i64, Vec<PaymentIntent>>,
    reference_prefix: String,
}

impl PaymentIntentRegistry {
    pub fn new(reference_prefix: impl Into<String>) -> Self {
        Self {
            intents: Cache::builder().build(),
            reference_prefix: reference_prefix.into(),
        }
    }

    pub async fn create_intent(
        &self,
        user_id: i64,
        expected_native_amount: u64,
        expected_token_amount: u64,
        token_contract_address: &str,
    ) -> PaymentIntent {
        let created_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let intent = PaymentIntent {
            reference: format!(
                "{}-{}-{}-{}",
                self.reference_prefix,
                user_id,
                created_at.timestamp_millis(),
                &suffix[..8]
            ),
            expected_native_amount,
            expected_token_amount,
            token_contract_address: token_contract_address.to_string(),
            created_at,
        };

        self.push(user_id, intent.clone()).await;

        tracing::info!(
            "Payment intent {} created for user {}",
            intent.reference,
            user_id
        );

        intent
    }

    /// Appends an already built intent, evicting the oldest beyond capacity.
    pub async fn push(&self, user_id: i64, intent: PaymentIntent) {
        self.intents
            .entry(user_id)
            .and_upsert_with(|existing| {
                let mut set = existing.map(|entry| entry.into_value()).unwrap_or_default();
                set.push(intent);
                if set.len() > MAX_PENDING_INTENTS {
                    let overflow = set.len() - MAX_PENDING_INTENTS;
                    for evicted in set.drain(..overflow) {
                        tracing::debug!(
                            "Evicted intent {} for user {} (capacity {})",
                            evicted.reference,
                            user_id,
                            MAX_PENDING_INTENTS
                        );
                    }
                }
                std::future::ready(set)
            })
            .await;
    }

    /// Outstanding intents, most recently created first.
    pub async fn get_intents(&self, user_id: i64) -> Vec<PaymentIntent> {
        let mut set = self.intents.get(&user_id).await.unwrap_or_default();
        set.reverse();
        set
    }

    pub async fn clear_intents(&self, user_id: i64) {
        self.intents.invalidate(&user_id).await;
        tracing::debug!("Cleared pending intents for user {}", user_id);
    }
}
