use crate::{
    error::GateError,
    models::{PaymentIntent, Subscription},
    services::{Messenger, PaymentIntentRegistry, SubscriptionStore},
};
use std::sync::Arc;

/// Turns a matched intent into an active subscription.
pub struct SubscriptionActivator {
    store: Arc<dyn SubscriptionStore>,
    registry: Arc<PaymentIntentRegistry>,
    messenger: Arc<dyn Messenger>,
    duration_days: u32,
}

impl SubscriptionActivator {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        registry: Arc<PaymentIntentRegistry>,
        messenger: Arc<dyn Messenger>,
        duration_days: u32,
    ) -> Self {
        Self {
            store,
            registry,
            messenger,
            duration_days,
        }
    }

    /// Commits the subscription, then voids every pending intent of the user,
    /// then sends the onboarding messages once. A store failure leaves the
    /// intents in place so a later check can retry.
    pub async fn activate(
        &self,
        user_id: i64,
        intent: &PaymentIntent,
    ) -> Result<Subscription, GateError> {
        let subscription = self
            .store
            .create_or_extend_subscription(user_id, &intent.reference, self.duration_days)
            .await?;

        self.registry.clear_intents(user_id).await;

        tracing::info!(
            "Subscription activated for user {} until {} (ref {})",
            user_id,
            subscription.expires_at,
            intent.reference
        );

        if let Err(e) = self.messenger.deliver_confirmation(user_id, &subscription).await {
            tracing::warn!("Confirmation delivery to user {} failed: {}", user_id, e);
        }
        if let Err(e) = self.messenger.deliver_first_lesson(user_id).await {
            tracing::warn!("First lesson delivery to user {} failed: {}", user_id, e);
        }

        Ok(subscription)
    }
}
