use crate::{
    error::GateError,
    models::{PaymentIntent, Subscription},
    services::{
        ConcurrencyGuard, PaymentIntentRegistry, RetryController, RetryOutcome, StatEvent,
        SubscriptionActivator, VerificationStats,
    },
};
use std::sync::Arc;
use std::time::Duration;

/// Amounts a new purchase must pay.
#[derive(Debug, Clone)]
pub struct PurchaseTerms {
    pub native_amount: u64,
    pub token_amount: u64,
    pub token_contract_address: String,
}

/// Result of a completed check, one user-facing message each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Activated(Subscription),
    NotFound,
    ServiceUnavailable,
    DeadlineExceeded,
}

impl CheckOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            CheckOutcome::Activated(_) => "activated",
            CheckOutcome::NotFound => "not_found",
            CheckOutcome::ServiceUnavailable => "service_unavailable",
            CheckOutcome::DeadlineExceeded => "deadline_exceeded",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CheckOutcome::Activated(sub) => format!(
                "Payment confirmed. Your subscription is active until {}.",
                sub.expires_at.format("%Y-%m-%d")
            ),
            CheckOutcome::NotFound => {
                "We could not find your payment yet. Transfers can take a few minutes, please check again later.".to_string()
            }
            CheckOutcome::ServiceUnavailable => {
                "The payment network is not responding right now. Please try again in a few minutes.".to_string()
            }
            CheckOutcome::DeadlineExceeded => {
                "Checking your payment took too long. Please try again in a few minutes.".to_string()
            }
        }
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            CheckOutcome::Activated(sub) => Some(sub),
            _ => None,
        }
    }
}

/// Runs payment checks: one per user at a time, polled under the retry
/// policy, bounded by an overall deadline, activated exactly once on a match.
pub struct PaymentVerifier {
    guard: ConcurrencyGuard,
    registry: Arc<PaymentIntentRegistry>,
    retry: RetryController,
    activator: SubscriptionActivator,
    stats: Arc<VerificationStats>,
    run_deadline: Duration,
}

impl PaymentVerifier {
    pub fn new(
        registry: Arc<PaymentIntentRegistry>,
        retry: RetryController,
        activator: SubscriptionActivator,
        stats: Arc<VerificationStats>,
        run_deadline: Duration,
    ) -> Self {
        Self {
            guard: ConcurrencyGuard::new(),
            registry,
            retry,
            activator,
            stats,
            run_deadline,
        }
    }

    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    pub fn stats(&self) -> &VerificationStats {
        &self.stats
    }

    pub async fn start_purchase(&self, user_id: i64, terms: &PurchaseTerms) -> PaymentIntent {
        self.registry
            .create_intent(
                user_id,
                terms.native_amount,
                terms.token_amount,
                &terms.token_contract_address,
            )
            .await
    }

    pub async fn check_payment(&self, user_id: i64) -> Result<CheckOutcome, GateError> {
        let Some(_permit) = self.guard.try_acquire(user_id) else {
            self.stats.record(StatEvent::RejectedDuplicate);
            return Err(GateError::DuplicateCheckInFlight(user_id));
        };

        if self.registry.get_intents(user_id).await.is_empty() {
            self.stats.record(StatEvent::RejectedNoIntent);
            return Err(GateError::NoPendingIntent(user_id));
        }

        self.stats.record(StatEvent::CheckStarted);
        tracing::info!("Checking payment for user {}", user_id);

        let polled = tokio::time::timeout(self.run_deadline, self.retry.run(user_id)).await;

        let outcome = match polled {
            Ok(RetryOutcome::Matched(found)) => {
                match self.activator.activate(user_id, &found.intent).await {
                    Ok(subscription) => CheckOutcome::Activated(subscription),
                    Err(e) => {
                        self.stats.record(StatEvent::StoreFailed);
                        return Err(e);
                    }
                }
            }
            Ok(RetryOutcome::NotFound) => CheckOutcome::NotFound,
            Ok(RetryOutcome::ServiceUnavailable) => CheckOutcome::ServiceUnavailable,
            Err(_) => {
                tracing::warn!(
                    "Payment check for user {} exceeded deadline of {:?}",
                    user_id,
                    self.run_deadline
                );
                CheckOutcome::DeadlineExceeded
            }
        };

        self.stats.record(match outcome {
            CheckOutcome::Activated(_) => StatEvent::Activated,
            CheckOutcome::NotFound => StatEvent::NotFound,
            CheckOutcome::ServiceUnavailable => StatEvent::ServiceUnavailable,
            CheckOutcome::DeadlineExceeded => StatEvent::DeadlineExceeded,
        });

        Ok(outcome)
    }
}
