use crate::services::{ChainTransactionFetcher, PaymentIntentRegistry, PaymentMatch, PaymentMatcher};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Polling schedule for one verification run. Delays are fixed between
/// attempts; there is no backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub inter_attempt_delay: Duration,
    pub max_attempts: u32,
    pub fetch_limit: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            inter_attempt_delay: Duration::from_secs(5),
            max_attempts: 3,
            fetch_limit: 20,
        }
    }
}

impl RetryPolicy {
    /// Total time spent sleeping when every attempt runs, fetch time excluded.
    pub fn sleep_budget(&self) -> Duration {
        self.initial_delay + self.inter_attempt_delay * self.max_attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Matched(PaymentMatch),
    /// Every attempt finished without a match; the last one fetched fine.
    NotFound,
    /// The last attempt could not reach the ledger.
    ServiceUnavailable,
}

/// State of one check invocation, kept for logging.
#[derive(Debug)]
pub struct VerificationRun {
    pub user_id: i64,
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
}

pub struct RetryController {
    fetcher: Arc<dyn ChainTransactionFetcher>,
    matcher: PaymentMatcher,
    registry: Arc<PaymentIntentRegistry>,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(
        fetcher: Arc<dyn ChainTransactionFetcher>,
        matcher: PaymentMatcher,
        registry: Arc<PaymentIntentRegistry>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            matcher,
            registry,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run(&self, user_id: i64) -> RetryOutcome {
        let mut run = VerificationRun {
            user_id,
            attempt: 0,
            started_at: Utc::now(),
        };
        let max_attempts = self.policy.max_attempts.max(1);

        tokio::time::sleep(self.policy.initial_delay).await;

        loop {
            run.attempt += 1;
            let last = run.attempt >= max_attempts;

            match self.fetcher.fetch_recent(self.policy.fetch_limit).await {
                Ok(transactions) => {
                    let intents = self.registry.get_intents(user_id).await;
                    if let Some(found) = self.matcher.find_match(&transactions, &intents) {
                        tracing::info!(
                            user_id = run.user_id,
                            attempt = run.attempt,
                            reference = %found.intent.reference,
                            kind = ?found.kind,
                            tx = ?found.transaction_hash,
                            "Payment matched"
                        );
                        return RetryOutcome::Matched(found);
                    }

                    tracing::debug!(
                        "No matching payment for user {} on attempt {}/{} ({} transactions)",
                        run.user_id,
                        run.attempt,
                        max_attempts,
                        transactions.len()
                    );

                    if last {
                        tracing::info!(
                            "Payment for user {} not found after {} attempts ({}s)",
                            run.user_id,
                            run.attempt,
                            (Utc::now() - run.started_at).num_seconds()
                        );
                        return RetryOutcome::NotFound;
                    }
                }
                Err(e) => {
                    if last {
                        tracing::error!(
                            "Ledger unavailable for user {} on final attempt {}: {}",
                            run.user_id,
                            run.attempt,
                            e
                        );
                        return RetryOutcome::ServiceUnavailable;
                    }
                    tracing::warn!(
                        "Ledger fetch failed for user {} on attempt {}/{}: {}",
                        run.user_id,
                        run.attempt,
                        max_attempts,
                        e
                    );
                }
            }

            tokio::time::sleep(self.policy.inter_attempt_delay).await;
        }
    }
}
