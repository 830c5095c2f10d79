#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sub_gate::{
    error::{FetchError, GateError},
    models::{OutboundMessage, PaymentIntent, Subscription, TokenTransfer, TransactionRecord},
    services::*,
};

pub const USER: i64 = 7;
pub const USDT: &str = "EQusdt-master";
pub const DAYS: u32 = 30;

/// One scripted fetch result.
pub enum Step {
    Batch(Vec<TransactionRecord>),
    Fail,
}

/// Replays scripted batches in order; once the script runs out it keeps
/// returning empty batches.
pub struct ScriptedFetcher {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedFetcher {
    pub fn new(steps: Vec<Step>) -> Self {
        Self::with_latency(steps, Duration::ZERO)
    }

    pub fn with_latency(steps: Vec<Step>, latency: Duration) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            latency,
        }
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainTransactionFetcher for ScriptedFetcher {
    async fn fetch_recent(&self, _limit: usize) -> Result<Vec<TransactionRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Batch(batch)) => Ok(batch),
            Some(Step::Fail) => Err(FetchError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub confirmations: Mutex<Vec<i64>>,
    pub lessons: Mutex<Vec<i64>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver_confirmation(&self, user_id: i64, _sub: &Subscription) -> anyhow::Result<()> {
        self.confirmations.lock().unwrap().push(user_id);
        Ok(())
    }

    async fn deliver_first_lesson(&self, user_id: i64) -> anyhow::Result<()> {
        self.lessons.lock().unwrap().push(user_id);
        Ok(())
    }
}

/// Messenger whose deliveries always fail.
pub struct BrokenMessenger;

#[async_trait]
impl Messenger for BrokenMessenger {
    async fn deliver_confirmation(&self, _user_id: i64, _sub: &Subscription) -> anyhow::Result<()> {
        anyhow::bail!("chat platform down")
    }

    async fn deliver_first_lesson(&self, _user_id: i64) -> anyhow::Result<()> {
        anyhow::bail!("chat platform down")
    }
}

/// Store that rejects every write.
pub struct FailingStore;

#[async_trait]
impl SubscriptionStore for FailingStore {
    async fn create_or_extend_subscription(
        &self,
        _user_id: i64,
        _reference: &str,
        _days: u32,
    ) -> Result<Subscription, GateError> {
        Err(GateError::Store("write refused".to_string()))
    }

    async fn cancel_subscription(&self, _user_id: i64) -> Result<Option<Subscription>, GateError> {
        Ok(None)
    }

    async fn get_active_subscription(
        &self,
        _user_id: i64,
    ) -> Result<Option<Subscription>, GateError> {
        Ok(None)
    }
}

pub fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        initial_delay: Duration::ZERO,
        inter_attempt_delay: Duration::from_millis(1),
        max_attempts: 3,
        fetch_limit: 20,
    }
}

pub struct Harness {
    pub verifier: Arc<PaymentVerifier>,
    pub registry: Arc<PaymentIntentRegistry>,
    pub store: Arc<InMemorySubscriptionStore>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub messenger: Arc<RecordingMessenger>,
}

pub fn harness(fetcher: ScriptedFetcher) -> Harness {
    harness_with(fetcher, quick_policy(), Duration::from_secs(10))
}

pub fn harness_with(fetcher: ScriptedFetcher, policy: RetryPolicy, deadline: Duration) -> Harness {
    let registry = Arc::new(PaymentIntentRegistry::new("bot"));
    let store = Arc::new(InMemorySubscriptionStore::new());
    let fetcher = Arc::new(fetcher);
    let messenger = Arc::new(RecordingMessenger::default());

    let retry = RetryController::new(
        fetcher.clone(),
        PaymentMatcher::new(USDT, ReferenceMatch::Substring),
        registry.clone(),
        policy,
    );
    let activator =
        SubscriptionActivator::new(store.clone(), registry.clone(), messenger.clone(), DAYS);
    let verifier = Arc::new(PaymentVerifier::new(
        registry.clone(),
        retry,
        activator,
        Arc::new(VerificationStats::new()),
        deadline,
    ));

    Harness {
        verifier,
        registry,
        store,
        fetcher,
        messenger,
    }
}

pub fn intent(reference: &str) -> PaymentIntent {
    PaymentIntent {
        reference: reference.to_string(),
        expected_native_amount: 1_000_000_000,
        expected_token_amount: 5_000_000,
        token_contract_address: USDT.to_string(),
        created_at: Utc::now(),
    }
}

pub fn comment_tx(comment: &str) -> TransactionRecord {
    TransactionRecord {
        hash: Some(format!("tx-{}", comment)),
        in_comment: Some(comment.to_string()),
        out_messages: vec![],
    }
}

pub fn jetton_tx(contract: &str, amount: &str, payload: &str) -> TransactionRecord {
    TransactionRecord {
        hash: Some(format!("jt-{}", payload)),
        in_comment: None,
        out_messages: vec![OutboundMessage {
            comment: None,
            token_transfer: Some(TokenTransfer {
                jetton_contract_address: contract.to_string(),
                amount: amount.to_string(),
                forward_ton_amount: Some("1".to_string()),
                forward_payload: payload.to_string(),
            }),
        }],
    }
}
