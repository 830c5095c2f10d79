pub mod activator;
pub mod guard;
pub mod intents;
pub mod ledger;
pub mod matcher;
pub mod messenger;
pub mod retry;
pub mod stats;
pub mod store;
pub mod verifier;

pub use activator::SubscriptionActivator;
pub use guard::{CheckPermit, ConcurrencyGuard};
pub use intents::{PaymentIntentRegistry, MAX_PENDING_INTENTS};
pub use ledger::{ChainTransactionFetcher, TonApiFetcher};
pub use matcher::{MatchKind, PaymentMatch, PaymentMatcher, ReferenceMatch};
pub use messenger::{LoggingMessenger, Messenger, TelegramMessenger};
pub use retry::{RetryController, RetryOutcome, RetryPolicy, VerificationRun};
pub use stats::{StatEvent, VerificationStats};
pub use store::{InMemorySubscriptionStore, RedisSubscriptionStore, SubscriptionStore};
pub use verifier::{CheckOutcome, PaymentVerifier, PurchaseTerms};
