use crate::models::{PaymentIntent, TokenTransfer, TransactionRecord};
use std::str::FromStr;
use thiserror::Error;

/// How a payment reference is compared with a comment or forwarded payload.
///
/// `Substring` accepts any text containing the reference, which also admits
/// unrelated comments that happen to embed it. `Exact` requires equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceMatch {
    #[default]
    Substring,
    Exact,
}

#[derive(Debug, Error)]
#[error("Unknown reference match mode: {0} (expected `substring` or `exact`)")]
pub struct ParseReferenceMatchError(String);

impl FromStr for ReferenceMatch {
    type Err = ParseReferenceMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "substring" | "contains" => Ok(ReferenceMatch::Substring),
            "exact" => Ok(ReferenceMatch::Exact),
            other => Err(ParseReferenceMatchError(other.to_string())),
        }
    }
}

impl ReferenceMatch {
    pub fn matches(self, text: &str, reference: &str) -> bool {
        match self {
            ReferenceMatch::Substring => text == reference || text.contains(reference),
            ReferenceMatch::Exact => text == reference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Native,
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMatch {
    pub intent: PaymentIntent,
    pub kind: MatchKind,
    pub transaction_hash: Option<String>,
}

/// Decides whether a batch of ledger transactions settles any pending intent.
#[derive(Debug, Clone)]
pub struct PaymentMatcher {
    token_contract_address: String,
    mode: ReferenceMatch,
}

impl PaymentMatcher {
    pub fn new(token_contract_address: impl Into<String>, mode: ReferenceMatch) -> Self {
        Self {
            token_contract_address: token_contract_address.into(),
            mode,
        }
    }

    /// `intents` must be ordered newest first. For each intent every
    /// transaction is scanned for a native comment before any is scanned for a
    /// token transfer; the first hit wins.
    ///
    /// Native matches do not look at the transferred amount. Token matches
    /// require the configured contract and at least the expected amount.
    pub fn find_match(
        &self,
        transactions: &[TransactionRecord],
        intents: &[PaymentIntent],
    ) -> Option<PaymentMatch> {
        for intent in intents {
            if let Some(tx) = transactions
                .iter()
                .find(|tx| self.native_matches(tx, &intent.reference))
            {
                return Some(PaymentMatch {
                    intent: intent.clone(),
                    kind: MatchKind::Native,
                    transaction_hash: tx.hash.clone(),
                });
            }

            if let Some(tx) = transactions.iter().find(|tx| self.token_matches(tx, intent)) {
                return Some(PaymentMatch {
                    intent: intent.clone(),
                    kind: MatchKind::Token,
                    transaction_hash: tx.hash.clone(),
                });
            }
        }

        None
    }

    fn native_matches(&self, tx: &TransactionRecord, reference: &str) -> bool {
        tx.in_comment
            .iter()
            .chain(tx.out_messages.iter().filter_map(|msg| msg.comment.as_ref()))
            .any(|comment| self.mode.matches(comment, reference))
    }

    fn token_matches(&self, tx: &TransactionRecord, intent: &PaymentIntent) -> bool {
        tx.out_messages
            .iter()
            .filter_map(|msg| msg.token_transfer.as_ref())
            .any(|transfer| self.transfer_qualifies(transfer, intent))
    }

    fn transfer_qualifies(&self, transfer: &TokenTransfer, intent: &PaymentIntent) -> bool {
        if transfer.jetton_contract_address != self.token_contract_address {
            return false;
        }
        let Some(amount) = transfer.amount_units() else {
            tracing::debug!("Ignoring token transfer with amount {:?}", transfer.amount);
            return false;
        };
        amount >= u128::from(intent.expected_token_amount)
            && self.mode.matches(&transfer.forward_payload, &intent.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutboundMessage;
    use chrono::{Duration, Utc};

    const USDT: &str = "EQusdt";

    fn intent(reference: &str, age_secs: i64) -> PaymentIntent {
        PaymentIntent {
            reference: reference.to_string(),
            expected_native_amount: 1_000_000_000,
            expected_token_amount: 5_000_000,
            token_contract_address: USDT.to_string(),
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    fn inbound(hash: &str, comment: &str) -> TransactionRecord {
        TransactionRecord {
            hash: Some(hash.to_string()),
            in_comment: Some(comment.to_string()),
            out_messages: vec![],
        }
    }

    fn jetton(hash: &str, contract: &str, amount: &str, payload: &str) -> TransactionRecord {
        TransactionRecord {
            hash: Some(hash.to_string()),
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

    fn matcher() -> PaymentMatcher {
        PaymentMatcher::new(USDT, ReferenceMatch::Substring)
    }

    #[test]
    fn native_comment_matches_exactly_or_as_substring() {
        let intents = [intent("bot-7-100", 0)];

        let exact = matcher().find_match(&[inbound("a", "bot-7-100")], &intents);
        assert_eq!(exact.unwrap().kind, MatchKind::Native);

        let embedded = matcher().find_match(&[inbound("b", "pay bot-7-100 thanks")], &intents);
        assert!(embedded.is_some());

        assert!(matcher()
            .find_match(&[inbound("c", "bot-7-10")], &intents)
            .is_none());
    }

    #[test]
    fn outbound_comment_also_counts() {
        let tx = TransactionRecord {
            hash: Some("a".to_string()),
            in_comment: None,
            out_messages: vec![OutboundMessage {
                comment: Some("bot-7-100".to_string()),
                token_transfer: None,
            }],
        };
        assert!(matcher().find_match(&[tx], &[intent("bot-7-100", 0)]).is_some());
    }

    #[test]
    fn exact_mode_rejects_embedded_reference() {
        let strict = PaymentMatcher::new(USDT, ReferenceMatch::Exact);
        let intents = [intent("bot-7-100", 0)];
        assert!(strict
            .find_match(&[inbound("a", "x bot-7-100")], &intents)
            .is_none());
        assert!(strict
            .find_match(&[inbound("a", "bot-7-100")], &intents)
            .is_some());
    }

    #[test]
    fn token_transfer_requires_every_condition() {
        let intents = [intent("bot-7-100", 0)];

        let ok = matcher().find_match(&[jetton("t", USDT, "5000000", "bot-7-100")], &intents);
        assert_eq!(ok.unwrap().kind, MatchKind::Token);

        let overpaid = matcher().find_match(&[jetton("t", USDT, "9000000", "ref:bot-7-100")], &intents);
        assert!(overpaid.is_some());

        for tx in [
            jetton("t", "EQother", "5000000", "bot-7-100"),
            jetton("t", USDT, "4999999", "bot-7-100"),
            jetton("t", USDT, "5000000", "bot-7-999"),
            jetton("t", USDT, "five", "bot-7-100"),
        ] {
            assert!(matcher().find_match(&[tx], &intents).is_none());
        }
    }

    #[test]
    fn newest_intent_wins() {
        let intents = [intent("bot-7-200", 0), intent("bot-7-100", 60)];
        let txs = [inbound("old", "bot-7-100"), inbound("new", "bot-7-200")];

        let found = matcher().find_match(&txs, &intents).unwrap();
        assert_eq!(found.intent.reference, "bot-7-200");
        assert_eq!(found.transaction_hash.as_deref(), Some("new"));
    }

    #[test]
    fn native_pass_precedes_token_pass() {
        let intents = [intent("bot-7-100", 0)];
        let txs = [
            jetton("token", USDT, "5000000", "bot-7-100"),
            inbound("native", "bot-7-100"),
        ];

        let found = matcher().find_match(&txs, &intents).unwrap();
        assert_eq!(found.kind, MatchKind::Native);
        assert_eq!(found.transaction_hash.as_deref(), Some("native"));
    }

    #[test]
    fn parses_mode() {
        assert_eq!("exact".parse::<ReferenceMatch>().unwrap(), ReferenceMatch::Exact);
        assert_eq!(
            "Substring".parse::<ReferenceMatch>().unwrap(),
            ReferenceMatch::Substring
        );
        assert!("fuzzy".parse::<ReferenceMatch>().is_err());
    }
}
