use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An outstanding purchase attempt waiting for a matching ledger transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub reference: String,
    pub expected_native_amount: u64, // nanoTON
    pub expected_token_amount: u64,  // jetton smallest unit
    pub token_contract_address: String,
    pub created_at: DateTime<Utc>,
}

/// What the payer needs to build the transfer for an intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstructions {
    pub reference: String,
    pub receiving_address: String,
    pub native_amount: String,
    pub token_amount: String,
    pub token_contract_address: String,
    pub transfer_link: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentInstructions {
    pub fn new(intent: &PaymentIntent, receiving_address: &str) -> Self {
        Self {
            reference: intent.reference.clone(),
            receiving_address: receiving_address.to_string(),
            native_amount: intent.expected_native_amount.to_string(),
            token_amount: intent.expected_token_amount.to_string(),
            token_contract_address: intent.token_contract_address.clone(),
            transfer_link: format!(
                "ton://transfer/{}?amount={}&text={}",
                receiving_address, intent.expected_native_amount, intent.reference
            ),
            created_at: intent.created_at,
        }
    }
}
