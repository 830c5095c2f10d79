use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized view of one ledger transaction on the receiving address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: Option<String>,
    pub in_comment: Option<String>,
    pub out_messages: Vec<OutboundMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub comment: Option<String>,
    pub token_transfer: Option<TokenTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub jetton_contract_address: String,
    pub amount: String,
    pub forward_ton_amount: Option<String>,
    pub forward_payload: String,
}

impl TokenTransfer {
    /// `None` when the string-encoded amount is not an unsigned integer.
    pub fn amount_units(&self) -> Option<u128> {
        self.amount.trim().parse().ok()
    }
}

// Explorer API wire format

#[derive(Debug, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Option<Vec<Value>>,
}

impl TransactionsResponse {
    /// Decodes each entry on its own; entries with an unexpected shape are
    /// skipped so they cannot hide the rest of the batch.
    pub fn into_records(self) -> Vec<TransactionRecord> {
        self.transactions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RawTransaction>(entry) {
                Ok(raw) => Some(raw.into()),
                Err(e) => {
                    tracing::warn!("Skipping undecodable ledger transaction: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub in_msg: Option<RawMessage>,
    #[serde(default)]
    pub out_msgs: Option<Vec<RawMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub decoded_body: Option<RawDecodedBody>,
}

#[derive(Debug, Deserialize)]
pub struct RawDecodedBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub jetton_transfer: Option<RawJettonTransfer>,
}

#[derive(Debug, Deserialize)]
pub struct RawJettonTransfer {
    #[serde(default)]
    pub jetton_master_address: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub forward_ton_amount: Option<Value>,
    #[serde(default)]
    pub forward_payload: Option<Value>,
}

impl From<RawTransaction> for TransactionRecord {
    fn from(raw: RawTransaction) -> Self {
        Self {
            hash: raw.hash,
            in_comment: raw
                .in_msg
                .and_then(|msg| msg.decoded_body)
                .and_then(|body| body.text),
            out_messages: raw
                .out_msgs
                .unwrap_or_default()
                .into_iter()
                .map(OutboundMessage::from)
                .collect(),
        }
    }
}

impl From<RawMessage> for OutboundMessage {
    fn from(raw: RawMessage) -> Self {
        let Some(body) = raw.decoded_body else {
            return Self::default();
        };

        Self {
            comment: body.text,
            token_transfer: body.jetton_transfer.and_then(TokenTransfer::from_raw),
        }
    }
}

impl TokenTransfer {
    // A transfer body without contract or amount can never qualify
    fn from_raw(jt: RawJettonTransfer) -> Option<Self> {
        let jetton_contract_address = jt.jetton_master_address?;
        let amount = jt.amount.filter(|v| !v.is_null())?;
        Some(Self {
            jetton_contract_address,
            amount: value_to_string(&amount),
            forward_ton_amount: jt.forward_ton_amount.as_ref().map(value_to_string),
            forward_payload: jt
                .forward_payload
                .as_ref()
                .map(payload_text)
                .unwrap_or_default(),
        })
    }
}

// Amounts arrive either as JSON strings or bare numbers.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn payload_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("value").and_then(|inner| inner.get("text")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}
