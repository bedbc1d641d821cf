//! Payment records and PayU request / response signing.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::PaymentStatus;

pub const PROVIDER_PAYU: &str = "payu";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_payment_id: String,
    pub amount: BigDecimal,
    pub status: PaymentStatus,
    pub raw_response: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub id: Uuid,
    pub provider: String,
    pub provider_payment_id: String,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct PayuCredentials {
    pub merchant_key: String,
    pub salt: String,
}

/// Transaction id in the `TXN<millis><9 chars>` shape the gateway accepts.
pub fn new_transaction_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("TXN{}{}", now.timestamp_millis(), suffix)
}

/// Fields PayU signs on the way in. The user-defined fields are always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayuRequest {
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
}

fn sha512_hex(input: &str) -> String {
    hex::encode(sha512_bytes(input))
}

/// `sha512(key|txnid|amount|productinfo|firstname|email|udf1..udf5||||||salt)`
pub fn request_hash(creds: &PayuCredentials, req: &PayuRequest) -> String {
    sha512_hex(&format!(
        "{}|{}|{}|{}|{}|{}|||||||||||{}",
        creds.merchant_key,
        req.txnid,
        req.amount,
        req.productinfo,
        req.firstname,
        req.email,
        creds.salt
    ))
}

/// Gateway callback body. Everything except `hash` feeds the reverse hash.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub txnid: String,
    pub status: String,
    pub amount: String,
    #[serde(default)]
    pub productinfo: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub email: String,
    pub hash: String,
}

impl WebhookPayload {
    pub fn outcome(&self) -> PaymentStatus {
        if self.status.eq_ignore_ascii_case("success") {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        }
    }

    pub fn amount(&self) -> Result<BigDecimal, DomainError> {
        BigDecimal::from_str(self.amount.trim())
            .map_err(|_| DomainError::InvalidInput(format!("invalid amount '{}'", self.amount)))
    }
}

/// `sha512(salt|status||||||udf5..udf1|email|firstname|productinfo|amount|txnid|key)`
pub fn response_hash(creds: &PayuCredentials, payload: &WebhookPayload) -> String {
    sha512_hex(&response_input(creds, payload))
}

fn response_input(creds: &PayuCredentials, payload: &WebhookPayload) -> String {
    format!(
        "{}|{}|||||||||||{}|{}|{}|{}|{}|{}",
        creds.salt,
        payload.status,
        payload.email,
        payload.firstname,
        payload.productinfo,
        payload.amount,
        payload.txnid,
        creds.merchant_key
    )
}

fn sha512_bytes(input: &str) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(input.as_bytes());
    hasher.finalize().to_vec()
}

/// Equality whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn verify_webhook(creds: &PayuCredentials, payload: &WebhookPayload) -> Result<(), DomainError> {
    let mismatch = || DomainError::Unauthorized("payment callback signature mismatch".to_string());
    let provided = hex::decode(payload.hash.trim()).map_err(|_| mismatch())?;
    let expected = sha512_bytes(&response_input(creds, payload));
    if constant_time_eq(&expected, &provided) {
        Ok(())
    } else {
        Err(mismatch())
    }
}
