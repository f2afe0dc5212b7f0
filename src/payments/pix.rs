//! Pix payload generation (EMV "copia e cola" format).
//!
//! # Responsibilities
//! - Normalize and cap the merchant/transaction text fields
//! - Assemble the TLV payload with the br.gov.bcb.pix account field
//! - Append the CRC-16/CCITT-FALSE checksum
//!
//! # Design Decisions
//! - The payload string is the product; QR image rendering is left to
//!   downstream consumers
//! - Text fields are folded to ASCII upper-case alphanumerics, matching
//!   what acquirers accept without escaping

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::payments::store::{PaymentMethod, PaymentStore};
use crate::payments::PaymentError;
use crate::resilience::Operation;

const MAX_MERCHANT_NAME: usize = 20;
const MAX_MERCHANT_CITY: usize = 15;
const MAX_TRANSACTION_ID: usize = 25;

/// Request body for Pix payload generation.
#[derive(Debug, Clone, Deserialize)]
pub struct PixRequest {
    pub merchant_name: String,
    pub pix_key: String,
    pub amount: f64,
    pub merchant_city: String,
    pub transaction_id: String,
    /// Testing hook: when set, the operation fails without generating.
    #[serde(default)]
    pub force_failure: bool,
}

/// Generated Pix document.
#[derive(Debug, Clone, Serialize)]
pub struct PixDocument {
    pub transaction_id: String,
    pub payload: String,
    pub amount: f64,
}

/// One EMV TLV field: two-digit id, two-digit length, value.
fn emv_field(id: u8, value: &str) -> String {
    format!("{:02}{:02}{}", id, value.len(), value)
}

/// Fold accented Latin letters to ASCII, uppercase, and strip everything
/// that is not A-Z or 0-9.
fn normalize(text: &str) -> String {
    text.chars()
        .filter_map(fold_ascii)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn fold_ascii(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' | 'Ç' => 'C',
        'ñ' | 'Ñ' => 'N',
        c if c.is_ascii() => c.to_ascii_uppercase(),
        _ => return None,
    };
    Some(folded)
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF), as required by the
/// Pix payload specification.
fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// A validated Pix charge ready for payload assembly.
#[derive(Debug, Clone)]
pub struct Pix {
    merchant_name: String,
    pix_key: String,
    amount: f64,
    merchant_city: String,
    transaction_id: String,
}

impl Pix {
    pub fn new(
        merchant_name: &str,
        pix_key: &str,
        amount: f64,
        merchant_city: &str,
        transaction_id: &str,
    ) -> Result<Self, PaymentError> {
        let pix_key = pix_key.trim().to_lowercase();
        if pix_key.is_empty() {
            return Err(PaymentError::MissingField("pix_key"));
        }
        if !(amount > 0.0) {
            return Err(PaymentError::InvalidAmount(amount));
        }

        let mut transaction_id = normalize(transaction_id);
        transaction_id.truncate(MAX_TRANSACTION_ID);
        if transaction_id.is_empty() {
            return Err(PaymentError::MissingField("transaction_id"));
        }

        let mut merchant_name = normalize(merchant_name);
        merchant_name.truncate(MAX_MERCHANT_NAME);
        if merchant_name.is_empty() {
            return Err(PaymentError::MissingField("merchant_name"));
        }

        let mut merchant_city = normalize(merchant_city);
        merchant_city.truncate(MAX_MERCHANT_CITY);
        if merchant_city.is_empty() {
            return Err(PaymentError::MissingField("merchant_city"));
        }

        Ok(Self {
            merchant_name,
            pix_key,
            amount,
            merchant_city,
            transaction_id,
        })
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Assemble the full payload, CRC included.
    pub fn payload(&self) -> String {
        let account = format!(
            "{}{}",
            emv_field(0, "br.gov.bcb.pix"),
            emv_field(1, &self.pix_key)
        );
        let additional = emv_field(5, &self.transaction_id);

        let mut payload = String::new();
        payload.push_str(&emv_field(0, "01"));
        payload.push_str(&emv_field(26, &account));
        payload.push_str(&emv_field(52, "0000"));
        payload.push_str(&emv_field(53, "986")); // BRL
        payload.push_str(&emv_field(54, &format!("{:.2}", self.amount)));
        payload.push_str(&emv_field(58, "BR"));
        payload.push_str(&emv_field(59, &self.merchant_name));
        payload.push_str(&emv_field(60, &self.merchant_city));
        payload.push_str(&emv_field(62, &additional));
        // The CRC covers everything up to and including its own "6304"
        // id+length prefix.
        payload.push_str("6304");
        let crc = crc16_ccitt(payload.as_bytes());
        payload.push_str(&format!("{crc:04X}"));
        payload
    }
}

/// Pix generation as a guarded operation.
pub struct PixOperation {
    store: Arc<PaymentStore>,
}

impl PixOperation {
    pub fn new(store: Arc<PaymentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation for PixOperation {
    type Input = PixRequest;
    type Value = PixDocument;
    type Error = PaymentError;

    async fn invoke(&self, request: PixRequest) -> Result<PixDocument, PaymentError> {
        if request.force_failure {
            return Err(PaymentError::Forced);
        }

        let pix = Pix::new(
            &request.merchant_name,
            &request.pix_key,
            request.amount,
            &request.merchant_city,
            &request.transaction_id,
        )?;
        let document = PixDocument {
            transaction_id: pix.transaction_id().to_string(),
            payload: pix.payload(),
            amount: request.amount,
        };

        self.store
            .record_generated(&document.transaction_id, PaymentMethod::Pix, request.amount);
        tracing::info!(
            transaction_id = %document.transaction_id,
            amount = request.amount,
            "Pix payload generated"
        );
        Ok(document)
    }
}
