//! Bank-slip (boleto) document generation.
//!
//! # Responsibilities
//! - Assemble the 44-digit Febraban barcode for a Santander slip
//! - Derive the 47-digit digitable line with its check digits
//! - Compute the due-date factor
//!
//! # Design Decisions
//! - The document data (barcode + digitable line) is the product; PDF
//!   rendering is left to downstream consumers
//! - Beneficiary identity comes from configuration, payer identity from
//!   the request

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::schema::PaymentsConfig;
use crate::payments::store::{PaymentMethod, PaymentStore};
use crate::payments::PaymentError;
use crate::resilience::Operation;

const BANK_CODE: &str = "033"; // Santander
const CURRENCY_CODE: char = '9'; // BRL
const ACCOUNT: &str = "9901760";
const WALLET: &str = "102";
const NOSSO_NUMERO: &str = "000000000001";

/// Request body for bank-slip generation.
#[derive(Debug, Clone, Deserialize)]
pub struct BankSlipRequest {
    pub payer_name: String,
    pub payer_document: String,
    pub amount: f64,
    pub payer_address: String,
    pub payer_neighborhood: String,
    pub payer_city: String,
    pub payer_state: String,
    pub payer_zip: String,
    /// Testing hook: when set, the operation fails without generating.
    #[serde(default)]
    pub force_failure: bool,
}

/// Generated bank-slip document, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct BankSlipDocument {
    pub document_id: String,
    pub barcode: String,
    pub digitable_line: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub beneficiary_name: String,
    pub beneficiary_document: String,
    pub payer_name: String,
    pub payer_document: String,
    pub payer_address: String,
    pub payer_neighborhood: String,
    pub payer_city: String,
    pub payer_state: String,
    pub payer_zip: String,
}

/// Mod-10 check digit (weights 2,1 alternating from the right; the
/// digits of two-digit products are summed).
fn mod10(digits: &str) -> u32 {
    let mut weight = 2;
    let mut sum = 0;
    for c in digits.chars().rev() {
        let product = c.to_digit(10).unwrap_or(0) * weight;
        sum += product / 10 + product % 10;
        weight = if weight == 2 { 1 } else { 2 };
    }
    (10 - sum % 10) % 10
}

/// Barcode DAC: mod-11 with weights 2..9 cycling from the right;
/// remainders 0, 10 and 11 map to 1.
fn mod11_dac(digits: &str) -> u32 {
    let mut weight = 2;
    let mut sum = 0;
    for c in digits.chars().rev() {
        sum += c.to_digit(10).unwrap_or(0) * weight;
        weight = if weight == 9 { 2 } else { weight + 1 };
    }
    match 11 - sum % 11 {
        0 | 10 | 11 => 1,
        dac => dac,
    }
}

/// Nosso-número check digit: mod-11 where remainders above 9 map to 0.
fn mod11_dv(digits: &str) -> u32 {
    let mut weight = 2;
    let mut sum = 0;
    for c in digits.chars().rev() {
        sum += c.to_digit(10).unwrap_or(0) * weight;
        weight = if weight == 9 { 2 } else { weight + 1 };
    }
    match 11 - sum % 11 {
        10 | 11 => 0,
        dv => dv,
    }
}

/// Four-digit due-date factor: days since 1997-10-07, wrapping back to
/// 1000 once 9999 is exceeded (Febraban rule effective 2025-02-22).
fn due_date_factor(due: NaiveDate) -> u32 {
    let base = NaiveDate::from_ymd_opt(1997, 10, 7).unwrap();
    let days = (due - base).num_days().max(0);
    if days <= 9999 {
        days as u32
    } else {
        (((days - 10000) % 9000) + 1000) as u32
    }
}

/// One digitable-line field: digits plus its mod-10 check digit, shown
/// as a 5-digit group, a dot, and the remainder.
fn digitable_field(digits: &str) -> String {
    let full = format!("{}{}", digits, mod10(digits));
    format!("{}.{}", &full[0..5], &full[5..])
}

/// Derive the digitable line from a 44-digit barcode.
pub fn digitable_line(barcode: &str) -> String {
    let free = &barcode[19..44];
    let field1 = digitable_field(&format!("{}{}", &barcode[0..4], &free[0..5]));
    let field2 = digitable_field(&free[5..15]);
    let field3 = digitable_field(&free[15..25]);
    let dac = &barcode[4..5];
    let factor_and_value = &barcode[5..19];
    format!("{field1} {field2} {field3} {dac} {factor_and_value}")
}

/// A validated slip ready for barcode assembly.
#[derive(Debug, Clone)]
pub struct BankSlip {
    amount: f64,
    due_date: NaiveDate,
}

impl BankSlip {
    pub fn new(amount: f64, due_date: NaiveDate) -> Result<Self, PaymentError> {
        if !(amount > 0.0) {
            return Err(PaymentError::InvalidAmount(amount));
        }
        Ok(Self { amount, due_date })
    }

    /// Assemble the 44-digit barcode.
    ///
    /// Layout: bank (3), currency (1), DAC (1), due-date factor (4),
    /// value in cents (10), free field (25). The DAC is computed over
    /// the other 43 digits.
    pub fn barcode(&self) -> String {
        let factor = due_date_factor(self.due_date);
        let cents = (self.amount * 100.0).round() as u64;
        // Santander free field: fixed '9', account, nosso número with
        // its check digit, the IOS zero, and the wallet.
        let free = format!(
            "9{}{}{}0{}",
            ACCOUNT,
            NOSSO_NUMERO,
            mod11_dv(NOSSO_NUMERO),
            WALLET
        );
        let without_dac = format!("{BANK_CODE}{CURRENCY_CODE}{factor:04}{cents:010}{free}");
        let dac = mod11_dac(&without_dac);
        format!("{BANK_CODE}{CURRENCY_CODE}{dac}{factor:04}{cents:010}{free}")
    }
}

/// Bank-slip generation as a guarded operation.
pub struct BankSlipOperation {
    store: Arc<PaymentStore>,
    beneficiary_name: String,
    beneficiary_document: String,
    due_days: i64,
}

impl BankSlipOperation {
    pub fn new(store: Arc<PaymentStore>, config: &PaymentsConfig) -> Self {
        Self {
            store,
            beneficiary_name: config.beneficiary_name.clone(),
            beneficiary_document: config.beneficiary_document.clone(),
            due_days: config.due_days,
        }
    }
}

#[async_trait]
impl Operation for BankSlipOperation {
    type Input = BankSlipRequest;
    type Value = BankSlipDocument;
    type Error = PaymentError;

    async fn invoke(&self, request: BankSlipRequest) -> Result<BankSlipDocument, PaymentError> {
        if request.force_failure {
            return Err(PaymentError::Forced);
        }
        if request.payer_name.trim().is_empty() {
            return Err(PaymentError::MissingField("payer_name"));
        }
        if request.payer_document.trim().is_empty() {
            return Err(PaymentError::MissingField("payer_document"));
        }

        let due_date = Utc::now().date_naive() + Duration::days(self.due_days);
        let slip = BankSlip::new(request.amount, due_date)?;
        let barcode = slip.barcode();
        let document = BankSlipDocument {
            document_id: Uuid::new_v4().to_string(),
            digitable_line: digitable_line(&barcode),
            barcode,
            amount: request.amount,
            due_date,
            beneficiary_name: self.beneficiary_name.clone(),
            beneficiary_document: self.beneficiary_document.clone(),
            payer_name: request.payer_name,
            payer_document: request.payer_document,
            payer_address: request.payer_address,
            payer_neighborhood: request.payer_neighborhood,
            payer_city: request.payer_city,
            payer_state: request.payer_state,
            payer_zip: request.payer_zip,
        };

        self.store.record_generated(
            &document.document_id,
            PaymentMethod::BankSlip,
            request.amount,
        );
        tracing::info!(
            document_id = %document.document_id,
            amount = request.amount,
            due_date = %due_date,
            "Bank slip generated"
        );
        Ok(document)
    }
}
