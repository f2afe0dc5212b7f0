//! Payment status store with optional JSON persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    BankSlip,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::BankSlip => "bank_slip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Generated,
    Failed,
}

/// Status of one payment document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    pub amount: f64,
    pub status: PaymentStatus,
    /// Seconds since epoch at record time.
    pub created_at: u64,
}

/// A thread-safe store of payment records, keyed by transaction or
/// document id.
#[derive(Clone, Default)]
pub struct PaymentStore {
    inner: Arc<DashMap<String, PaymentRecord>>,
    persistence_path: Option<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl PaymentStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists.
    pub fn load_from_file(path: &str) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let map: std::collections::HashMap<String, PaymentRecord> =
                serde_json::from_reader(reader)?;
            for (k, v) in map {
                store.inner.insert(k, v);
            }
            metrics::record_store_size(store.inner.len());
            tracing::info!("Loaded {} payment records from store file", store.inner.len());
        }
        Ok(store)
    }

    /// Save to file.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            let map: std::collections::HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();
            serde_json::to_writer(writer, &map)?;
            tracing::info!("Saved {} payment records to store file", map.len());
        }
        Ok(())
    }

    /// Record a successfully generated document.
    pub fn record_generated(&self, id: &str, method: PaymentMethod, amount: f64) {
        self.record(
            id,
            PaymentRecord {
                method,
                amount,
                status: PaymentStatus::Generated,
                created_at: now_secs(),
            },
        );
        metrics::record_payment(method.as_str());
    }

    /// Record a failed generation attempt.
    pub fn record_failed(&self, id: &str, method: PaymentMethod, amount: f64) {
        self.record(
            id,
            PaymentRecord {
                method,
                amount,
                status: PaymentStatus::Failed,
                created_at: now_secs(),
            },
        );
    }

    fn record(&self, id: &str, record: PaymentRecord) {
        self.inner.insert(id.to_string(), record);
        metrics::record_store_size(self.inner.len());
    }

    pub fn get(&self, id: &str) -> Option<PaymentRecord> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// Counts of (generated, failed) records.
    pub fn summary(&self) -> (usize, usize) {
        let mut generated = 0;
        let mut failed = 0;
        for r in self.inner.iter() {
            match r.value().status {
                PaymentStatus::Generated => generated += 1,
                PaymentStatus::Failed => failed += 1,
            }
        }
        (generated, failed)
    }
}
