//! Registry of named circuits.
//!
//! # Responsibilities
//! - Hold one circuit per protected operation for the process lifetime
//! - Hand out the same instance for repeated registrations of a name
//! - Expose point-in-time snapshots for inspection endpoints
//!
//! # Design Decisions
//! - Keyed by operation identity, not call site
//! - Each circuit carries its own lock; the registry adds no shared one

use std::sync::Arc;

use dashmap::DashMap;

use crate::resilience::circuit_breaker::{Circuit, CircuitSettings, CircuitSnapshot};

/// All circuits in the process, keyed by operation identity.
#[derive(Default)]
pub struct CircuitRegistry {
    circuits: DashMap<String, Arc<Circuit>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self {
            circuits: DashMap::new(),
        }
    }

    /// Get the circuit registered under `name`, creating it on first use.
    ///
    /// The settings of the first registration win; later calls with the
    /// same name return the existing instance unchanged.
    pub fn register(&self, name: &str, settings: CircuitSettings) -> Arc<Circuit> {
        let entry = self
            .circuits
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Circuit::new(name, settings)));
        entry.value().clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Circuit>> {
        self.circuits.get(name).map(|c| c.value().clone())
    }

    /// Point-in-time view of every circuit, ordered by name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots: Vec<_> = self.circuits.iter().map(|c| c.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitState;
    use std::time::Duration;

    #[test]
    fn same_name_returns_same_circuit() {
        let registry = CircuitRegistry::new();
        let first = registry.register("pix", CircuitSettings::default());
        let second = registry.register(
            "pix",
            CircuitSettings {
                threshold: 99,
                timeout: Duration::from_secs(1),
            },
        );

        assert!(Arc::ptr_eq(&first, &second));
        // First registration's settings win.
        assert_eq!(second.snapshot().threshold, 2);
    }

    #[test]
    fn snapshots_cover_all_circuits() {
        let registry = CircuitRegistry::new();
        registry.register("bank-slip", CircuitSettings::default());
        registry.register("pix", CircuitSettings::default());

        let snapshots = registry.snapshots();
        let names: Vec<_> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bank-slip", "pix"]);
        assert!(snapshots.iter().all(|s| s.state == CircuitState::Closed));
    }

    #[test]
    fn unknown_name_is_absent() {
        let registry = CircuitRegistry::new();
        assert!(registry.get("missing").is_none());
    }
}
