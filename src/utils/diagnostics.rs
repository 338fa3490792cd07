//! Process-wide registry of scalar diagnostics.
//!
//! Solvers register a named accessor once; output code samples every registered
//! value at each output step and writes it as a time series. Registration is
//! idempotent by name: the first accessor registered under a name is kept.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::Serialize;

use crate::error::LapError;

type Accessor = Box<dyn Fn() -> f64 + Send + Sync>;

#[derive(Default)]
pub struct DiagnosticsRegistry {
    entries: Mutex<BTreeMap<String, Accessor>>,
}

#[derive(Serialize)]
struct Sample<'a> {
    time: f64,
    values: &'a BTreeMap<String, f64>,
}

impl DiagnosticsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static DiagnosticsRegistry {
        static GLOBAL: OnceLock<DiagnosticsRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DiagnosticsRegistry::new)
    }

    /// Register `accessor` under `name`. Returns false, and keeps the existing
    /// accessor, if the name is already taken.
    pub fn register<F>(&self, name: &str, accessor: F) -> bool
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return false;
        }
        entries.insert(name.to_string(), Box::new(accessor));
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).map(|f| f())
    }

    /// Current value of every diagnostic.
    pub fn sample(&self) -> BTreeMap<String, f64> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|(name, f)| (name.clone(), f())).collect()
    }

    /// Append one JSON line `{"time": .., "values": {..}}` to `out`.
    pub fn write_sample<W: Write>(&self, time: f64, mut out: W) -> Result<(), LapError> {
        let values = self.sample();
        serde_json::to_writer(&mut out, &Sample { time, values: &values })?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn registration_is_idempotent() {
        let registry = DiagnosticsRegistry::new();
        assert!(registry.register("mean_its", || 1.0));
        assert!(!registry.register("mean_its", || 2.0));
        assert_eq!(registry.value("mean_its"), Some(1.0));
        assert_eq!(registry.value("other"), None);
    }

    #[test]
    fn accessors_read_live_values() {
        let registry = DiagnosticsRegistry::new();
        let cell = Arc::new(AtomicU64::new(0));
        let reader = Arc::clone(&cell);
        registry.register("x", move || reader.load(Ordering::Relaxed) as f64);
        cell.store(4, Ordering::Relaxed);
        assert_eq!(registry.sample().get("x"), Some(&4.0));
    }

    #[test]
    fn samples_are_json_lines() {
        let registry = DiagnosticsRegistry::new();
        registry.register("a", || 2.5);
        let mut buf = Vec::new();
        registry.write_sample(0.5, &mut buf).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert_eq!(line, "{\"time\":0.5,\"values\":{\"a\":2.5}}\n");
    }

    #[test]
    fn global_registry_is_shared() {
        let name = "diagnostics_test_global_shared";
        DiagnosticsRegistry::global().register(name, || 3.0);
        assert!(DiagnosticsRegistry::global().is_registered(name));
    }
}
