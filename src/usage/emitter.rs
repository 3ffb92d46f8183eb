//! Gauge sinks for the usage reporter.
//!
//! The reporter never touches the global recorder directly; it is handed a
//! [`MetricsEmitter`]. In the agent that is [`RecorderEmitter`], which writes
//! through the `metrics` facade to whatever recorder was installed at startup.
//! [`InmemEmitter`] keeps the latest values in memory for inspection.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use metrics::Label;

pub trait MetricsEmitter: Send + Sync {
    fn set_gauge(&self, name: &'static str, value: f64, labels: &[Label]);
}

/// Forwards to the process-wide `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderEmitter;

impl MetricsEmitter for RecorderEmitter {
    fn set_gauge(&self, name: &'static str, value: f64, labels: &[Label]) {
        metrics::gauge!(name, labels.to_vec()).set(value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeValue {
    pub name: String,
    pub value: f64,
    pub labels: Vec<Label>,
}

/// Latest gauge values keyed by `name;key=value;...`, labels in emission order.
#[derive(Debug, Default)]
pub struct InmemEmitter {
    gauges: Mutex<BTreeMap<String, GaugeValue>>,
}

impl InmemEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gauges(&self) -> BTreeMap<String, GaugeValue> {
        self.gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn gauge(&self, key: &str) -> Option<f64> {
        self.gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|g| g.value)
    }
}

fn flat_key(name: &str, labels: &[Label]) -> String {
    let mut key = name.to_string();
    for label in labels {
        key.push(';');
        key.push_str(label.key());
        key.push('=');
        key.push_str(label.value());
    }
    key
}

impl MetricsEmitter for InmemEmitter {
    fn set_gauge(&self, name: &'static str, value: f64, labels: &[Label]) {
        let gauge = GaugeValue {
            name: name.to_string(),
            value,
            labels: labels.to_vec(),
        };
        self.gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(flat_key(name, labels), gauge);
    }
}
