//! Periodic translation of catalog state into usage gauges.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::Label;
use tokio::time::{self, Instant};
use tracing::{Instrument, Span};

use crate::config::validation::RESERVED_LABELS;
use crate::config::UsageConfig;
use crate::lifecycle::ShutdownSignal;
use crate::usage::emitter::MetricsEmitter;
use crate::usage::store::{StateSnapshot, DEFAULT_NAMESPACE};

pub const DEFAULT_REPORTING_INTERVAL: Duration = Duration::from_secs(60);

/// Gauge: number of registered nodes.
pub const STATE_NODES: &str = "state_nodes";
/// Gauge: number of registered service instances, per namespace.
pub const STATE_SERVICES: &str = "state_services";

/// Everything the reporter needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Added as the `datacenter` label when non-empty.
    pub datacenter: String,
    /// Span the reporter logs under.
    pub span: Span,
    /// Time between reports; zero means [`DEFAULT_REPORTING_INTERVAL`].
    pub interval: Duration,
    /// Extra labels attached after `datacenter`. Keys the reporter sets
    /// itself (`datacenter`, `namespace`) are ignored.
    pub labels: Vec<Label>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            datacenter: String::new(),
            span: Span::none(),
            interval: DEFAULT_REPORTING_INTERVAL,
            labels: Vec::new(),
        }
    }
}

impl ReporterConfig {
    pub fn from_usage(config: &UsageConfig) -> Self {
        Self {
            datacenter: config.datacenter.clone(),
            span: tracing::info_span!("usage_metrics", datacenter = %config.datacenter),
            interval: Duration::from_secs(config.reporting_interval_secs),
            labels: config
                .labels
                .iter()
                .map(|(k, v)| Label::new(k.clone(), v.clone()))
                .collect(),
        }
    }
}

pub struct UsageReporter<S> {
    state: Arc<S>,
    emitter: Arc<dyn MetricsEmitter>,
    labels: Vec<Label>,
    interval: Duration,
    span: Span,
}

impl<S: StateSnapshot> UsageReporter<S> {
    pub fn new(state: Arc<S>, emitter: Arc<dyn MetricsEmitter>, config: ReporterConfig) -> Self {
        let mut labels = Vec::with_capacity(config.labels.len() + 1);
        if !config.datacenter.is_empty() {
            labels.push(Label::new("datacenter", config.datacenter));
        }
        for label in config.labels {
            if RESERVED_LABELS.contains(&label.key()) {
                tracing::warn!(key = label.key(), "ignoring reserved usage label");
                continue;
            }
            labels.push(label);
        }

        let interval = if config.interval.is_zero() {
            DEFAULT_REPORTING_INTERVAL
        } else {
            config.interval
        };

        Self {
            state,
            emitter,
            labels,
            interval,
            span: config.span,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Report every interval until `shutdown` fires. The first report happens
    /// one interval after start; one last report is emitted on shutdown.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let span = self.span.clone();
        async move {
            tracing::debug!(interval = ?self.interval, "usage metrics reporter starting");
            let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_once(),
                    _ = shutdown.recv() => {
                        tracing::debug!("usage metrics reporter shutting down");
                        self.run_once();
                        break;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Emit one round of gauges.
    ///
    /// A failed query is logged and reported as zero rather than skipped.
    pub fn run_once(&self) {
        let _entered = self.span.enter();

        let nodes = self.state.nodes().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to retrieve nodes from state store");
            Vec::new()
        });
        self.emitter
            .set_gauge(STATE_NODES, nodes.len() as f64, &self.labels);

        let services = self.state.services().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to retrieve services from state store");
            Vec::new()
        });

        let mut per_namespace = BTreeMap::from([(DEFAULT_NAMESPACE.to_string(), 0usize)]);
        for svc in &services {
            *per_namespace
                .entry(svc.namespace_or_default().to_string())
                .or_default() += 1;
        }

        for (namespace, count) in per_namespace {
            let mut labels = self.labels.clone();
            labels.push(Label::new("namespace", namespace));
            self.emitter.set_gauge(STATE_SERVICES, count as f64, &labels);
        }
    }
}
