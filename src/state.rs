//! # Application State Management
//!
//! Shared state handed to every request handler and WebSocket actor via
//! `web::Data<AppState>`. The long-lived engine pieces (live state
//! manager, fan-out registry, meeting store) are `Arc`-shared and own
//! their internal locking; the config and metrics sit behind
//! `Arc<RwLock>` so requests can read concurrently while updates stay
//! exclusive.

use crate::config::AppConfig;
use crate::fanout::ConnectionManager;
use crate::live::StateManager;
use crate::meetings::MeetingStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<AppConfig>>,
    pub metrics: Arc<RwLock<AppMetrics>>,
    pub start_time: Instant,

    /// Meeting record bookkeeping (the CRUD surface).
    pub meetings: Arc<MeetingStore>,
    /// Live per-meeting transcript/insight engine.
    pub live: Arc<StateManager>,
    /// Per-meeting WebSocket subscriber registry.
    pub connections: Arc<ConnectionManager>,
}

/// Counters collected across all HTTP requests and live connections.
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    /// Currently open WebSocket connections across all meetings.
    pub active_connections: u32,
    /// Per-endpoint statistics, keyed by "METHOD /path".
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let live = StateManager::new(
            chrono::Duration::seconds(config.meeting.min_update_interval_secs as i64),
            config.meeting.dedup_similarity_threshold,
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            meetings: Arc::new(MeetingStore::new()),
            live: Arc::new(live),
            connections: Arc::new(ConnectionManager::new()),
        }
    }

    /// Copy of the current configuration; cloning keeps lock hold times
    /// short.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn increment_request_count(&self) {
        self.metrics.write().unwrap().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics.write().unwrap().error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn increment_active_connections(&self) {
        self.metrics.write().unwrap().active_connections += 1;
    }

    pub fn decrement_active_connections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        // Guard against underflow if a disconnect races a failed start.
        if metrics.active_connections > 0 {
            metrics.active_connections -= 1;
        }
    }

    /// Consistent copy of the metrics for the health/metrics endpoints.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_connections: metrics.active_connections,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_counter_does_not_underflow() {
        let state = AppState::new(AppConfig::default());
        state.decrement_active_connections();
        assert_eq!(state.get_metrics_snapshot().active_connections, 0);

        state.increment_active_connections();
        state.increment_active_connections();
        state.decrement_active_connections();
        assert_eq!(state.get_metrics_snapshot().active_connections, 1);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = AppState::new(AppConfig::default());
        state.record_endpoint_request("GET /health", 10, false);
        state.record_endpoint_request("GET /health", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["GET /health"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.average_duration_ms(), 20.0);
        assert_eq!(metric.error_rate(), 0.5);
    }
}
