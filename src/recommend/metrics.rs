use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use crate::recommend::types::StrategyType;

const LATENCY_BUCKETS: [u64; 6] = [100, 500, 1_000, 5_000, 10_000, u64::MAX];
const BUCKET_MIDPOINTS: [f64; 6] = [50.0, 300.0, 750.0, 3000.0, 7500.0, 15000.0];

#[derive(Default)]
pub struct StrategyMetrics {
    pub call_count: AtomicU64,
    pub item_count: AtomicU64,
    pub total_latency_us: AtomicU64,
    pub error_count: AtomicU64,
    pub last_called_at: AtomicI64,
    latency_buckets: [AtomicU64; 6],
}

impl StrategyMetrics {
    fn record_latency_bucket(&self, latency_us: u64) {
        for (i, &threshold) in LATENCY_BUCKETS.iter().enumerate() {
            if latency_us <= threshold {
                self.latency_buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// (p50, p95, p99) in microseconds, approximated by bucket midpoints.
    pub fn percentiles(&self) -> (f64, f64, f64) {
        let counts: Vec<u64> = self
            .latency_buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return (0.0, 0.0, 0.0);
        }

        let percentile = |pct: f64| -> f64 {
            let target = (pct / 100.0 * total as f64).ceil() as u64;
            let mut cumulative = 0u64;
            for (i, &count) in counts.iter().enumerate() {
                cumulative += count;
                if cumulative >= target {
                    return BUCKET_MIDPOINTS[i];
                }
            }
            BUCKET_MIDPOINTS[5]
        };

        (percentile(50.0), percentile(95.0), percentile(99.0))
    }
}

/// 每个策略一组原子计数器，外加降级次数
pub struct MetricsRegistry {
    enabled: AtomicBool,
    strategies: HashMap<StrategyType, StrategyMetrics>,
    fallback_count: AtomicU64,
    degraded_profile_count: AtomicU64,
}

impl MetricsRegistry {
    pub fn new(enabled: bool) -> Self {
        let mut strategies = HashMap::new();
        for strategy in StrategyType::PRIMARY
            .iter()
            .chain(std::iter::once(&StrategyType::Similar))
        {
            strategies.insert(*strategy, StrategyMetrics::default());
        }
        Self {
            enabled: AtomicBool::new(enabled),
            strategies,
            fallback_count: AtomicU64::new(0),
            degraded_profile_count: AtomicU64::new(0),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn record_call(&self, strategy: StrategyType, latency_us: u64, items: usize, is_error: bool) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        if let Some(metric) = self.strategies.get(&strategy) {
            metric.call_count.fetch_add(1, Ordering::Relaxed);
            metric.item_count.fetch_add(items as u64, Ordering::Relaxed);
            metric
                .total_latency_us
                .fetch_add(latency_us, Ordering::Relaxed);
            if is_error {
                metric.error_count.fetch_add(1, Ordering::Relaxed);
            }
            metric.record_latency_bucket(latency_us);
            metric
                .last_called_at
                .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
        }
    }

    pub fn record_fallback(&self) {
        if self.enabled.load(Ordering::Relaxed) {
            self.fallback_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_degraded_profile(&self) {
        if self.enabled.load(Ordering::Relaxed) {
            self.degraded_profile_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let strategies = self
            .strategies
            .iter()
            .map(|(strategy, metric)| {
                let (p50, p95, p99) = metric.percentiles();
                (
                    strategy.as_str().to_string(),
                    StrategySnapshot {
                        call_count: metric.call_count.load(Ordering::Relaxed),
                        item_count: metric.item_count.load(Ordering::Relaxed),
                        total_latency_us: metric.total_latency_us.load(Ordering::Relaxed),
                        error_count: metric.error_count.load(Ordering::Relaxed),
                        last_called_at: metric.last_called_at.load(Ordering::Relaxed),
                        p50_us: p50,
                        p95_us: p95,
                        p99_us: p99,
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            enabled: self.enabled.load(Ordering::Relaxed),
            strategies,
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
            degraded_profile_count: self.degraded_profile_count.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for metric in self.strategies.values() {
            metric.call_count.store(0, Ordering::Relaxed);
            metric.item_count.store(0, Ordering::Relaxed);
            metric.total_latency_us.store(0, Ordering::Relaxed);
            metric.error_count.store(0, Ordering::Relaxed);
            for bucket in &metric.latency_buckets {
                bucket.store(0, Ordering::Relaxed);
            }
        }
        self.fallback_count.store(0, Ordering::Relaxed);
        self.degraded_profile_count.store(0, Ordering::Relaxed);
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySnapshot {
    pub call_count: u64,
    pub item_count: u64,
    pub total_latency_us: u64,
    pub error_count: u64,
    pub last_called_at: i64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub enabled: bool,
    pub strategies: HashMap<String, StrategySnapshot>,
    pub fallback_count: u64,
    pub degraded_profile_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_per_strategy() {
        let registry = MetricsRegistry::new(true);
        registry.record_call(StrategyType::Weakness, 120, 3, false);
        registry.record_call(StrategyType::Weakness, 80, 0, true);
        registry.record_fallback();

        let snap = registry.snapshot();
        let w = &snap.strategies["weakness"];
        assert_eq!(w.call_count, 2);
        assert_eq!(w.item_count, 3);
        assert_eq!(w.error_count, 1);
        assert_eq!(w.total_latency_us, 200);
        assert_eq!(snap.fallback_count, 1);
        assert_eq!(snap.strategies["review"].call_count, 0);
    }

    #[test]
    fn disabled_registry_ignores_calls() {
        let registry = MetricsRegistry::new(false);
        registry.record_call(StrategyType::Review, 10, 1, false);
        registry.record_fallback();
        let snap = registry.snapshot();
        assert_eq!(snap.strategies["review"].call_count, 0);
        assert_eq!(snap.fallback_count, 0);
    }

    #[test]
    fn percentiles_follow_buckets() {
        let registry = MetricsRegistry::new(true);
        for _ in 0..10 {
            registry.record_call(StrategyType::Progressive, 50, 1, false);
        }
        let (p50, _, p99) = registry.strategies[&StrategyType::Progressive].percentiles();
        assert_eq!(p50, 50.0);
        assert_eq!(p99, 50.0);
    }

    #[test]
    fn reset_clears_counters() {
        let registry = MetricsRegistry::new(true);
        registry.record_call(StrategyType::Exploration, 10, 2, false);
        registry.record_degraded_profile();
        registry.reset();
        let snap = registry.snapshot();
        assert_eq!(snap.strategies["exploration"].call_count, 0);
        assert_eq!(snap.degraded_profile_count, 0);
    }
}
