use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Solve lifecycle and persistence counters
#[derive(Debug, Default)]
pub struct SolveMetrics {
    pub solves_started: AtomicU64,
    pub solutions_found: AtomicU64,
    pub no_solution: AtomicU64,
    pub gateway_failures: AtomicU64,
    pub validation_rejections: AtomicU64,
    pub compile_warnings: AtomicU64,
    pub persistence_failures: AtomicU64,
    pub total_solve_time_ms: AtomicU64,
}

impl SolveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_solve_started(&self) {
        self.solves_started.fetch_add(1, Ordering::Relaxed);
    }

    /// A response arrived; `found == false` means the instance is unsatisfiable
    pub fn record_response(&self, found: bool, elapsed: Duration) {
        if found {
            self.solutions_found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.no_solution.fetch_add(1, Ordering::Relaxed);
        }
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.total_solve_time_ms.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn record_gateway_failure(&self) {
        self.gateway_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compile_warnings(&self, count: usize) {
        if count > 0 {
            self.compile_warnings
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
        warn!("Snapshot persistence failed");
    }

    pub fn snapshot(&self) -> SolveStats {
        SolveStats {
            solves_started: self.solves_started.load(Ordering::Relaxed),
            solutions_found: self.solutions_found.load(Ordering::Relaxed),
            no_solution: self.no_solution.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            compile_warnings: self.compile_warnings.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            total_solve_time_ms: self.total_solve_time_ms.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Solve metrics: started={}, found={}, unsat={}, gateway_failures={}, rejected={}, warnings={}, persistence_failures={}",
            stats.solves_started,
            stats.solutions_found,
            stats.no_solution,
            stats.gateway_failures,
            stats.validation_rejections,
            stats.compile_warnings,
            stats.persistence_failures
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveStats {
    pub solves_started: u64,
    pub solutions_found: u64,
    pub no_solution: u64,
    pub gateway_failures: u64,
    pub validation_rejections: u64,
    pub compile_warnings: u64,
    pub persistence_failures: u64,
    pub total_solve_time_ms: u64,
}

/// Global metrics instance
static SOLVE_METRICS: std::sync::LazyLock<SolveMetrics> =
    std::sync::LazyLock::new(SolveMetrics::new);

pub fn solve_metrics() -> &'static SolveMetrics {
    &SOLVE_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}
