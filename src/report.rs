//!
//! Combines one poll's status and metrics into the values shown on the dashboard.
//!
//! Optional fields are `None` when the node did not export the metric they are
//! derived from. Renderers must skip those lines rather than print a zero.
use crate::balance::Balance;
use crate::block_rate::BlockRate;
use crate::exposition::MetricsSnapshot;
use crate::status::StatusSnapshot;

/// Metric names read from `/metrics`
pub mod names {
    pub const IS_GOVERNOR: &str = "is_governor";
    pub const PEERS: &str = "p2p_peers";
    pub const RESIDENT_MEMORY: &str = "process_resident_memory_bytes";
    pub const CPU_SECONDS: &str = "process_cpu_seconds_total";
    pub const GOROUTINES: &str = "go_goroutines";
    pub const OPEN_FDS: &str = "process_open_fds";
    pub const MAX_FDS: &str = "process_max_fds";
    pub const TXS_SUCCESSFUL: &str = "executed_txs_successful";
    pub const TXS_FAILED: &str = "executed_txs_failure";
    pub const TXS_GAS: &str = "txs_gas_total";
    pub const CACHE_HITS: &str = "cache_hits";
    pub const CACHE_MISSES: &str = "cache_misses";
    pub const BLOCK_PROCESS_SUM: &str = "block_process_time_seconds_sum";
    pub const BLOCK_PROCESS_COUNT: &str = "block_process_time_seconds_count";
    pub const TIME_IN_RECOVERY: &str = "time_in_recovery";
}

/// Executed transaction totals summed over every label set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transactions {
    pub successful: Option<f64>,
    pub failed: Option<f64>,
    pub gas: Option<f64>,
}

impl Transactions {
    /// Nothing to show
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.successful.is_none() && self.failed.is_none() && self.gas.is_none()
    }
}

/// Process resource usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Process {
    pub resident_memory_bytes: Option<f64>,
    pub cpu_seconds: Option<f64>,
    pub goroutines: Option<f64>,
    pub open_fds: Option<f64>,
    pub max_fds: Option<f64>,
    /// Open descriptors as a percentage of the limit
    pub fd_usage_percent: Option<f64>,
}

impl Process {
    /// Nothing to show
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.resident_memory_bytes.is_none()
            && self.cpu_seconds.is_none()
            && self.goroutines.is_none()
            && self.open_fds.is_none()
            && self.max_fds.is_none()
    }
}

/// Cache effectiveness
#[derive(Debug, Clone, PartialEq)]
pub struct Cache {
    pub hits: f64,
    pub misses: f64,
    /// `hits / (hits + misses)` as a percentage, absent when there was no lookup yet
    pub hit_rate: Option<f64>,
}

/// Block processing timings
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProcessing {
    pub blocks: f64,
    pub avg_time_ms: f64,
}

/// Everything rendered for a single poll
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub status: StatusSnapshot,
    /// Signing address balance
    pub balance: Balance,
    /// Minimum balance the operator asked to be warned about
    pub min_balance: u64,
    pub below_min_balance: bool,
    /// Blocks per second since the monitor started
    pub blocks_per_second: f64,
    pub is_governor: Option<bool>,
    pub peers: Option<f64>,
    pub transactions: Transactions,
    pub process: Process,
    pub cache: Option<Cache>,
    pub block_processing: Option<BlockProcessing>,
    /// Seconds spent in recovery, only when greater than zero
    pub recovery_seconds: Option<f64>,
}

/// Build a report from the status and metrics of one poll
#[must_use]
pub fn aggregate(
    status: StatusSnapshot,
    metrics: &MetricsSnapshot,
    min_balance: u64,
    block_rate: &BlockRate,
) -> Report {
    let balance = status.signing_address_balance;

    let process = {
        let open_fds = metrics.scalar(names::OPEN_FDS);
        let max_fds = metrics.scalar(names::MAX_FDS);
        Process {
            resident_memory_bytes: metrics.scalar(names::RESIDENT_MEMORY),
            cpu_seconds: metrics.scalar(names::CPU_SECONDS),
            goroutines: metrics.scalar(names::GOROUTINES),
            open_fds,
            max_fds,
            fd_usage_percent: open_fds
                .zip(max_fds)
                .map(|(open, max)| open / max * 100.0),
        }
    };

    let transactions = Transactions {
        successful: metrics.sum(names::TXS_SUCCESSFUL),
        failed: metrics.sum(names::TXS_FAILED),
        gas: metrics.sum(names::TXS_GAS),
    };

    let cache = metrics
        .scalar(names::CACHE_HITS)
        .zip(metrics.scalar(names::CACHE_MISSES))
        .map(|(hits, misses)| {
            let total = hits + misses;
            Cache {
                hits,
                misses,
                hit_rate: (total > 0.0).then(|| hits / total * 100.0),
            }
        });

    let block_processing = metrics
        .scalar(names::BLOCK_PROCESS_SUM)
        .zip(metrics.scalar(names::BLOCK_PROCESS_COUNT))
        .filter(|(_, count)| *count > 0.0)
        .map(|(sum, count)| BlockProcessing {
            blocks: count,
            avg_time_ms: sum / count * 1000.0,
        });

    Report {
        below_min_balance: balance.is_below(min_balance),
        balance,
        min_balance,
        blocks_per_second: block_rate.blocks_per_second(),
        is_governor: metrics
            .scalar(names::IS_GOVERNOR)
            .map(|v| (v - 1.0).abs() < f64::EPSILON),
        peers: metrics.scalar(names::PEERS),
        transactions,
        process,
        cache,
        block_processing,
        recovery_seconds: metrics
            .scalar(names::TIME_IN_RECOVERY)
            .filter(|seconds| *seconds > 0.0),
        status,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exposition::parse;
    use crate::status::{decode, test::STATUS};

    fn status() -> StatusSnapshot {
        decode(STATUS.as_bytes()).unwrap()
    }

    fn with_balance(wei: &str) -> StatusSnapshot {
        StatusSnapshot {
            signing_address_balance: Balance::parse_wei(wei).unwrap(),
            ..status()
        }
    }

    const METRICS: &str = r#"
# HELP is_governor Node is a governor
# TYPE is_governor gauge
is_governor 1
p2p_peers 12
process_resident_memory_bytes 1.572864e+06
process_cpu_seconds_total 93.5
go_goroutines 211
process_open_fds 64
process_max_fds 1024
executed_txs_successful{type="transfer"} 10
executed_txs_successful{type="contract"} 5
executed_txs_failure{reason="revert"} 2
txs_gas_total{type="transfer"} 21000
txs_gas_total{type="contract"} 79000
cache_hits 75
cache_misses 25
block_process_time_seconds_sum 2.5
block_process_time_seconds_count 10
time_in_recovery 125
"#;

    #[test]
    fn balance_threshold_is_strict() {
        let report = aggregate(
            with_balance("10000000000000000000"),
            &MetricsSnapshot::default(),
            10,
            &BlockRate::new(),
        );
        assert_eq!(report.balance.to_string(), "10");
        assert!(!report.below_min_balance);

        let report = aggregate(
            with_balance("9999999999999999999"),
            &MetricsSnapshot::default(),
            10,
            &BlockRate::new(),
        );
        assert!(report.below_min_balance);
    }

    #[test]
    fn absent_metrics_are_unset() {
        let report = aggregate(status(), &MetricsSnapshot::default(), 10, &BlockRate::new());
        assert_eq!(report.is_governor, None);
        assert_eq!(report.peers, None);
        assert!(report.transactions.is_empty());
        assert!(report.process.is_empty());
        assert_eq!(report.process.fd_usage_percent, None);
        assert_eq!(report.cache, None);
        assert_eq!(report.block_processing, None);
        assert_eq!(report.recovery_seconds, None);
        assert_eq!(report.blocks_per_second, 0.0);
    }

    #[test]
    fn derived_fields() {
        let report = aggregate(status(), &parse(METRICS), 10, &BlockRate::new());

        assert_eq!(report.is_governor, Some(true));
        assert_eq!(report.peers, Some(12.0));
        assert_eq!(report.transactions.successful, Some(15.0));
        assert_eq!(report.transactions.failed, Some(2.0));
        assert_eq!(report.transactions.gas, Some(100_000.0));
        assert_eq!(report.process.resident_memory_bytes, Some(1_572_864.0));
        assert_eq!(report.process.fd_usage_percent, Some(6.25));
        assert_eq!(
            report.cache,
            Some(Cache {
                hits: 75.0,
                misses: 25.0,
                hit_rate: Some(75.0)
            })
        );
        assert_eq!(
            report.block_processing,
            Some(BlockProcessing {
                blocks: 10.0,
                avg_time_ms: 250.0
            })
        );
        assert_eq!(report.recovery_seconds, Some(125.0));
    }

    #[test]
    fn partial_pairs_are_unset() {
        let metrics = parse("process_open_fds 10\ncache_hits 3\nblock_process_time_seconds_sum 1");
        let report = aggregate(status(), &metrics, 10, &BlockRate::new());
        assert_eq!(report.process.open_fds, Some(10.0));
        assert_eq!(report.process.fd_usage_percent, None);
        assert_eq!(report.cache, None);
        assert_eq!(report.block_processing, None);
    }

    #[test]
    fn fd_limit_alone_is_kept() {
        let report = aggregate(status(), &parse("process_max_fds 1024"), 10, &BlockRate::new());
        assert_eq!(report.process.max_fds, Some(1024.0));
        assert_eq!(report.process.fd_usage_percent, None);
        assert!(!report.process.is_empty());
    }

    #[test]
    fn zero_denominators() {
        let metrics = parse(
            "cache_hits 0\ncache_misses 0\nblock_process_time_seconds_sum 0\nblock_process_time_seconds_count 0\ntime_in_recovery 0\nis_governor 0",
        );
        let report = aggregate(status(), &metrics, 10, &BlockRate::new());
        assert_eq!(report.cache.unwrap().hit_rate, None);
        assert_eq!(report.block_processing, None);
        assert_eq!(report.recovery_seconds, None);
        assert_eq!(report.is_governor, Some(false));
    }

    #[test]
    fn block_rate_from_samples() {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let mut rate = BlockRate::new();
        rate.record(100, now);
        rate.record(200, now + Duration::seconds(10));

        let report = aggregate(status(), &MetricsSnapshot::default(), 10, &rate);
        assert_eq!(report.blocks_per_second, 10.0);
    }
}
