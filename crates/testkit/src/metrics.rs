//! Standardized metrics collection and reporting for CI integration.
//!
//! Worldtests fill a [`MetricsReport`] describing generation throughput, vein
//! behaviour, deferred-placement traffic and persistence cost, and export it as
//! JSON for regression tracking.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Top-level metrics report.
///
/// This is the standardized format for metrics.json files exported by tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test/benchmark identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (ISO 8601)
    pub timestamp: String,

    /// Git commit hash (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    /// Overall test result
    pub result: TestResult,

    /// Terrain generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainMetrics>,

    /// Vein growth metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veins: Option<VeinMetrics>,

    /// Deferred placement metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred: Option<DeferredMetrics>,

    /// Persistence/save metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed all validations
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

/// Terrain generation throughput
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainMetrics {
    /// Total chunks generated
    pub chunks_generated: usize,

    /// Average generation time per chunk, decoration included (microseconds)
    pub avg_gen_time_us: f64,

    /// Min generation time (microseconds)
    pub min_gen_time_us: u128,

    /// Max generation time (microseconds)
    pub max_gen_time_us: u128,

    /// Chunks per second throughput
    pub chunks_per_second: f64,
}

/// Vein growth outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeinMetrics {
    /// Veins whose placement roll succeeded
    pub veins_started: usize,

    /// Veins that passed the acceptance gate
    pub veins_accepted: usize,

    /// Ore blocks written while their vein grew
    pub ores_placed: usize,

    /// Candidates outside the vertical build limits
    pub ores_dropped: usize,

    /// Pebbles written while their vein grew
    pub pebbles_placed: usize,

    /// Ore blocks per block id, counted in the final world
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ores_by_block: Option<BTreeMap<String, usize>>,
}

/// Cross-chunk placement traffic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredMetrics {
    /// Ore writes recorded for chunks not yet generated
    pub ores_deferred: usize,

    /// Pebble writes recorded for chunks not yet generated
    pub pebbles_deferred: usize,

    /// Non-empty drains
    pub chunks_drained: usize,

    /// Deferred ores applied on drain
    pub ores_applied: usize,

    /// Deferred pebbles applied on drain
    pub pebbles_applied: usize,

    /// Entries still pending when the test ended
    pub entries_pending: usize,
}

/// Persistence and save/load metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceMetrics {
    /// Store saves performed
    pub saves: usize,

    /// Store loads performed
    pub loads: usize,

    /// Average save time (microseconds)
    pub avg_save_time_us: f64,

    /// Average load time (microseconds)
    pub avg_load_time_us: f64,

    /// Bytes of the last file written
    pub bytes_written: u64,

    /// Compression ratio (uncompressed record / file size)
    pub compression_ratio: f64,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,

    /// Number of validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                commit_hash: None,
                result: TestResult::Pass,
                terrain: None,
                veins: None,
                deferred: None,
                persistence: None,
                test_execution: TestExecutionMetrics {
                    duration_seconds: 0.0,
                    assertions_checked: None,
                    validations_passed: None,
                },
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set commit hash
    pub fn commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.report.commit_hash = Some(hash.into());
        self
    }

    /// Set terrain metrics
    pub fn terrain(mut self, metrics: TerrainMetrics) -> Self {
        self.report.terrain = Some(metrics);
        self
    }

    /// Set vein metrics
    pub fn veins(mut self, metrics: VeinMetrics) -> Self {
        self.report.veins = Some(metrics);
        self
    }

    /// Set deferred placement metrics
    pub fn deferred(mut self, metrics: DeferredMetrics) -> Self {
        self.report.deferred = Some(metrics);
        self
    }

    /// Set persistence metrics
    pub fn persistence(mut self, metrics: PersistenceMetrics) -> Self {
        self.report.persistence = Some(metrics);
        self
    }

    /// Set test execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
