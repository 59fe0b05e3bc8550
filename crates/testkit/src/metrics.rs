//! Metrics collection and reporting for structure worldtests.
//!
//! Reports are exported as JSON so CI can diff piece counts and realization
//! outcomes between runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use structgen_world::{RealizeReport, StructureStart};
use tracing::debug;

/// Top-level metrics report written by a worldtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier
    pub test_name: String,

    /// Collection time (RFC 3339)
    pub timestamp: String,

    /// Overall test result
    pub result: TestResult,

    /// Layout generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationMetrics>,

    /// Per-chunk realization metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realization: Option<RealizationMetrics>,

    /// Save/load metrics
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

/// Layout generation counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    /// Origins tried
    pub attempted: usize,

    /// Origins that produced a structure
    pub generated: usize,

    /// Pieces across all generated structures
    pub total_pieces: usize,

    /// Largest piece count of a single structure
    pub max_pieces: usize,

    /// Deepest generation depth seen
    pub max_gen_depth: i32,

    /// Structures per family name
    pub by_family: BTreeMap<String, usize>,
}

impl GenerationMetrics {
    /// Account for one origin and its outcome.
    pub fn record(&mut self, start: Option<&StructureStart>) {
        self.attempted += 1;
        let Some(start) = start else {
            return;
        };
        self.generated += 1;
        let pieces = start.pieces();
        self.total_pieces += pieces.len();
        self.max_pieces = self.max_pieces.max(pieces.len());
        if let Some(depth) = pieces.iter().map(|p| p.gen_depth()).max() {
            self.max_gen_depth = self.max_gen_depth.max(depth);
        }
        *self
            .by_family
            .entry(start.family().name().to_string())
            .or_default() += 1;
    }

    /// Mean pieces per generated structure.
    pub fn avg_pieces(&self) -> f64 {
        if self.generated == 0 {
            0.0
        } else {
            self.total_pieces as f64 / self.generated as f64
        }
    }
}

/// Realization outcome totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizationMetrics {
    /// Chunks realized
    pub chunks: usize,

    /// Piece visits across all chunks
    pub pieces_visited: usize,

    /// Visits that painted
    pub pieces_placed: usize,

    /// Visits that refused to place
    pub pieces_failed: usize,

    /// Writes that escaped the chunk being realized
    pub clip_violations: usize,
}

impl RealizationMetrics {
    /// Add one chunk's report.
    pub fn record(&mut self, report: &RealizeReport) {
        self.chunks += 1;
        self.pieces_visited += report.visited;
        self.pieces_placed += report.placed;
        self.pieces_failed += report.failed;
    }
}

/// Persistence and save/load metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetrics {
    /// Starts written
    pub starts_saved: usize,

    /// Starts read back
    pub starts_loaded: usize,

    /// Total bytes written
    pub bytes_written: u64,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,
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
                result: TestResult::Pass,
                generation: None,
                realization: None,
                persistence: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set generation metrics
    pub fn generation(mut self, metrics: GenerationMetrics) -> Self {
        self.report.generation = Some(metrics);
        self
    }

    /// Set realization metrics
    pub fn realization(mut self, metrics: RealizationMetrics) -> Self {
        self.report.realization = Some(metrics);
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
    path: PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        file.write_all(json.as_bytes())?;
        debug!(path = %self.path.display(), test = %report.test_name, "wrote metrics report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use structgen_core::{BoundingBox, ChunkPos};
    use structgen_world::{Piece, PieceKind, StructureFamily};

    fn stairs(depth: i32) -> Piece {
        Piece::new(
            PieceKind::MineshaftStairs,
            BoundingBox::new(0, 10, 0, 2, 16, 8),
            None,
            depth,
        )
    }

    #[test]
    fn generation_metrics_count_outcomes() {
        let start = StructureStart::new(
            StructureFamily::Mineshaft,
            ChunkPos::new(0, 0),
            vec![stairs(0), stairs(3)],
        )
        .unwrap();
        let mut metrics = GenerationMetrics::default();
        metrics.record(Some(&start));
        metrics.record(None);
        assert_eq!(metrics.attempted, 2);
        assert_eq!(metrics.generated, 1);
        assert_eq!(metrics.max_gen_depth, 3);
        assert_eq!(metrics.avg_pieces(), 2.0);
        assert_eq!(metrics.by_family.get("mineshaft"), Some(&1));
    }

    #[test]
    fn metrics_sink_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "structgen-metrics-{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        let mut realization = RealizationMetrics::default();
        realization.record(&RealizeReport {
            visited: 3,
            placed: 2,
            failed: 1,
        });
        let report = MetricsReportBuilder::new("sink_test")
            .result(TestResult::Pass)
            .realization(realization)
            .build();

        let sink = MetricsSink::create(&path).unwrap();
        sink.write(&report).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("sink_test"));
        assert!(contents.contains("\"result\": \"pass\""));
        assert!(contents.contains("\"pieces_failed\": 1"));
        let parsed: MetricsReport = serde_json::from_str(&contents).unwrap();
        assert!(parsed.generation.is_none());

        fs::remove_file(&path).ok();
    }
}
