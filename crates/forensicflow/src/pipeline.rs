//! Analysis pipeline.
//!
//! records -> validation -> graph -> {cycles, smurfing, shell chains}
//! -> legitimacy -> scoring -> report (+ projection)
//!
//! The three pattern detectors only read the graph. [`Pipeline::run`] runs
//! them one after another; [`Pipeline::run_concurrent`] runs them as parallel
//! blocking tasks on a shared `Arc` graph.

use crate::messages::{AnalysisInput, AnalysisOutput};
use crate::projection::GraphProjection;
use crate::report::{Analysis, AnalysisReport, Diagnostics};
use async_trait::async_trait;
use forensicflow_core::config::AnalysisConfig;
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use forensicflow_detect::cycles::CycleDetector;
use forensicflow_detect::legitimacy::LegitimacyFilter;
use forensicflow_detect::shell::ShellNetworkDetector;
use forensicflow_detect::smurfing::SmurfingDetector;
use forensicflow_detect::types::{CycleSearchResult, ShellChain, SmurfingPattern};
use forensicflow_graph::builder::GraphBuilder;
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_graph::types::{Transaction, TransactionRecord};
use forensicflow_graph::validation::validate_records;
use forensicflow_scoring::scorer::SuspicionScorer;
use forensicflow_scoring::types::Detections;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};

// ============================================================================
// Progress Reporting
// ============================================================================

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Building the transfer graph.
    GraphConstruction,
    /// Cycle search.
    CycleDetection,
    /// Fan-in / fan-out detection.
    SmurfingDetection,
    /// Shell chain tracing.
    ShellDetection,
    /// Merchant / payroll recognition.
    LegitimacyFiltering,
    /// Score composition.
    Scoring,
    /// Report and projection assembly.
    Reporting,
    /// All stages finished.
    Complete,
}

impl Stage {
    /// Stages that do work, in execution order.
    pub const WORK: &'static [Stage] = &[
        Stage::GraphConstruction,
        Stage::CycleDetection,
        Stage::SmurfingDetection,
        Stage::ShellDetection,
        Stage::LegitimacyFiltering,
        Stage::Scoring,
        Stage::Reporting,
    ];

    /// Stage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::GraphConstruction => "graph_construction",
            Stage::CycleDetection => "cycle_detection",
            Stage::SmurfingDetection => "smurfing_detection",
            Stage::ShellDetection => "shell_detection",
            Stage::LegitimacyFiltering => "legitimacy_filtering",
            Stage::Scoring => "scoring",
            Stage::Reporting => "reporting",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Stage about to run, or [`Stage::Complete`].
    pub stage: Stage,
    /// Stages finished so far.
    pub completed: usize,
    /// Total number of work stages.
    pub total: usize,
}

/// Receives progress notifications between stages.
///
/// Implementations must not block.
pub trait ProgressObserver: Send + Sync {
    /// Called before each stage and once on completion.
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}

struct Progress<'a> {
    observer: &'a dyn ProgressObserver,
    completed: usize,
}

impl<'a> Progress<'a> {
    fn new(observer: &'a dyn ProgressObserver) -> Self {
        Self {
            observer,
            completed: 0,
        }
    }

    fn begin(&self, stage: Stage) {
        self.observer.on_progress(ProgressEvent {
            stage,
            completed: self.completed,
            total: Stage::WORK.len(),
        });
    }

    fn finish(&mut self, stages: usize) {
        self.completed += stages;
    }

    fn complete(&self) {
        self.observer.on_progress(ProgressEvent {
            stage: Stage::Complete,
            completed: Stage::WORK.len(),
            total: Stage::WORK.len(),
        });
    }
}

// ============================================================================
// Pipeline Kernel
// ============================================================================

/// End-to-end analysis pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    metadata: KernelMetadata,
    config: AnalysisConfig,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

struct DetectorResults {
    cycles: CycleSearchResult,
    smurfing: Vec<SmurfingPattern>,
    shell_chains: Vec<ShellChain>,
}

impl Pipeline {
    /// Create a pipeline with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create a pipeline with the given configuration.
    #[must_use]
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            metadata: KernelMetadata::batch("pipeline/analyze", Domain::Pipeline)
                .with_description("Validation, detection, scoring and report assembly")
                .with_throughput(10_000)
                .with_latency_us(50_000.0),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validate records, then run all stages sequentially.
    pub fn analyze(&self, records: &[TransactionRecord]) -> Result<Analysis> {
        self.analyze_with(records, &NoProgress)
    }

    /// Validate records, then run all stages sequentially with progress.
    pub fn analyze_with(
        &self,
        records: &[TransactionRecord],
        observer: &dyn ProgressObserver,
    ) -> Result<Analysis> {
        let transactions = validate_records(records)?;
        self.run(&transactions, observer)
    }

    /// Run all stages sequentially on validated transactions.
    pub fn run(
        &self,
        transactions: &[Transaction],
        observer: &dyn ProgressObserver,
    ) -> Result<Analysis> {
        self.validate()?;
        let started = Instant::now();
        let mut progress = Progress::new(observer);
        let mut diagnostics = Diagnostics::default();

        let graph = self.build_graph(transactions, &mut progress, &mut diagnostics);

        progress.begin(Stage::CycleDetection);
        let cycles = timed(Stage::CycleDetection, || {
            CycleDetector::compute(&graph, &self.config.cycles)
        });
        diagnostics.record(Stage::CycleDetection, cycles.1, cycles.0.cycles.len());
        progress.finish(1);

        progress.begin(Stage::SmurfingDetection);
        let smurfing = timed(Stage::SmurfingDetection, || {
            SmurfingDetector::compute(&graph, &self.config.smurfing)
        });
        diagnostics.record(Stage::SmurfingDetection, smurfing.1, smurfing.0.len());
        progress.finish(1);

        progress.begin(Stage::ShellDetection);
        let shell = timed(Stage::ShellDetection, || {
            ShellNetworkDetector::compute(&graph, &self.config.shell)
        });
        diagnostics.record(Stage::ShellDetection, shell.1, shell.0.len());
        progress.finish(1);

        let found = DetectorResults {
            cycles: cycles.0,
            smurfing: smurfing.0,
            shell_chains: shell.0,
        };
        self.finish(&graph, found, progress, diagnostics, started)
    }

    /// Run all stages, with the three pattern detectors in parallel.
    pub async fn run_concurrent(
        &self,
        transactions: &[Transaction],
        observer: &dyn ProgressObserver,
    ) -> Result<Analysis> {
        self.validate()?;
        let started = Instant::now();
        let mut progress = Progress::new(observer);
        let mut diagnostics = Diagnostics::default();

        let graph = Arc::new(self.build_graph(transactions, &mut progress, &mut diagnostics));

        progress.begin(Stage::CycleDetection);
        progress.begin(Stage::SmurfingDetection);
        progress.begin(Stage::ShellDetection);

        let cycles = {
            let graph = Arc::clone(&graph);
            let config = self.config.cycles.clone();
            tokio::task::spawn_blocking(move || {
                timed(Stage::CycleDetection, || CycleDetector::compute(&graph, &config))
            })
        };
        let smurfing = {
            let graph = Arc::clone(&graph);
            let config = self.config.smurfing.clone();
            tokio::task::spawn_blocking(move || {
                timed(Stage::SmurfingDetection, || {
                    SmurfingDetector::compute(&graph, &config)
                })
            })
        };
        let shell = {
            let graph = Arc::clone(&graph);
            let config = self.config.shell.clone();
            tokio::task::spawn_blocking(move || {
                timed(Stage::ShellDetection, || {
                    ShellNetworkDetector::compute(&graph, &config)
                })
            })
        };

        let (cycles, smurfing, shell) = tokio::try_join!(cycles, smurfing, shell)
            .map_err(|e| FlowError::internal(format!("detector task failed: {e}")))?;

        diagnostics.record(Stage::CycleDetection, cycles.1, cycles.0.cycles.len());
        diagnostics.record(Stage::SmurfingDetection, smurfing.1, smurfing.0.len());
        diagnostics.record(Stage::ShellDetection, shell.1, shell.0.len());
        progress.finish(3);

        let found = DetectorResults {
            cycles: cycles.0,
            smurfing: smurfing.0,
            shell_chains: shell.0,
        };
        self.finish(&graph, found, progress, diagnostics, started)
    }

    fn build_graph(
        &self,
        transactions: &[Transaction],
        progress: &mut Progress<'_>,
        diagnostics: &mut Diagnostics,
    ) -> TransactionGraph {
        info!(transactions = transactions.len(), "starting analysis");
        progress.begin(Stage::GraphConstruction);
        let (graph, elapsed) = timed(Stage::GraphConstruction, || {
            GraphBuilder::compute(transactions)
        });
        diagnostics.record(Stage::GraphConstruction, elapsed, graph.num_accounts());
        progress.finish(1);
        graph
    }

    /// Legitimacy, scoring and report assembly.
    fn finish(
        &self,
        graph: &TransactionGraph,
        found: DetectorResults,
        mut progress: Progress<'_>,
        mut diagnostics: Diagnostics,
        started: Instant,
    ) -> Result<Analysis> {
        diagnostics.cycle_truncation = found.cycles.truncated;
        diagnostics.cycle_candidates = found.cycles.candidates;
        diagnostics.cycle_starts_searched = found.cycles.starts_searched;
        if let Some(reason) = found.cycles.truncated {
            warn!(
                %reason,
                cycles = found.cycles.cycles.len(),
                searched = found.cycles.starts_searched,
                candidates = found.cycles.candidates,
                "cycle search truncated"
            );
        }

        progress.begin(Stage::LegitimacyFiltering);
        let (legitimate, elapsed) = timed(Stage::LegitimacyFiltering, || {
            LegitimacyFilter::compute(graph, &self.config.legitimacy)
        });
        diagnostics.record(Stage::LegitimacyFiltering, elapsed, legitimate.len());
        progress.finish(1);

        let detections = Detections {
            cycles: found.cycles.cycles,
            smurfing: found.smurfing,
            shell_chains: found.shell_chains,
            legitimate,
        };

        progress.begin(Stage::Scoring);
        let (board, elapsed) = timed(Stage::Scoring, || {
            SuspicionScorer::compute(graph, &detections, &self.config.scoring)
        });
        let board = board?;
        diagnostics.record(Stage::Scoring, elapsed, board.rings.len());
        progress.finish(1);

        progress.begin(Stage::Reporting);
        let report_started = Instant::now();
        let report = AnalysisReport::assemble(&board, graph.num_transactions(), started.elapsed());
        let projection = self
            .config
            .projection
            .enabled
            .then(|| GraphProjection::build(graph, &board, &report, &self.config.projection));
        diagnostics.record(
            Stage::Reporting,
            report_started.elapsed(),
            report.suspicious_accounts.len(),
        );
        progress.finish(1);
        progress.complete();

        info!(
            accounts = report.summary.total_accounts_analyzed,
            flagged = report.summary.suspicious_accounts_flagged,
            rings = report.summary.fraud_rings_detected,
            seconds = report.summary.processing_time_seconds,
            "analysis complete"
        );

        Ok(Analysis {
            report,
            diagnostics,
            projection,
        })
    }
}

fn timed<T>(stage: Stage, f: impl FnOnce() -> T) -> (T, Duration) {
    let span = info_span!("stage", stage = %stage);
    let _guard = span.enter();
    let start = Instant::now();
    let out = f();
    let elapsed = start.elapsed();
    debug!(elapsed_us = elapsed.as_micros() as u64, "stage finished");
    (out, elapsed)
}

impl AnalysisKernel for Pipeline {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}

#[async_trait]
impl BatchKernel<AnalysisInput, AnalysisOutput> for Pipeline {
    async fn execute(&self, input: AnalysisInput) -> Result<AnalysisOutput> {
        let start = Instant::now();
        let transactions = validate_records(&input.records)?;
        let analysis = self.run_concurrent(&transactions, &NoProgress).await?;
        Ok(AnalysisOutput {
            analysis,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }

    fn validate_input(&self, input: &AnalysisInput) -> Result<()> {
        validate_records(&input.records).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensicflow_detect::types::TruncationReason;
    use std::sync::Mutex;

    fn triangle() -> Vec<Transaction> {
        vec![
            Transaction::at_epoch("T1", "A", "B", 100.0, 0),
            Transaction::at_epoch("T2", "B", "C", 100.0, 7_200),
            Transaction::at_epoch("T3", "C", "A", 100.0, 14_400),
        ]
    }

    #[test]
    fn test_pipeline_metadata() {
        let pipeline = Pipeline::new();
        assert_eq!(pipeline.metadata().id, "pipeline/analyze");
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_progress_events() {
        let events = Mutex::new(Vec::new());
        let observer = |e: ProgressEvent| events.lock().unwrap().push(e);
        Pipeline::new().run(&triangle(), &observer).unwrap();

        let events = events.into_inner().unwrap();
        let stages: Vec<Stage> = events.iter().map(|e| e.stage).collect();
        let mut expected = Stage::WORK.to_vec();
        expected.push(Stage::Complete);
        assert_eq!(stages, expected);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.completed, i);
            assert_eq!(e.total, 7);
        }
    }

    #[test]
    fn test_diagnostics_recorded() {
        let analysis = Pipeline::new().run(&triangle(), &NoProgress).unwrap();
        assert_eq!(analysis.diagnostics.stages.len(), Stage::WORK.len());
        assert_eq!(
            analysis.diagnostics.stage(Stage::CycleDetection).unwrap().items,
            1
        );
        assert_eq!(analysis.diagnostics.cycle_truncation, None);
        assert!(analysis.projection.is_none());
    }

    #[test]
    fn test_truncation_is_not_fatal() {
        let mut transactions = triangle();
        transactions.extend([
            Transaction::at_epoch("T4", "D", "E", 50.0, 0),
            Transaction::at_epoch("T5", "E", "F", 50.0, 60),
            Transaction::at_epoch("T6", "F", "D", 50.0, 120),
        ]);
        let mut config = AnalysisConfig::default();
        config.cycles.max_cycles = Some(1);
        let analysis = Pipeline::with_config(config).run(&transactions, &NoProgress).unwrap();
        assert_eq!(
            analysis.diagnostics.cycle_truncation,
            Some(TruncationReason::CycleLimit)
        );
        assert_eq!(analysis.report.fraud_rings.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig::default().with_cycle_timeout(Duration::ZERO);
        let err = Pipeline::with_config(config).run(&triangle(), &NoProgress).unwrap_err();
        assert!(matches!(err, FlowError::ConfigError(_)));
    }

    #[test]
    fn test_projection_enabled() {
        let config = AnalysisConfig::default().with_projection(true);
        let analysis = Pipeline::with_config(config).run(&triangle(), &NoProgress).unwrap();
        let projection = analysis.projection.unwrap();
        assert_eq!(projection.rendered_nodes, 3);
        assert_eq!(projection.edges.len(), 3);
    }

    #[test]
    fn test_analyze_rejects_bad_rows() {
        let records = vec![TransactionRecord::new("T1", "A", "B", "abc", "2024-01-01 00:00:00")];
        let err = Pipeline::new().analyze(&records).unwrap_err();
        assert!(matches!(err, FlowError::InvalidAmount { row: 1, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_progress_order() {
        let events = Mutex::new(Vec::new());
        let observer = |e: ProgressEvent| events.lock().unwrap().push((e.stage, e.completed));
        Pipeline::new()
            .run_concurrent(&triangle(), &observer)
            .await
            .unwrap();
        let events = events.into_inner().unwrap();
        assert_eq!(events[0], (Stage::GraphConstruction, 0));
        assert_eq!(events[1], (Stage::CycleDetection, 1));
        assert_eq!(events[3], (Stage::ShellDetection, 1));
        assert_eq!(events[4], (Stage::LegitimacyFiltering, 4));
        assert_eq!(events.last().copied(), Some((Stage::Complete, 7)));
    }

    #[tokio::test]
    async fn test_pipeline_execute() {
        let pipeline = Pipeline::new();
        let records = vec![
            TransactionRecord::new("T1", "A", "B", "100", "2024-01-01 10:00:00"),
            TransactionRecord::new("T2", "B", "C", "100", "2024-01-01 12:00:00"),
            TransactionRecord::new("T3", "C", "A", "100", "2024-01-01 14:00:00"),
        ];
        let out = pipeline.execute(AnalysisInput::new(records)).await.unwrap();
        assert_eq!(out.analysis.report.fraud_rings.len(), 1);
        assert_eq!(out.analysis.report.summary.total_transactions, 3);
    }
}
