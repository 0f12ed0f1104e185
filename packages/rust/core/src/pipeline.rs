//! End-to-end audit pipeline: bundle → findings → risk map → resources → report.

use std::time::{Duration, Instant};

use tracing::{Span, field, info, instrument};

use waterauditor_shared::{
    AuditConfig, ReasoningService, Report, RequestId, ResourceSet, Result, RiskMap,
    SearchService, Stage, VisualFindings,
};

use crate::bundle::{InputBundle, InputBundleBuilder};
use crate::{analyzer, composer, mapper, researcher};

/// Everything one audit produced.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub request_id: RequestId,
    pub findings: VisualFindings,
    pub risk_map: RiskMap,
    pub resources: ResourceSet,
    pub report: Report,
    /// Wall-clock time for the whole run.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn phase(&self, stage: Stage);
    /// Called once the report is ready.
    fn done(&self, outcome: &AuditOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _stage: Stage) {}
    fn done(&self, _outcome: &AuditOutcome) {}
}

/// Run the four stages over a validated bundle.
///
/// 1. Visual analysis of the image
/// 2. Risk mapping from the findings and the context fields
/// 3. Resource research, one search per category
/// 4. Report composition
///
/// Stages run strictly in order and the first failure ends the run; no
/// partial report is produced.
#[instrument(
    skip_all,
    fields(source_type = %bundle.source_type(), usage = %bundle.usage(), request_id = tracing::field::Empty)
)]
pub async fn run_audit<R, S>(
    bundle: &InputBundle,
    reasoning: &R,
    search: &S,
    config: &AuditConfig,
    progress: &dyn ProgressReporter,
) -> Result<AuditOutcome>
where
    R: ReasoningService,
    S: SearchService,
{
    let start = Instant::now();
    let request_id = RequestId::new();
    Span::current().record("request_id", field::display(request_id));

    info!("starting audit");

    progress.phase(Stage::VisualAnalysis);
    let findings = analyzer::analyze(reasoning, bundle.image()).await?;

    progress.phase(Stage::RiskMapping);
    let risk_map = mapper::map_risks(reasoning, &findings, bundle).await?;

    progress.phase(Stage::ResourceResearch);
    let resources = researcher::research(search, &risk_map, bundle, config).await?;

    progress.phase(Stage::ReportComposition);
    let report = composer::compose(
        reasoning,
        bundle,
        &findings,
        &risk_map,
        &resources,
        request_id,
    )
    .await?;

    let outcome = AuditOutcome {
        request_id,
        findings,
        risk_map,
        resources,
        report,
        elapsed: start.elapsed(),
    };

    progress.done(&outcome);

    info!(
        request_id = %outcome.request_id,
        risks = %outcome.risk_map.labels(),
        links = outcome.resources.total_links(),
        elapsed_ms = outcome.elapsed.as_millis(),
        "audit complete"
    );

    Ok(outcome)
}

/// Validate the builder's input, then run the audit.
///
/// Invalid input fails before any service is called.
pub async fn generate_report<R, S>(
    builder: InputBundleBuilder,
    reasoning: &R,
    search: &S,
    config: &AuditConfig,
    progress: &dyn ProgressReporter,
) -> Result<AuditOutcome>
where
    R: ReasoningService,
    S: SearchService,
{
    let bundle = builder.build()?;
    run_audit(&bundle, reasoning, search, config, progress).await
}
