//! Stage 5: report composition.

use chrono::Utc;
use tracing::{info, instrument};

use waterauditor_markdown::{Narrative, ReportInput, misplaced_sections, render_report};
use waterauditor_shared::{
    AuditError, ReasoningRequest, ReasoningService, Report, RequestId, ResourceSet, Result,
    RiskMap, Stage, VisualFindings,
};

use crate::bundle::InputBundle;
use crate::{prompts, response};

/// Ask the model for the narrative and render the final report.
///
/// Findings, risk map and resources are rendered from the artifacts
/// themselves; only the summary, purification techniques and do's and
/// don'ts come from the model.
#[instrument(skip_all, fields(%request_id))]
pub async fn compose<R: ReasoningService>(
    reasoning: &R,
    bundle: &InputBundle,
    findings: &VisualFindings,
    risk_map: &RiskMap,
    resources: &ResourceSet,
    request_id: RequestId,
) -> Result<Report> {
    let request = ReasoningRequest {
        stage: Stage::ReportComposition,
        instructions: prompts::REPORT_COMPOSITION,
        prompt: prompts::composition_prompt(bundle, findings, risk_map, resources),
        image: None,
    };

    let text = reasoning
        .complete(&request)
        .await
        .map_err(|e| AuditError::CompositionService(format!("report composition failed: {e}")))?;

    let narrative: Narrative = response::parse_json(&text).map_err(|e| {
        AuditError::CompositionService(format!("report composition returned an unusable answer: {e}"))
    })?;

    let markdown = render_report(&ReportInput {
        context: bundle.context_fields(),
        findings,
        risk_map,
        resources,
        narrative: &narrative,
    });

    let misplaced = misplaced_sections(&markdown);
    if !misplaced.is_empty() {
        return Err(AuditError::CompositionService(format!(
            "rendered report is missing sections: {}",
            misplaced.join(", ")
        )));
    }

    info!(bytes = markdown.len(), "report composed");

    Ok(Report {
        request_id,
        generated_at: Utc::now(),
        markdown,
    })
}
