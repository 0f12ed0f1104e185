//! Stage 2: visual contamination analysis of the sample photo.

use tracing::{info, instrument};

use waterauditor_shared::{
    AuditError, ReasoningRequest, ReasoningService, Result, SampleImage, Stage, VisualFindings,
};

use crate::{prompts, response};

/// Inspect the photo and return the visual findings.
///
/// Only the image is sent; context fields are not visible to this stage.
/// Any service failure or unusable answer is an
/// [`AuditError::AnalysisService`].
#[instrument(skip_all, fields(image_kind = ?image.kind(), image_len = image.bytes().len()))]
pub async fn analyze<R: ReasoningService>(reasoning: &R, image: &SampleImage) -> Result<VisualFindings> {
    let request = ReasoningRequest {
        stage: Stage::VisualAnalysis,
        instructions: prompts::VISUAL_ANALYSIS,
        prompt: prompts::visual_prompt(),
        image: Some(image),
    };

    let text = reasoning
        .complete(&request)
        .await
        .map_err(|e| AuditError::AnalysisService(format!("visual analysis failed: {e}")))?;

    let findings: VisualFindings = response::parse_json(&text).map_err(|e| {
        AuditError::AnalysisService(format!("visual analysis returned an unusable answer: {e}"))
    })?;

    info!(
        features = findings.detected_features.len(),
        level = %findings.contamination_level,
        "visual analysis complete"
    );

    Ok(findings)
}
