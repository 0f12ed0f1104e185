//! Stage 3: risk mapping from visual findings and sample context.

use serde::Deserialize;
use tracing::{info, instrument};

use waterauditor_shared::{
    AuditError, ReasoningRequest, ReasoningService, Result, RiskCategory, RiskEntry, RiskMap,
    Severity, Stage, VisualFindings,
};

use crate::bundle::InputBundle;
use crate::{prompts, response};

/// Diagnosis shape requested from the model.
#[derive(Debug, Deserialize)]
struct Diagnosis {
    #[serde(default)]
    summary: String,
    severity: Severity,
    #[serde(alias = "causes")]
    contamination_causes: Vec<Cause>,
    #[serde(default)]
    action_note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cause {
    #[serde(rename = "type", alias = "category")]
    category: RiskCategory,
    #[serde(default)]
    source: String,
    #[serde(alias = "severity")]
    risk_level: Severity,
}

/// Classify the findings into biological, chemical and vector-borne risks.
///
/// Reads only the non-image fields of the bundle. Any service failure,
/// unusable answer, or unclassified category is an
/// [`AuditError::AnalysisService`].
#[instrument(skip_all, fields(usage = %bundle.usage(), source_type = %bundle.source_type()))]
pub async fn map_risks<R: ReasoningService>(
    reasoning: &R,
    findings: &VisualFindings,
    bundle: &InputBundle,
) -> Result<RiskMap> {
    let request = ReasoningRequest {
        stage: Stage::RiskMapping,
        instructions: prompts::RISK_MAPPING,
        prompt: prompts::risk_prompt(findings, bundle),
        image: None,
    };

    let text = reasoning
        .complete(&request)
        .await
        .map_err(|e| AuditError::AnalysisService(format!("risk mapping failed: {e}")))?;

    let diagnosis: Diagnosis = response::parse_json(&text).map_err(|e| {
        AuditError::AnalysisService(format!("risk mapping returned an unusable answer: {e}"))
    })?;

    let entries = diagnosis
        .contamination_causes
        .into_iter()
        .map(|cause| RiskEntry {
            category: cause.category,
            severity: cause.risk_level,
            source: cause.source.trim().to_string(),
        })
        .collect();

    let risk_map = RiskMap::new(
        diagnosis.summary,
        diagnosis.severity,
        entries,
        diagnosis.action_note,
    )?;

    info!(
        overall = %risk_map.overall_severity(),
        risks = %risk_map.labels(),
        "risk mapping complete"
    );

    Ok(risk_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubReasoning, sample_findings, valid_builder};

    #[tokio::test]
    async fn maps_fenced_diagnosis() {
        let bundle = valid_builder().build().unwrap();
        let stub = StubReasoning::happy();

        let risk_map = map_risks(&stub, &sample_findings(), &bundle).await.unwrap();

        assert_eq!(risk_map.labels(), "biological:medium, chemical:low, vector-borne:low");
        assert_eq!(risk_map.overall_severity(), Severity::Medium);
        assert!(risk_map.note().unwrap().contains("drinking"));
        assert!(!stub.had_image(Stage::RiskMapping));
    }

    #[tokio::test]
    async fn prompt_carries_findings_and_context() {
        let bundle = valid_builder().build().unwrap();
        let stub = StubReasoning::happy();

        map_risks(&stub, &sample_findings(), &bundle).await.unwrap();

        let prompt = stub.prompt_for(Stage::RiskMapping).unwrap();
        assert!(prompt.contains("high turbidity"));
        assert!(prompt.contains("Surrounding Area: rural, near farmland"));
        assert!(prompt.contains("User-Noticed Issues: cloudy, slight odor"));
    }

    #[tokio::test]
    async fn missing_category_is_analysis_error() {
        let bundle = valid_builder().build().unwrap();
        let stub = StubReasoning::happy().with_response(
            Stage::RiskMapping,
            r#"{"summary":"s","severity":"Low","contamination_causes":[{"type":"Chemical","source":"oil sheen","risk_level":"High"}]}"#,
        );

        let err = map_risks(&stub, &sample_findings(), &bundle).await.unwrap_err();
        assert!(matches!(err, AuditError::AnalysisService(_)));
        assert!(err.to_string().contains("biological"));
    }

    #[tokio::test]
    async fn unknown_category_is_analysis_error() {
        let bundle = valid_builder().build().unwrap();
        let stub = StubReasoning::happy().with_response(
            Stage::RiskMapping,
            r#"{"summary":"s","severity":"Low","contamination_causes":[{"type":"Radiological","source":"x","risk_level":"Low"}]}"#,
        );

        let err = map_risks(&stub, &sample_findings(), &bundle).await.unwrap_err();
        assert!(matches!(err, AuditError::AnalysisService(_)));
    }

    #[tokio::test]
    async fn service_failure_is_analysis_error() {
        let bundle = valid_builder().build().unwrap();
        let stub = StubReasoning::happy().failing_at(Stage::RiskMapping);

        let err = map_risks(&stub, &sample_findings(), &bundle).await.unwrap_err();
        assert!(matches!(err, AuditError::AnalysisService(_)));
    }
}
