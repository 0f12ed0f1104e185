//! Deterministic stub services and fixtures for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use waterauditor_shared::{
    AuditError, ReasoningRequest, ReasoningService, ResourceCategory, Result, RiskCategory,
    RiskEntry, RiskMap, SearchHit, SearchQuery, SearchService, Severity, Stage, VisualFindings,
};

use crate::bundle::InputBundleBuilder;

/// Smallest byte string the format sniffer accepts as JPEG.
pub(crate) const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

pub(crate) const FINDINGS_JSON: &str = r#"{"detected_features":["high turbidity","organic odor"],"contamination_level":"Moderate","likely_risks":["bacterial contamination"]}"#;

pub(crate) const RISK_JSON: &str = r#"```json
{
  "summary": "Cloudy well water with organic odor suggests microbial contamination.",
  "severity": "Moderate",
  "contamination_causes": [
    {"type": "Biological", "source": "turbidity and odor", "risk_level": "Moderate"},
    {"type": "Chemical", "source": "nearby farmland runoff", "risk_level": "Low"},
    {"type": "Vector-borne", "source": "no larvae visible", "risk_level": "Low"}
  ],
  "action_note": "Concern is elevated because the water is used for drinking."
}
```"#;

pub(crate) const NARRATIVE_JSON: &str = r#"{"summary":"The well sample is cloudy and smells organic.","purification":["Boil water for at least one minute ([how to boil water](https://example.org/diy_purification/1))."],"dos":["Store treated water in clean, covered containers."],"donts":["Don't drink untreated water."]}"#;

/// Builder for the reference scenario: murky well water used for drinking.
pub(crate) fn valid_builder() -> InputBundleBuilder {
    InputBundleBuilder::new()
        .image(JPEG_BYTES)
        .source_type("well")
        .usage("drinking")
        .surroundings("rural, near farmland")
        .observed_issues("cloudy, slight odor")
}

pub(crate) fn sample_findings() -> VisualFindings {
    VisualFindings {
        detected_features: vec!["high turbidity".into(), "organic odor".into()],
        contamination_level: Severity::Medium,
        likely_risks: vec!["bacterial contamination".into()],
    }
}

/// `biological:medium, chemical:low, vector-borne:low`
pub(crate) fn sample_risk_map() -> RiskMap {
    let entry = |category, severity, source: &str| RiskEntry {
        category,
        severity,
        source: source.into(),
    };
    RiskMap::new(
        "Cloudy well water with organic odor suggests microbial contamination.",
        Severity::Medium,
        vec![
            entry(RiskCategory::Biological, Severity::Medium, "turbidity and odor"),
            entry(RiskCategory::Chemical, Severity::Low, "nearby farmland runoff"),
            entry(RiskCategory::VectorBorne, Severity::Low, "no larvae visible"),
        ],
        None,
    )
    .expect("sample risk map")
}

// ---------------------------------------------------------------------------
// StubReasoning
// ---------------------------------------------------------------------------

/// Reasoning stub with canned answers per stage and a call log.
pub(crate) struct StubReasoning {
    responses: HashMap<Stage, std::result::Result<String, String>>,
    calls: Mutex<Vec<(Stage, String, bool)>>,
}

impl StubReasoning {
    /// Stub answering every stage successfully with the reference fixtures.
    pub(crate) fn happy() -> Self {
        Self {
            responses: HashMap::from([
                (Stage::VisualAnalysis, Ok(FINDINGS_JSON.to_string())),
                (Stage::RiskMapping, Ok(RISK_JSON.to_string())),
                (Stage::ReportComposition, Ok(NARRATIVE_JSON.to_string())),
            ]),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace one stage's answer.
    pub(crate) fn with_response(mut self, stage: Stage, text: &str) -> Self {
        self.responses.insert(stage, Ok(text.to_string()));
        self
    }

    /// Make one stage fail.
    pub(crate) fn failing_at(mut self, stage: Stage) -> Self {
        self.responses
            .insert(stage, Err(format!("{} unavailable", stage.as_str())));
        self
    }

    /// Stages called, in call order.
    pub(crate) fn stages_called(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().iter().map(|(s, _, _)| *s).collect()
    }

    pub(crate) fn calls_for(&self, stage: Stage) -> usize {
        self.stages_called().iter().filter(|s| **s == stage).count()
    }

    /// Prompt sent for a stage (last call).
    pub(crate) fn prompt_for(&self, stage: Stage) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _, _)| *s == stage)
            .map(|(_, p, _)| p.clone())
    }

    /// Whether the last call for a stage carried an image.
    pub(crate) fn had_image(&self, stage: Stage) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _, _)| *s == stage)
            .is_some_and(|(_, _, image)| *image)
    }
}

impl ReasoningService for StubReasoning {
    async fn complete(&self, request: &ReasoningRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push((
            request.stage,
            request.prompt.clone(),
            request.image.is_some(),
        ));
        match self.responses.get(&request.stage) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(AuditError::Provider(message.clone())),
            None => Err(AuditError::Provider("no stubbed response".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// StubSearch
// ---------------------------------------------------------------------------

/// Search stub returning one link per category unless overridden.
pub(crate) struct StubSearch {
    overrides: HashMap<ResourceCategory, Vec<SearchHit>>,
    failing: HashSet<ResourceCategory>,
    calls: Mutex<Vec<SearchQuery>>,
}

impl StubSearch {
    pub(crate) fn happy() -> Self {
        Self {
            overrides: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_hits(mut self, category: ResourceCategory, hits: Vec<SearchHit>) -> Self {
        self.overrides.insert(category, hits);
        self
    }

    pub(crate) fn failing_for(mut self, category: ResourceCategory) -> Self {
        self.failing.insert(category);
        self
    }

    pub(crate) fn queries(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub(crate) fn hit(title: &str, link: &str) -> SearchHit {
    SearchHit {
        title: title.into(),
        link: link.into(),
    }
}

impl SearchService for StubSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        self.calls.lock().unwrap().push(query.clone());
        if self.failing.contains(&query.category) {
            return Err(AuditError::Provider("search quota exhausted".into()));
        }
        Ok(self.overrides.get(&query.category).cloned().unwrap_or_else(|| {
            vec![hit(
                &format!("{} guide", query.category.title()),
                &format!("https://example.org/{}/1", query.category.as_str()),
            )]
        }))
    }
}
