//! Instruction templates and prompt builders for each stage.

use waterauditor_shared::{ResourceCategory, ResourceSet, RiskMap, SearchQuery, VisualFindings};

use crate::bundle::InputBundle;

/// Instructions for the visual inspection stage.
pub const VISUAL_ANALYSIS: &str = "\
You are a water safety inspector. Given a photo of water in a container or a surface \
water body, detect visual signs of contamination and assess the risk level.

Inspect the image for visible indicators such as:
- Murky, turbid or discolored water
- Foam or oil sheen
- Floating particles or sediment
- Algae, moss or biofilm
- Mosquito larvae or other visible organisms

Respond with a single JSON object and nothing else:
{
  \"detected_features\": [\"visible contamination indicator\", ...],
  \"contamination_level\": \"Low\" | \"Moderate\" | \"High\",
  \"likely_risks\": [\"possible risk, e.g. bacterial, chemical, mosquito-borne\", ...]
}";

/// Instructions for the risk mapping stage.
pub const RISK_MAPPING: &str = "\
You are a water risk analyst. Based on visual findings and the context of the water \
source, classify contamination causes and their risk levels. Do not give recommendations.

Classify every one of these categories exactly once: Biological, Chemical, Vector-borne.
For each, give:
- type: the category
- source: the probable visible indicator or origin (murkiness, algae, larvae, sediment...)
- risk_level: Low, Moderate or High

Use the context to weight severity: water used for drinking or cooking carries more \
weight than water used for cleaning or irrigation, and nearby industry or farmland raises \
chemical risk. End with a neutral note on concern or urgency, without advice.

Respond with a single JSON object and nothing else:
{
  \"summary\": \"concise overview of the contamination situation\",
  \"severity\": \"Low\" | \"Moderate\" | \"High\",
  \"contamination_causes\": [{\"type\": \"...\", \"source\": \"...\", \"risk_level\": \"...\"}],
  \"action_note\": \"neutral remark on urgency or concern\"
}";

/// Instructions for the report composition stage.
pub const REPORT_COMPOSITION: &str = "\
You are a water safety assistant. You receive a visual contamination summary of a water \
sample, a risk diagnosis by contamination type and severity, and curated web links grouped \
by category. Write the narrative parts of a practical water safety report.

- summary: two to four sentences on what was observed and how concerning it is.
- purification: best-fit purification techniques for this scenario (boiling, chlorination, \
filtration, solar disinfection...), one technique per item.
- dos: practical, friendly safe-use tips.
- donts: clear safety warnings (e.g. do not use untreated water for cooking).

Embed one or two of the provided links directly inside the purification items and the \
do's and don'ts using markdown link syntax, e.g. [boil water safely](https://...). Only \
use links from the provided list. Avoid location-specific recommendations. Do not use \
headings.

Respond with a single JSON object and nothing else:
{
  \"summary\": \"...\",
  \"purification\": [\"...\"],
  \"dos\": [\"...\"],
  \"donts\": [\"...\"]
}";

/// User prompt for the visual inspection stage.
pub fn visual_prompt() -> String {
    "Inspect this water image for contamination signs.".to_string()
}

/// User prompt for the risk mapping stage: findings plus the sample context.
pub fn risk_prompt(findings: &VisualFindings, bundle: &InputBundle) -> String {
    format!(
        "Visual inspection findings:\n{}\n\nWater Source: {}\nUsage: {}\nSurrounding Area: {}\n\
         User-Noticed Issues: {}\nUrgency Level: {}",
        findings.to_markdown(),
        bundle.source_type(),
        bundle.usage(),
        bundle.surroundings(),
        bundle.observed_issues(),
        bundle.urgency().unwrap_or("Not specified"),
    )
}

/// Search phrase for each resource category.
fn category_phrase(category: ResourceCategory) -> &'static str {
    match category {
        ResourceCategory::DiyPurification => "DIY water purification methods",
        ResourceCategory::HygieneGuidelines => "water safety and hygiene guidelines",
        ResourceCategory::Advisories => "NGO public health drinking water advisory",
        ResourceCategory::FilterReviews => "water filter reviews recommendations",
    }
}

/// Build the web query for one category.
///
/// Combines the category phrase, the water source, the elevated risk
/// categories and any user preferences.
pub fn research_query(
    category: ResourceCategory,
    risk_map: &RiskMap,
    source_type: &str,
    preferences: Option<&str>,
) -> SearchQuery {
    let mut parts = vec![
        category_phrase(category).to_string(),
        format!("{} water", source_type.trim()),
    ];

    let elevated = risk_map.elevated_categories();
    if !elevated.is_empty() {
        let risks: Vec<&str> = elevated.iter().map(|c| c.as_str()).collect();
        parts.push(format!("{} contamination", risks.join(" ")));
    }

    if let Some(preferences) = preferences {
        parts.push(preferences.trim().to_string());
    }

    SearchQuery {
        text: parts.join(" "),
        category,
    }
}

/// User prompt for the report composition stage.
pub fn composition_prompt(
    bundle: &InputBundle,
    findings: &VisualFindings,
    risk_map: &RiskMap,
    resources: &ResourceSet,
) -> String {
    let context = bundle
        .context_fields()
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Sample context:\n{context}\n\nVisual inspection summary:\n{}\n\n\
         Water contamination diagnosis:\n{}\n\nCurated web resources:\n{}",
        findings.to_markdown(),
        risk_map.to_markdown(),
        resources.to_markdown(),
    )
}
