//! Water safety report rendering.
//!
//! The report always carries the same six `##` sections in the same order.
//! Visual findings, risk mapping and curated resources are rendered straight
//! from the stage artifacts; the narrative sections come from the model and
//! pass through the [`cleanup`] pipeline first.

mod cleanup;

use serde::Deserialize;
use tracing::{debug, instrument};

use waterauditor_shared::{ResourceSet, RiskMap, VisualFindings};

/// Report title (the only H1).
pub const REPORT_TITLE: &str = "Water Quality Report";

/// Fixed section headings, in order.
pub const SECTION_HEADINGS: [&str; 6] = [
    "Summary",
    "Visual Findings",
    "Risk Mapping",
    "Recommended Purification Techniques",
    "Do's and Don'ts",
    "Curated Resources by Category",
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Model-written parts of the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Narrative {
    /// Short overview of the situation.
    #[serde(default)]
    pub summary: String,
    /// Recommended purification techniques, one per item.
    #[serde(default)]
    pub purification: Vec<String>,
    /// Safe-use tips.
    #[serde(default)]
    pub dos: Vec<String>,
    /// Safety warnings.
    #[serde(default)]
    pub donts: Vec<String>,
}

/// Everything the renderer needs.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    /// Labelled sample context fields (e.g. `("Water Source", "well")`).
    pub context: Vec<(&'static str, &'a str)>,
    pub findings: &'a VisualFindings,
    pub risk_map: &'a RiskMap,
    pub resources: &'a ResourceSet,
    pub narrative: &'a Narrative,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Render the complete report.
///
/// Output depends only on `input`: identical input yields identical bytes.
#[instrument(skip_all, fields(links = input.resources.total_links()))]
pub fn render_report(input: &ReportInput<'_>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {REPORT_TITLE}\n"));

    // Summary
    push_section(&mut out, SECTION_HEADINGS[0]);
    let summary = cleanup::run_pipeline(&input.narrative.summary);
    if summary.is_empty() {
        out.push_str("_No summary was provided._\n");
    } else {
        out.push_str(&summary);
        out.push('\n');
    }
    if !input.context.is_empty() {
        out.push('\n');
        for (label, value) in &input.context {
            out.push_str(&format!("- **{label}**: {}\n", single_line(value)));
        }
    }

    // Visual Findings
    push_section(&mut out, SECTION_HEADINGS[1]);
    push_findings(&mut out, input.findings);

    // Risk Mapping
    push_section(&mut out, SECTION_HEADINGS[2]);
    push_risk_map(&mut out, input.risk_map);

    // Recommended Purification Techniques
    push_section(&mut out, SECTION_HEADINGS[3]);
    push_list(&mut out, &input.narrative.purification, "No specific techniques were suggested.");

    // Do's and Don'ts
    push_section(&mut out, SECTION_HEADINGS[4]);
    out.push_str("**Do:**\n\n");
    push_list(&mut out, &input.narrative.dos, "No specific recommendations.");
    out.push_str("\n**Don't:**\n\n");
    push_list(&mut out, &input.narrative.donts, "No specific warnings.");

    // Curated Resources by Category
    push_section(&mut out, SECTION_HEADINGS[5]);
    push_resources(&mut out, input.resources);

    debug!(len = out.len(), "report rendered");
    out
}

/// Section headings from [`SECTION_HEADINGS`] that are missing from
/// `markdown` or appear out of order.
pub fn misplaced_sections(markdown: &str) -> Vec<&'static str> {
    let found: Vec<&str> = markdown
        .lines()
        .filter_map(|line| line.strip_prefix("## "))
        .map(str::trim)
        .collect();

    let mut misplaced = Vec::new();
    let mut cursor = 0;
    for heading in SECTION_HEADINGS {
        match found[cursor..].iter().position(|h| *h == heading) {
            Some(offset) => cursor += offset + 1,
            None => misplaced.push(heading),
        }
    }
    misplaced
}

// ---------------------------------------------------------------------------
// Section helpers
// ---------------------------------------------------------------------------

fn push_section(out: &mut String, heading: &str) {
    out.push_str(&format!("\n## {heading}\n\n"));
}

fn push_findings(out: &mut String, findings: &VisualFindings) {
    out.push_str(&format!(
        "**Contamination level:** `{}`\n\n",
        findings.contamination_level
    ));

    out.push_str("**Detected indicators:**\n\n");
    push_list(out, &findings.detected_features, "No visible indicators detected.");

    out.push_str("\n**Likely risks:**\n\n");
    push_list(out, &findings.likely_risks, "No specific risks inferred.");
}

fn push_risk_map(out: &mut String, risk_map: &RiskMap) {
    let summary = single_line(&cleanup::run_pipeline(risk_map.summary()));
    if !summary.is_empty() {
        out.push_str(&format!("{summary}\n\n"));
    }
    out.push_str(&format!(
        "**Overall severity:** `{}`\n\n",
        risk_map.overall_severity()
    ));
    for entry in risk_map.entries() {
        out.push_str(&format!("- `{}`: {}\n", entry.label(), single_line(&entry.source)));
    }
    if let Some(note) = risk_map.note() {
        out.push_str(&format!("\n> **Note:** {}\n", single_line(note)));
    }
}

fn push_resources(out: &mut String, resources: &ResourceSet) {
    for warning in resources.warnings() {
        out.push_str(&format!("> **Warning:** {}\n\n", single_line(warning)));
    }

    let mut first = true;
    for (category, links) in resources.iter() {
        if !first {
            out.push('\n');
        }
        first = false;

        out.push_str(&format!("### {}\n\n", category.title()));
        if links.is_empty() {
            out.push_str("- _No resources found._\n");
            continue;
        }
        for link in links {
            out.push_str(&format!(
                "- [{}]({})\n",
                cleanup::escape_link_text(&link.title),
                link.link
            ));
        }
    }
}

fn push_list(out: &mut String, items: &[String], empty: &str) {
    let cleaned: Vec<String> = items
        .iter()
        .map(|item| cleanup::clean_list_item(item))
        .filter(|item| !item.is_empty())
        .collect();

    if cleaned.is_empty() {
        out.push_str(&format!("- _{empty}_\n"));
        return;
    }
    for item in cleaned {
        out.push_str(&format!("- {item}\n"));
    }
}

/// Collapse whitespace so a value cannot break out of its line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
