//! Core domain types: the artifacts each pipeline stage produces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{AuditError, Result};

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one report request (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The four external-call stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    VisualAnalysis,
    RiskMapping,
    ResourceResearch,
    ReportComposition,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::VisualAnalysis,
        Stage::RiskMapping,
        Stage::ResourceResearch,
        Stage::ReportComposition,
    ];

    /// Stable identifier used in logs and requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisualAnalysis => "visual_analysis",
            Self::RiskMapping => "risk_mapping",
            Self::ResourceResearch => "resource_research",
            Self::ReportComposition => "report_composition",
        }
    }

    /// Human-readable label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VisualAnalysis => "Inspecting water sample image",
            Self::RiskMapping => "Mapping contamination risks",
            Self::ResourceResearch => "Researching purification resources",
            Self::ReportComposition => "Composing water safety report",
        }
    }
}

// ---------------------------------------------------------------------------
// SampleImage
// ---------------------------------------------------------------------------

/// Image encodings accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// MIME type for data URLs and uploads.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// The uploaded water-sample photo.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleImage {
    bytes: Vec<u8>,
    kind: ImageKind,
}

impl SampleImage {
    /// Wrap raw upload bytes, sniffing the format from the magic bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(AuditError::missing_input("the uploaded image is empty"));
        }

        let kind = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Jpeg) => ImageKind::Jpeg,
            Ok(image::ImageFormat::Png) => ImageKind::Png,
            Ok(other) => {
                return Err(AuditError::missing_input(format!(
                    "unsupported image format {other:?}; upload a JPEG or PNG photo"
                )));
            }
            Err(_) => {
                return Err(AuditError::missing_input(
                    "the uploaded file is not a recognizable image; upload a JPEG or PNG photo",
                ));
            }
        };

        Ok(Self { bytes, kind })
    }

    /// Raw image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected encoding.
    pub fn kind(&self) -> ImageKind {
        self.kind
    }
}

impl std::fmt::Debug for SampleImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleImage")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Qualitative severity label. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "moderate" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// VisualFindings
// ---------------------------------------------------------------------------

/// Output of the visual inspection stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualFindings {
    /// Visible contamination indicators.
    #[serde(default)]
    pub detected_features: Vec<String>,
    /// Overall qualitative risk estimate.
    pub contamination_level: Severity,
    /// Health or environmental risks inferred from the image.
    #[serde(default)]
    pub likely_risks: Vec<String>,
}

impl VisualFindings {
    /// Markdown rendering used in prompts and in the report body.
    pub fn to_markdown(&self) -> String {
        format!(
            "**Detected Contaminants**: {}\n**Contamination Level**: `{}`\n**Likely Risks**: {}",
            join_or_none(&self.detected_features),
            self.contamination_level,
            join_or_none(&self.likely_risks),
        )
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

// ---------------------------------------------------------------------------
// RiskMap
// ---------------------------------------------------------------------------

/// Contamination risk categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    Biological,
    Chemical,
    VectorBorne,
}

impl RiskCategory {
    /// All categories in report order.
    pub const ALL: [RiskCategory; 3] = [
        RiskCategory::Biological,
        RiskCategory::Chemical,
        RiskCategory::VectorBorne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biological => "biological",
            Self::Chemical => "chemical",
            Self::VectorBorne => "vector-borne",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();

        match normalized.as_str() {
            "biological" => Ok(Self::Biological),
            "chemical" => Ok(Self::Chemical),
            "vector-borne" | "vectorborne" => Ok(Self::VectorBorne),
            other => Err(format!("unknown risk category '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for RiskCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One classified risk: category, severity and the visible indicator behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub category: RiskCategory,
    pub severity: Severity,
    pub source: String,
}

impl RiskEntry {
    /// Compact `category:severity` label, e.g. `biological:medium`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.category, self.severity)
    }
}

/// Output of the risk mapping stage: exactly one entry per [`RiskCategory`],
/// in category order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskMap {
    summary: String,
    overall_severity: Severity,
    entries: Vec<RiskEntry>,
    note: Option<String>,
}

impl RiskMap {
    /// Normalize classified entries into a risk map.
    ///
    /// Duplicate categories keep the highest severity (and that entry's
    /// source). Every category must be classified at least once.
    pub fn new(
        summary: impl Into<String>,
        overall_severity: Severity,
        entries: Vec<RiskEntry>,
        note: Option<String>,
    ) -> Result<Self> {
        let mut by_category: BTreeMap<RiskCategory, RiskEntry> = BTreeMap::new();
        for entry in entries {
            match by_category.get(&entry.category) {
                Some(existing) if existing.severity >= entry.severity => {}
                _ => {
                    by_category.insert(entry.category, entry);
                }
            }
        }

        let missing: Vec<&str> = RiskCategory::ALL
            .iter()
            .filter(|c| !by_category.contains_key(c))
            .map(|c| c.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AuditError::AnalysisService(format!(
                "risk map did not classify: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            summary: summary.into().trim().to_string(),
            overall_severity,
            entries: by_category.into_values().collect(),
            note: note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn overall_severity(&self) -> Severity {
        self.overall_severity
    }

    /// Entries in category order.
    pub fn entries(&self) -> &[RiskEntry] {
        &self.entries
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Categories whose severity is medium or higher.
    pub fn elevated_categories(&self) -> Vec<RiskCategory> {
        self.entries
            .iter()
            .filter(|e| e.severity >= Severity::Medium)
            .map(|e| e.category)
            .collect()
    }

    /// `biological:medium, chemical:low, vector-borne:low`
    pub fn labels(&self) -> String {
        self.entries
            .iter()
            .map(RiskEntry::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Markdown rendering used in prompts and in the report body.
    pub fn to_markdown(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("**Summary**: {}", self.summary));
        lines.push(format!("**Overall Severity**: `{}`", self.overall_severity));
        lines.push(String::new());
        for entry in &self.entries {
            lines.push(format!("- **{}**: {}", entry.label(), entry.source));
        }
        if let Some(note) = &self.note {
            lines.push(String::new());
            lines.push(format!("**Note**: {note}"));
        }
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// ResourceSet
// ---------------------------------------------------------------------------

/// The four fixed resource categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    DiyPurification,
    HygieneGuidelines,
    Advisories,
    FilterReviews,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 4] = [
        ResourceCategory::DiyPurification,
        ResourceCategory::HygieneGuidelines,
        ResourceCategory::Advisories,
        ResourceCategory::FilterReviews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiyPurification => "diy_purification",
            Self::HygieneGuidelines => "hygiene_guidelines",
            Self::Advisories => "advisories",
            Self::FilterReviews => "filter_reviews",
        }
    }

    /// Heading used in the report.
    pub fn title(&self) -> &'static str {
        match self {
            Self::DiyPurification => "DIY Water Purification",
            Self::HygieneGuidelines => "Water Safety & Hygiene Guidelines",
            Self::Advisories => "NGO or Public Advisories",
            Self::FilterReviews => "Water Filter Reviews & Recommendations",
        }
    }
}

/// A curated link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub title: String,
    pub link: Url,
}

/// Output of the research stage. Always holds all four categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSet {
    categories: BTreeMap<ResourceCategory, Vec<ResourceLink>>,
    warnings: Vec<String>,
}

impl ResourceSet {
    /// Build a set; categories absent from `entries` map to an empty list.
    pub fn new(
        entries: impl IntoIterator<Item = (ResourceCategory, Vec<ResourceLink>)>,
        warnings: Vec<String>,
    ) -> Self {
        let mut categories: BTreeMap<ResourceCategory, Vec<ResourceLink>> = ResourceCategory::ALL
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();
        for (category, links) in entries {
            categories.insert(category, links);
        }
        Self {
            categories,
            warnings,
        }
    }

    /// Links for a category, in provider order.
    pub fn get(&self, category: ResourceCategory) -> &[ResourceLink] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate categories in report order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceCategory, &[ResourceLink])> {
        self.categories.iter().map(|(c, links)| (*c, links.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = ResourceCategory> + '_ {
        self.categories.keys().copied()
    }

    /// Degradation annotations (empty unless search failures were tolerated).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn total_links(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Markdown link list used in the composer prompt.
    pub fn to_markdown(&self) -> String {
        let mut lines = Vec::new();
        for (category, links) in self.iter() {
            lines.push(format!("{}:", category.title()));
            if links.is_empty() {
                lines.push("- (no results)".to_string());
            }
            for link in links {
                lines.push(format!("- [{}]({})", link.title, link.link));
            }
        }
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The final advisory document.
///
/// `markdown` depends only on the stage outputs; run metadata lives beside it.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub request_id: RequestId,
    pub generated_at: DateTime<Utc>,
    pub markdown: String,
}

impl Report {
    pub fn as_str(&self) -> &str {
        &self.markdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    fn entry(category: RiskCategory, severity: Severity) -> RiskEntry {
        RiskEntry {
            category,
            severity,
            source: "murkiness".into(),
        }
    }

    #[test]
    fn request_id_roundtrip() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().expect("parse RequestId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn sample_image_sniffs_png_and_jpeg() {
        let png = SampleImage::from_bytes(PNG_MAGIC.to_vec()).expect("png");
        assert_eq!(png.kind(), ImageKind::Png);
        assert_eq!(png.kind().mime_type(), "image/png");

        let jpeg = SampleImage::from_bytes(JPEG_MAGIC.to_vec()).expect("jpeg");
        assert_eq!(jpeg.kind(), ImageKind::Jpeg);
    }

    #[test]
    fn sample_image_rejects_empty_and_garbage() {
        let err = SampleImage::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, AuditError::MissingInput { .. }));

        let err = SampleImage::from_bytes(b"plain text, not an image".to_vec()).unwrap_err();
        assert!(matches!(err, AuditError::MissingInput { .. }));
    }

    #[test]
    fn severity_parses_moderate_alias() {
        assert_eq!("Moderate".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("severe".parse::<Severity>().is_err());
        assert!(Severity::Low < Severity::Medium && Severity::Medium < Severity::High);
    }

    #[test]
    fn risk_category_parses_variants() {
        assert_eq!("Vector-borne".parse::<RiskCategory>().unwrap(), RiskCategory::VectorBorne);
        assert_eq!("vector_borne".parse::<RiskCategory>().unwrap(), RiskCategory::VectorBorne);
        assert_eq!("Biological".parse::<RiskCategory>().unwrap(), RiskCategory::Biological);
        assert!("radiological".parse::<RiskCategory>().is_err());
    }

    #[test]
    fn visual_findings_deserializes_model_shape() {
        let json = r#"{"detected_features":["murky water","sediment"],"contamination_level":"Moderate","likely_risks":["bacterial"]}"#;
        let findings: VisualFindings = serde_json::from_str(json).expect("deserialize");
        assert_eq!(findings.contamination_level, Severity::Medium);
        let md = findings.to_markdown();
        assert!(md.contains("murky water, sediment"));
        assert!(md.contains("`medium`"));
    }

    #[test]
    fn risk_map_orders_and_dedupes_entries() {
        let map = RiskMap::new(
            "Cloudy well water",
            Severity::Medium,
            vec![
                entry(RiskCategory::VectorBorne, Severity::Low),
                entry(RiskCategory::Chemical, Severity::Low),
                entry(RiskCategory::Biological, Severity::Low),
                entry(RiskCategory::Biological, Severity::Medium),
            ],
            Some("  ".into()),
        )
        .expect("risk map");

        assert_eq!(map.labels(), "biological:medium, chemical:low, vector-borne:low");
        assert_eq!(map.elevated_categories(), vec![RiskCategory::Biological]);
        assert!(map.note().is_none());
    }

    #[test]
    fn risk_map_requires_every_category() {
        let err = RiskMap::new(
            "x",
            Severity::Low,
            vec![entry(RiskCategory::Biological, Severity::High)],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AuditError::AnalysisService(_)));
        assert!(err.to_string().contains("chemical, vector-borne"));
    }

    #[test]
    fn resource_set_always_has_four_categories() {
        let set = ResourceSet::new(
            vec![(
                ResourceCategory::Advisories,
                vec![ResourceLink {
                    title: "WHO guidance".into(),
                    link: Url::parse("https://www.who.int/water").unwrap(),
                }],
            )],
            Vec::new(),
        );

        let categories: Vec<_> = set.categories().collect();
        assert_eq!(categories, ResourceCategory::ALL.to_vec());
        assert_eq!(set.get(ResourceCategory::Advisories).len(), 1);
        assert!(set.get(ResourceCategory::FilterReviews).is_empty());
        assert_eq!(set.total_links(), 1);
    }
}
