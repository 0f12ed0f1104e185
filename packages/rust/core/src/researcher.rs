//! Stage 4: categorized resource research.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use url::Url;

use waterauditor_shared::{
    AuditConfig, AuditError, ResourceCategory, ResourceLink, ResourceSet, Result, RiskMap,
    SearchFailurePolicy, SearchHit, SearchService,
};

use crate::bundle::InputBundle;
use crate::prompts;

/// Search each resource category in turn and curate the results.
///
/// Queries run one at a time in [`ResourceCategory::ALL`] order. Results keep
/// provider order, invalid links are dropped, a link kept once is never kept
/// again (in this or a later category), and each category is capped at
/// `config.max_results_per_category`.
///
/// A failed search aborts with [`AuditError::SearchService`] unless the
/// config asks to degrade, in which case the category stays empty and the
/// set carries a warning.
#[instrument(skip_all, fields(source_type = %bundle.source_type()))]
pub async fn research<S: SearchService>(
    search: &S,
    risk_map: &RiskMap,
    bundle: &InputBundle,
    config: &AuditConfig,
) -> Result<ResourceSet> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(ResourceCategory::ALL.len());
    let mut warnings = Vec::new();

    for category in ResourceCategory::ALL {
        let query = prompts::research_query(
            category,
            risk_map,
            bundle.source_type(),
            bundle.preferences(),
        );

        let hits = match search.search(&query).await {
            Ok(hits) => hits,
            Err(e) => match config.on_search_failure {
                SearchFailurePolicy::Abort => {
                    return Err(AuditError::SearchService(format!(
                        "search for {} failed: {e}",
                        category.title()
                    )));
                }
                SearchFailurePolicy::Degrade => {
                    warn!(category = category.as_str(), error = %e, "search failed, leaving category empty");
                    warnings.push(format!(
                        "Search for {} failed, so no resources are listed for it.",
                        category.title()
                    ));
                    entries.push((category, Vec::new()));
                    continue;
                }
            },
        };

        let links = curate(hits, &mut seen, config.max_results_per_category);
        debug!(category = category.as_str(), kept = links.len(), "category curated");
        entries.push((category, links));
    }

    let resources = ResourceSet::new(entries, warnings);

    info!(
        links = resources.total_links(),
        warnings = resources.warnings().len(),
        "resource research complete"
    );

    Ok(resources)
}

/// Validate, deduplicate and cap one category's hits, keeping their order.
fn curate(hits: Vec<SearchHit>, seen: &mut HashSet<String>, cap: usize) -> Vec<ResourceLink> {
    let mut links = Vec::new();

    for hit in hits {
        if links.len() >= cap {
            break;
        }

        let Some(link) = parse_link(&hit.link) else {
            debug!(link = %hit.link, "dropping invalid link");
            continue;
        };

        if !seen.insert(link.as_str().to_string()) {
            continue;
        }

        let title = match hit.title.trim() {
            "" => link.host_str().unwrap_or("Untitled").to_string(),
            t => t.to_string(),
        };

        links.push(ResourceLink { title, link });
    }

    links
}

/// Parse an absolute http(s) link, dropping any fragment.
fn parse_link(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
