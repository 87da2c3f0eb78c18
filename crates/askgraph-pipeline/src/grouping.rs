//! Bundle grouping: nest scenario rows under the bundle that contains them.
//!
//! Given a table whose first row holds a scenario identifier in some column,
//! every distinct scenario is enriched with two lookups against the same
//! engine (owning bundle, own label/acronym) and the table is rebuilt as
//!
//! | Bundle URI | Bundle Label | Scenario Acronym | Scenario Label |
//!
//! with the bundle cells filled only on the first row of each group.
//! Enrichment failures never fail the table; they only drop metadata.

use std::collections::HashMap;
use std::sync::Arc;

use askgraph_sparql::{QueryEngine, ResultTable, StructuredQuery};

pub const DEFAULT_SCENARIO_FRAGMENT: &str = "/ontology/oekg/scenario/";

const OEKG_NAMESPACE: &str = "https://openenergyplatform.org/ontology/oekg/";
const BUNDLE_PAGE_BASE: &str = "https://openenergyplatform.org/scenario-bundles/id/";

pub const GROUPED_COLUMNS: [&str; 4] = [
    "Bundle URI",
    "Bundle Label",
    "Scenario Acronym",
    "Scenario Label",
];

/// Decides which values are scenario identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioMatcher {
    fragment: String,
}

impl Default for ScenarioMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SCENARIO_FRAGMENT)
    }
}

impl ScenarioMatcher {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    pub fn is_scenario(&self, value: &str) -> bool {
        !self.fragment.is_empty() && value.contains(&self.fragment)
    }

    /// First column whose first-row value is a scenario identifier.
    pub fn find_column(&self, table: &ResultTable) -> Option<usize> {
        let first = table.rows().first()?;
        first
            .iter()
            .position(|v| v.as_deref().is_some_and(|v| self.is_scenario(v)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioEntry {
    pub uri: String,
    /// Empty when the label lookup failed.
    pub acronym: String,
    pub label: String,
}

/// Scenarios sharing an owning bundle. `uri == None` collects the scenarios
/// whose bundle could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleGroup {
    pub uri: Option<String>,
    pub label: Option<String>,
    pub scenarios: Vec<ScenarioEntry>,
}

/// Internal OEKG bundle URIs point at the public bundle page instead.
pub fn bundle_page_uri(uri: &str) -> String {
    if uri.starts_with(OEKG_NAMESPACE) {
        if let Some(id) = uri.rsplit('/').next().filter(|s| !s.is_empty()) {
            return format!("{BUNDLE_PAGE_BASE}{id}");
        }
    }
    uri.to_string()
}

pub fn bundle_lookup_query(scenario: &str) -> StructuredQuery {
    StructuredQuery::new(format!(
        "SELECT DISTINCT ?bundle ?bundleLabel WHERE {{ ?bundle obo:BFO_0000051 <{scenario}> . ?bundle rdfs:label ?bundleLabel . }}"
    ))
}

/// Which of `candidates` are typed as scenario bundles.
pub fn bundle_type_query(candidates: &[String]) -> StructuredQuery {
    let values: Vec<String> = candidates.iter().map(|c| format!("<{c}>")).collect();
    StructuredQuery::new(format!(
        "SELECT DISTINCT ?bundle WHERE {{ VALUES ?bundle {{ {} }} ?bundle a oeo:OEO_00020227 . }}",
        values.join(" ")
    ))
}

pub fn label_lookup_query(scenario: &str) -> StructuredQuery {
    StructuredQuery::new(format!(
        "SELECT ?scenario ?scenarioLabel ?scenarioAcronym WHERE {{ VALUES ?scenario {{ <{scenario}> }} ?scenario rdfs:label ?scenarioLabel . ?scenario dc:acronym ?scenarioAcronym . }}"
    ))
}

/// Flatten groups into the display table: scenarios sorted by
/// (acronym, label) within each group, bundle cells on the first row only.
pub fn flatten_groups(groups: Vec<BundleGroup>) -> ResultTable {
    let columns = GROUPED_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut rows = Vec::new();
    for mut group in groups {
        group
            .scenarios
            .sort_by(|a, b| (&a.acronym, &a.label).cmp(&(&b.acronym, &b.label)));
        for (i, scenario) in group.scenarios.into_iter().enumerate() {
            let (bundle_uri, bundle_label) = if i == 0 {
                (group.uri.as_deref().map(bundle_page_uri), group.label.clone())
            } else {
                (None, None)
            };
            rows.push(vec![
                bundle_uri,
                bundle_label,
                Some(scenario.acronym).filter(|a| !a.is_empty()),
                Some(scenario.label),
            ]);
        }
    }
    ResultTable::new(columns, rows)
}

fn first_binding(table: &ResultTable, column: &str) -> Option<String> {
    let idx = table.column_index(column)?;
    table.value(0, idx).map(str::to_string)
}

pub struct BundleGrouper {
    engine: Arc<dyn QueryEngine>,
    matcher: ScenarioMatcher,
}

impl BundleGrouper {
    pub fn new(engine: Arc<dyn QueryEngine>, matcher: ScenarioMatcher) -> Self {
        Self { engine, matcher }
    }

    pub fn matcher(&self) -> &ScenarioMatcher {
        &self.matcher
    }

    /// Regroup `table` by bundle. Tables without a scenario column keep
    /// their shape; only bundle IRIs in them are pointed at the public page.
    pub async fn group(&self, table: ResultTable) -> ResultTable {
        if table.is_empty() {
            return table;
        }
        let Some(column) = self.matcher.find_column(&table) else {
            return self.link_bundle_pages(table).await;
        };

        let mut scenarios: Vec<String> = Vec::new();
        for value in table.column_values(column).flatten() {
            if self.matcher.is_scenario(value) && !scenarios.iter().any(|s| s == value) {
                scenarios.push(value.to_string());
            }
        }
        tracing::debug!(column, scenarios = scenarios.len(), "grouping scenarios by bundle");

        let mut groups: Vec<BundleGroup> = Vec::new();
        let mut by_bundle: HashMap<String, usize> = HashMap::new();
        let mut ungrouped: Vec<ScenarioEntry> = Vec::new();

        for scenario in scenarios {
            let entry = self.describe_scenario(&scenario).await;
            match self.owning_bundle(&scenario).await {
                Some((uri, label)) => {
                    let idx = *by_bundle.entry(uri.clone()).or_insert_with(|| {
                        groups.push(BundleGroup {
                            uri: Some(uri),
                            label: Some(label),
                            scenarios: Vec::new(),
                        });
                        groups.len() - 1
                    });
                    groups[idx].scenarios.push(entry);
                }
                None => ungrouped.push(entry),
            }
        }

        if !ungrouped.is_empty() {
            groups.push(BundleGroup {
                uri: None,
                label: None,
                scenarios: ungrouped,
            });
        }
        flatten_groups(groups)
    }

    async fn link_bundle_pages(&self, table: ResultTable) -> ResultTable {
        let mut candidates: Vec<String> = Vec::new();
        for row in table.rows() {
            for value in row.iter().flatten() {
                if value.starts_with(OEKG_NAMESPACE)
                    && !self.matcher.is_scenario(value)
                    && !candidates.contains(value)
                {
                    candidates.push(value.clone());
                }
            }
        }
        if candidates.is_empty() {
            return table;
        }

        let query = bundle_type_query(&candidates);
        let bundles: Vec<String> = match self.engine.select(&query.full_text()).await {
            Ok(t) => match t.column_index("bundle") {
                Some(idx) => t.column_values(idx).flatten().map(str::to_string).collect(),
                None => Vec::new(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "bundle type lookup failed");
                return table;
            }
        };
        if bundles.is_empty() {
            return table;
        }

        let rows = table
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.as_ref().map(|v| {
                            if bundles.contains(v) {
                                bundle_page_uri(v)
                            } else {
                                v.clone()
                            }
                        })
                    })
                    .collect()
            })
            .collect();
        ResultTable::new(table.columns().to_vec(), rows)
    }

    async fn owning_bundle(&self, scenario: &str) -> Option<(String, String)> {
        let query = bundle_lookup_query(scenario);
        match self.engine.select(&query.full_text()).await {
            Ok(t) => {
                let bundle = first_binding(&t, "bundle");
                let label = first_binding(&t, "bundleLabel");
                if bundle.is_none() {
                    tracing::warn!(scenario, "no owning bundle found");
                }
                Some((bundle?, label.unwrap_or_default()))
            }
            Err(e) => {
                tracing::warn!(scenario, error = %e, "bundle lookup failed");
                None
            }
        }
    }

    async fn describe_scenario(&self, scenario: &str) -> ScenarioEntry {
        let query = label_lookup_query(scenario);
        let (label, acronym) = match self.engine.select(&query.full_text()).await {
            Ok(t) => (
                first_binding(&t, "scenarioLabel"),
                first_binding(&t, "scenarioAcronym"),
            ),
            Err(e) => {
                tracing::warn!(scenario, error = %e, "scenario label lookup failed");
                (None, None)
            }
        };
        match label {
            Some(label) => ScenarioEntry {
                uri: scenario.to_string(),
                acronym: acronym.unwrap_or_default(),
                label,
            },
            None => ScenarioEntry {
                uri: scenario.to_string(),
                acronym: String::new(),
                label: scenario.to_string(),
            },
        }
    }
}
