use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use super::aggregate::{Execution, JobAggregate};
use super::classifier::cmp_versions_desc;

/// Bucket for jobs whose name carries no known platform token.
pub const UNKNOWN_PLATFORM: &str = "unknown";

pub type VariantMap = IndexMap<String, Vec<Execution>>;
pub type PlatformMap = IndexMap<String, VariantMap>;

/// version -> platform -> variant -> executions (newest first).
///
/// Versions are kept newest first; platforms and variants keep the order
/// in which they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportTree(IndexMap<String, PlatformMap>);

impl ReportTree {
    pub fn versions(&self) -> impl Iterator<Item = (&str, &PlatformMap)> {
        self.0.iter().map(|(version, platforms)| (version.as_str(), platforms))
    }

    pub fn get(&self, version: &str) -> Option<&PlatformMap> {
        self.0.get(version)
    }

    pub fn contains_version(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionTotals {
    pub total: usize,
    pub passed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryTotals {
    pub total: usize,
    pub total_passed: usize,
    /// Same order as the versions of the tree that produced it
    pub per_version: IndexMap<String, VersionTotals>,
}

/// Groups aggregates into a [`ReportTree`].
///
/// Aggregates without executions are left out. When two aggregates share
/// version, platform and variant, the one processed last replaces the
/// earlier executions instead of being merged with them.
pub fn group(aggregates: impl IntoIterator<Item = JobAggregate>) -> ReportTree {
    let mut aggregates: Vec<JobAggregate> = aggregates
        .into_iter()
        .filter(|aggregate| !aggregate.is_empty())
        .collect();
    aggregates.sort_by(|a, b| cmp_versions_desc(&a.identity.version, &b.identity.version));

    let mut tree: IndexMap<String, PlatformMap> = IndexMap::new();

    for aggregate in aggregates {
        let identity = aggregate.identity;
        let platform = identity.platform.unwrap_or_else(|| {
            warn!(
                "No known platform in {}, grouping under '{UNKNOWN_PLATFORM}'",
                identity.full_name
            );
            UNKNOWN_PLATFORM.to_string()
        });

        let variants = tree
            .entry(identity.version)
            .or_default()
            .entry(platform)
            .or_default();

        if variants
            .insert(identity.variant, aggregate.executions)
            .is_some()
        {
            warn!(
                "{} shares version, platform and variant with another job; keeping its results only",
                identity.full_name
            );
        }
    }

    ReportTree(tree)
}

/// Counts executions and successes, globally and per version.
pub fn summarize(tree: &ReportTree) -> SummaryTotals {
    let mut totals = SummaryTotals::default();

    for (version, platforms) in tree.versions() {
        let version_totals = platforms
            .values()
            .flat_map(IndexMap::values)
            .flatten()
            .fold(VersionTotals::default(), |mut acc, execution| {
                acc.total += 1;
                if execution.status.is_success() {
                    acc.passed += 1;
                }
                acc
            });

        totals.total += version_totals.total;
        totals.total_passed += version_totals.passed;
        totals.per_version.insert(version.to_owned(), version_totals);
    }

    totals
}
