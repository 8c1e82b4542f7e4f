use std::cmp::Ordering;

use indexmap::IndexSet;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PLATFORMS: [&str; 3] = ["metal", "aws", "azure"];
pub const DEFAULT_VARIANT_DELIMITER: &str = "periodics-";
pub const DEFAULT_VERSION_PATTERN: &str = r"\d\.\d+";

/// A job name that does not follow the periodic naming convention.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("a version is missing at {name}")]
    MissingVersion { name: String },

    #[error("no variant after '{delimiter}' at {name}")]
    MissingVariant { name: String, delimiter: String },
}

/// Dimensions parsed out of a periodic job name.
///
/// `variant` and `version` are never empty. `platform` is `None` when the
/// name carries none of the known platform tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobIdentity {
    pub full_name: String,
    pub platform: Option<String>,
    pub variant: String,
    pub version: String,
}

/// Distinct versions in the order they were first seen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionRegistry(IndexSet<String>);

impl VersionRegistry {
    pub fn register(&mut self, version: &str) {
        if !self.contains(version) {
            self.0.insert(version.to_owned());
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        self.0.contains(version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Splits job names into version, platform and variant.
#[derive(Debug, Clone)]
pub struct Classifier {
    platforms: Vec<String>,
    variant_delimiter: String,
    version_pattern: Regex,
}

impl Classifier {
    /// Creates a classifier.
    ///
    /// # Arguments
    ///
    /// * `platforms` - Platform tokens, checked in order (first match wins)
    /// * `variant_delimiter` - Marker after which the variant starts (e.g. "periodics-")
    /// * `version_pattern` - Regex whose first match is the version (e.g. `\d\.\d+`)
    ///
    /// # Errors
    ///
    /// Returns an error if `version_pattern` is not a valid regex.
    pub fn new(
        platforms: Vec<String>,
        variant_delimiter: impl Into<String>,
        version_pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            platforms,
            variant_delimiter: variant_delimiter.into(),
            version_pattern: Regex::new(version_pattern)?,
        })
    }

    pub fn classify(&self, full_name: &str) -> Result<JobIdentity, ClassificationError> {
        // Overlapping tokens resolve by configured order.
        let platform = self
            .platforms
            .iter()
            .find(|p| full_name.contains(p.as_str()))
            .cloned();

        let variant = full_name
            .split_once(&self.variant_delimiter)
            .map(|(_, rest)| rest)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| ClassificationError::MissingVariant {
                name: full_name.to_owned(),
                delimiter: self.variant_delimiter.clone(),
            })?;

        let version = self
            .version_pattern
            .find(full_name)
            .map(|m| m.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ClassificationError::MissingVersion {
                name: full_name.to_owned(),
            })?;

        Ok(JobIdentity {
            full_name: full_name.to_owned(),
            platform,
            variant: variant.to_owned(),
            version: version.to_owned(),
        })
    }

    /// Classifies every name, registering each version seen.
    ///
    /// Stops at the first malformed name.
    pub fn classify_all<I, S>(
        &self,
        names: I,
    ) -> Result<(Vec<JobIdentity>, VersionRegistry), ClassificationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = VersionRegistry::default();
        let identities = names
            .into_iter()
            .map(|name| {
                let identity = self.classify(name.as_ref())?;
                registry.register(&identity.version);
                Ok(identity)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((identities, registry))
    }
}

/// Orders versions newest first ("4.20" before "4.19" before "4.9").
///
/// Components are compared numerically. Versions with a non-numeric
/// component sort after all numeric ones, by plain string comparison.
pub fn cmp_versions_desc(a: &str, b: &str) -> Ordering {
    match (numeric_components(a), numeric_components(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

fn numeric_components(version: &str) -> Option<Vec<u64>> {
    version.split('.').map(|c| c.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(
            DEFAULT_PLATFORMS.iter().map(ToString::to_string).collect(),
            DEFAULT_VARIANT_DELIMITER,
            DEFAULT_VERSION_PATTERN,
        )
        .unwrap()
    }

    #[cfg(test)]
    mod classify {
        use super::*;

        #[test]
        fn extracts_all_three_dimensions() {
            let identity = classifier()
                .classify("periodic-ci-openshift-hypershift-release-4.19-periodics-e2e-kubevirt-aws-ovn")
                .unwrap();

            assert_eq!(identity.version, "4.19");
            assert_eq!(identity.platform.as_deref(), Some("aws"));
            assert_eq!(identity.variant, "e2e-kubevirt-aws-ovn");
        }

        #[test]
        fn keeps_full_name() {
            let name = "periodic-4.20-kubevirt-metal-periodics-fips";
            let identity = classifier().classify(name).unwrap();

            assert_eq!(identity.full_name, name);
            assert_eq!(identity.version, "4.20");
            assert_eq!(identity.platform.as_deref(), Some("metal"));
            assert_eq!(identity.variant, "fips");
        }

        #[test]
        fn variant_is_everything_after_first_delimiter() {
            let identity = classifier()
                .classify("periodic-4.18-azure-periodics-conformance-periodics-extra")
                .unwrap();

            assert_eq!(identity.variant, "conformance-periodics-extra");
        }

        #[test]
        fn first_configured_platform_wins() {
            let identity = classifier()
                .classify("periodic-4.18-aws-on-azure-periodics-x")
                .unwrap();

            assert_eq!(identity.platform.as_deref(), Some("aws"));
        }

        #[test]
        fn unknown_platform_is_not_an_error() {
            let identity = classifier()
                .classify("periodic-4.17-kubevirt-gcp-periodics-ovn")
                .unwrap();

            assert_eq!(identity.platform, None);
            assert_eq!(identity.variant, "ovn");
        }

        #[test]
        fn fails_without_version() {
            let err = classifier()
                .classify("periodic-main-kubevirt-aws-periodics-ovn")
                .unwrap_err();

            assert_eq!(
                err,
                ClassificationError::MissingVersion {
                    name: "periodic-main-kubevirt-aws-periodics-ovn".to_string()
                }
            );
            assert!(err.to_string().contains("periodic-main-kubevirt-aws-periodics-ovn"));
        }

        #[test]
        fn fails_without_delimiter() {
            let err = classifier()
                .classify("periodic-4.19-kubevirt-aws-ovn")
                .unwrap_err();

            assert!(matches!(err, ClassificationError::MissingVariant { .. }));
        }

        #[test]
        fn fails_when_delimiter_ends_the_name() {
            let err = classifier().classify("periodic-4.19-aws-periodics-").unwrap_err();

            assert!(matches!(err, ClassificationError::MissingVariant { .. }));
        }
    }

    #[cfg(test)]
    mod classify_all {
        use super::*;

        #[test]
        fn registers_distinct_versions_in_first_seen_order() {
            let (identities, registry) = classifier()
                .classify_all([
                    "a-4.19-aws-periodics-x",
                    "b-4.20-metal-periodics-y",
                    "c-4.19-azure-periodics-z",
                ])
                .unwrap();

            assert_eq!(identities.len(), 3);
            assert_eq!(registry.iter().collect::<Vec<_>>(), vec!["4.19", "4.20"]);
        }

        #[test]
        fn aborts_on_first_malformed_name() {
            let result = classifier().classify_all(["a-4.19-aws-periodics-x", "broken"]);

            assert!(result.is_err());
        }

        #[test]
        fn empty_input_yields_empty_registry() {
            let (identities, registry) =
                classifier().classify_all(Vec::<String>::new()).unwrap();

            assert!(identities.is_empty());
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn versions_sort_numerically_descending() {
        let mut versions = vec!["4.9", "4.20", "4.19", "3.11"];
        versions.sort_by(|a, b| cmp_versions_desc(a, b));

        assert_eq!(versions, vec!["4.20", "4.19", "4.9", "3.11"]);
    }

    #[test]
    fn non_numeric_versions_sort_after_numeric_ones() {
        let mut versions = vec!["4.10x", "4.9", "beta", "4.10"];
        versions.sort_by(|a, b| cmp_versions_desc(a, b));

        assert_eq!(versions, vec!["4.10", "4.9", "beta", "4.10x"]);
    }

    #[test]
    fn mixed_version_order_is_transitive() {
        let versions = ["4.10", "4.9", "4.10x"];
        assert_eq!(cmp_versions_desc("4.10", "4.9"), Ordering::Less);
        assert_eq!(cmp_versions_desc("4.9", "4.10x"), Ordering::Less);
        assert_eq!(cmp_versions_desc("4.10", "4.10x"), Ordering::Less);
        for a in versions {
            for b in versions {
                assert_eq!(cmp_versions_desc(a, b), cmp_versions_desc(b, a).reverse());
            }
        }
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(Classifier::new(vec![], "periodics-", r"(\d").is_err());
    }
}
