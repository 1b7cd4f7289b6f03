//! Source-of-truth metadata carried by writable nodes.

use serde::{Deserialize, Serialize};

/// Source written by the CRM itself. Updates from it always win.
pub const SOURCE_OPENLINE: &str = "openline";
/// Source used by web-scrape enrichment. Wins on organization updates.
pub const SOURCE_WEBSCRAPE: &str = "webscrape";
/// Default `appSource` for nodes created by this layer.
pub const APP_SOURCE: &str = "crm-graph";

/// The `source` / `sourceOfTruth` / `appSource` triple.
///
/// `source` is the system that produced the write, `source_of_truth` the
/// system that owns the node's fields from now on, `app_source` the
/// application that issued it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFields {
    pub source: String,
    pub source_of_truth: String,
    pub app_source: String,
}

impl SourceFields {
    /// A triple where the producing system is also the owner.
    pub fn new(source: impl Into<String>, app_source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            source_of_truth: source.clone(),
            source,
            app_source: app_source.into(),
        }
    }

    pub fn openline() -> Self {
        Self::new(SOURCE_OPENLINE, APP_SOURCE)
    }

    /// Owner to record; falls back to `source` when unset.
    pub fn source_of_truth(&self) -> &str {
        if self.source_of_truth.is_empty() {
            &self.source
        } else {
            &self.source_of_truth
        }
    }

    pub fn app_source(&self) -> &str {
        if self.app_source.is_empty() {
            APP_SOURCE
        } else {
            &self.app_source
        }
    }

    /// Whether this write replaces fields owned by another source.
    pub fn overwrite(&self) -> bool {
        is_overwrite_source(&self.source)
    }
}

/// `openline` writes always overwrite.
pub fn is_overwrite_source(source: &str) -> bool {
    source == SOURCE_OPENLINE
}

/// Organization updates additionally let web-scrape data overwrite.
pub fn is_organization_overwrite_source(source: &str) -> bool {
    source == SOURCE_OPENLINE || source == SOURCE_WEBSCRAPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_only_for_openline() {
        assert!(SourceFields::openline().overwrite());
        assert!(!SourceFields::new("hubspot", "sync").overwrite());
        assert!(!is_overwrite_source(SOURCE_WEBSCRAPE));
        assert!(is_organization_overwrite_source(SOURCE_WEBSCRAPE));
    }

    #[test]
    fn test_source_of_truth_defaults_to_source() {
        let fields = SourceFields {
            source: "hubspot".into(),
            ..Default::default()
        };
        assert_eq!(fields.source_of_truth(), "hubspot");
        assert_eq!(fields.app_source(), APP_SOURCE);
    }
}
