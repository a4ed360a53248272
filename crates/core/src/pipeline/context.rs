use std::path::Path;

use crate::authenticity::thresholds::AuthenticityThresholds;
use crate::detection::features::{FeatureConfig, FeatureMatcher};
use crate::detection::locator::LocatorConfig;
use crate::detection::matcher::MatcherConfig;
use crate::detection::pattern::PatternConfig;
use crate::templates::catalog::TemplateCatalog;

/// All pipeline tuning in one place, stage by stage.
#[derive(Clone, Debug, Default)]
pub struct DetectorConfig {
    pub locator: LocatorConfig,
    pub matcher: MatcherConfig,
    pub pattern: PatternConfig,
    pub features: FeatureConfig,
    pub thresholds: AuthenticityThresholds,
}

/// Immutable state shared by every detection call: the template catalog,
/// the cached reference features, and the stage configuration.
///
/// Constructed once at startup and passed by reference into each
/// coordinator; workers needing isolation construct one coordinator each
/// around the same context.
pub struct DetectionContext {
    catalog: TemplateCatalog,
    features: Option<FeatureMatcher>,
    config: DetectorConfig,
}

impl DetectionContext {
    pub fn new(catalog: TemplateCatalog, config: DetectorConfig) -> Self {
        let features = catalog
            .primary()
            .map(|template| FeatureMatcher::new(template, config.features.clone()));
        if features.is_none() {
            log::warn!("no primary template: feature verification disabled");
        }
        Self {
            catalog,
            features,
            config,
        }
    }

    /// Load the catalog from the conventional asset directory.
    pub fn load(assets_dir: &Path, config: DetectorConfig) -> Self {
        Self::new(TemplateCatalog::load(assets_dir), config)
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Feature verification path; absent when no primary template loaded.
    pub fn feature_matcher(&self) -> Option<&FeatureMatcher> {
        self.features.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::template::{default_header_range, Template, TemplateKind};
    use crate::testutil::textured_card;

    #[test]
    fn test_context_with_primary_has_features() {
        let catalog = TemplateCatalog::from_templates([Template::from_frame(
            TemplateKind::Primary,
            textured_card(160, 100),
            &default_header_range(),
        )]);
        let context = DetectionContext::new(catalog, DetectorConfig::default());
        assert!(context.feature_matcher().is_some());
    }

    #[test]
    fn test_context_without_primary_disables_features() {
        let catalog = TemplateCatalog::from_templates([Template::from_frame(
            TemplateKind::Dark,
            textured_card(160, 100),
            &default_header_range(),
        )]);
        let context = DetectionContext::new(catalog, DetectorConfig::default());
        assert!(context.feature_matcher().is_none());
        assert_eq!(context.catalog().len(), 1);
    }

    #[test]
    fn test_load_from_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let context = DetectionContext::load(
            &dir.path().join("does-not-exist"),
            DetectorConfig::default(),
        );
        assert!(context.catalog().is_empty());
        assert!(context.feature_matcher().is_none());
    }
}
